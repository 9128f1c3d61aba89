//! Type definitions

mod check;
mod domain;
mod notification;
mod stats;

pub use check::{
    CheckOutcome, CheckPath, CheckReport, CheckRun, InconclusiveReason, ProbeOutcome, ProbeReport,
    SkipReason, Transition, Verdict,
};
pub use domain::{
    DomainId, DomainRecord, DomainState, DomainStatus, NewDomain, RegisterDomainRequest,
};
pub use notification::{DeliveryResponse, DomainNotice, NotificationKind, NotificationRecord};
pub use stats::{DomainCounts, DomainStatusView, MonitorStats, SweepSummary};
