pub mod check_log;
pub mod domain;
pub mod notification;
