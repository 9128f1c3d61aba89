//! `hickory-resolver` backed existence probe.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    ResolveError, TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    lookup::Lookup,
    name_server::TokioConnectionProvider,
    proto::{ProtoErrorKind, op::ResponseCode, rr::RecordType},
};

use crate::error::{CoreError, CoreResult};
use crate::traits::ExistenceProbe;
use crate::types::{InconclusiveReason, ProbeOutcome};

/// Default DNS port when an endpoint is given as a bare IP.
const DNS_PORT: u16 = 53;

/// Probe a single nameserver with one query, no retries and no cache.
pub struct HickoryProbe {
    endpoint: String,
    resolver: TokioResolver,
    record_type: RecordType,
}

impl HickoryProbe {
    /// Build a probe for `addr`.
    ///
    /// The resolver is configured with `attempts = 1` and an empty cache so
    /// that every probe reaches the endpoint; negative answers are trusted
    /// because NXDOMAIN is exactly what we are looking for.
    #[must_use]
    pub fn new(addr: SocketAddr, record_type: RecordType, timeout: Duration) -> Self {
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true),
        );
        let provider = TokioConnectionProvider::default();
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.num_concurrent_reqs = 1;
        let resolver = TokioResolver::builder_with_config(config, provider)
            .with_options(opts)
            .build();

        Self {
            endpoint: addr.to_string(),
            resolver,
            record_type,
        }
    }

    /// Build a probe from an endpoint string (`8.8.8.8`, `8.8.8.8:5353`, `[2001:db8::1]:53`)
    /// and a record type name (`NS`, `SOA`, `A`, ...).
    pub fn from_config(endpoint: &str, record_type: &str, timeout: Duration) -> CoreResult<Self> {
        let addr = parse_endpoint(endpoint)?;
        let record_type = RecordType::from_str(&record_type.to_uppercase()).map_err(|_| {
            CoreError::ConfigError(format!("Unsupported probe record type: {record_type}"))
        })?;
        Ok(Self::new(addr, record_type, timeout))
    }
}

#[async_trait]
impl ExistenceProbe for HickoryProbe {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn probe(&self, domain: &str) -> ProbeOutcome {
        // Fully qualified so no search domain is ever appended.
        let fqdn = format!("{}.", domain.trim_end_matches('.'));
        let outcome = classify_lookup(self.resolver.lookup(fqdn.as_str(), self.record_type).await);
        log::debug!("[{}] {domain} {}: {outcome:?}", self.endpoint, self.record_type);
        outcome
    }
}

/// Parse `ip` or `ip:port` into a socket address.
pub(crate) fn parse_endpoint(endpoint: &str) -> CoreResult<SocketAddr> {
    let endpoint = endpoint.trim();
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok(addr);
    }
    endpoint
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| CoreError::ConfigError(format!("Invalid DNS server address: {endpoint}")))
}

fn classify_lookup(result: Result<Lookup, ResolveError>) -> ProbeOutcome {
    match result {
        // Any answer at all means the name is delegated.
        Ok(_) => ProbeOutcome::Exists,
        Err(err) => classify_error(&err),
    }
}

fn classify_error(err: &ResolveError) -> ProbeOutcome {
    let Some(proto) = err.proto() else {
        return ProbeOutcome::Inconclusive(InconclusiveReason::Transport(err.to_string()));
    };
    match proto.kind() {
        ProtoErrorKind::NoRecordsFound { response_code, .. } => {
            classify_response_code(*response_code)
        }
        ProtoErrorKind::Timeout => ProbeOutcome::Inconclusive(InconclusiveReason::Timeout),
        ProtoErrorKind::Io(e) => {
            ProbeOutcome::Inconclusive(InconclusiveReason::Transport(e.to_string()))
        }
        _ => ProbeOutcome::Inconclusive(InconclusiveReason::Malformed(proto.to_string())),
    }
}

/// Map a negative response code onto a probe outcome.
///
/// `NOERROR` without answers is NODATA: the name exists, just not with the
/// queried type.
fn classify_response_code(code: ResponseCode) -> ProbeOutcome {
    match code {
        ResponseCode::NXDomain => ProbeOutcome::Absent,
        ResponseCode::NoError => ProbeOutcome::Exists,
        other => ProbeOutcome::Inconclusive(InconclusiveReason::Response(other.to_string())),
    }
}
