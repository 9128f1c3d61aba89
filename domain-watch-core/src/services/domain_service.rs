//! Domain registration service

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::services::monitor::Monitor;
use crate::types::{DomainId, DomainRecord, NewDomain, RegisterDomainRequest};

/// Maximum length of a domain name in ASCII form
const MAX_DOMAIN_LENGTH: usize = 253;

/// Registration, listing and deletion of monitored domains
pub struct DomainService {
    ctx: Arc<ServiceContext>,
    monitor: Arc<Monitor>,
    supported_extensions: Vec<String>,
}

impl DomainService {
    /// `supported_extensions` restricts registration to these TLDs; empty allows any.
    #[must_use]
    pub fn new(
        ctx: Arc<ServiceContext>,
        monitor: Arc<Monitor>,
        supported_extensions: Vec<String>,
    ) -> Self {
        let supported_extensions = supported_extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            ctx,
            monitor,
            supported_extensions,
        }
    }

    /// Add a domain to monitoring with status `unknown`
    pub async fn register(&self, request: RegisterDomainRequest) -> CoreResult<DomainRecord> {
        let name = normalize_domain(&request.domain)?;
        let extension = extension_of(&name).to_string();

        if !self.supported_extensions.is_empty() && !self.supported_extensions.contains(&extension)
        {
            return Err(CoreError::ValidationError(format!(
                "Unsupported extension .{extension} (supported: {})",
                self.supported_extensions.join(", ")
            )));
        }

        if self.ctx.domain_repository.find_by_name(&name).await?.is_some() {
            return Err(CoreError::DomainAlreadyExists(name));
        }

        let niche = request
            .niche
            .map(|niche| niche.trim().to_string())
            .filter(|niche| !niche.is_empty());

        let record = self
            .ctx
            .domain_repository
            .insert(&NewDomain {
                name,
                extension,
                niche,
                traffic: request.traffic,
                referring_domains: request.referring_domains,
            })
            .await?;

        log::info!("Domain registered: {} (id {})", record.name, record.id);
        Ok(record)
    }

    /// Delete a domain and its history
    pub async fn delete(&self, domain_id: DomainId) -> CoreResult<()> {
        if !self.ctx.domain_repository.delete(domain_id).await? {
            return Err(CoreError::DomainNotFound(domain_id));
        }
        self.monitor.forget_domain(domain_id);
        log::info!("Domain deleted: {domain_id}");
        Ok(())
    }

    /// All domains, ordered by ID
    pub async fn list(&self) -> CoreResult<Vec<DomainRecord>> {
        self.ctx.domain_repository.find_all().await
    }

    pub async fn get(&self, domain_id: DomainId) -> CoreResult<DomainRecord> {
        self.ctx
            .domain_repository
            .find_by_id(domain_id)
            .await?
            .ok_or(CoreError::DomainNotFound(domain_id))
    }
}

/// Trim, lowercase and convert a domain to its IDNA ASCII form.
///
/// Requires at least two labels; a trailing root dot is dropped.
pub fn normalize_domain(input: &str) -> CoreResult<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if trimmed.parse::<std::net::IpAddr>().is_ok() {
        return Err(CoreError::ValidationError(format!(
            "Expected a domain name, got an IP address: {trimmed}"
        )));
    }

    let ascii = idna::domain_to_ascii_strict(trimmed)
        .map_err(|_| CoreError::ValidationError(format!("Invalid domain name: {trimmed}")))?
        .to_ascii_lowercase();

    if ascii.len() > MAX_DOMAIN_LENGTH {
        return Err(CoreError::ValidationError(format!(
            "Domain name exceeds maximum length of {MAX_DOMAIN_LENGTH} characters (got {})",
            ascii.len()
        )));
    }
    if !ascii.contains('.') || ascii.split('.').any(str::is_empty) {
        return Err(CoreError::ValidationError(format!(
            "Domain name must have a name and an extension: {trimmed}"
        )));
    }
    Ok(ascii)
}

fn extension_of(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
