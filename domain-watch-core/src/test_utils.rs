//! Test helpers
//!
//! Mock implementations and factories used by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::services::{
    Monitor, MonitorConfig, NotificationDispatcher, ResolverPair, RetryPolicy, ServiceContext,
};
use crate::traits::{
    CheckHistoryRepository, DomainRepository, ExistenceProbe, NotificationRepository,
    NotificationTransport,
};
use crate::types::{
    CheckOutcome, DeliveryResponse, DomainCounts, DomainId, DomainNotice, DomainRecord,
    DomainState, DomainStatus, NewDomain, NotificationRecord, ProbeOutcome,
};

pub fn sample_domain(id: DomainId, name: &str) -> DomainRecord {
    let now = Utc::now();
    DomainRecord {
        id,
        name: name.to_string(),
        extension: name.rsplit('.').next().unwrap_or_default().to_string(),
        niche: Some("tech".to_string()),
        traffic: 1500,
        referring_domains: 42,
        status: DomainStatus::Unknown,
        previous_status: DomainStatus::Unknown,
        last_checked: None,
        last_available: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// ===== InMemoryStore =====

#[derive(Default)]
struct StoreState {
    domains: BTreeMap<DomainId, DomainRecord>,
    next_id: DomainId,
    checks: Vec<CheckOutcome>,
    notifications: Vec<NotificationRecord>,
}

/// In-memory implementation of all three repositories
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    /// When set, `save_check` fails with this error
    save_check_error: RwLock<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_domain(&self, name: &str) -> DomainRecord {
        self.insert(&NewDomain {
            name: name.to_string(),
            extension: name.rsplit('.').next().unwrap_or_default().to_string(),
            niche: Some("tech".to_string()),
            traffic: 1500,
            referring_domains: 42,
        })
        .await
        .unwrap()
    }

    pub async fn domain(&self, id: DomainId) -> DomainRecord {
        self.state.read().await.domains[&id].clone()
    }

    pub async fn set_status(&self, id: DomainId, status: DomainStatus) {
        let mut state = self.state.write().await;
        let domain = state.domains.get_mut(&id).unwrap();
        domain.status = status;
    }

    pub async fn checks(&self) -> Vec<CheckOutcome> {
        self.state.read().await.checks.clone()
    }

    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.state.read().await.notifications.clone()
    }

    pub async fn set_save_check_error(&self, err: Option<String>) {
        *self.save_check_error.write().await = err;
    }
}

#[async_trait]
impl DomainRepository for InMemoryStore {
    async fn find_all(&self) -> CoreResult<Vec<DomainRecord>> {
        Ok(self.state.read().await.domains.values().cloned().collect())
    }

    async fn find_active(&self) -> CoreResult<Vec<DomainRecord>> {
        Ok(self
            .state
            .read()
            .await
            .domains
            .values()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>> {
        Ok(self.state.read().await.domains.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Option<DomainRecord>> {
        Ok(self
            .state
            .read()
            .await
            .domains
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn insert(&self, domain: &NewDomain) -> CoreResult<DomainRecord> {
        let mut state = self.state.write().await;
        if state.domains.values().any(|d| d.name == domain.name) {
            return Err(CoreError::DomainAlreadyExists(domain.name.clone()));
        }
        state.next_id += 1;
        let mut record = sample_domain(state.next_id, &domain.name);
        record.extension.clone_from(&domain.extension);
        record.niche.clone_from(&domain.niche);
        record.traffic = domain.traffic;
        record.referring_domains = domain.referring_domains;
        state.domains.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: DomainId) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.domains.remove(&id).is_some();
        state.checks.retain(|c| c.domain_id != id);
        state.notifications.retain(|n| n.domain_id != id);
        Ok(removed)
    }

    async fn set_active(&self, id: DomainId, active: bool) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let domain = state
            .domains
            .get_mut(&id)
            .ok_or(CoreError::DomainNotFound(id))?;
        domain.is_active = active;
        Ok(())
    }

    async fn apply_status(&self, id: DomainId, new_state: &DomainState) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let domain = state
            .domains
            .get_mut(&id)
            .ok_or(CoreError::DomainNotFound(id))?;
        domain.set_state(*new_state);
        Ok(())
    }

    async fn counts(&self) -> CoreResult<DomainCounts> {
        let state = self.state.read().await;
        let mut counts = DomainCounts::default();
        for domain in state.domains.values() {
            counts.total += 1;
            if domain.is_active {
                counts.active += 1;
            }
            *counts
                .by_status
                .entry(domain.status.as_str().to_string())
                .or_default() += 1;
            *counts
                .by_extension
                .entry(domain.extension.clone())
                .or_default() += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl CheckHistoryRepository for InMemoryStore {
    async fn save_check(&self, outcome: &CheckOutcome) -> CoreResult<()> {
        if let Some(ref msg) = *self.save_check_error.read().await {
            return Err(CoreError::StorageError(msg.clone()));
        }
        self.state.write().await.checks.push(outcome.clone());
        Ok(())
    }

    async fn recent_checks(&self, domain_id: DomainId, limit: u64) -> CoreResult<Vec<CheckOutcome>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .read()
            .await
            .checks
            .iter()
            .rev()
            .filter(|c| c.domain_id == domain_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn prune_checks_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.checks.len();
        state.checks.retain(|c| c.checked_at >= cutoff);
        Ok((before - state.checks.len()) as u64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn save_notification(&self, record: &NotificationRecord) -> CoreResult<()> {
        self.state.write().await.notifications.push(record.clone());
        Ok(())
    }

    async fn recent_notifications(
        &self,
        domain_id: DomainId,
        limit: u64,
    ) -> CoreResult<Vec<NotificationRecord>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .rev()
            .filter(|n| n.domain_id == domain_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_notifications_since(&self, since: DateTime<Utc>) -> CoreResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.success && n.sent_at >= since)
            .count() as u64)
    }
}

// ===== ScriptedProbe =====

/// Probe returning queued outcomes, then a fallback outcome
pub struct ScriptedProbe {
    endpoint: String,
    fallback: Mutex<ProbeOutcome>,
    queued: Mutex<VecDeque<ProbeOutcome>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(endpoint: &str, fallback: ProbeOutcome) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            fallback: Mutex::new(fallback),
            queued: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_fallback(&self, outcome: ProbeOutcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn queue(&self, outcomes: impl IntoIterator<Item = ProbeOutcome>) {
        self.queued.lock().unwrap().extend(outcomes);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous probes observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistenceProbe for ScriptedProbe {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn probe(&self, _domain: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

// ===== RecordingTransport =====

/// Transport recording every notice; answers with scripted responses, then 204
#[derive(Default)]
pub struct RecordingTransport {
    sent: RwLock<Vec<DomainNotice>>,
    responses: RwLock<VecDeque<CoreResult<DeliveryResponse>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script(&self, responses: impl IntoIterator<Item = CoreResult<DeliveryResponse>>) {
        self.responses.write().await.extend(responses);
    }

    pub async fn sent(&self) -> Vec<DomainNotice> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, notice: &DomainNotice) -> CoreResult<DeliveryResponse> {
        self.sent.write().await.push(notice.clone());
        self.responses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(DeliveryResponse::ok(204)))
    }
}

// ===== TestHarness =====

/// Monitor wired to in-memory collaborators
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub ctx: Arc<ServiceContext>,
    pub primary: Arc<ScriptedProbe>,
    pub secondary: Arc<ScriptedProbe>,
    pub transport: Arc<RecordingTransport>,
    pub monitor: Arc<Monitor>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        Self::build(
            config,
            ScriptedProbe::new("primary", ProbeOutcome::Exists),
            ScriptedProbe::new("secondary", ProbeOutcome::Exists),
        )
    }

    pub fn build(config: MonitorConfig, primary: ScriptedProbe, secondary: ScriptedProbe) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let ctx = Arc::new(ServiceContext::from_store(Arc::clone(&store)));
        let primary = Arc::new(primary);
        let secondary = Arc::new(secondary);
        let transport = Arc::new(RecordingTransport::new());

        let resolvers = ResolverPair::new(
            primary.clone(),
            secondary.clone(),
            Duration::from_secs(5),
        );
        let dispatcher = Arc::new(NotificationDispatcher::new(
            transport.clone(),
            store.clone(),
            RetryPolicy::default(),
        ));
        let monitor = Monitor::new(Arc::clone(&ctx), config, resolvers, dispatcher).unwrap();

        Self {
            store,
            ctx,
            primary,
            secondary,
            transport,
            monitor,
        }
    }

    /// Script both endpoints with the same outcome from now on
    pub fn set_outcome(&self, outcome: &ProbeOutcome) {
        self.primary.set_fallback(outcome.clone());
        self.secondary.set_fallback(outcome.clone());
    }
}
