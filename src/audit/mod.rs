//! Audit trail.
//!
//! Services hand [`AuditEvent`]s to an [`AuditSink`]. The production sink
//! publishes onto a broadcast bus; a listener task persists each event to
//! `audit_logs` so a slow store never blocks the request path.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod auditable;
pub use auditable::Auditable;

use crate::authz::Actor;
use crate::db;
use crate::models::audit::AuditAction;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub actor_email: String,
    pub organization_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub detail: Option<String>,
    pub context: RequestContext,
}

impl AuditEvent {
    pub fn new(actor: &Actor, action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            actor_id: Some(actor.id),
            actor_email: actor.email.clone(),
            organization_id: Some(actor.organization_id),
            action,
            resource: resource.into(),
            resource_id: None,
            detail: None,
            context: RequestContext::default(),
        }
    }

    /// Event with no authenticated actor, e.g. a login attempt for an
    /// address that may not exist.
    pub fn anonymous(email: impl Into<String>, action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            actor_id: None,
            actor_email: email.into(),
            organization_id: None,
            action,
            resource: resource.into(),
            resource_id: None,
            detail: None,
            context: RequestContext::default(),
        }
    }

    pub fn for_entity<T: Auditable>(actor: &Actor, action: AuditAction, entity: &T) -> Self {
        Self::new(actor, action, T::resource_name())
            .with_resource_id(entity.audit_id())
            .with_detail(auditable::describe(action, entity))
    }

    pub fn denied(actor: &Actor, resource: impl Into<String>, resource_id: Option<Uuid>, reason: &str) -> Self {
        let mut event = Self::new(actor, AuditAction::AccessDenied, resource).with_detail(reason);
        event.resource_id = resource_id;
        event
    }

    pub fn with_resource_id(mut self, id: Uuid) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// Receives audit events. Recording never fails the calling operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

pub type AuditBus = broadcast::Sender<AuditEvent>;

pub fn init_audit_bus() -> (AuditBus, broadcast::Receiver<AuditEvent>) {
    broadcast::channel(1024)
}

fn trace_event(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        action = event.action.as_str(),
        resource = %event.resource,
        resource_id = ?event.resource_id,
        actor = %event.actor_email,
        detail = event.detail.as_deref().unwrap_or(""),
        "audit"
    );
}

/// Fire-and-forget sink backed by the broadcast bus.
#[derive(Debug, Clone)]
pub struct BusAuditSink {
    bus: AuditBus,
}

impl BusAuditSink {
    pub fn new(bus: AuditBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl AuditSink for BusAuditSink {
    async fn record(&self, event: AuditEvent) {
        trace_event(&event);
        if self.bus.send(event).is_err() {
            tracing::warn!(target: "audit", "no audit listener attached, event dropped");
        }
    }
}

/// Writes each event to the store before returning.
#[derive(Debug, Clone)]
pub struct StoreAuditSink {
    pool: SqlitePool,
}

impl StoreAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn record(&self, event: AuditEvent) {
        trace_event(&event);
        if let Err(err) = db::audit::insert(&self.pool, &event).await {
            tracing::error!(error = %err, "failed to persist audit event");
        }
    }
}

/// Keeps events in memory, for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEvent> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Request metadata stored alongside each audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

/// Persists events published on the bus until every sender is dropped.
pub async fn start_audit_listener(mut rx: broadcast::Receiver<AuditEvent>, pool: SqlitePool) {
    tracing::info!("audit listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(err) = db::audit::insert(&pool, &event).await {
                    tracing::error!(error = %err, event_id = %event.id, "failed to persist audit event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit listener lagged, events lost");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("audit listener stopped");
}
