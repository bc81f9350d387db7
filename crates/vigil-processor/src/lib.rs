//! The stateful back half of the pipeline: consumes enriched events from the
//! queue and walks alerts through the grouping lifecycle.
//!
//! For every event the processor decides between deduplication, reactivation,
//! parent creation, child creation, and resolution (direct or deferred). Hot
//! state is written first and is the decision barrier: once a state write
//! succeeds the decision stands, and durable-store or notifier effects may
//! lag behind it. A failed state operation bubbles out of the handler so the
//! queue's at-least-once delivery retries the whole decision.
//!
//! Per-key queue ordering means every event that can touch one grouping slot
//! arrives on the same partition, so none of this needs locks beyond the
//! state store's own per-operation atomicity.


use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vigil_common::types::{Action, Alert, AlertStatus, AlertType, InternalEvent, Tenant};
use vigil_notify::Notifier;
use vigil_queue::{Consumer, Message, MessageHandler};
use vigil_store::{
    AlertRepository, AlertState, GroupingRuleRepository, ParentState, PendingResolve, StateStore,
    TenantRepository,
};

/// Consumes events from the queue and manages the alert lifecycle.
pub struct ProcessorService {
    consumer: Arc<dyn Consumer>,
    state: Arc<dyn StateStore>,
    alerts: Arc<dyn AlertRepository>,
    tenants: Arc<dyn TenantRepository>,
    rules: Arc<dyn GroupingRuleRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ProcessorService {
    pub fn new(
        consumer: Arc<dyn Consumer>,
        state: Arc<dyn StateStore>,
        alerts: Arc<dyn AlertRepository>,
        tenants: Arc<dyn TenantRepository>,
        rules: Arc<dyn GroupingRuleRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            consumer,
            state,
            alerts,
            tenants,
            rules,
            notifier,
        }
    }

    /// Runs the consume loop until `cancel` fires or the queue closes.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> vigil_queue::Result<()> {
        tracing::info!("starting processor service");
        let consumer = Arc::clone(&self.consumer);
        consumer.start(cancel, self).await
    }

    /// Stops the underlying consumer. Idempotent.
    pub async fn stop(&self) -> vigil_queue::Result<()> {
        tracing::info!("stopping processor service");
        self.consumer.close().await
    }

    async fn handle_trigger(&self, event: &InternalEvent) -> anyhow::Result<()> {
        let dedup_key = &event.event.dedup_key;

        if let Some(existing) = self.state.get_alert(dedup_key).await? {
            if existing.status == AlertStatus::Resolved {
                return self.reactivate(event, existing).await;
            }
            tracing::debug!(dedup_key, "alert already active, deduplicated");
            return Ok(());
        }

        let tenant = self.tenants.get_by_id(&event.event.tenant_id).await?;
        let rule = self.rules.get_by_id(&tenant.grouping_rule_id).await?;

        let parent = self
            .state
            .get_parent(&event.event.tenant_id, &rule.grouping_key, &event.grouping_value)
            .await?;

        match parent {
            Some(parent) => self.create_child(event, &parent).await,
            None => {
                self.create_parent(event, &rule.grouping_key, rule.time_window(), &tenant)
                    .await
            }
        }
    }

    async fn create_parent(
        &self,
        event: &InternalEvent,
        grouping_key: &str,
        time_window: chrono::Duration,
        tenant: &Tenant,
    ) -> anyhow::Result<()> {
        let mut alert = Alert::new_parent(&event.event);
        alert.id = vigil_common::id::next_id();

        self.state
            .set_alert(AlertState {
                dedup_key: alert.dedup_key.clone(),
                tenant_id: alert.tenant_id.clone(),
                alert_type: AlertType::Parent,
                status: AlertStatus::Active,
                parent_dedup_key: None,
                resolve_requested: false,
            })
            .await?;

        self.state
            .set_parent(
                &event.event.tenant_id,
                grouping_key,
                &event.grouping_value,
                ParentState {
                    dedup_key: alert.dedup_key.clone(),
                    created_at: alert.created_at,
                    child_count: 0,
                },
                time_window,
            )
            .await?;

        if let Err(error) = self.alerts.create(&alert).await {
            tracing::warn!(
                dedup_key = %alert.dedup_key,
                error = %error,
                "failed to persist parent alert, state remains authoritative"
            );
        }

        tracing::info!(
            dedup_key = %alert.dedup_key,
            tenant_id = %alert.tenant_id,
            grouping_value = %event.grouping_value,
            "created parent alert"
        );

        self.notifier.notify_new_parent(&alert, tenant).await;
        Ok(())
    }

    async fn create_child(
        &self,
        event: &InternalEvent,
        parent: &ParentState,
    ) -> anyhow::Result<()> {
        let mut alert = Alert::new_child(&event.event, &parent.dedup_key);
        alert.id = vigil_common::id::next_id();

        self.state
            .set_alert(AlertState {
                dedup_key: alert.dedup_key.clone(),
                tenant_id: alert.tenant_id.clone(),
                alert_type: AlertType::Child,
                status: AlertStatus::Active,
                parent_dedup_key: Some(parent.dedup_key.clone()),
                resolve_requested: false,
            })
            .await?;
        self.state
            .add_child(&parent.dedup_key, &alert.dedup_key)
            .await?;

        if let Err(error) = self.alerts.create(&alert).await {
            tracing::warn!(
                dedup_key = %alert.dedup_key,
                error = %error,
                "failed to persist child alert, state remains authoritative"
            );
        }

        // child_count is a hint; the children set in state plus the child's
        // parent reference are authoritative, so a failure here only logs.
        match self.alerts.get_by_dedup_key(&parent.dedup_key).await {
            Ok(mut parent_alert) => {
                parent_alert.increment_child_count();
                if let Err(error) = self.alerts.update(&parent_alert).await {
                    tracing::warn!(
                        dedup_key = %parent.dedup_key,
                        error = %error,
                        "failed to update parent child count"
                    );
                }
            }
            Err(error) => tracing::warn!(
                dedup_key = %parent.dedup_key,
                error = %error,
                "failed to load parent for child count update"
            ),
        }

        tracing::info!(
            dedup_key = %alert.dedup_key,
            parent_dedup_key = %parent.dedup_key,
            "created child alert"
        );
        Ok(())
    }

    /// A trigger for a dedup key whose stored status is resolved flips the
    /// same record back to active; the system does not fork a new history.
    async fn reactivate(
        &self,
        event: &InternalEvent,
        mut existing: AlertState,
    ) -> anyhow::Result<()> {
        let dedup_key = &event.event.dedup_key;
        existing.status = AlertStatus::Active;
        existing.resolve_requested = false;
        let alert_type = existing.alert_type;
        self.state.set_alert(existing).await?;

        // Reopen the grouping slot for reactivated parents so future events
        // with the same grouping value keep grouping under this alert.
        if alert_type == AlertType::Parent {
            self.reopen_parent_slot(event).await;
        }

        match self.alerts.get_by_dedup_key(dedup_key).await {
            Ok(mut alert) => {
                alert.reactivate();
                if let Err(error) = self.alerts.update(&alert).await {
                    tracing::warn!(dedup_key, error = %error, "failed to persist reactivation");
                }
            }
            Err(error) => {
                tracing::warn!(dedup_key, error = %error, "reactivated alert missing from repository");
            }
        }

        tracing::info!(dedup_key, "reactivated alert");
        Ok(())
    }

    /// Best-effort: the reactivation decision is already settled in state,
    /// so lookup failures here only log.
    async fn reopen_parent_slot(&self, event: &InternalEvent) {
        let dedup_key = &event.event.dedup_key;
        let tenant = match self.tenants.get_by_id(&event.event.tenant_id).await {
            Ok(tenant) => tenant,
            Err(error) => {
                tracing::warn!(dedup_key, error = %error, "failed to load tenant for parent slot");
                return;
            }
        };
        let rule = match self.rules.get_by_id(&tenant.grouping_rule_id).await {
            Ok(rule) => rule,
            Err(error) => {
                tracing::warn!(dedup_key, error = %error, "failed to load rule for parent slot");
                return;
            }
        };
        let child_count = self.state.child_count(dedup_key).await.unwrap_or(0);
        let slot = ParentState {
            dedup_key: dedup_key.clone(),
            created_at: Utc::now(),
            child_count: child_count as i64,
        };
        if let Err(error) = self
            .state
            .set_parent(
                &event.event.tenant_id,
                &rule.grouping_key,
                &event.grouping_value,
                slot,
                rule.time_window(),
            )
            .await
        {
            tracing::warn!(dedup_key, error = %error, "failed to reopen parent slot");
        }
    }

    async fn handle_resolve(&self, event: &InternalEvent) -> anyhow::Result<()> {
        let dedup_key = &event.event.dedup_key;

        let existing = match self.state.get_alert(dedup_key).await? {
            Some(existing) => existing,
            None => {
                tracing::warn!(dedup_key, "resolve requested for unknown alert");
                return Ok(());
            }
        };

        if existing.status == AlertStatus::Resolved {
            tracing::debug!(dedup_key, "alert already resolved");
            return Ok(());
        }

        match existing.alert_type {
            AlertType::Child => self.resolve_child(event, existing).await,
            AlertType::Parent => self.resolve_parent(event, existing).await,
        }
    }

    async fn resolve_child(
        &self,
        event: &InternalEvent,
        mut existing: AlertState,
    ) -> anyhow::Result<()> {
        let dedup_key = &event.event.dedup_key;
        let parent_dedup_key = existing.parent_dedup_key.clone();

        existing.status = AlertStatus::Resolved;
        self.state.set_alert(existing).await?;

        match self.alerts.get_by_dedup_key(dedup_key).await {
            Ok(mut alert) => {
                alert.resolve();
                if let Err(error) = self.alerts.update(&alert).await {
                    tracing::warn!(dedup_key, error = %error, "failed to persist child resolution");
                }
            }
            Err(error) => {
                tracing::warn!(dedup_key, error = %error, "resolved child missing from repository");
            }
        }

        tracing::info!(dedup_key, "resolved child alert");

        if let Some(parent_key) = parent_dedup_key {
            return self.probe_parent_resolution(&parent_key).await;
        }
        Ok(())
    }

    async fn resolve_parent(
        &self,
        event: &InternalEvent,
        mut existing: AlertState,
    ) -> anyhow::Result<()> {
        let dedup_key = &event.event.dedup_key;
        let active_children = self.alerts.count_active_children(dedup_key).await?;

        if active_children > 0 {
            // Deferred path: flag the intent and wait for the children.
            existing.resolve_requested = true;
            self.state.set_alert(existing).await?;
            self.state
                .set_pending_resolve(
                    dedup_key,
                    PendingResolve {
                        requested_at: Utc::now(),
                        remaining_children: active_children as i64,
                    },
                )
                .await?;

            match self.alerts.get_by_dedup_key(dedup_key).await {
                Ok(mut alert) => {
                    alert.mark_resolve_requested();
                    if let Err(error) = self.alerts.update(&alert).await {
                        tracing::warn!(dedup_key, error = %error, "failed to persist resolve request");
                    }
                }
                Err(error) => {
                    tracing::warn!(dedup_key, error = %error, "parent missing from repository");
                }
            }

            tracing::info!(
                dedup_key,
                active_children,
                "parent resolve requested, waiting for children"
            );
            return Ok(());
        }

        self.complete_parent_resolution(dedup_key, existing).await
    }

    /// Called after any child resolution to see whether a deferred parent
    /// resolve can now complete.
    async fn probe_parent_resolution(&self, parent_dedup_key: &str) -> anyhow::Result<()> {
        let pending = match self.state.get_pending_resolve(parent_dedup_key).await? {
            Some(pending) => pending,
            None => return Ok(()),
        };

        let active_children = self.alerts.count_active_children(parent_dedup_key).await?;
        if active_children > 0 {
            self.state
                .set_pending_resolve(
                    parent_dedup_key,
                    PendingResolve {
                        requested_at: pending.requested_at,
                        remaining_children: active_children as i64,
                    },
                )
                .await?;
            return Ok(());
        }

        let parent_state = self
            .state
            .get_alert(parent_dedup_key)
            .await?
            .ok_or_else(|| anyhow::anyhow!("parent alert state not found: {parent_dedup_key}"))?;

        self.complete_parent_resolution(parent_dedup_key, parent_state)
            .await
    }

    async fn complete_parent_resolution(
        &self,
        dedup_key: &str,
        mut existing: AlertState,
    ) -> anyhow::Result<()> {
        let tenant_id = existing.tenant_id.clone();
        existing.status = AlertStatus::Resolved;
        existing.resolve_requested = false;
        self.state.set_alert(existing).await?;

        if let Err(error) = self.state.delete_pending_resolve(dedup_key).await {
            tracing::warn!(dedup_key, error = %error, "failed to delete pending resolve");
        }

        let resolved = match self.alerts.get_by_dedup_key(dedup_key).await {
            Ok(mut alert) => {
                alert.resolve();
                if let Err(error) = self.alerts.update(&alert).await {
                    tracing::warn!(dedup_key, error = %error, "failed to persist parent resolution");
                }
                Some(alert)
            }
            Err(error) => {
                tracing::warn!(dedup_key, error = %error, "resolved parent missing from repository");
                None
            }
        };

        tracing::info!(dedup_key, "resolved parent alert");

        if let Some(alert) = resolved {
            match self.tenants.get_by_id(&tenant_id).await {
                Ok(tenant) => self.notifier.notify_resolved(&alert, &tenant).await,
                Err(error) => {
                    tracing::warn!(dedup_key, error = %error, "failed to load tenant for notification");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for ProcessorService {
    async fn handle(&self, message: Message) -> anyhow::Result<()> {
        // Malformed payloads can never become processable; dropping them is
        // the only way to keep the partition moving.
        let event: InternalEvent = match serde_json::from_slice(&message.value) {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(error = %error, "failed to deserialize event, dropping message");
                return Ok(());
            }
        };

        tracing::debug!(
            dedup_key = %event.event.dedup_key,
            action = %event.event.action,
            grouping_value = %event.grouping_value,
            "processing event"
        );

        match event.event.action {
            Action::Trigger => self.handle_trigger(&event).await,
            Action::Resolve => self.handle_resolve(&event).await,
        }
    }
}
