//! In-memory fakes behind the domain contracts, shared by the handler and
//! reaper tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::contracts::{
    Enqueuer, Message, NotificationStore, Provider, RenderedMessage, TemplateRenderer,
};
use common::record::{ListFilter, NewNotification, NotificationRecord};
use common::{Channel, NotificationKind, NotificationStatus, NotifyError};

#[derive(Default)]
pub struct FakeStore {
    records: Mutex<HashMap<String, NotificationRecord>>,
    history: Mutex<HashMap<String, Vec<NotificationStatus>>>,
    next_id: AtomicUsize,
    fail_next_update: AtomicBool,
    fail_list_stale: AtomicBool,
    fail_update_for: Mutex<Option<String>>,
}

impl FakeStore {
    pub fn insert(&self, record: NotificationRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &str) -> Option<NotificationRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn status_history(&self, id: &str) -> Vec<NotificationStatus> {
        self.history
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next update_status call fail once.
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    /// Make every update_status call for the given id fail.
    pub fn fail_updates_for(&self, id: &str) {
        *self.fail_update_for.lock().unwrap() = Some(id.to_string());
    }

    pub fn fail_list_stale(&self) {
        self.fail_list_stale.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationStore for FakeStore {
    async fn create(&self, new: NewNotification) -> Result<NotificationRecord, NotifyError> {
        let now = Utc::now();
        let id = format!("n-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = NotificationRecord {
            id: id.clone(),
            idempotency_key: new.idempotency_key,
            channel: new.channel,
            kind: new.kind,
            recipient: new.recipient,
            template_data: new.template_data,
            provider_id: None,
            status: NotificationStatus::Queued,
            error_message: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            delivered_at: None,
            opened_at: None,
            bounced_at: None,
        };
        self.insert(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<NotificationRecord>, NotifyError> {
        Ok(self.record(id))
    }

    async fn get_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<NotificationRecord>, NotifyError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        provider_id: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), NotifyError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(NotifyError::Store("injected update failure".into()));
        }
        if self.fail_update_for.lock().unwrap().as_deref() == Some(id) {
            return Err(NotifyError::Store("injected update failure".into()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| NotifyError::not_found("notification", id.to_string()))?;

        record.status = status;
        record.updated_at = Utc::now();
        if let Some(provider_id) = provider_id {
            record.provider_id = Some(provider_id.to_string());
        }
        match error_message {
            Some(msg) => record.error_message = Some(msg.to_string()),
            None if status == NotificationStatus::Queued => record.error_message = None,
            None => {}
        }
        if status == NotificationStatus::Sent {
            record.sent_at = Some(record.updated_at);
        }

        self.history
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push(status);
        Ok(())
    }

    async fn update_webhook_status(
        &self,
        provider_id: &str,
        status: NotificationStatus,
    ) -> Result<(), NotifyError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records
            .values_mut()
            .find(|r| r.provider_id.as_deref() == Some(provider_id))
        {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list(
        &self,
        _filter: &ListFilter,
    ) -> Result<(Vec<NotificationRecord>, u64), NotifyError> {
        let records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        let total = records.len() as u64;
        Ok((records, total))
    }

    async fn list_stale(
        &self,
        older_than: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, NotifyError> {
        if self.fail_list_stale.load(Ordering::SeqCst) {
            return Err(NotifyError::Store("injected scan failure".into()));
        }

        let mut stale: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status.is_reapable() && r.updated_at < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|r| r.updated_at);
        stale.truncate(limit as usize);
        Ok(stale)
    }
}

#[derive(Default)]
pub struct FakeEnqueuer {
    enqueued: Mutex<Vec<String>>,
    fail_for: Mutex<Option<String>>,
}

impl FakeEnqueuer {
    pub fn enqueued(&self) -> Vec<String> {
        self.enqueued.lock().unwrap().clone()
    }

    /// Make enqueue_send fail for the given record id.
    pub fn fail_for(&self, id: &str) {
        *self.fail_for.lock().unwrap() = Some(id.to_string());
    }
}

#[async_trait]
impl Enqueuer for FakeEnqueuer {
    async fn enqueue_send(&self, log_id: &str) -> Result<(), NotifyError> {
        if self.fail_for.lock().unwrap().as_deref() == Some(log_id) {
            return Err(NotifyError::Queue("broker unavailable".into()));
        }
        self.enqueued.lock().unwrap().push(log_id.to_string());
        Ok(())
    }
}

pub struct FakeRenderer {
    failure: Option<String>,
}

impl FakeRenderer {
    pub fn ok() -> Self {
        Self { failure: None }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
        }
    }
}

impl TemplateRenderer for FakeRenderer {
    fn render(
        &self,
        kind: NotificationKind,
        _data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<RenderedMessage, NotifyError> {
        if let Some(message) = &self.failure {
            return Err(NotifyError::Render(message.clone()));
        }
        Ok(RenderedMessage {
            subject: format!("subject for {kind}"),
            html: "<p>body</p>".into(),
            text: "body".into(),
        })
    }
}

pub struct FakeProvider {
    provider_id: String,
    failures_remaining: AtomicUsize,
    error: String,
    always_fail: bool,
}

impl FakeProvider {
    pub fn succeeding(provider_id: &str) -> Self {
        Self {
            provider_id: provider_id.into(),
            failures_remaining: AtomicUsize::new(0),
            error: String::new(),
            always_fail: false,
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            provider_id: String::new(),
            failures_remaining: AtomicUsize::new(0),
            error: error.into(),
            always_fail: true,
        }
    }

    /// Fail the first `failures` sends, then succeed.
    pub fn failing_then_succeeding(failures: usize, provider_id: &str) -> Self {
        Self {
            provider_id: provider_id.into(),
            failures_remaining: AtomicUsize::new(failures),
            error: "transient upstream failure".into(),
            always_fail: false,
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, _message: &Message) -> Result<String, NotifyError> {
        if self.always_fail {
            return Err(NotifyError::provider(Channel::Email, self.error.clone()));
        }

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(NotifyError::provider(Channel::Email, self.error.clone()));
        }

        Ok(self.provider_id.clone())
    }
}
