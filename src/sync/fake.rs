//! In-memory storage provider and sleepers for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::provider::{ProviderError, RemoteFile, RemoteFileId, StorageProvider};
use super::remote::Sleeper;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        name: String,
        mime_type: String,
        body: String,
    },
    Update {
        id: String,
        body: String,
        name: Option<String>,
    },
    Permission {
        id: String,
    },
    ShareLink {
        id: String,
    },
}

#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<Call>>,
    /// Failures returned by the next create/update calls, in order
    write_failures: Mutex<VecDeque<ProviderError>>,
    permission_failures: Mutex<VecDeque<ProviderError>>,
    ids: Mutex<VecDeque<String>>,
    counter: AtomicUsize,
    /// When set, every create/update waits for a permit
    gate: Option<Arc<Semaphore>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose writes block until `release` is called
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn release(&self, writes: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(writes);
        }
    }

    /// Id handed out by the next successful create
    pub fn push_id(&self, id: &str) {
        self.ids.lock().unwrap().push_back(id.to_string());
    }

    pub fn fail_next(&self, err: ProviderError) {
        self.write_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_permission(&self, err: ProviderError) {
        self.permission_failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .count()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn next_write_failure(&self) -> Option<ProviderError> {
        self.write_failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl StorageProvider for FakeProvider {
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        body: &str,
    ) -> Result<RemoteFile, ProviderError> {
        self.calls.lock().unwrap().push(Call::Create {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            body: body.to_string(),
        });
        self.pass_gate().await;
        if let Some(err) = self.next_write_failure() {
            return Err(err);
        }
        let id = self.ids.lock().unwrap().pop_front().unwrap_or_else(|| {
            format!("file-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
        });
        Ok(RemoteFile {
            id: RemoteFileId::new(id),
        })
    }

    async fn update_file(
        &self,
        id: &RemoteFileId,
        body: &str,
        name: Option<&str>,
    ) -> Result<RemoteFile, ProviderError> {
        self.calls.lock().unwrap().push(Call::Update {
            id: id.to_string(),
            body: body.to_string(),
            name: name.map(str::to_string),
        });
        self.pass_gate().await;
        if let Some(err) = self.next_write_failure() {
            return Err(err);
        }
        Ok(RemoteFile { id: id.clone() })
    }

    async fn set_public_read_permission(&self, id: &RemoteFileId) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Permission { id: id.to_string() });
        match self.permission_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn get_share_link(&self, id: &RemoteFileId) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ShareLink { id: id.to_string() });
        Ok(format!("https://drive.google.com/file/d/{}/view", id))
    }
}

/// Retries without waiting
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

/// Records requested delays without waiting
#[derive(Default)]
pub struct RecordingSleep {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleep {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleep {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
