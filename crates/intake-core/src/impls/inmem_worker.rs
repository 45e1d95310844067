//! InMemoryWorker - 開発用の worker
//!
//! アップロードはせず、受け取った item を順番に記録するだけ。
//! `set_unreachable(true)` にすると全ての呼び出しが `TransportError::Unreachable` になる。
//! `refuse(item)` した item だけは `TransportError::Rejected` で断られる。
//! `emit_*` で登録済み listener に status callback を送れる。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{ListenerId, TransportError, WorkItem};
use crate::ports::{StatusListener, UploadWorker};

/// # 実装詳細
/// - 受信記録と listener を Mutex で保護
/// - listener の呼び出しはロックの外で行う（listener 側から worker を触っても詰まらない）
pub struct InMemoryWorker {
    unreachable: AtomicBool,
    state: Mutex<WorkerState>,
}

#[derive(Default)]
struct WorkerState {
    received: Vec<WorkItem>,
    rejected: usize,
    refused: HashSet<WorkItem>,
    listeners: Vec<(ListenerId, Arc<dyn StatusListener>)>,
}

impl InMemoryWorker {
    pub fn new() -> Self {
        Self {
            unreachable: AtomicBool::new(false),
            state: Mutex::new(WorkerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self) -> Result<(), TransportError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable);
        }
        Ok(())
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Reject every later enqueue of `item`.
    pub fn refuse(&self, item: WorkItem) {
        self.state().refused.insert(item);
    }

    /// Items accepted so far, in arrival order.
    pub fn received(&self) -> Vec<WorkItem> {
        self.state().received.clone()
    }

    /// Enqueue calls that returned an error.
    pub fn rejected(&self) -> usize {
        self.state().rejected
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    fn listeners(&self) -> Vec<Arc<dyn StatusListener>> {
        self.state()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub fn emit_log(&self, message: &str) {
        for listener in self.listeners() {
            listener.log_to_client(message);
        }
    }

    pub fn emit_upload_status(&self, uploading: bool) {
        for listener in self.listeners() {
            listener.on_upload_status_change(uploading);
        }
    }
}

impl Default for InMemoryWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadWorker for InMemoryWorker {
    async fn enqueue_upload(&self, item: &WorkItem) -> Result<(), TransportError> {
        if let Err(e) = self.check_reachable() {
            self.state().rejected += 1;
            return Err(e);
        }
        let mut state = self.state();
        if state.refused.contains(item) {
            state.rejected += 1;
            return Err(TransportError::Rejected(format!("{item} refused")));
        }
        state.received.push(item.clone());
        Ok(())
    }

    async fn register_listener(
        &self,
        id: ListenerId,
        listener: Arc<dyn StatusListener>,
    ) -> Result<(), TransportError> {
        self.check_reachable()?;
        let mut state = self.state();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.push((id, listener));
        Ok(())
    }

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), TransportError> {
        self.check_reachable()?;
        self.state().listeners.retain(|(existing, _)| *existing != id);
        Ok(())
    }
}
