//! UploadWorker port - 実際にアップロードを行う外部の worker
//!
//! IntakeQueue はこの trait 経由でしか worker に触らない。
//! 実装は in-process 呼び出しでも RPC でも local socket でもよい。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ListenerId, TransportError, WorkItem};
use crate::ports::StatusListener;

/// 呼び出しはどれも遅い・失敗しうる前提で扱う。
/// IntakeQueue は内部ロックを保持したままこれらを呼ばない。
#[async_trait]
pub trait UploadWorker: Send + Sync {
    /// Hand one item to the worker. Fire-and-forget: `Ok` means accepted, not uploaded.
    async fn enqueue_upload(&self, item: &WorkItem) -> Result<(), TransportError>;

    /// Attach a status sink. The worker may call it from any thread.
    async fn register_listener(
        &self,
        id: ListenerId,
        listener: Arc<dyn StatusListener>,
    ) -> Result<(), TransportError>;

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), TransportError>;
}
