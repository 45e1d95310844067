//! DispatchLoop - worker への呼び出しを 1 本のタスクで直列に実行する
//!
//! # フロー
//! 1. IntakeQueue がロック内で `Command` を channel に積む（非ブロッキング）
//! 2. DispatchLoop が FIFO で取り出す
//! 3. epoch がまだ現役か短いロックで確認し、ロックを外してから worker を呼ぶ
//!
//! consumer が 1 つなので channel の順序 = worker から見た順序になる。

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::intake::{IntakeState, lock};
use crate::domain::{EpochId, IntakeError, ListenerId, WorkItem};
use crate::ports::{StatusListener, UploadWorker};

pub(crate) enum Command {
    Register {
        epoch: EpochId,
        worker: Arc<dyn UploadWorker>,
        listener_id: ListenerId,
    },
    Enqueue {
        epoch: EpochId,
        worker: Arc<dyn UploadWorker>,
        item: WorkItem,
    },
    /// Sent for a worker that is already detached, so it carries no epoch.
    Unregister {
        worker: Arc<dyn UploadWorker>,
        listener_id: ListenerId,
    },
    Flush(oneshot::Sender<()>),
}

pub(crate) struct DispatchLoop {
    state: Arc<Mutex<IntakeState>>,
    relay: Arc<dyn StatusListener>,
}

/// Dispatcher handle.
/// - `request_shutdown()` で停止要求
/// - `shutdown_and_join()` で停止を待つ
pub(crate) struct DispatcherHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    pub(crate) fn spawn(
        runtime: &Handle,
        dispatch: DispatchLoop,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = runtime.spawn(dispatch.run(commands, shutdown_rx));
        Self { shutdown_tx, join }
    }

    /// In-flight worker calls are not cancelled; queued commands are dropped.
    pub(crate) fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub(crate) async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            warn!(error = %e, "dispatch loop ended abnormally");
        }
    }
}

impl DispatchLoop {
    pub(crate) fn new(state: Arc<Mutex<IntakeState>>, relay: Arc<dyn StatusListener>) -> Self {
        Self { state, relay }
    }

    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let command = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                command = commands.recv() => command,
            };

            // sender が全部 drop された = IntakeQueue がいなくなった
            let Some(command) = command else {
                break;
            };
            self.handle(command).await;
        }

        commands.close();
        let mut abandoned = 0u64;
        while let Ok(command) = commands.try_recv() {
            if let Command::Enqueue { item, .. } = command {
                debug!(%item, "dispatch loop stopping, dropping item");
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            lock(&self.state).counts.dropped += abandoned;
        }
        debug!(abandoned, "dispatch loop stopped");
    }

    fn is_current(&self, epoch: EpochId) -> bool {
        lock(&self.state).epoch() == Some(epoch)
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::Enqueue {
                epoch,
                worker,
                item,
            } => {
                if !self.is_current(epoch) {
                    warn!(%item, %epoch, "worker disconnected before forwarding, dropping item");
                    lock(&self.state).counts.dropped += 1;
                    return;
                }

                match worker.enqueue_upload(&item).await {
                    Ok(()) => {
                        debug!(%item, %epoch, "forwarded to worker");
                        lock(&self.state).counts.forwarded += 1;
                    }
                    Err(source) => {
                        let err = IntakeError::TransportFailure { item, source };
                        warn!(error = %err, %epoch, "failure to enqueue upload");
                        lock(&self.state).counts.failed += 1;
                    }
                }
            }
            Command::Register {
                epoch,
                worker,
                listener_id,
            } => {
                if !self.is_current(epoch) {
                    debug!(%epoch, "epoch ended before listener registration");
                    return;
                }
                match worker
                    .register_listener(listener_id, Arc::clone(&self.relay))
                    .await
                {
                    Ok(()) => debug!(%epoch, listener = %listener_id, "status listener registered"),
                    Err(e) => warn!(error = %e, %epoch, "failed to register status listener"),
                }
            }
            Command::Unregister {
                worker,
                listener_id,
            } => {
                if let Err(e) = worker.unregister_listener(listener_id).await {
                    debug!(error = %e, listener = %listener_id, "unregister failed, ignoring");
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
