//! IntakeQueue - worker が来る前の submission を溜め、来たら順番に流す
//!
//! # 保証
//! - `submit` は常に受け付ける。worker を待たないし、エラーも返さない
//! - Disconnected の間は pending に積み、接続時に FIFO で drain する
//! - drain と `submit` は同じロックの中で行うので、submission は
//!   「drain される側」か「直接流される側」のどちらか一方にだけ入る
//! - 切断後は古い handle に何も送らない（dispatcher が epoch で弾く）
//!
//! worker への実際の呼び出しは `DispatchLoop` が行う。ここではロックの中で
//! `Command` を積むだけで、ロックを持ったまま worker を呼ぶことはない。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::builder::IntakeBuilder;
use super::dispatch_loop::{Command, DispatchLoop, DispatcherHandle};
use super::status::{DeliveryCounts, IntakeStatus};
use crate::domain::{
    ConnectionState, EpochId, IntakeError, ListenerId, StatusEvent, Submission, WorkItem,
};
use crate::ports::{IdGenerator, StatusListener, UploadWorker};

/// Lock, recovering the data if a previous holder panicked.
///
/// Every critical section here leaves the state consistent between statements,
/// so a poisoned lock is still safe to use.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) enum Connection {
    Disconnected,
    Connected {
        epoch: EpochId,
        worker: Arc<dyn UploadWorker>,
    },
}

pub(crate) struct IntakeState {
    pub(crate) connection: Connection,
    pub(crate) pending: VecDeque<WorkItem>,
    pub(crate) counts: DeliveryCounts,
}

impl IntakeState {
    fn new() -> Self {
        Self {
            connection: Connection::Disconnected,
            pending: VecDeque::new(),
            counts: DeliveryCounts::default(),
        }
    }

    fn connection_state(&self) -> ConnectionState {
        match self.connection {
            Connection::Connected { .. } => ConnectionState::Connected,
            Connection::Disconnected => ConnectionState::Disconnected,
        }
    }

    pub(crate) fn epoch(&self) -> Option<EpochId> {
        match &self.connection {
            Connection::Connected { epoch, .. } => Some(*epoch),
            Connection::Disconnected => None,
        }
    }
}

struct Inner {
    state: Arc<Mutex<IntakeState>>,
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<StatusEvent>,
    ids: Arc<dyn IdGenerator>,
    listener_id: ListenerId,
    dispatcher: Mutex<Option<DispatcherHandle>>,
}

/// Buffers work items until a worker is connected, then forwards them in order.
///
/// Cheap to clone; all clones share one queue. Build with [`IntakeQueue::builder`]
/// inside a tokio runtime.
#[derive(Clone)]
pub struct IntakeQueue {
    inner: Arc<Inner>,
}

impl IntakeQueue {
    pub fn builder() -> IntakeBuilder {
        IntakeBuilder::new()
    }

    pub(crate) fn start(
        runtime: &Handle,
        ids: Arc<dyn IdGenerator>,
        relay: Arc<dyn StatusListener>,
        events: broadcast::Sender<StatusEvent>,
    ) -> Self {
        let state = Arc::new(Mutex::new(IntakeState::new()));
        let (commands, rx) = mpsc::unbounded_channel();
        let dispatcher = DispatcherHandle::spawn(
            runtime,
            DispatchLoop::new(Arc::clone(&state), relay),
            rx,
        );
        let listener_id = ids.generate_listener_id();

        Self {
            inner: Arc::new(Inner {
                state,
                commands,
                events,
                ids,
                listener_id,
                dispatcher: Mutex::new(Some(dispatcher)),
            }),
        }
    }

    /// Accept one item. Forwarded right away when connected, queued otherwise.
    pub fn submit(&self, item: WorkItem) {
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        match &state.connection {
            Connection::Connected { epoch, worker } => {
                debug!(%item, %epoch, "forwarding");
                let command = Command::Enqueue {
                    epoch: *epoch,
                    worker: Arc::clone(worker),
                    item,
                };
                self.dispatch(state, command);
            }
            Connection::Disconnected => {
                debug!(%item, "worker not connected, queueing");
                state.pending.push_back(item);
            }
        }
    }

    pub fn submit_all(&self, items: impl IntoIterator<Item = WorkItem>) {
        for item in items {
            self.submit(item);
        }
    }

    /// Resolve a share action and submit what it carries.
    ///
    /// Returns how many items were submitted. A payload that cannot be
    /// resolved at all is rejected here and never reaches the queue.
    pub fn accept(&self, submission: &Submission) -> Result<usize, IntakeError> {
        let items = submission.resolve()?;
        let count = items.len();
        self.submit_all(items);
        Ok(count)
    }

    /// The worker became reachable.
    ///
    /// On a real transition this starts a new epoch, registers the status
    /// listener and drains the pending queue in FIFO order. When already
    /// connected with a different handle, the handle is replaced and the
    /// status listener moves to it; nothing is re-forwarded.
    pub fn on_worker_connected(&self, worker: Arc<dyn UploadWorker>) {
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;

        if let Connection::Connected {
            epoch,
            worker: current,
        } = &mut state.connection
        {
            let epoch = *epoch;
            if Arc::ptr_eq(current, &worker) {
                debug!(%epoch, "worker already connected with this handle");
                return;
            }
            debug!(%epoch, "worker already connected, replacing handle");
            let previous = std::mem::replace(current, Arc::clone(&worker));
            // the status listener follows the handle
            self.dispatch(
                state,
                Command::Unregister {
                    worker: previous,
                    listener_id: self.inner.listener_id,
                },
            );
            self.dispatch(
                state,
                Command::Register {
                    epoch,
                    worker,
                    listener_id: self.inner.listener_id,
                },
            );
            return;
        }

        let epoch = self.inner.ids.generate_epoch_id();
        info!(%epoch, pending = state.pending.len(), "worker connected");
        state.connection = Connection::Connected {
            epoch,
            worker: Arc::clone(&worker),
        };

        self.dispatch(
            state,
            Command::Register {
                epoch,
                worker: Arc::clone(&worker),
                listener_id: self.inner.listener_id,
            },
        );
        while let Some(item) = state.pending.pop_front() {
            let command = Command::Enqueue {
                epoch,
                worker: Arc::clone(&worker),
                item,
            };
            self.dispatch(state, command);
        }
    }

    /// The worker went away. The stored handle is dropped immediately.
    pub fn on_worker_disconnected(&self) {
        let mut state = lock(&self.inner.state);
        match std::mem::replace(&mut state.connection, Connection::Disconnected) {
            Connection::Connected { epoch, .. } => {
                info!(%epoch, pending = state.pending.len(), "worker disconnected");
            }
            Connection::Disconnected => debug!("worker already disconnected"),
        }
    }

    /// Leave the worker voluntarily: unregister the status listener, then disconnect.
    pub fn detach(&self) {
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        match std::mem::replace(&mut state.connection, Connection::Disconnected) {
            Connection::Connected { epoch, worker } => {
                info!(%epoch, "detaching from worker");
                let command = Command::Unregister {
                    worker,
                    listener_id: self.inner.listener_id,
                };
                self.dispatch(state, command);
            }
            Connection::Disconnected => debug!("detach while disconnected"),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.inner.state).connection_state()
    }

    pub fn status(&self) -> IntakeStatus {
        let state = lock(&self.inner.state);
        IntakeStatus {
            state: state.connection_state(),
            epoch: state.epoch(),
            pending: state.pending.len(),
            listeners: self.inner.events.receiver_count(),
            counts: state.counts,
        }
    }

    /// Status events reported by connected workers, in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until every command issued before this call has been handled.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.commands.send(Command::Flush(tx)).is_err() {
            return;
        }
        // dispatcher が止まると sender ごと drop されて Err になる
        let _ = rx.await;
    }

    /// Stop the dispatcher and wait for it. Later forwards are counted as dropped.
    pub async fn shutdown(&self) {
        let dispatcher = lock(&self.inner.dispatcher).take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.shutdown_and_join().await;
        }
    }

    fn dispatch(&self, state: &mut IntakeState, command: Command) {
        if let Err(mpsc::error::SendError(command)) = self.inner.commands.send(command) {
            if let Command::Enqueue { item, .. } = command {
                warn!(%item, "dispatcher stopped, dropping item");
                state.counts.dropped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryWorker;
    use std::time::Duration;

    async fn queue() -> IntakeQueue {
        IntakeQueue::builder().spawn().unwrap()
    }

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names.iter().map(|n| WorkItem::new(*n)).collect()
    }

    #[tokio::test]
    async fn submissions_before_connect_are_drained_in_order() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        queue.submit(WorkItem::new("u1"));
        queue.submit(WorkItem::new("u2"));
        assert_eq!(queue.status().pending, 2);

        queue.on_worker_connected(worker.clone());
        queue.flush().await;

        assert_eq!(worker.received(), items(&["u1", "u2"]));
        let status = queue.status();
        assert_eq!(status.pending, 0);
        assert_eq!(status.counts.forwarded, 2);
    }

    #[tokio::test]
    async fn submission_while_connected_bypasses_pending() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());
        queue.on_worker_connected(worker.clone());

        queue.submit(WorkItem::new("u3"));
        assert_eq!(queue.status().pending, 0);

        queue.flush().await;
        assert_eq!(worker.received(), items(&["u3"]));
    }

    #[tokio::test]
    async fn redundant_disconnect_keeps_pending_items() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        queue.submit(WorkItem::new("u4"));
        queue.on_worker_disconnected();
        assert_eq!(queue.status().pending, 1);

        queue.on_worker_connected(worker.clone());
        queue.flush().await;
        assert_eq!(worker.received(), items(&["u4"]));
    }

    #[tokio::test]
    async fn reconnect_delivers_only_new_items_to_new_handle() {
        let queue = queue().await;
        let first = Arc::new(InMemoryWorker::new());
        let second = Arc::new(InMemoryWorker::new());

        queue.on_worker_connected(first.clone());
        queue.submit(WorkItem::new("u5"));
        queue.flush().await;
        queue.on_worker_disconnected();

        queue.submit(WorkItem::new("u6"));
        queue.on_worker_connected(second.clone());
        queue.flush().await;

        assert_eq!(first.received(), items(&["u5"]));
        assert_eq!(second.received(), items(&["u6"]));
    }

    #[tokio::test]
    async fn redundant_connect_does_not_redeliver() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        queue.submit_all(items(&["a", "b"]));
        queue.on_worker_connected(worker.clone());
        let epoch = queue.status().epoch;
        queue.on_worker_connected(worker.clone());
        queue.flush().await;

        assert_eq!(worker.received(), items(&["a", "b"]));
        assert_eq!(queue.status().epoch, epoch);
    }

    #[tokio::test]
    async fn redundant_connect_replaces_the_handle() {
        let queue = queue().await;
        let first = Arc::new(InMemoryWorker::new());
        let second = Arc::new(InMemoryWorker::new());

        queue.on_worker_connected(first.clone());
        queue.on_worker_connected(second.clone());
        queue.submit(WorkItem::new("x"));
        queue.flush().await;

        assert!(first.received().is_empty());
        assert_eq!(second.received(), items(&["x"]));
    }

    #[tokio::test]
    async fn replacing_the_handle_moves_the_status_listener() {
        let queue = queue().await;
        let first = Arc::new(InMemoryWorker::new());
        let second = Arc::new(InMemoryWorker::new());
        let mut events = queue.subscribe();

        queue.on_worker_connected(first.clone());
        queue.on_worker_connected(second.clone());
        queue.flush().await;

        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 1);

        second.emit_log("from second");
        assert!(matches!(
            events.recv().await.unwrap(),
            StatusEvent::Log { message, .. } if message == "from second"
        ));

        queue.detach();
        queue.flush().await;
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 0);
    }

    #[tokio::test]
    async fn reconnecting_the_same_handle_keeps_one_registration() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        queue.on_worker_connected(worker.clone());
        queue.on_worker_connected(worker.clone());
        queue.flush().await;

        assert_eq!(worker.listener_count(), 1);
        assert!(queue.connection_state().is_connected());
    }

    #[tokio::test]
    async fn rejected_item_does_not_disturb_the_rest_of_the_drain() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());
        worker.refuse(WorkItem::new("b"));

        queue.submit_all(items(&["a", "b", "c"]));
        queue.on_worker_connected(worker.clone());
        queue.flush().await;

        assert_eq!(worker.received(), items(&["a", "c"]));
        assert_eq!(worker.rejected(), 1);
        let status = queue.status();
        assert_eq!(status.counts.forwarded, 2);
        assert_eq!(status.counts.failed, 1);
    }

    #[tokio::test]
    async fn in_flight_items_never_reach_a_disconnected_handle() {
        // current_thread runtime: the dispatcher cannot run before `flush`
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        queue.on_worker_connected(worker.clone());
        queue.submit(WorkItem::new("late"));
        queue.on_worker_disconnected();
        queue.submit(WorkItem::new("queued"));
        queue.flush().await;

        assert!(worker.received().is_empty());
        let status = queue.status();
        assert_eq!(status.counts.dropped, 1);
        assert_eq!(status.pending, 1);
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert!(!status.state.is_connected());
        assert_eq!(status.epoch, None);
    }

    #[tokio::test]
    async fn transport_failure_is_counted_and_not_requeued() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());
        worker.set_unreachable(true);

        queue.submit(WorkItem::new("lost"));
        queue.on_worker_connected(worker.clone());
        queue.flush().await;

        worker.set_unreachable(false);
        queue.submit(WorkItem::new("next"));
        queue.flush().await;

        assert_eq!(worker.received(), items(&["next"]));
        let status = queue.status();
        assert_eq!(status.counts.failed, 1);
        assert_eq!(status.counts.forwarded, 1);
        assert_eq!(status.pending, 0);
    }

    #[tokio::test]
    async fn accept_submits_resolved_items() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        let count = queue
            .accept(&Submission::multiple(["content://a", "content://b"]))
            .unwrap();
        assert_eq!(count, 2);

        let err = queue
            .accept(&Submission::Single { extras: None })
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidSubmissionPayload(_)));
        assert_eq!(queue.status().pending, 2);

        queue.on_worker_connected(worker.clone());
        queue.flush().await;
        assert_eq!(worker.received(), items(&["content://a", "content://b"]));
    }

    #[tokio::test]
    async fn connect_registers_listener_and_detach_unregisters_it() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());
        let mut events = queue.subscribe();

        queue.on_worker_connected(worker.clone());
        queue.flush().await;
        assert_eq!(worker.listener_count(), 1);

        worker.emit_upload_status(true);
        worker.emit_log("uploading content://a");
        assert!(matches!(
            events.recv().await.unwrap(),
            StatusEvent::UploadStatus { uploading: true, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            StatusEvent::Log { message, .. } if message == "uploading content://a"
        ));

        queue.detach();
        queue.flush().await;
        assert_eq!(worker.listener_count(), 0);
        assert_eq!(queue.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_stops_forwarding() {
        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());
        queue.on_worker_connected(worker.clone());

        queue.shutdown().await;
        queue.submit(WorkItem::new("after-shutdown"));
        // flush returns immediately once the dispatcher is gone
        tokio::time::timeout(Duration::from_secs(1), queue.flush())
            .await
            .unwrap();

        assert!(worker.received().is_empty());
        assert_eq!(queue.status().counts.dropped, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submitters_racing_a_connect_lose_and_duplicate_nothing() {
        const SUBMITTERS: usize = 4;
        const PER_SUBMITTER: usize = 200;

        let queue = queue().await;
        let worker = Arc::new(InMemoryWorker::new());

        let handles: Vec<_> = (0..SUBMITTERS)
            .map(|s| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_SUBMITTER {
                        queue.submit(WorkItem::new(format!("{s}:{i}")));
                    }
                })
            })
            .collect();
        queue.on_worker_connected(worker.clone());
        for handle in handles {
            handle.join().unwrap();
        }
        queue.flush().await;

        let received = worker.received();
        assert_eq!(received.len(), SUBMITTERS * PER_SUBMITTER);
        for s in 0..SUBMITTERS {
            let prefix = format!("{s}:");
            let seen: Vec<usize> = received
                .iter()
                .filter_map(|item| item.as_str().strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..PER_SUBMITTER).collect::<Vec<_>>());
        }
    }
}
