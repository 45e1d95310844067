//! StatusRelay - worker に登録する intake 側の callback
//!
//! worker からの callback を `StatusEvent` に変換して
//! 1. broadcast（`IntakeQueue::subscribe` の受信者）に流し、
//! 2. builder で渡された listener にそのまま転送する。
//!
//! どちらも同期的に発行順で届けるので、listener ごとの順序は保たれる。

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::StatusEvent;
use crate::ports::{Clock, StatusListener};

pub(crate) struct StatusRelay {
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<StatusEvent>,
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl StatusRelay {
    pub(crate) fn new(
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<StatusEvent>,
        listeners: Vec<Arc<dyn StatusListener>>,
    ) -> Self {
        Self {
            clock,
            events,
            listeners,
        }
    }

    fn publish(&self, event: StatusEvent) {
        // receiver がいなくてもエラーにしない
        let _ = self.events.send(event);
    }
}

impl StatusListener for StatusRelay {
    fn log_to_client(&self, message: &str) {
        for listener in &self.listeners {
            listener.log_to_client(message);
        }
        self.publish(StatusEvent::Log {
            message: message.to_string(),
            at: self.clock.now(),
        });
    }

    fn on_upload_status_change(&self, uploading: bool) {
        for listener in &self.listeners {
            listener.on_upload_status_change(uploading);
        }
        self.publish(StatusEvent::UploadStatus {
            uploading,
            at: self.clock.now(),
        });
    }
}
