use tracing::debug;

use crate::ports::StatusListener;

/// Writes every worker status callback to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl StatusListener for TracingListener {
    fn log_to_client(&self, message: &str) {
        debug!(target: "intake::worker", %message, "from worker");
    }

    fn on_upload_status_change(&self, uploading: bool) {
        debug!(target: "intake::worker", uploading, "upload status change");
    }
}
