//! Events - worker から届く status 通知
//!
//! worker が登録済み listener に送る情報イベント。配送保証はなく、
//! listener ごとに発行順が保たれることだけを約束する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Free-text log line from the worker.
    Log { message: String, at: DateTime<Utc> },
    /// The worker started or stopped uploading.
    UploadStatus { uploading: bool, at: DateTime<Utc> },
}
