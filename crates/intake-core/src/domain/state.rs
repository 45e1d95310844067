//! State - worker との接続状態
//!
//! 遷移は外部の session manager からの通知でのみ起きる:
//! - `on_worker_connected` → Connected
//! - `on_worker_disconnected` / `detach` → Disconnected
//!
//! 終端状態はない（IntakeQueue の寿命の間、何度でも往復する）。

use serde::{Deserialize, Serialize};

/// ConnectionState は worker に到達できるかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}
