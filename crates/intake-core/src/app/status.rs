//! Status - IntakeQueue のスナップショット

use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionState, EpochId};

/// Delivery outcomes counted since the queue was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounts {
    /// Accepted by a worker.
    pub forwarded: u64,
    /// The worker call failed. Not retried.
    pub failed: u64,
    /// Never attempted: the epoch ended (or the dispatcher stopped) first.
    pub dropped: u64,
}

/// ```ignore
/// let status = queue.status();
/// println!("{}", serde_json::to_string_pretty(&status)?);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeStatus {
    pub state: ConnectionState,
    pub epoch: Option<EpochId>,
    pub pending: usize,
    /// Live `subscribe()` receivers.
    pub listeners: usize,
    #[serde(flatten)]
    pub counts: DeliveryCounts,
}
