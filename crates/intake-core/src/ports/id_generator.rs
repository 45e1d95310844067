//! IdGenerator port - ID 生成の抽象化
//!
//! epoch / listener の ID を生成します。テストで FixedClock を差し込めるよう
//! trait として抽象化しています。

use crate::domain::ids::{EpochId, ListenerId};
use crate::ports::Clock;
use ulid::Ulid;

/// # Thread Safety
/// - `Send + Sync` を要求（dispatcher と呼び出し元の両方から使う）
pub trait IdGenerator: Send + Sync {
    fn generate_epoch_id(&self) -> EpochId;

    fn generate_listener_id(&self) -> ListenerId;
}

/// UlidGenerator は Clock の現在時刻を timestamp 部に使う ULID 生成器
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_epoch_id(&self) -> EpochId {
        EpochId::from(self.next_ulid())
    }

    fn generate_listener_id(&self) -> ListenerId {
        ListenerId::from(self.next_ulid())
    }
}
