//! Ports - 抽象化レイヤー
//!
//! IntakeQueue が外部と接する継ぎ目を trait として定義します。
//! - worker（アップロード本体）
//! - worker からの status callback
//! - 時刻と ID 生成（テストで差し替えるため）

pub mod clock;
pub mod id_generator;
pub mod status_listener;
pub mod worker;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::status_listener::StatusListener;
pub use self::worker::UploadWorker;
