//! App - アプリケーション層
//!
//! ports を組み合わせて intake の振る舞いを実装します。
//!
//! # 主要コンポーネント
//! - **IntakeQueue**: submission の受け口、pending の管理、接続状態の遷移
//! - **DispatchLoop**: worker 呼び出しを直列に行うバックグラウンドタスク
//! - **IntakeBuilder**: 設定検証とワイヤリング
//! - **StatusRelay**: worker の status callback を subscriber に配る

pub mod builder;
mod dispatch_loop;
pub mod intake;
mod relay;
pub mod status;

pub use self::builder::{BuildError, IntakeBuilder};
pub use self::intake::IntakeQueue;
pub use self::status::{DeliveryCounts, IntakeStatus};
