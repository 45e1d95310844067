//! intake-core
//!
//! Reliable hand-off of work items to an intermittently connected upload worker.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（WorkItem, ConnectionState, StatusEvent, Submission, ids, errors）
//! - **ports**: 抽象化レイヤー（UploadWorker, StatusListener, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（IntakeQueue, dispatch loop, builder, status）
//! - **impls**: 実装（InMemoryWorker, TracingListener）
//! - **config**: TOML 設定
//!
//! ```ignore
//! let queue = IntakeQueue::builder().spawn()?;
//! queue.submit(WorkItem::new("content://media/external/images/1"));
//! // ... later, when the session manager reports the worker is up:
//! queue.on_worker_connected(worker);
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BuildError, IntakeBuilder, IntakeQueue, IntakeStatus};
pub use config::IntakeConfig;
pub use domain::{ConnectionState, IntakeError, StatusEvent, Submission, WorkItem};
