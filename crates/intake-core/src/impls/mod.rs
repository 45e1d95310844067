//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryWorker**: 受け取った item を記録するだけの worker
//! - **TracingListener**: status callback を tracing に流す listener

pub mod inmem_worker;
pub mod tracing_listener;

pub use self::inmem_worker::InMemoryWorker;
pub use self::tracing_listener::TracingListener;
