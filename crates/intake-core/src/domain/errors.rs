//! Errors - エラー型と分類
//!
//! IntakeQueue は `submit` の呼び出し元にエラーを返さない。
//! ここにある型は境界（worker 呼び出し、submission の解決、設定の読み込み）で
//! 発生し、その場でログに記録されるか、境界の呼び出し元に返される。

use thiserror::Error;

use super::WorkItem;

/// ErrorKind はエラーの運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// worker に届かなかった（到達不能、呼び出し拒否）
    Transport,
    /// submission を WorkItem に解決できなかった
    Payload,
    /// 設定・構築時のエラー
    Configuration,
}

/// Error returned by an `UploadWorker` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("worker unreachable")]
    Unreachable,

    #[error("call rejected by worker: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed to forward {item}: {source}")]
    TransportFailure {
        item: WorkItem,
        #[source]
        source: TransportError,
    },

    #[error("invalid submission payload: {0}")]
    InvalidSubmissionPayload(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportFailure { .. } => ErrorKind::Transport,
            Self::InvalidSubmissionPayload(_) => ErrorKind::Payload,
            Self::Config(_) | Self::Io(_) => ErrorKind::Configuration,
        }
    }
}
