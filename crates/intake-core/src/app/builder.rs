//! IntakeBuilder - IntakeQueue の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定の検証は `spawn()` の時点で行う
//! - tokio runtime の外で呼ばれたら dispatcher を起動できないので BuildError

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast;

use super::intake::IntakeQueue;
use super::relay::StatusRelay;
use crate::config::IntakeConfig;
use crate::impls::TracingListener;
use crate::ports::{Clock, IdGenerator, StatusListener, SystemClock, UlidGenerator};

/// ```ignore
/// let queue = IntakeBuilder::new()
///     .config(IntakeConfig::load("intake.toml")?)
///     .listener(Arc::new(MyListener))
///     .spawn()?;
/// ```
pub struct IntakeBuilder {
    config: IntakeConfig,
    clock: Arc<dyn Clock>,
    listeners: Vec<Arc<dyn StatusListener>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IntakeQueue must be spawned from within a tokio runtime")]
    NoRuntime,
}

impl IntakeBuilder {
    pub fn new() -> Self {
        Self {
            config: IntakeConfig::default(),
            clock: Arc::new(SystemClock),
            listeners: Vec::new(),
        }
    }

    pub fn config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock used for status event timestamps and id generation.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Extra sink that receives every worker status callback.
    pub fn listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn spawn(self) -> Result<IntakeQueue, BuildError> {
        self.config
            .validate()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        let runtime = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;

        let mut listeners = self.listeners;
        if self.config.log_status_events {
            listeners.insert(0, Arc::new(TracingListener));
        }

        let (events, _) = broadcast::channel(self.config.status_capacity);
        let relay = Arc::new(StatusRelay::new(
            Arc::clone(&self.clock),
            events.clone(),
            listeners,
        ));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(self.clock));

        Ok(IntakeQueue::start(&runtime, ids, relay, events))
    }
}

impl Default for IntakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
