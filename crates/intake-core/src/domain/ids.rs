//! Typed identifiers for connection epochs and status listeners.
//!
//! # ULID + Phantom type
//! `Id<T>` で共通実装を一つにまとめ、`T` はマーカー型としてのみ使います。
//! - `EpochId`: Disconnected → Connected の遷移ごとに 1 つ
//! - `ListenerId`: worker に登録した status listener の識別子
//!
//! ULID なので生成順にソートでき、ログ上で epoch の前後関係が読めます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// 各 ID 型のマーカー trait（Display のプレフィックスを提供）
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// ```ignore
/// let epoch: EpochId = Id::from(Ulid::new());
/// let listener: ListenerId = Id::from(Ulid::new());
/// // epoch と listener は別の型なので混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Connection epoch のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Epoch {}

impl IdMarker for Epoch {
    fn prefix() -> &'static str {
        "epoch-"
    }
}

/// Status listener のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Listener {}

impl IdMarker for Listener {
    fn prefix() -> &'static str {
        "listener-"
    }
}

/// Identifier of one worker connection (Disconnected -> Connected -> Disconnected).
pub type EpochId = Id<Epoch>;

/// Identifier under which the intake registers its status listener with a worker.
pub type ListenerId = Id<Listener>;
