//! Domain model: work items, connection state, status events, ids, errors.

pub mod errors;
pub mod events;
pub mod ids;
pub mod item;
pub mod state;
pub mod submission;

pub use self::errors::{ErrorKind, IntakeError, TransportError};
pub use self::events::StatusEvent;
pub use self::ids::{EpochId, ListenerId};
pub use self::item::WorkItem;
pub use self::state::ConnectionState;
pub use self::submission::Submission;
