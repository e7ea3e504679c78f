//! Optimistic list mutations
//!
//! Overlays in-flight creates, toggles and deletes on the latest confirmed
//! server snapshot so a list reflects user intent before the backend
//! answers, and converges to server truth once it does.

pub mod mutations;
pub mod pending;
pub mod reconciler;

pub use mutations::{ListMutations, MutationError, MutationResult};
pub use pending::{NextSnapshotWins, PendingCreate, PendingMutations, SettlementPolicy};
pub use reconciler::{merge, OptimisticList, RenderedItem, Snapshot};
