//! Backend mutation contract

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Mutation rejected: {0}")]
    Rejected(String),

    #[error("Backend unreachable: {0}")]
    Transport(String),
}

pub type MutationResult<T> = Result<T, MutationError>;

/// Authoritative list backend. Every call may fail independently of the
/// optimistic bookkeeping layered on top of it.
#[async_trait]
pub trait ListMutations<P: Send + 'static>: Send + Sync {
    /// Returns the server-assigned id
    async fn create(&self, payload: P) -> MutationResult<String>;

    async fn set_completed(&self, id: &str, completed: bool) -> MutationResult<()>;

    async fn delete(&self, id: &str) -> MutationResult<()>;
}

#[async_trait]
impl<P, T> ListMutations<P> for std::sync::Arc<T>
where
    P: Send + 'static,
    T: ListMutations<P> + ?Sized,
{
    async fn create(&self, payload: P) -> MutationResult<String> {
        (**self).create(payload).await
    }

    async fn set_completed(&self, id: &str, completed: bool) -> MutationResult<()> {
        (**self).set_completed(id, completed).await
    }

    async fn delete(&self, id: &str) -> MutationResult<()> {
        (**self).delete(id).await
    }
}
