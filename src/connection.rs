//! Connection-pool seam.

use async_trait::async_trait;

use crate::error::{AcquireError, ReleaseError};

/// Leases exclusive connections out of a pool bound to one datastore.
///
/// `release` takes the connection by value, so a connection can be handed
/// back at most once.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    type Connection: Send + 'static;

    /// Produces a healthy connection, or fails on exhaustion, network or
    /// authentication faults.
    async fn acquire(&self) -> Result<Self::Connection, AcquireError>;

    /// Returns a connection to the pool.
    async fn release(&self, connection: Self::Connection) -> Result<(), ReleaseError>;
}
