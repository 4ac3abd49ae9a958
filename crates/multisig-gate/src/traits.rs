use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::execution::{AuthorizedBatch, ExecutionReceipt, ResourceRef};

/// The external environment that actually carries out approved actions.
///
/// Implementations must be all-or-nothing: either every action in the batch
/// takes effect and `Ok` is returned, or none does. The gate marks a
/// transaction executed only after `Ok`.
///
/// The batch's [`DerivedAuthority`](multisig_types::DerivedAuthority) must be
/// accepted as a signature for its address, and only for that address, once
/// [`DerivedAuthority::verify`](multisig_types::DerivedAuthority::verify)
/// succeeds.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        batch: &AuthorizedBatch,
        resources: &[ResourceRef],
    ) -> Result<ExecutionReceipt, ExecutionError>;
}
