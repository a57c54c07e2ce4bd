//! # Chain Module
//!
//! Boundary to the Solana RPC node: broadcasting signed transactions and
//! reading signature confirmation status. The engine and poller talk to the
//! chain only through [`ChainGateway`].

use async_trait::async_trait;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::error::SwapError;

pub mod rpc;

pub use rpc::SolanaRpcGateway;

/// Graduated certainty levels the cluster reports for a submitted
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationTier {
    Processed,
    Confirmed,
    Finalized,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Submit a signed transaction. Submission failure is terminal for the
    /// attempt; callers must not re-broadcast the same payload.
    async fn broadcast(&self, transaction: &VersionedTransaction) -> Result<Signature, SwapError>;

    /// Current confirmation tier for a signature, `None` while the cluster
    /// has not seen it yet.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<Option<ConfirmationTier>>;
}
