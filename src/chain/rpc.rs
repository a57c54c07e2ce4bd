use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::chain::{ChainGateway, ConfirmationTier};
use crate::error::SwapError;

/// [`ChainGateway`] over the nonblocking Solana RPC client.
pub struct SolanaRpcGateway {
    rpc: Arc<RpcClient>,
}

impl SolanaRpcGateway {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl ChainGateway for SolanaRpcGateway {
    async fn broadcast(&self, transaction: &VersionedTransaction) -> Result<Signature, SwapError> {
        self.rpc
            .send_transaction(transaction)
            .await
            .map_err(|err| SwapError::BroadcastFailed(err.to_string()))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<Option<ConfirmationTier>> {
        let statuses = self
            .rpc
            .get_signature_statuses(&[*signature])
            .await
            .context("signature status query failed")?
            .value;

        Ok(statuses.into_iter().next().flatten().map(|status| {
            if status.satisfies_commitment(CommitmentConfig::finalized()) {
                ConfirmationTier::Finalized
            } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                ConfirmationTier::Confirmed
            } else {
                ConfirmationTier::Processed
            }
        }))
    }
}
