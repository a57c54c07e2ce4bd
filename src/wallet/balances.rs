//! Balance lookups against the Solana RPC node.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use tracing::warn;

use crate::wallet::{BalanceProvider, WalletProvider};

pub struct RpcBalanceProvider {
    rpc: Arc<RpcClient>,
    wallets: Arc<dyn WalletProvider>,
}

impl RpcBalanceProvider {
    pub fn new(rpc: Arc<RpcClient>, wallets: Arc<dyn WalletProvider>) -> Self {
        Self { rpc, wallets }
    }

    async fn owner(&self, user_id: u64) -> Result<Pubkey> {
        let address = self
            .wallets
            .address(user_id)
            .await?
            .with_context(|| format!("user {user_id} has no wallet"))?;
        Pubkey::from_str(&address).context("stored wallet address is not a valid pubkey")
    }
}

#[async_trait]
impl BalanceProvider for RpcBalanceProvider {
    async fn token_balance(&self, user_id: u64, mint: &str) -> Result<u64> {
        let owner = self.owner(user_id).await?;
        let mint = Pubkey::from_str(mint).context("invalid mint address")?;
        let token_account = get_associated_token_address(&owner, &mint);

        match self.rpc.get_token_account_balance(&token_account).await {
            Ok(balance) => balance
                .amount
                .parse::<u64>()
                .context("unparseable token amount from RPC"),
            Err(err) => {
                // An absent token account is indistinguishable from a node
                // hiccup here; both read as an empty balance.
                warn!("no balance readable for {}: {}", token_account, err);
                Ok(0)
            }
        }
    }

    async fn token_decimals(&self, mint: &str) -> Result<u8> {
        let mint = Pubkey::from_str(mint).context("invalid mint address")?;
        let supply = self
            .rpc
            .get_token_supply(&mint)
            .await
            .context("mint supply lookup failed")?;
        Ok(supply.decimals)
    }

    async fn native_balance(&self, user_id: u64) -> Result<u64> {
        let owner = self.owner(user_id).await?;
        self.rpc
            .get_balance(&owner)
            .await
            .context("native balance lookup failed")
    }
}
