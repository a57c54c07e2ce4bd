//! # Wallet Module
//!
//! Custodial key management and balance lookups. The engine and controller
//! depend on the [`WalletProvider`] and [`BalanceProvider`] traits only; the
//! concrete implementations here are a JSON users file and the Solana RPC
//! node.

use std::fmt;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};

pub mod balances;
pub mod store;

pub use balances::RpcBalanceProvider;
pub use store::FileWalletStore;

/// A user's custodial keypair, treated as an opaque signing capability.
///
/// The secret never leaves this type: `Debug` prints only the derived
/// address and there is no accessor for the key material.
pub struct Credential {
    keypair: Keypair,
}

impl Credential {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.address()).finish()
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// The user's signing capability, `None` when no wallet exists.
    async fn credential(&self, user_id: u64) -> anyhow::Result<Option<Credential>>;

    /// The user's public address, `None` when no wallet exists.
    async fn address(&self, user_id: u64) -> anyhow::Result<Option<String>>;

    /// Return the user's address, generating and persisting a fresh keypair
    /// when none exists yet.
    async fn ensure_wallet(&self, user_id: u64) -> anyhow::Result<String>;
}

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Token balance in the mint's smallest unit; a missing token account
    /// reads as zero.
    async fn token_balance(&self, user_id: u64, mint: &str) -> anyhow::Result<u64>;

    /// Display decimals recorded on the mint.
    async fn token_decimals(&self, mint: &str) -> anyhow::Result<u8>;

    /// Native balance in lamports.
    async fn native_balance(&self, user_id: u64) -> anyhow::Result<u64>;
}
