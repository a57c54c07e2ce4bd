//! Swap failure taxonomy shared by the engine, poller, and dialogue layer.

use thiserror::Error;

/// Every way a swap attempt can fail.
///
/// All variants are terminal for the attempt that produced them: the engine
/// never retries on its own, the user re-initiates with a fresh quote.
#[derive(Debug, Error)]
pub enum SwapError {
    /// The user has no custodial wallet on record.
    #[error("no wallet found for user {0}")]
    CredentialNotFound(u64),

    /// A sell was requested against a zero token balance.
    #[error("no token balance available to sell")]
    NothingToSell,

    /// The quote API returned an error, garbage, or nothing in time.
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// The swap-build API failed, or its payload could not be decoded/signed.
    #[error("swap transaction build failed: {0}")]
    SwapBuildFailed(String),

    /// The RPC node rejected the signed transaction at submission.
    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    /// A confirmation poll for this signature is already running.
    #[error("confirmation already in progress for {0}")]
    AlreadyInProgress(String),

    /// Wallet-store or balance-lookup infrastructure failure.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
