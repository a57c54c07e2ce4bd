//! Swap Engine Service
//!
//! Turns validated trade parameters into a signed, broadcast, and confirmed
//! on-chain transaction: resolve the custodial credential, quote through
//! Jupiter, build the unsigned transaction, sign it, broadcast it, and poll
//! for finality. Exposes `buy`/`sell` plus the dry-run estimates the
//! dialogue layer shows before asking for confirmation.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use solana_sdk::native_token::sol_to_lamports;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{info, warn};

use crate::chain::ChainGateway;
use crate::error::SwapError;
use crate::services::confirmer::TxConfirmer;
use crate::services::jupiter::SwapApi;
use crate::wallet::{BalanceProvider, Credential, WalletProvider};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

const SOL_DECIMALS: u8 = 9;

/// Outcome of a full swap attempt.
///
/// `success: false` with a signature present means the transaction was
/// broadcast but not finalized before the confirmation deadline; the
/// signature is surfaced so the user can look the transaction up manually.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub tx_signature: Option<String>,
}

/// Dry-run quote result shown to the user before they confirm.
#[derive(Debug, Clone, Copy)]
pub struct QuoteEstimate {
    /// Quoted output in the output asset's smallest unit
    pub out_amount: u64,
    /// Display decimals for the output asset
    pub out_decimals: u8,
}

/// The engine operations the dialogue layer drives.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn estimate_buy(
        &self,
        user_id: u64,
        token_mint: &str,
        sol_in: f64,
        slippage_bps: u16,
    ) -> Result<QuoteEstimate, SwapError>;

    async fn estimate_sell(
        &self,
        user_id: u64,
        token_mint: &str,
        percentage: u8,
        slippage_bps: u16,
    ) -> Result<QuoteEstimate, SwapError>;

    /// Swap `sol_in` SOL (major units) into `token_mint`.
    async fn buy(
        &self,
        user_id: u64,
        token_mint: &str,
        sol_in: f64,
        slippage_bps: u16,
    ) -> Result<ExecutionResult, SwapError>;

    /// Swap `percentage` (1-100) of the user's `token_mint` balance into SOL.
    async fn sell(
        &self,
        user_id: u64,
        token_mint: &str,
        percentage: u8,
        slippage_bps: u16,
    ) -> Result<ExecutionResult, SwapError>;
}

pub struct SwapEngine {
    api: Arc<dyn SwapApi>,
    chain: Arc<dyn ChainGateway>,
    wallets: Arc<dyn WalletProvider>,
    balances: Arc<dyn BalanceProvider>,
    confirmer: TxConfirmer,
}

impl SwapEngine {
    pub fn new(
        api: Arc<dyn SwapApi>,
        chain: Arc<dyn ChainGateway>,
        wallets: Arc<dyn WalletProvider>,
        balances: Arc<dyn BalanceProvider>,
        confirmer: TxConfirmer,
    ) -> Self {
        Self {
            api,
            chain,
            wallets,
            balances,
            confirmer,
        }
    }

    async fn resolve_credential(&self, user_id: u64) -> Result<Credential, SwapError> {
        self.wallets
            .credential(user_id)
            .await?
            .ok_or(SwapError::CredentialNotFound(user_id))
    }

    /// Size a sell in the token's smallest unit. A zero balance is terminal
    /// before any remote call is made.
    async fn sell_amount_minor(
        &self,
        user_id: u64,
        token_mint: &str,
        percentage: u8,
    ) -> Result<u64, SwapError> {
        let balance = self.balances.token_balance(user_id, token_mint).await?;
        if balance == 0 {
            return Err(SwapError::NothingToSell);
        }
        Ok((u128::from(balance) * u128::from(percentage) / 100) as u64)
    }

    /// Quote, build, sign, broadcast, confirm. One signed broadcast per
    /// attempt: a failure anywhere is terminal and a retry must start over
    /// with a fresh quote.
    async fn execute(
        &self,
        credential: &Credential,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<ExecutionResult, SwapError> {
        let trader = credential.address().to_string();

        let quote = self
            .api
            .get_quote(input_mint, output_mint, amount, slippage_bps)
            .await?;
        let blob = self.api.build_swap_transaction(&trader, &quote).await?;
        let transaction = sign_swap_transaction(credential, &blob)?;

        let signature = self.chain.broadcast(&transaction).await?;
        info!("broadcast swap transaction {}", signature);

        let confirmed = match self.confirmer.confirm(&signature).await {
            Ok(confirmed) => confirmed,
            Err(SwapError::AlreadyInProgress(_)) => {
                // The transaction is on the wire; degrade to an uncertain
                // outcome instead of dropping the signature.
                warn!("confirmation for {} already running", signature);
                false
            }
            Err(err) => return Err(err),
        };

        Ok(ExecutionResult {
            success: confirmed,
            tx_signature: Some(signature.to_string()),
        })
    }
}

#[async_trait]
impl SwapExecutor for SwapEngine {
    async fn estimate_buy(
        &self,
        user_id: u64,
        token_mint: &str,
        sol_in: f64,
        slippage_bps: u16,
    ) -> Result<QuoteEstimate, SwapError> {
        self.resolve_credential(user_id).await?;

        let lamports = sol_to_lamports(sol_in);
        let quote = self
            .api
            .get_quote(SOL_MINT, token_mint, lamports, slippage_bps)
            .await?;
        let out_decimals = self.balances.token_decimals(token_mint).await?;

        Ok(QuoteEstimate {
            out_amount: quote.out_amount_minor()?,
            out_decimals,
        })
    }

    async fn estimate_sell(
        &self,
        user_id: u64,
        token_mint: &str,
        percentage: u8,
        slippage_bps: u16,
    ) -> Result<QuoteEstimate, SwapError> {
        self.resolve_credential(user_id).await?;

        let amount = self.sell_amount_minor(user_id, token_mint, percentage).await?;
        let quote = self
            .api
            .get_quote(token_mint, SOL_MINT, amount, slippage_bps)
            .await?;

        Ok(QuoteEstimate {
            out_amount: quote.out_amount_minor()?,
            out_decimals: SOL_DECIMALS,
        })
    }

    async fn buy(
        &self,
        user_id: u64,
        token_mint: &str,
        sol_in: f64,
        slippage_bps: u16,
    ) -> Result<ExecutionResult, SwapError> {
        let credential = self.resolve_credential(user_id).await?;
        let lamports = sol_to_lamports(sol_in);
        info!("user {} buying {} with {} lamports", user_id, token_mint, lamports);

        self.execute(&credential, SOL_MINT, token_mint, lamports, slippage_bps)
            .await
    }

    async fn sell(
        &self,
        user_id: u64,
        token_mint: &str,
        percentage: u8,
        slippage_bps: u16,
    ) -> Result<ExecutionResult, SwapError> {
        let credential = self.resolve_credential(user_id).await?;
        let amount = self.sell_amount_minor(user_id, token_mint, percentage).await?;
        info!(
            "user {} selling {}% of {} ({} minor units)",
            user_id, percentage, token_mint, amount
        );

        self.execute(&credential, token_mint, SOL_MINT, amount, slippage_bps)
            .await
    }
}

/// Decode the adapter's base64 blob and place the trader's signature at the
/// signer index. The engine never re-derives keys or rebuilds the message;
/// a blob that cannot be decoded or lacks the signer is a build failure.
fn sign_swap_transaction(
    credential: &Credential,
    blob: &str,
) -> Result<VersionedTransaction, SwapError> {
    let bytes = BASE64
        .decode(blob)
        .map_err(|err| SwapError::SwapBuildFailed(format!("transaction is not valid base64: {err}")))?;

    let mut transaction: VersionedTransaction = bincode::deserialize(&bytes)
        .map_err(|err| SwapError::SwapBuildFailed(format!("undecodable transaction: {err}")))?;

    let signer = credential.address();
    let index = transaction
        .message
        .static_account_keys()
        .iter()
        .position(|key| *key == signer)
        .ok_or_else(|| {
            SwapError::SwapBuildFailed("trader key missing from transaction account keys".to_string())
        })?;

    let signature = credential.sign(&transaction.message.serialize());
    transaction.signatures[index] = signature;

    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use solana_sdk::message::Message;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signature, Signer};
    use solana_sdk::transaction::Transaction;

    use super::*;
    use crate::chain::ConfirmationTier;
    use crate::services::jupiter::JupiterQuote;

    const TOKEN_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn quote_with_out_amount(out_amount: u64) -> JupiterQuote {
        serde_json::from_value(serde_json::json!({
            "inputMint": SOL_MINT,
            "inAmount": "0",
            "outputMint": TOKEN_MINT,
            "outAmount": out_amount.to_string(),
        }))
        .unwrap()
    }

    /// Unsigned single-signer transaction blob with `payer` as fee payer,
    /// shaped like the adapter's swap-build response.
    fn unsigned_blob_for(payer: &Pubkey) -> String {
        let message = Message::new(&[], Some(payer));
        let transaction = VersionedTransaction::from(Transaction::new_unsigned(message));
        BASE64.encode(bincode::serialize(&transaction).unwrap())
    }

    struct StubWallets {
        secret: Option<Vec<u8>>,
    }

    impl StubWallets {
        fn with_keypair(keypair: &Keypair) -> Arc<Self> {
            Arc::new(Self {
                secret: Some(keypair.to_bytes().to_vec()),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self { secret: None })
        }
    }

    #[async_trait]
    impl WalletProvider for StubWallets {
        async fn credential(&self, _user_id: u64) -> anyhow::Result<Option<Credential>> {
            Ok(self
                .secret
                .as_ref()
                .map(|bytes| Credential::new(Keypair::try_from(&bytes[..]).unwrap())))
        }

        async fn address(&self, user_id: u64) -> anyhow::Result<Option<String>> {
            Ok(self
                .credential(user_id)
                .await?
                .map(|c| c.address().to_string()))
        }

        async fn ensure_wallet(&self, user_id: u64) -> anyhow::Result<String> {
            Ok(self.address(user_id).await?.unwrap())
        }
    }

    struct StubBalances {
        token_balance: u64,
        decimals: u8,
    }

    #[async_trait]
    impl BalanceProvider for StubBalances {
        async fn token_balance(&self, _user_id: u64, _mint: &str) -> anyhow::Result<u64> {
            Ok(self.token_balance)
        }

        async fn token_decimals(&self, _mint: &str) -> anyhow::Result<u8> {
            Ok(self.decimals)
        }

        async fn native_balance(&self, _user_id: u64) -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    #[derive(Clone, Copy)]
    struct QuoteCall {
        amount: u64,
        slippage_bps: u16,
    }

    struct StubApi {
        fail_quote: bool,
        out_amount: u64,
        blob: Option<String>,
        quote_calls: Mutex<Vec<QuoteCall>>,
        build_called: AtomicBool,
    }

    impl StubApi {
        fn quoting(out_amount: u64) -> Arc<Self> {
            Arc::new(Self {
                fail_quote: false,
                out_amount,
                blob: None,
                quote_calls: Mutex::new(Vec::new()),
                build_called: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail_quote: true,
                out_amount: 0,
                blob: None,
                quote_calls: Mutex::new(Vec::new()),
                build_called: AtomicBool::new(false),
            })
        }

        fn with_blob(out_amount: u64, blob: String) -> Arc<Self> {
            Arc::new(Self {
                fail_quote: false,
                out_amount,
                blob: Some(blob),
                quote_calls: Mutex::new(Vec::new()),
                build_called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl SwapApi for StubApi {
        async fn get_quote(
            &self,
            _input_mint: &str,
            _output_mint: &str,
            amount: u64,
            slippage_bps: u16,
        ) -> Result<JupiterQuote, SwapError> {
            if self.fail_quote {
                return Err(SwapError::QuoteUnavailable("stub outage".to_string()));
            }
            self.quote_calls
                .lock()
                .unwrap()
                .push(QuoteCall { amount, slippage_bps });
            Ok(quote_with_out_amount(self.out_amount))
        }

        async fn build_swap_transaction(
            &self,
            _user_public_key: &str,
            _quote: &JupiterQuote,
        ) -> Result<String, SwapError> {
            self.build_called.store(true, Ordering::SeqCst);
            match &self.blob {
                Some(blob) => Ok(blob.clone()),
                None => Err(SwapError::SwapBuildFailed("stub has no blob".to_string())),
            }
        }
    }

    struct StubChain {
        signature: Signature,
        finalizes: bool,
        broadcast_called: AtomicBool,
        broadcast_signatures: Mutex<Vec<(Signature, Vec<u8>)>>,
    }

    impl StubChain {
        fn new(finalizes: bool) -> Arc<Self> {
            Arc::new(Self {
                signature: Signature::new_unique(),
                finalizes,
                broadcast_called: AtomicBool::new(false),
                broadcast_signatures: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChainGateway for StubChain {
        async fn broadcast(
            &self,
            transaction: &VersionedTransaction,
        ) -> Result<Signature, SwapError> {
            self.broadcast_called.store(true, Ordering::SeqCst);
            self.broadcast_signatures.lock().unwrap().push((
                transaction.signatures[0],
                transaction.message.serialize(),
            ));
            Ok(self.signature)
        }

        async fn signature_status(
            &self,
            _signature: &Signature,
        ) -> anyhow::Result<Option<ConfirmationTier>> {
            Ok(self.finalizes.then_some(ConfirmationTier::Finalized))
        }
    }

    fn engine(
        api: Arc<StubApi>,
        chain: Arc<StubChain>,
        wallets: Arc<StubWallets>,
        balances: StubBalances,
    ) -> SwapEngine {
        let chain: Arc<dyn ChainGateway> = chain;
        let confirmer = TxConfirmer::new(
            Arc::clone(&chain),
            Duration::from_millis(20),
            Duration::from_millis(1),
        );
        SwapEngine::new(api, chain, wallets, Arc::new(balances), confirmer)
    }

    #[tokio::test]
    async fn quote_failure_stops_before_build_and_broadcast() {
        let api = StubApi::failing();
        let chain = StubChain::new(true);
        let keypair = Keypair::new();
        let engine = engine(
            Arc::clone(&api),
            Arc::clone(&chain),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.buy(1, TOKEN_MINT, 1.0, 500).await;

        assert!(matches!(result, Err(SwapError::QuoteUnavailable(_))));
        assert!(!api.build_called.load(Ordering::SeqCst));
        assert!(!chain.broadcast_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_wallet_is_credential_not_found() {
        let api = StubApi::quoting(1);
        let engine = engine(
            Arc::clone(&api),
            StubChain::new(true),
            StubWallets::empty(),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.buy(9, TOKEN_MINT, 1.0, 500).await;

        assert!(matches!(result, Err(SwapError::CredentialNotFound(9))));
        assert!(api.quote_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_balance_sell_never_reaches_the_adapter() {
        let api = StubApi::quoting(1);
        let keypair = Keypair::new();
        let engine = engine(
            Arc::clone(&api),
            StubChain::new(true),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.sell(1, TOKEN_MINT, 50, 500).await;

        assert!(matches!(result, Err(SwapError::NothingToSell)));
        assert!(api.quote_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn buy_estimate_converts_major_units_to_lamports() {
        let api = StubApi::quoting(246_780_123);
        let keypair = Keypair::new();
        let engine = engine(
            Arc::clone(&api),
            StubChain::new(true),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let estimate = engine.estimate_buy(1, TOKEN_MINT, 1.5, 500).await.unwrap();

        let calls = api.quote_calls.lock().unwrap();
        assert_eq!(calls[0].amount, 1_500_000_000);
        assert_eq!(calls[0].slippage_bps, 500);
        assert_eq!(estimate.out_amount, 246_780_123);
        assert_eq!(estimate.out_decimals, 6);
    }

    #[tokio::test]
    async fn sell_estimate_sizes_from_balance_percentage() {
        let api = StubApi::quoting(42);
        let keypair = Keypair::new();
        let engine = engine(
            Arc::clone(&api),
            StubChain::new(true),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 1_000_000, decimals: 6 },
        );

        let estimate = engine.estimate_sell(1, TOKEN_MINT, 50, 500).await.unwrap();

        assert_eq!(api.quote_calls.lock().unwrap()[0].amount, 500_000);
        assert_eq!(estimate.out_decimals, 9);
    }

    #[tokio::test]
    async fn finalized_swap_reports_success_with_signature() {
        let keypair = Keypair::new();
        let api = StubApi::with_blob(42, unsigned_blob_for(&keypair.pubkey()));
        let chain = StubChain::new(true);
        let engine = engine(
            Arc::clone(&api),
            Arc::clone(&chain),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.buy(1, TOKEN_MINT, 0.25, 500).await.unwrap();

        assert!(result.success);
        assert_eq!(result.tx_signature, Some(chain.signature.to_string()));
    }

    #[tokio::test]
    async fn confirmation_deadline_reports_uncertain_outcome() {
        let keypair = Keypair::new();
        let api = StubApi::with_blob(42, unsigned_blob_for(&keypair.pubkey()));
        let chain = StubChain::new(false);
        let engine = engine(
            Arc::clone(&api),
            Arc::clone(&chain),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.buy(1, TOKEN_MINT, 0.25, 500).await.unwrap();

        // Broadcast happened, finality did not arrive in time: the caller
        // still gets the signature for manual lookup.
        assert!(!result.success);
        assert_eq!(result.tx_signature, Some(chain.signature.to_string()));
    }

    #[tokio::test]
    async fn broadcast_transaction_carries_a_valid_signature() {
        let keypair = Keypair::new();
        let api = StubApi::with_blob(42, unsigned_blob_for(&keypair.pubkey()));
        let chain = StubChain::new(true);
        let engine = engine(
            Arc::clone(&api),
            Arc::clone(&chain),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        engine.buy(1, TOKEN_MINT, 0.25, 500).await.unwrap();

        let broadcasts = chain.broadcast_signatures.lock().unwrap();
        let (signature, message) = &broadcasts[0];
        assert!(signature.verify(keypair.pubkey().as_ref(), message));
    }

    #[tokio::test]
    async fn blob_without_the_trader_key_is_a_build_failure() {
        let keypair = Keypair::new();
        let foreign = Keypair::new();
        let api = StubApi::with_blob(42, unsigned_blob_for(&foreign.pubkey()));
        let chain = StubChain::new(true);
        let engine = engine(
            Arc::clone(&api),
            Arc::clone(&chain),
            StubWallets::with_keypair(&keypair),
            StubBalances { token_balance: 0, decimals: 6 },
        );

        let result = engine.buy(1, TOKEN_MINT, 0.25, 500).await;

        assert!(matches!(result, Err(SwapError::SwapBuildFailed(_))));
        assert!(!chain.broadcast_called.load(Ordering::SeqCst));
    }
}
