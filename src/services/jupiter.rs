//! Jupiter API adapter.
//!
//! Stateless client for the two remote calls a swap needs: a price quote
//! (GET `/quote`) and an unsigned swap transaction built from that quote
//! (POST `/swap`). Both are single-shot with a bounded request timeout;
//! retry policy lives with the callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SwapError;

/// Jupiter API quote response.
///
/// Only the fields the engine reads are typed; everything else the API
/// returns is captured in `extra` so the quote round-trips verbatim into
/// the swap-build request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupiterQuote {
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "inAmount")]
    pub in_amount: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    #[serde(rename = "outAmount")]
    pub out_amount: String,
    #[serde(rename = "otherAmountThreshold", skip_serializing_if = "Option::is_none")]
    pub other_amount_threshold: Option<String>,
    #[serde(rename = "swapMode", skip_serializing_if = "Option::is_none")]
    pub swap_mode: Option<String>,
    #[serde(rename = "slippageBps", skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u16>,
    #[serde(rename = "priceImpactPct", skip_serializing_if = "Option::is_none")]
    pub price_impact_pct: Option<String>,
    #[serde(rename = "routePlan", skip_serializing_if = "Option::is_none")]
    pub route_plan: Option<serde_json::Value>,
    #[serde(rename = "contextSlot", skip_serializing_if = "Option::is_none")]
    pub context_slot: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JupiterQuote {
    /// Quoted output in the output asset's smallest unit.
    pub fn out_amount_minor(&self) -> Result<u64, SwapError> {
        self.out_amount.parse().map_err(|_| {
            SwapError::QuoteUnavailable(format!("unparseable outAmount {:?}", self.out_amount))
        })
    }
}

/// Jupiter swap request payload
#[derive(Debug, Serialize)]
struct JupiterSwapRequest<'a> {
    #[serde(rename = "userPublicKey")]
    user_public_key: &'a str,
    #[serde(rename = "wrapAndUnwrapSol")]
    wrap_and_unwrap_sol: bool,
    #[serde(rename = "useSharedAccounts")]
    use_shared_accounts: bool,
    #[serde(rename = "quoteResponse")]
    quote_response: &'a JupiterQuote,
}

/// Jupiter swap response: the unsigned transaction as a base64 blob.
#[derive(Debug, Deserialize)]
struct JupiterSwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

/// The two remote calls the engine makes, behind a seam so tests can
/// substitute a recording stub.
#[async_trait]
pub trait SwapApi: Send + Sync {
    /// Fetch a price quote. `amount` is in the input asset's smallest unit.
    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<JupiterQuote, SwapError>;

    /// Build an unsigned swap transaction for a quote, returned as a
    /// base64-encoded blob.
    async fn build_swap_transaction(
        &self,
        user_public_key: &str,
        quote: &JupiterQuote,
    ) -> Result<String, SwapError>;
}

pub struct JupiterClient {
    http: Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SwapApi for JupiterClient {
    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<JupiterQuote, SwapError> {
        let params = [
            ("inputMint", input_mint.to_string()),
            ("outputMint", output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", slippage_bps.to_string()),
            ("onlyDirectRoutes", "true".to_string()),
        ];

        let response = self
            .http
            .get(format!("{}/quote", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|err| SwapError::QuoteUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SwapError::QuoteUnavailable(format!(
                "HTTP {} for {}/{}",
                response.status(),
                input_mint,
                output_mint
            )));
        }

        let quote: JupiterQuote = response.json().await.map_err(|err| {
            SwapError::QuoteUnavailable(format!("malformed quote response: {err}"))
        })?;

        debug!(
            "quoted {} {} -> {} {}",
            quote.in_amount, quote.input_mint, quote.out_amount, quote.output_mint
        );
        Ok(quote)
    }

    async fn build_swap_transaction(
        &self,
        user_public_key: &str,
        quote: &JupiterQuote,
    ) -> Result<String, SwapError> {
        let payload = JupiterSwapRequest {
            user_public_key,
            wrap_and_unwrap_sol: true,
            use_shared_accounts: true,
            quote_response: quote,
        };

        let response = self
            .http
            .post(format!("{}/swap", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| SwapError::SwapBuildFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SwapError::SwapBuildFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let swap: JupiterSwapResponse = response.json().await.map_err(|err| {
            SwapError::SwapBuildFailed(format!("malformed swap response: {err}"))
        })?;

        Ok(swap.swap_transaction)
    }
}
