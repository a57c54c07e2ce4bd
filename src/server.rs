//! # Server Module
//!
//! HTTP server setup and route configuration for the Swapbot server.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::{get, post}};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::bot::{DialogueController, Messenger, WebhookMessenger};
use crate::chain::{ChainGateway, SolanaRpcGateway};
use crate::config::CONFIG;
use crate::routes::health::ping;
use crate::routes::turn::submit_turn;
use crate::services::jupiter::{JupiterClient, SwapApi};
use crate::services::swap_engine::{SwapEngine, SwapExecutor};
use crate::services::TxConfirmer;
use crate::wallet::{BalanceProvider, FileWalletStore, RpcBalanceProvider, WalletProvider};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<DialogueController>,
}

/// Starts the Swapbot HTTP server.
///
/// Wires the wallet store, RPC gateway, Jupiter adapter, swap engine, and
/// dialogue controller together, then serves the turn intake and health
/// endpoints until the process is terminated.
pub async fn start() {
    let config = &*CONFIG;

    let wallets: Arc<dyn WalletProvider> = match FileWalletStore::load(&config.wallet.users_file) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!("Failed to open wallet store: {:#}", err);
            panic!("Cannot start server without the wallet store");
        }
    };

    let rpc = Arc::new(RpcClient::new_with_commitment(
        config.solana.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    ));
    let chain: Arc<dyn ChainGateway> = Arc::new(SolanaRpcGateway::new(Arc::clone(&rpc)));
    let balances: Arc<dyn BalanceProvider> =
        Arc::new(RpcBalanceProvider::new(rpc, Arc::clone(&wallets)));

    let api: Arc<dyn SwapApi> = Arc::new(JupiterClient::new(
        config.jupiter.base_url.clone(),
        Duration::from_secs(config.jupiter.request_timeout_secs),
    ));
    let confirmer = TxConfirmer::new(
        Arc::clone(&chain),
        Duration::from_secs(config.swap.confirm_timeout_secs),
        Duration::from_secs(config.swap.poll_interval_secs),
    );
    let engine: Arc<dyn SwapExecutor> = Arc::new(SwapEngine::new(
        api,
        chain,
        Arc::clone(&wallets),
        Arc::clone(&balances),
        confirmer,
    ));

    let messenger: Arc<dyn Messenger> =
        Arc::new(WebhookMessenger::new(config.messenger.webhook_url.clone()));

    let controller = Arc::new(DialogueController::new(
        engine,
        messenger,
        wallets,
        balances,
        config.swap.slippage_bps,
    ));

    let app_state = Arc::new(AppState { controller });

    let app = Router::new()
        .route("/ping", get(ping)) // Health check endpoint
        .route("/api/v1/turn", post(submit_turn))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", addr, err);
            panic!("Cannot start server");
        }
    };

    tracing::info!("🚀 Listening on http://{}", addr);
    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
