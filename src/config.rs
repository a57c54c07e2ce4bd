//! Configuration module for environment variables and application settings

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;

/// Global application configuration loaded from environment variables
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Solana RPC endpoint configuration
    pub solana: SolanaConfig,

    /// Jupiter aggregator API configuration
    pub jupiter: JupiterConfig,

    /// Swap execution configuration
    pub swap: SwapConfig,

    /// Outbound messaging configuration
    pub messenger: MessengerConfig,

    /// Custodial wallet storage configuration
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
}

#[derive(Debug, Clone)]
pub struct JupiterConfig {
    pub base_url: String,
    /// Per-request timeout for quote and swap-build calls, in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Fixed slippage tolerance carried on every quote request
    pub slippage_bps: u16,
    /// Confirmation deadline per broadcast transaction, in seconds
    pub confirm_timeout_secs: u64,
    /// Sleep between confirmation status queries, in seconds
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MessengerConfig {
    /// Where outbound replies are POSTed; replies are logged when unset
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub users_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },

            solana: SolanaConfig {
                rpc_url: env::var("SOLANA_RPC_URL")
                    .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            },

            jupiter: JupiterConfig {
                base_url: env::var("JUPITER_API_URL")
                    .unwrap_or_else(|_| "https://quote-api.jup.ag/v6".to_string()),
                request_timeout_secs: env::var("JUPITER_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },

            swap: SwapConfig {
                slippage_bps: env::var("SWAP_SLIPPAGE_BPS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
                confirm_timeout_secs: env::var("SWAP_CONFIRM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse()
                    .unwrap_or(90),
                poll_interval_secs: env::var("SWAP_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
            },

            messenger: MessengerConfig {
                webhook_url: env::var("MESSENGER_WEBHOOK_URL").ok(),
            },

            wallet: WalletConfig {
                users_file: env::var("WALLET_USERS_FILE")
                    .unwrap_or_else(|_| "data/users.json".to_string())
                    .into(),
            },
        })
    }
}
