//! # Swapbot Server
//!
//! Conversational Solana swap service - an HTTP API server built with Rust,
//! Axum, and Tokio that lets users trade tokens through the Jupiter
//! aggregator from a turn-based chat interface, using custodial wallets held
//! on their behalf.
//!
//! ## Features
//! - Async/await HTTP server using Axum framework
//! - Structured logging with tracing
//! - Health check endpoint for monitoring
//! - Multi-turn buy/sell dialogue with per-user sessions
//! - Jupiter DEX integration for Solana token swaps
//! - Custodial wallet provisioning and balance display
//!
//! ## Architecture
//! The server is organized into modules:
//! - `server`: Core server initialization and wiring
//! - `config`: Environment variable configuration management
//! - `bot`: Dialogue controller, session states, and outbound messaging
//! - `services`: Jupiter adapter, swap engine, and confirmation poller
//! - `wallet`: Custodial key storage and balance lookups
//! - `chain`: Solana RPC gateway
//! - `routes`: HTTP route handlers (health check, turn intake)
//!
//! ## Environment Setup
//! All settings have defaults; override via environment or `.env`:
//! ```bash
//! SOLANA_RPC_URL=... SWAP_SLIPPAGE_BPS=500 cargo run
//! ```
//!
//! ## Health Check
//! Once running, you can verify the server is operational:
//! ```bash
//! curl http://localhost:3000/ping
//! ```

mod bot;
mod chain;
mod config;
mod error;
mod routes;
mod server;
mod services;
mod wallet;

use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

/// Application entry point.
///
/// Initializes the tracing/logging system and starts the HTTP server.
/// This function will run indefinitely until the process is terminated.
#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    dotenv::dotenv().ok();

    // Initialize the tracing subscriber for structured logging
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::fmt
                ::layer()
                .with_target(false) // Don't show module targets for cleaner output
                .compact() // Use compact formatting
        )
        .init();

    // Log application startup
    tracing::info!("🏁 Starting Swapbot Server...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });

    // Start the HTTP server - this will run indefinitely
    server::start().await;
}
