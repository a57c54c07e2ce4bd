//! # Services Module
//!
//! Business logic services: the Jupiter quote/swap API adapter, the swap
//! execution engine, and the transaction confirmation poller.

pub mod confirmer;
pub mod jupiter;
pub mod swap_engine;

pub use confirmer::TxConfirmer;
pub use jupiter::{JupiterClient, SwapApi};
pub use swap_engine::{SwapEngine, SwapExecutor};
