// # Routes Module
//
// - This module contains all HTTP route handlers for the Swapbot Server.
// - Routes are organized by functionality into separate submodules.

/// Health check and monitoring endpoints
pub mod health;

/// Conversation turn intake endpoint
pub mod turn;
