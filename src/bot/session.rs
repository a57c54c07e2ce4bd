//! Per-user conversation state.
//!
//! Each flow step is a variant carrying exactly the data collected so far,
//! so a half-filled trade cannot be observed: the fields for a state exist
//! only while the session is in that state.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn label(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// How much to trade: SOL in major units for a buy, a percentage of the
/// token balance for a sell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAmount {
    Sol(f64),
    Percent(u8),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Idle,
    AwaitingTokenAddress {
        side: TradeSide,
    },
    AwaitingAmount {
        side: TradeSide,
        token_mint: String,
    },
    AwaitingConfirmation {
        side: TradeSide,
        token_mint: String,
        amount: TradeAmount,
        /// Quoted output in the output asset's smallest unit
        quoted_out: u64,
        out_decimals: u8,
    },
}

#[derive(Debug)]
pub struct ConversationSession {
    pub state: DialogState,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            state: DialogState::Idle,
            created_at: Utc::now(),
        }
    }

    /// Begin a fresh trade flow, replacing whatever was active.
    pub fn start_flow(&mut self, side: TradeSide) {
        self.state = DialogState::AwaitingTokenAddress { side };
        self.created_at = Utc::now();
    }

    pub fn reset(&mut self) {
        self.state = DialogState::Idle;
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_returns_every_state_to_idle() {
        let states = [
            DialogState::Idle,
            DialogState::AwaitingTokenAddress { side: TradeSide::Buy },
            DialogState::AwaitingAmount {
                side: TradeSide::Sell,
                token_mint: "mint".to_string(),
            },
            DialogState::AwaitingConfirmation {
                side: TradeSide::Buy,
                token_mint: "mint".to_string(),
                amount: TradeAmount::Sol(1.0),
                quoted_out: 5,
                out_decimals: 6,
            },
        ];

        for state in states {
            let mut session = ConversationSession::new();
            session.state = state;
            session.reset();
            assert_eq!(session.state, DialogState::Idle);
        }
    }

    #[test]
    fn starting_a_flow_replaces_the_active_one() {
        let mut session = ConversationSession::new();
        session.state = DialogState::AwaitingConfirmation {
            side: TradeSide::Buy,
            token_mint: "mint".to_string(),
            amount: TradeAmount::Sol(2.0),
            quoted_out: 9,
            out_decimals: 6,
        };

        session.start_flow(TradeSide::Sell);
        assert_eq!(
            session.state,
            DialogState::AwaitingTokenAddress { side: TradeSide::Sell }
        );
    }
}
