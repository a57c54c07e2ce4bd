//! Dialogue controller.
//!
//! Maps each incoming user turn onto the current conversation state,
//! collects and validates trade parameters across turns, and drives the
//! swap engine on confirmation. One session per user id; a user's turns
//! are serialized by a per-session mutex while different users proceed
//! concurrently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bot::messenger::{Keyboard, Messenger};
use crate::bot::session::{ConversationSession, DialogState, TradeAmount, TradeSide};
use crate::bot::validate;
use crate::services::swap_engine::{ExecutionResult, SwapExecutor};
use crate::wallet::{BalanceProvider, WalletProvider};

const SOL_DECIMALS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Buy,
    Sell,
    Balance,
    CreateWallet,
    Back,
    Confirm,
}

fn parse_command(text: &str) -> Option<Command> {
    match text.trim().to_lowercase().as_str() {
        "/start" | "start" => Some(Command::Start),
        "/buy" | "buy" | "🟢 buy" => Some(Command::Buy),
        "/sell" | "sell" | "🔴 sell" => Some(Command::Sell),
        "/balance" | "balance" | "💰 balance" => Some(Command::Balance),
        "/wallet" | "create wallet" | "🔑 create wallet" => Some(Command::CreateWallet),
        "/back" | "back" | "cancel" | "◀️ back" => Some(Command::Back),
        "/confirm" | "confirm" | "✅ confirm" => Some(Command::Confirm),
        _ => None,
    }
}

pub struct DialogueController {
    engine: Arc<dyn SwapExecutor>,
    messenger: Arc<dyn Messenger>,
    wallets: Arc<dyn WalletProvider>,
    balances: Arc<dyn BalanceProvider>,
    sessions: DashMap<u64, Arc<Mutex<ConversationSession>>>,
    slippage_bps: u16,
}

impl DialogueController {
    pub fn new(
        engine: Arc<dyn SwapExecutor>,
        messenger: Arc<dyn Messenger>,
        wallets: Arc<dyn WalletProvider>,
        balances: Arc<dyn BalanceProvider>,
        slippage_bps: u16,
    ) -> Self {
        Self {
            engine,
            messenger,
            wallets,
            balances,
            sessions: DashMap::new(),
            slippage_bps,
        }
    }

    /// Process one `(user, text)` turn to completion: state transition,
    /// engine calls, and replies. Turns from the same user queue on the
    /// session mutex and run in arrival order.
    pub async fn handle_turn(&self, user_id: u64, text: &str) {
        let session = self.session(user_id);
        let mut session = session.lock().await;

        match parse_command(text) {
            Some(Command::Back) => {
                session.reset();
                self.say(user_id, "Cancelled.", Some(Keyboard::main_menu())).await;
            }
            Some(Command::Buy) => self.start_flow(user_id, &mut session, TradeSide::Buy).await,
            Some(Command::Sell) => self.start_flow(user_id, &mut session, TradeSide::Sell).await,
            Some(Command::Start) => self.handle_start(user_id).await,
            Some(Command::Balance) => self.handle_balance(user_id).await,
            Some(Command::CreateWallet) => self.handle_create_wallet(user_id).await,
            Some(Command::Confirm) | None => self.advance_flow(user_id, &mut session, text).await,
        }
    }

    fn session(&self, user_id: u64) -> Arc<Mutex<ConversationSession>> {
        self.sessions.entry(user_id).or_default().clone()
    }

    async fn start_flow(&self, user_id: u64, session: &mut ConversationSession, side: TradeSide) {
        if session.state != DialogState::Idle {
            debug!(
                "user {} abandoned a flow open since {}",
                user_id, session.created_at
            );
        }
        session.start_flow(side);
        info!("user {} started a {} flow", user_id, side.label());

        let prompt = match side {
            TradeSide::Buy => "Send the mint address of the token you want to buy.",
            TradeSide::Sell => "Send the mint address of the token you want to sell.",
        };
        self.say(user_id, prompt, None).await;
    }

    async fn advance_flow(&self, user_id: u64, session: &mut ConversationSession, text: &str) {
        match session.state.clone() {
            DialogState::Idle => {
                self.say(
                    user_id,
                    "Choose an action from the menu.",
                    Some(Keyboard::main_menu()),
                )
                .await;
            }

            DialogState::AwaitingTokenAddress { side } => {
                match validate::parse_token_address(text) {
                    Ok(token_mint) => {
                        session.state = DialogState::AwaitingAmount { side, token_mint };
                        let prompt = match side {
                            TradeSide::Buy => "How much SOL do you want to spend? E.g. 0.5",
                            TradeSide::Sell => {
                                "What percentage of your balance do you want to sell? 1-100"
                            }
                        };
                        self.say(user_id, prompt, None).await;
                    }
                    Err(_) => {
                        self.say(
                            user_id,
                            "Invalid token address. Send a 44-character mint address.",
                            None,
                        )
                        .await;
                    }
                }
            }

            DialogState::AwaitingAmount { side, token_mint } => {
                self.collect_amount(user_id, session, side, token_mint, text).await;
            }

            DialogState::AwaitingConfirmation {
                side, token_mint, amount, ..
            } => {
                if parse_command(text) == Some(Command::Confirm) {
                    self.execute_trade(user_id, session, side, &token_mint, amount).await;
                } else {
                    self.say(
                        user_id,
                        "Press ✅ Confirm to execute the swap, or ◀️ Back to cancel.",
                        Some(Keyboard::confirm_menu()),
                    )
                    .await;
                }
            }
        }
    }

    /// Parse the amount turn, fetch a dry-run quote, and move to the
    /// confirmation step. A quoting failure cancels the flow rather than
    /// leaving the session stuck.
    async fn collect_amount(
        &self,
        user_id: u64,
        session: &mut ConversationSession,
        side: TradeSide,
        token_mint: String,
        text: &str,
    ) {
        let amount = match side {
            TradeSide::Buy => match validate::parse_sol_amount(text) {
                Ok(sol) => TradeAmount::Sol(sol),
                Err(_) => {
                    self.say(user_id, "Enter a positive SOL amount, e.g. 0.5.", None).await;
                    return;
                }
            },
            TradeSide::Sell => match validate::parse_percentage(text) {
                Ok(percent) => TradeAmount::Percent(percent),
                Err(_) => {
                    self.say(user_id, "Enter a whole percentage between 1 and 100.", None).await;
                    return;
                }
            },
        };

        let estimate = match amount {
            TradeAmount::Sol(sol) => {
                self.engine
                    .estimate_buy(user_id, &token_mint, sol, self.slippage_bps)
                    .await
            }
            TradeAmount::Percent(percent) => {
                self.engine
                    .estimate_sell(user_id, &token_mint, percent, self.slippage_bps)
                    .await
            }
        };

        match estimate {
            Ok(estimate) => {
                let summary = match side {
                    TradeSide::Buy => format!(
                        "You will receive approximately {} tokens.\nConfirm the buy?",
                        format_amount(estimate.out_amount, estimate.out_decimals)
                    ),
                    TradeSide::Sell => format!(
                        "You will receive approximately {} SOL.\nConfirm the sell?",
                        format_amount(estimate.out_amount, estimate.out_decimals)
                    ),
                };
                session.state = DialogState::AwaitingConfirmation {
                    side,
                    token_mint,
                    amount,
                    quoted_out: estimate.out_amount,
                    out_decimals: estimate.out_decimals,
                };
                self.say(user_id, &summary, Some(Keyboard::confirm_menu())).await;
            }
            Err(err) => {
                warn!("quote for user {} failed: {}", user_id, err);
                session.reset();
                self.say(
                    user_id,
                    &format!("Could not fetch a quote: {err}. The trade was cancelled."),
                    Some(Keyboard::main_menu()),
                )
                .await;
            }
        }
    }

    /// Run the full swap and report the outcome. Whatever happens, the
    /// session ends up back at `Idle`.
    async fn execute_trade(
        &self,
        user_id: u64,
        session: &mut ConversationSession,
        side: TradeSide,
        token_mint: &str,
        amount: TradeAmount,
    ) {
        self.say(user_id, "Executing swap...", None).await;

        let result = match amount {
            TradeAmount::Sol(sol) => {
                self.engine
                    .buy(user_id, token_mint, sol, self.slippage_bps)
                    .await
            }
            TradeAmount::Percent(percent) => {
                self.engine
                    .sell(user_id, token_mint, percent, self.slippage_bps)
                    .await
            }
        };

        let reply = match result {
            Ok(ExecutionResult {
                success: true,
                tx_signature: Some(signature),
            }) => format!("✅ Swap confirmed.\nSignature:\n`{signature}`"),
            Ok(ExecutionResult {
                success: true,
                tx_signature: None,
            }) => "✅ Swap confirmed.".to_string(),
            Ok(ExecutionResult {
                success: false,
                tx_signature: Some(signature),
            }) => format!(
                "⏳ The swap was sent but not finalized before the deadline.\n\
                 Check it later:\n`{signature}`"
            ),
            Ok(ExecutionResult {
                success: false,
                tx_signature: None,
            }) => "❌ The swap was not executed.".to_string(),
            Err(err) => {
                warn!("{} swap for user {} failed: {}", side.label(), user_id, err);
                format!("❌ Swap failed: {err}")
            }
        };

        session.reset();
        self.say(user_id, &reply, Some(Keyboard::main_menu())).await;
    }

    async fn handle_start(&self, user_id: u64) {
        match self.wallets.address(user_id).await {
            Ok(Some(address)) => {
                info!("user {} started the bot with an existing wallet", user_id);
                self.say(
                    user_id,
                    &format!("Welcome back! Your public address:\n`{address}`"),
                    Some(Keyboard::main_menu()),
                )
                .await;
            }
            Ok(None) => {
                info!("user {} started the bot with no wallet", user_id);
                self.say(
                    user_id,
                    "No wallet found. Press 🔑 Create wallet to set one up.",
                    Some(Keyboard::main_menu()),
                )
                .await;
            }
            Err(err) => {
                error!("wallet lookup for user {} failed: {:#}", user_id, err);
                self.say(user_id, "Could not load your wallet. Please try again.", None).await;
            }
        }
    }

    async fn handle_create_wallet(&self, user_id: u64) {
        match self.wallets.ensure_wallet(user_id).await {
            Ok(address) => {
                self.say(
                    user_id,
                    &format!("Your wallet is ready.\nPublic address:\n`{address}`"),
                    Some(Keyboard::main_menu()),
                )
                .await;
            }
            Err(err) => {
                error!("wallet creation for user {} failed: {:#}", user_id, err);
                self.say(user_id, "Could not create a wallet. Please try again.", None).await;
            }
        }
    }

    async fn handle_balance(&self, user_id: u64) {
        let address = match self.wallets.address(user_id).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                self.say(
                    user_id,
                    "No wallet found. Create one first from the menu.",
                    Some(Keyboard::main_menu()),
                )
                .await;
                return;
            }
            Err(err) => {
                error!("wallet lookup for user {} failed: {:#}", user_id, err);
                self.say(user_id, "Could not load your wallet. Please try again.", None).await;
                return;
            }
        };

        match self.balances.native_balance(user_id).await {
            Ok(lamports) => {
                self.say(
                    user_id,
                    &format!(
                        "Your balances:\n\nSOL: {}\n`{address}`",
                        format_amount(lamports, SOL_DECIMALS)
                    ),
                    Some(Keyboard::main_menu()),
                )
                .await;
            }
            Err(err) => {
                error!("balance lookup for user {} failed: {:#}", user_id, err);
                self.say(user_id, "Could not fetch your balance. Please try again.", None).await;
            }
        }
    }

    /// Best-effort delivery; a transport failure must not wedge the turn.
    async fn say(&self, user_id: u64, text: &str, keyboard: Option<Keyboard>) {
        if let Err(err) = self.messenger.send_message(user_id, text, keyboard).await {
            error!("failed to deliver reply to user {}: {:#}", user_id, err);
        }
    }

    #[cfg(test)]
    async fn state_of(&self, user_id: u64) -> DialogState {
        self.session(user_id).lock().await.state.clone()
    }
}

/// Render a minor-unit amount with the given display decimals, trimming
/// trailing zeros.
fn format_amount(minor: u64, decimals: u8) -> String {
    if decimals == 0 {
        return minor.to_string();
    }
    let scale = 10u128.pow(u32::from(decimals));
    let whole = u128::from(minor) / scale;
    let frac = u128::from(minor) % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = usize::from(decimals));
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
