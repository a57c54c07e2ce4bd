//! User-input validation for the trade flows.
//!
//! Failures here are recovered locally with a re-prompt; they never reach
//! the engine's error taxonomy.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Standard rendered length of a Solana mint address.
pub const TOKEN_ADDRESS_LEN: usize = 44;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid token address")]
    InvalidTokenAddress,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("percentage must be between 1 and 100")]
    PercentageOutOfRange,
}

/// Syntactic mint check: fixed rendered length and base58 decodability.
pub fn parse_token_address(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.len() != TOKEN_ADDRESS_LEN {
        return Err(ValidationError::InvalidTokenAddress);
    }
    Pubkey::from_str(trimmed).map_err(|_| ValidationError::InvalidTokenAddress)?;
    Ok(trimmed.to_string())
}

/// Positive decimal SOL amount in major units.
pub fn parse_sol_amount(input: &str) -> Result<f64, ValidationError> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount)?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}

/// Whole percentage of a balance, 1-100 inclusive.
pub fn parse_percentage(input: &str) -> Result<u8, ValidationError> {
    let percentage: u32 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount)?;
    if !(1..=100).contains(&percentage) {
        return Err(ValidationError::PercentageOutOfRange);
    }
    Ok(percentage as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn well_formed_mint_is_accepted() {
        assert_eq!(
            parse_token_address(&format!("  {USDC_MINT} ")),
            Ok(USDC_MINT.to_string())
        );
    }

    #[test]
    fn wrong_length_mint_is_rejected() {
        assert_eq!(
            parse_token_address("abc"),
            Err(ValidationError::InvalidTokenAddress)
        );
        assert_eq!(
            parse_token_address(&format!("{USDC_MINT}A")),
            Err(ValidationError::InvalidTokenAddress)
        );
        // 43 characters, valid base58, still rejected by the length rule.
        assert_eq!(
            parse_token_address("So11111111111111111111111111111111111111112"),
            Err(ValidationError::InvalidTokenAddress)
        );
    }

    #[test]
    fn non_base58_mint_is_rejected() {
        // Right length, but 0, O, I, and l are not base58.
        assert_eq!(
            parse_token_address("0OIl000000000000000000000000000000000000000l"),
            Err(ValidationError::InvalidTokenAddress)
        );
    }

    #[test]
    fn sol_amount_must_be_a_positive_decimal() {
        assert_eq!(parse_sol_amount("1.5"), Ok(1.5));
        assert_eq!(parse_sol_amount(" 0.25 "), Ok(0.25));
        assert_eq!(parse_sol_amount("0"), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_sol_amount("-1"), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_sol_amount("NaN"), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_sol_amount("much"), Err(ValidationError::InvalidAmount));
    }

    #[test]
    fn percentage_must_be_whole_and_in_range() {
        assert_eq!(parse_percentage("1"), Ok(1));
        assert_eq!(parse_percentage("100"), Ok(100));
        assert_eq!(parse_percentage("0"), Err(ValidationError::PercentageOutOfRange));
        assert_eq!(parse_percentage("101"), Err(ValidationError::PercentageOutOfRange));
        assert_eq!(parse_percentage("500"), Err(ValidationError::PercentageOutOfRange));
        assert_eq!(parse_percentage("50.5"), Err(ValidationError::InvalidAmount));
        assert_eq!(parse_percentage("half"), Err(ValidationError::InvalidAmount));
    }
}
