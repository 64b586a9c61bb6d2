// Nanoton amounts
//
// Amounts are carried as u128 nanotons everywhere, decimal strings are only
// used at the edges (configuration and display).

use thiserror::Error;

pub const COIN_DECIMALS: usize = 9;
pub const NANO_PER_TON: u128 = 1_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoinsError {
    #[error("invalid amount '{}'", _0)]
    InvalidAmount(String),
    #[error("too many decimals in '{}', at most {} are allowed", _0, COIN_DECIMALS)]
    TooManyDecimals(String),
    #[error("amount '{}' is too large", _0)]
    Overflow(String),
}

// Convert a decimal TON amount ("0.05", "12", "1.5") into nanotons
pub fn to_nano(value: &str) -> Result<u128, CoinsError> {
    let value = value.trim();
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(CoinsError::InvalidAmount(value.to_owned()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(CoinsError::InvalidAmount(value.to_owned()));
    }
    if frac_part.len() > COIN_DECIMALS {
        return Err(CoinsError::TooManyDecimals(value.to_owned()));
    }

    let int_value = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<u128>()
            .map_err(|_| CoinsError::Overflow(value.to_owned()))?
    };
    let frac_value = format!("{:0<width$}", frac_part, width = COIN_DECIMALS)
        .parse::<u128>()
        .map_err(|_| CoinsError::InvalidAmount(value.to_owned()))?;

    int_value
        .checked_mul(NANO_PER_TON)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| CoinsError::Overflow(value.to_owned()))
}

// Format nanotons as a TON decimal string without trailing zeros
pub fn format_ton(nano: u128) -> String {
    let int_part = nano / NANO_PER_TON;
    let frac_part = nano % NANO_PER_TON;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{:0>width$}", frac_part, width = COIN_DECIMALS);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

// Signed variant used for get-method results
pub fn format_ton_signed(nano: i128) -> String {
    if nano < 0 {
        format!("-{}", format_ton(nano.unsigned_abs()))
    } else {
        format_ton(nano as u128)
    }
}
