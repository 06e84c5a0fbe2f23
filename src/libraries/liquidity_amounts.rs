use ethnum::U256;
use std::cmp::min;

use super::{
    constants::Q64,
    full_math::{mul_div, mul_div_rounding_up},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityAmountsError {
    #[error("liquidity amount overflow")]
    Overflow,
    #[error("invalid price range")]
    InvalidPrice,
}

fn sorted(sqrt_price_a_x64: U256, sqrt_price_b_x64: U256) -> (U256, U256) {
    if sqrt_price_a_x64 > sqrt_price_b_x64 {
        (sqrt_price_b_x64, sqrt_price_a_x64)
    } else {
        (sqrt_price_a_x64, sqrt_price_b_x64)
    }
}

/// Computes the amount of liquidity received for a given amount of token0 and price range.
/// amount0 * (sqrt(upper) * sqrt(lower)) / (sqrt(upper) - sqrt(lower)), rounded down.
pub fn get_liquidity_for_amount0(
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    amount0: U256,
) -> Result<u128, LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }

    let intermediate =
        mul_div(lower, upper, *Q64).map_err(|_| LiquidityAmountsError::Overflow)?;
    let liquidity =
        mul_div(amount0, intermediate, upper - lower).map_err(|_| LiquidityAmountsError::Overflow)?;

    u128::try_from(liquidity).map_err(|_| LiquidityAmountsError::Overflow)
}

/// Computes the amount of liquidity received for a given amount of token1 and price range.
/// amount1 / (sqrt(upper) - sqrt(lower)), rounded down.
pub fn get_liquidity_for_amount1(
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    amount1: U256,
) -> Result<u128, LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }

    let liquidity =
        mul_div(amount1, *Q64, upper - lower).map_err(|_| LiquidityAmountsError::Overflow)?;

    u128::try_from(liquidity).map_err(|_| LiquidityAmountsError::Overflow)
}

/// Computes the maximum liquidity that can be minted for a given pair of desired amounts,
/// the current pool price, and the prices at the position's tick boundaries. Rounds down.
pub fn get_liquidity_for_amounts(
    sqrt_price_x64: U256,
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }

    let liquidity = if sqrt_price_x64 <= lower {
        get_liquidity_for_amount0(lower, upper, amount0)?
    } else if sqrt_price_x64 < upper {
        let liquidity0 = get_liquidity_for_amount0(sqrt_price_x64, upper, amount0)?;
        let liquidity1 = get_liquidity_for_amount1(lower, sqrt_price_x64, amount1)?;
        min(liquidity0, liquidity1)
    } else {
        get_liquidity_for_amount1(lower, upper, amount1)?
    };

    Ok(liquidity)
}

/// Computes the amount of token0 owed for a given liquidity and price range, rounded up.
pub fn get_amount0_for_liquidity(
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    liquidity: u128,
) -> Result<U256, LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }
    let numerator1 = U256::from(liquidity) << 64;
    let numerator2 = upper - lower;

    let intermediate =
        mul_div_rounding_up(numerator1, numerator2, upper).map_err(|_| LiquidityAmountsError::Overflow)?;
    Ok(intermediate / lower + if intermediate % lower != U256::ZERO { U256::ONE } else { U256::ZERO })
}

/// Computes the amount of token1 owed for a given liquidity and price range, rounded up.
pub fn get_amount1_for_liquidity(
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    liquidity: u128,
) -> Result<U256, LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }
    mul_div_rounding_up(U256::from(liquidity), upper - lower, *Q64)
        .map_err(|_| LiquidityAmountsError::Overflow)
}

/// Computes the actual (used0, used1) consumed when minting `liquidity` at the current price,
/// rounded up so the position never under-collateralizes.
pub fn get_amounts_for_liquidity(
    sqrt_price_x64: U256,
    sqrt_price_a_x64: U256,
    sqrt_price_b_x64: U256,
    liquidity: u128,
) -> Result<(U256, U256), LiquidityAmountsError> {
    let (lower, upper) = sorted(sqrt_price_a_x64, sqrt_price_b_x64);
    if lower == upper {
        return Err(LiquidityAmountsError::InvalidPrice);
    }

    if sqrt_price_x64 <= lower {
        Ok((get_amount0_for_liquidity(lower, upper, liquidity)?, U256::ZERO))
    } else if sqrt_price_x64 < upper {
        let amount0 = get_amount0_for_liquidity(sqrt_price_x64, upper, liquidity)?;
        let amount1 = get_amount1_for_liquidity(lower, sqrt_price_x64, liquidity)?;
        Ok((amount0, amount1))
    } else {
        Ok((U256::ZERO, get_amount1_for_liquidity(lower, upper, liquidity)?))
    }
}
