pub mod types;

use ethnum::U256;

use crate::event_source::SwapEvent;
use crate::libraries::constants::{Q128, Q64};
use crate::libraries::full_math::{mul_div, FullMathError};

pub use types::{PoolConfig, PoolState, Quote};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("fee-growth math: {0}")]
    FullMath(#[from] FullMathError),
    #[error("tick spacing must be a positive integer")]
    InvalidTickSpacing,
}

/// Stateful AMM model. Mutated only through `ingest`; everything else is a
/// read.
pub struct Pool {
    config: PoolConfig,
    state: PoolState,
}

impl Pool {
    pub fn new(config: PoolConfig, seed: PoolState) -> Result<Self, PoolError> {
        if config.tick_spacing <= 0 {
            return Err(PoolError::InvalidTickSpacing);
        }
        Ok(Self { config, state: seed })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// `(sqrt_price_x64 / 2^64)^2 * 10^(decimals0 - decimals1)`, expressed in
    /// token1 per token0.
    pub fn price(&self) -> f64 {
        let sqrt_price = self.state.sqrt_price_x64.as_u128() as f64 / (1u128 << 64) as f64;
        let base = sqrt_price * sqrt_price;
        base * 10f64.powi(self.config.decimals0 as i32 - self.config.decimals1 as i32)
    }

    /// Advances the pool by exactly one normalized swap. Must be called once
    /// per event, in event order.
    pub fn ingest(&mut self, event: &SwapEvent) -> Result<(), PoolError> {
        if self.state.liquidity_active > 0 && event.sqrt_price_before_x64 != self.state.sqrt_price_x64 {
            tracing::warn!(
                pool_id = %self.config.pool_id,
                expected = %self.state.sqrt_price_x64,
                got = %event.sqrt_price_before_x64,
                "sqrt_price_before mismatch, snapping pool state forward"
            );
        }

        if self.state.liquidity_active > 0 {
            let net_fee = saturating_sub(event.fee_amount, event.protocol_fee);
            let growth = mul_div(net_fee, *Q128, U256::from(self.state.liquidity_active))?;
            if event.zero_for_one {
                self.state.fee_growth_global_0 = self.state.fee_growth_global_0.wrapping_add(growth);
            } else {
                self.state.fee_growth_global_1 = self.state.fee_growth_global_1.wrapping_add(growth);
            }
        }

        self.state.sqrt_price_x64 = event.sqrt_price_after_x64;
        self.state.tick_current = event.tick;
        self.state.liquidity_active = event.liquidity;
        self.state.timestamp_ms = event.timestamp_ms;

        Ok(())
    }

    /// Flat-price quote against the current tick; does not simulate tick
    /// crossings. See the module-level notes on `Quote::price_impact_ppm`.
    pub fn estimate(&self, amount_in: U256, zero_for_one: bool) -> Result<Quote, PoolError> {
        let fee = mul_div_round_up_ppm(amount_in, self.config.fee_rate_ppm)?;
        let effective_in = saturating_sub(amount_in, fee);

        let sqrt_price = self.state.sqrt_price_x64;
        let amount_out = if zero_for_one {
            // token0 in: dy = effective_in * (sqrt_price/2^64)^2, applied as
            // two rounds of mul_div to stay within 256 bits.
            let scaled = mul_div(effective_in, sqrt_price, *Q64)?;
            mul_div(scaled, sqrt_price, *Q64)?
        } else {
            // token1 in: dx = effective_in / (sqrt_price/2^64)^2.
            let scaled = mul_div(effective_in, *Q64, sqrt_price)?;
            mul_div(scaled, *Q64, sqrt_price)?
        };

        Ok(Quote {
            amount_out,
            fee,
            price_impact_ppm: self.config.fee_rate_ppm as u64,
        })
    }
}

fn saturating_sub(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        U256::ZERO
    }
}

fn mul_div_round_up_ppm(amount_in: U256, fee_rate_ppm: u32) -> Result<U256, FullMathError> {
    crate::libraries::full_math::mul_div_rounding_up(amount_in, U256::from(fee_rate_ppm), U256::from(1_000_000u32))
}
