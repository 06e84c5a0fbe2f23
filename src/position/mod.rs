pub mod types;

use std::collections::BTreeMap;

use ethnum::U256;

pub use types::{ActionOutcome, CloseResult, Cost, OpenResult, Position, PositionStatus, Totals, Wallet};

use crate::libraries::constants::Q128;
use crate::libraries::full_math::{mul_div, FullMathError};
use crate::libraries::liquidity_amounts::{
    get_amounts_for_liquidity, get_liquidity_for_amounts, LiquidityAmountsError,
};
use crate::libraries::liquidity_math::add_delta;
use crate::libraries::tick_math::TickMath;
use crate::pool::Pool;

#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("position {0} not found")]
    NotFound(u64),
    #[error("position {0} is already closed")]
    AlreadyClosed(u64),
    #[error("liquidity math: {0}")]
    LiquidityMath(#[from] LiquidityAmountsError),
    #[error("fee-growth math: {0}")]
    FullMath(#[from] FullMathError),
    #[error("token accounting overflow")]
    Overflow,
}

/// Owns the wallet and every virtual position ever opened. Positions are
/// retained after closing for reporting; only `Open` positions receive fee
/// attribution.
pub struct PositionManager {
    wallet: Wallet,
    positions: BTreeMap<u64, Position>,
    next_id: u64,
    simulate_errors_remaining: u32,
}

fn checked_add(a: U256, b: U256) -> Result<U256, PositionError> {
    a.checked_add(b).ok_or(PositionError::Overflow)
}

/// Value given up to the price-implied exchange ratio between what was
/// desired and what the current price could actually consume, in ppm of the
/// desired value (both legs priced in token1 via `pool.price()`).
fn slippage_ppm(pool: &Pool, desired0: U256, desired1: U256, used0: U256, used1: U256) -> u64 {
    let price = pool.price();
    let desired_value = desired0.as_u128() as f64 * price + desired1.as_u128() as f64;
    if desired_value <= 0.0 {
        return 0;
    }
    let used_value = used0.as_u128() as f64 * price + used1.as_u128() as f64;
    let given_up = (desired_value - used_value).max(0.0);
    ((given_up / desired_value) * 1_000_000.0).round() as u64
}

impl PositionManager {
    pub fn new(invest0: U256, invest1: U256, simulate_errors: u32) -> Self {
        Self {
            wallet: Wallet::new(invest0, invest1),
            positions: BTreeMap::new(),
            next_id: 0,
            simulate_errors_remaining: simulate_errors,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn position(&self, id: u64) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// `fg_inside` as defined in the piecewise approximation: the full
    /// global delta while in range, held flat at the last snapshot while
    /// out of range so the subsequent delta computes to zero.
    fn fee_growth_inside_current(pool: &Pool, position: &Position) -> (U256, U256) {
        if position.in_range(pool.state().tick_current) {
            (pool.state().fee_growth_global_0, pool.state().fee_growth_global_1)
        } else {
            (position.fee_growth_inside_0_last, position.fee_growth_inside_1_last)
        }
    }

    fn accrue_fees(pool: &Pool, position: &mut Position) -> Result<(), PositionError> {
        let (cur0, cur1) = Self::fee_growth_inside_current(pool, position);
        let delta0 = cur0.wrapping_sub(position.fee_growth_inside_0_last);
        let delta1 = cur1.wrapping_sub(position.fee_growth_inside_1_last);

        let owed0 = mul_div(delta0, U256::from(position.liquidity), *Q128)?;
        let owed1 = mul_div(delta1, U256::from(position.liquidity), *Q128)?;

        position.tokens_owed_0 = checked_add(position.tokens_owed_0, owed0)?;
        position.tokens_owed_1 = checked_add(position.tokens_owed_1, owed1)?;
        position.fee_growth_inside_0_last = cur0;
        position.fee_growth_inside_1_last = cur1;
        Ok(())
    }

    /// Called by the Engine once per ingested swap, after `Pool::ingest`.
    pub fn update_all_position_fees(&mut self, pool: &Pool) -> Result<(), PositionError> {
        for position in self.positions.values_mut() {
            if position.status == PositionStatus::Open {
                Self::accrue_fees(pool, position)?;
            }
        }
        Ok(())
    }

    fn tick_alignment_ok(tick: i32, spacing: i32) -> bool {
        tick % spacing == 0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        pool: &Pool,
        tick_lower: i32,
        tick_upper: i32,
        desired0: U256,
        desired1: U256,
        cost: Option<Cost>,
        now_ms: u64,
    ) -> Result<ActionOutcome<OpenResult>, PositionError> {
        if self.simulate_errors_remaining > 0 {
            self.simulate_errors_remaining -= 1;
            return Ok(ActionOutcome::failure("simulated open failure"));
        }

        let spacing = pool.config().tick_spacing;
        if tick_lower >= tick_upper
            || !Self::tick_alignment_ok(tick_lower, spacing)
            || !Self::tick_alignment_ok(tick_upper, spacing)
        {
            return Ok(ActionOutcome::failure("ticks must be spacing-aligned with lower < upper"));
        }

        let cost_a = cost.as_ref().and_then(|c| c.token_a).unwrap_or(U256::ZERO);
        let cost_b = cost.as_ref().and_then(|c| c.token_b).unwrap_or(U256::ZERO);
        let required0 = checked_add(desired0, cost_a)?;
        let required1 = checked_add(desired1, cost_b)?;
        if self.wallet.cash0 < required0 || self.wallet.cash1 < required1 {
            return Ok(ActionOutcome::failure("insufficient wallet balance"));
        }

        let sqrt_lower = TickMath::get_sqrt_ratio_at_tick(tick_lower);
        let sqrt_upper = TickMath::get_sqrt_ratio_at_tick(tick_upper);
        let sqrt_current = pool.state().sqrt_price_x64;

        let liquidity =
            get_liquidity_for_amounts(sqrt_current, sqrt_lower, sqrt_upper, desired0, desired1)?;
        let (used0, used1) = get_amounts_for_liquidity(sqrt_current, sqrt_lower, sqrt_upper, liquidity)?;

        let refund0 = if desired0 > used0 { desired0 - used0 } else { U256::ZERO };
        let refund1 = if desired1 > used1 { desired1 - used1 } else { U256::ZERO };
        let slippage_ppm = slippage_ppm(pool, desired0, desired1, used0, used1);

        // Round-up consumption can overshoot `desired` by a wei; guard the
        // debit instead of trusting the upfront `required` check.
        let debit0 = checked_add(used0, cost_a)?;
        let debit1 = checked_add(used1, cost_b)?;
        self.wallet.cash0 = self.wallet.cash0.checked_sub(debit0).ok_or(PositionError::Overflow)?;
        self.wallet.cash1 = self.wallet.cash1.checked_sub(debit1).ok_or(PositionError::Overflow)?;

        let (fg0, fg1) = if tick_lower <= pool.state().tick_current && pool.state().tick_current < tick_upper {
            (pool.state().fee_growth_global_0, pool.state().fee_growth_global_1)
        } else {
            (U256::ZERO, U256::ZERO)
        };

        let id = self.next_id;
        self.next_id += 1;
        self.positions.insert(
            id,
            Position {
                id,
                tick_lower,
                tick_upper,
                liquidity,
                amount0_principal: used0,
                amount1_principal: used1,
                fee_growth_inside_0_last: fg0,
                fee_growth_inside_1_last: fg1,
                tokens_owed_0: U256::ZERO,
                tokens_owed_1: U256::ZERO,
                created_at: now_ms,
                status: PositionStatus::Open,
            },
        );

        Ok(ActionOutcome::ok(OpenResult {
            position_id: id,
            liquidity,
            used0,
            used1,
            refund0,
            refund1,
            slippage_ppm,
            gas_fee: cost.unwrap_or_default(),
        }))
    }

    /// Adds liquidity to an existing open position. Fees owed up to the
    /// pre-change liquidity are credited before the new liquidity is minted.
    pub fn add(
        &mut self,
        pool: &Pool,
        id: u64,
        desired0: U256,
        desired1: U256,
    ) -> Result<ActionOutcome<OpenResult>, PositionError> {
        if !self.positions.contains_key(&id) {
            return Ok(ActionOutcome::failure(format!("position {id} not found")));
        }
        {
            let position = self.positions.get_mut(&id).unwrap();
            if position.status != PositionStatus::Open {
                return Ok(ActionOutcome::failure(format!("position {id} is closed")));
            }
            Self::accrue_fees(pool, position)?;
        }

        if self.wallet.cash0 < desired0 || self.wallet.cash1 < desired1 {
            return Ok(ActionOutcome::failure("insufficient wallet balance"));
        }

        let position = self.positions.get(&id).unwrap();
        let sqrt_lower = TickMath::get_sqrt_ratio_at_tick(position.tick_lower);
        let sqrt_upper = TickMath::get_sqrt_ratio_at_tick(position.tick_upper);
        let sqrt_current = pool.state().sqrt_price_x64;

        let added_liquidity =
            get_liquidity_for_amounts(sqrt_current, sqrt_lower, sqrt_upper, desired0, desired1)?;
        let (used0, used1) =
            get_amounts_for_liquidity(sqrt_current, sqrt_lower, sqrt_upper, added_liquidity)?;
        let refund0 = if desired0 > used0 { desired0 - used0 } else { U256::ZERO };
        let refund1 = if desired1 > used1 { desired1 - used1 } else { U256::ZERO };
        let slippage_ppm = slippage_ppm(pool, desired0, desired1, used0, used1);

        self.wallet.cash0 = self.wallet.cash0.checked_sub(used0).ok_or(PositionError::Overflow)?;
        self.wallet.cash1 = self.wallet.cash1.checked_sub(used1).ok_or(PositionError::Overflow)?;

        let position = self.positions.get_mut(&id).unwrap();
        position.liquidity =
            add_delta(position.liquidity, added_liquidity as i128).map_err(|_| PositionError::Overflow)?;
        position.amount0_principal = checked_add(position.amount0_principal, used0)?;
        position.amount1_principal = checked_add(position.amount1_principal, used1)?;
        let (fg0, fg1) = Self::fee_growth_inside_current(pool, position);
        position.fee_growth_inside_0_last = fg0;
        position.fee_growth_inside_1_last = fg1;

        Ok(ActionOutcome::ok(OpenResult {
            position_id: id,
            liquidity: added_liquidity,
            used0,
            used1,
            refund0,
            refund1,
            slippage_ppm,
            gas_fee: Cost::default(),
        }))
    }

    pub fn close(
        &mut self,
        pool: &Pool,
        id: u64,
        now_ms: u64,
    ) -> Result<ActionOutcome<CloseResult>, PositionError> {
        let _ = now_ms;
        if !self.positions.contains_key(&id) {
            return Ok(ActionOutcome::failure(format!("position {id} not found")));
        }
        {
            let position = self.positions.get_mut(&id).unwrap();
            if position.status != PositionStatus::Open {
                return Ok(ActionOutcome::failure(format!("position {id} is already closed")));
            }
            Self::accrue_fees(pool, position)?;
        }

        let position = self.positions.get_mut(&id).unwrap();
        let amount0 = checked_add(position.amount0_principal, position.tokens_owed_0)?;
        let amount1 = checked_add(position.amount1_principal, position.tokens_owed_1)?;
        let fees0 = position.tokens_owed_0;
        let fees1 = position.tokens_owed_1;

        self.wallet.cash0 = checked_add(self.wallet.cash0, amount0)?;
        self.wallet.cash1 = checked_add(self.wallet.cash1, amount1)?;
        self.wallet.collected_fees_0 = checked_add(self.wallet.collected_fees_0, fees0)?;
        self.wallet.collected_fees_1 = checked_add(self.wallet.collected_fees_1, fees1)?;

        position.tokens_owed_0 = U256::ZERO;
        position.tokens_owed_1 = U256::ZERO;
        position.status = PositionStatus::Closed;

        Ok(ActionOutcome::ok(CloseResult { amount0, amount1, fees0, fees1 }))
    }

    /// Moves accrued, uncollected fees to the wallet without touching
    /// liquidity. Idempotent: calling twice with no intervening swap returns
    /// `(0, 0)` the second time.
    pub fn collect(&mut self, id: u64) -> Result<ActionOutcome<(U256, U256)>, PositionError> {
        let position = match self.positions.get_mut(&id) {
            Some(p) => p,
            None => return Ok(ActionOutcome::failure(format!("position {id} not found"))),
        };
        if position.status != PositionStatus::Open {
            return Ok(ActionOutcome::failure(format!("position {id} is closed")));
        }

        let fees0 = position.tokens_owed_0;
        let fees1 = position.tokens_owed_1;
        position.tokens_owed_0 = U256::ZERO;
        position.tokens_owed_1 = U256::ZERO;

        self.wallet.cash0 = checked_add(self.wallet.cash0, fees0)?;
        self.wallet.cash1 = checked_add(self.wallet.cash1, fees1)?;
        self.wallet.collected_fees_0 = checked_add(self.wallet.collected_fees_0, fees0)?;
        self.wallet.collected_fees_1 = checked_add(self.wallet.collected_fees_1, fees1)?;

        Ok(ActionOutcome::ok((fees0, fees1)))
    }

    pub fn totals(&self, pool: &Pool) -> Totals {
        let mut in_position0 = U256::ZERO;
        let mut in_position1 = U256::ZERO;
        let mut unclaimed_fees_0 = U256::ZERO;
        let mut unclaimed_fees_1 = U256::ZERO;

        for position in self.positions.values() {
            if position.status == PositionStatus::Open {
                in_position0 = in_position0.wrapping_add(position.amount0_principal);
                in_position1 = in_position1.wrapping_add(position.amount1_principal);
                unclaimed_fees_0 = unclaimed_fees_0.wrapping_add(position.tokens_owed_0);
                unclaimed_fees_1 = unclaimed_fees_1.wrapping_add(position.tokens_owed_1);
            }
        }

        let total0 = self.wallet.cash0.wrapping_add(in_position0).wrapping_add(unclaimed_fees_0);
        let total1 = self.wallet.cash1.wrapping_add(in_position1).wrapping_add(unclaimed_fees_1);
        let total_value = total0.as_u128() as f64 * pool.price() + total1.as_u128() as f64;

        Totals {
            cash0: self.wallet.cash0,
            cash1: self.wallet.cash1,
            in_position0,
            in_position1,
            unclaimed_fees_0,
            unclaimed_fees_1,
            collected_fees_0: self.wallet.collected_fees_0,
            collected_fees_1: self.wallet.collected_fees_1,
            initial_0: self.wallet.initial_0,
            initial_1: self.wallet.initial_1,
            total0,
            total1,
            total_value,
        }
    }
}
