pub mod constants;
pub mod full_math;
pub mod liquidity_amounts;
pub mod liquidity_math;
pub mod safe_cast;
pub mod tick_math;
