use ethnum::U256;

/// Immutable pool parameters, fixed for the lifetime of a backtest run.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pool_id: String,
    pub token0_name: String,
    pub token1_name: String,
    pub decimals0: u8,
    pub decimals1: u8,
    pub fee_rate_ppm: u32,
    pub tick_spacing: i32,
}

/// Mutable pool state, advanced only by `Pool::ingest`.
#[derive(Debug, Clone)]
pub struct PoolState {
    pub sqrt_price_x64: U256,
    pub tick_current: i32,
    pub liquidity_active: u128,
    pub timestamp_ms: u64,
    pub fee_growth_global_0: U256,
    pub fee_growth_global_1: U256,
}

/// Result of a flat-price quote against the current state; see
/// `Pool::estimate`.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub amount_out: U256,
    pub fee: U256,
    /// Fraction of `amount_in`, in parts-per-million, that `fee` represents.
    /// Not a measure of market-impact slippage: this engine does not
    /// simulate tick crossings, so quotes beyond the immediate tick are
    /// necessarily approximate.
    pub price_impact_ppm: u64,
}
