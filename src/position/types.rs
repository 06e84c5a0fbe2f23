use ethnum::U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A virtual position: never submitted on-chain, tracked only for
/// accounting.
#[derive(Debug, Clone)]
pub struct Position {
    pub id: u64,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub amount0_principal: U256,
    pub amount1_principal: U256,
    pub fee_growth_inside_0_last: U256,
    pub fee_growth_inside_1_last: U256,
    pub tokens_owed_0: U256,
    pub tokens_owed_1: U256,
    pub created_at: u64,
    pub status: PositionStatus,
}

impl Position {
    pub fn in_range(&self, tick_current: i32) -> bool {
        self.tick_lower <= tick_current && tick_current < self.tick_upper
    }
}

/// The single wallet owned by the PositionManager.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub cash0: U256,
    pub cash1: U256,
    pub collected_fees_0: U256,
    pub collected_fees_1: U256,
    pub initial_0: U256,
    pub initial_1: U256,
}

impl Wallet {
    pub fn new(invest0: U256, invest1: U256) -> Self {
        Self {
            cash0: invest0,
            cash1: invest1,
            collected_fees_0: U256::ZERO,
            collected_fees_1: U256::ZERO,
            initial_0: invest0,
            initial_1: invest1,
        }
    }
}

/// An optional simulated transaction cost deducted from the wallet when
/// opening, adding to, or closing a position.
#[derive(Debug, Clone, Default)]
pub struct Cost {
    pub token_a: Option<U256>,
    pub token_b: Option<U256>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenResult {
    pub position_id: u64,
    pub liquidity: u128,
    pub used0: U256,
    pub used1: U256,
    pub refund0: U256,
    pub refund1: U256,
    /// Value given up to the price-implied exchange ratio, in parts per
    /// million of the desired value priced at `pool.price()`; 0 when the
    /// full desired amounts were both consumable.
    pub slippage_ppm: u64,
    pub gas_fee: Cost,
}

/// Outcome of a position-mutating call; `success = false` never panics or
/// propagates as a `Result::Err` — strategies are expected to inspect it and
/// retry.
#[derive(Debug, Clone)]
pub struct ActionOutcome<T> {
    pub success: bool,
    pub message: String,
    pub result: Option<T>,
}

impl<T> ActionOutcome<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            result: Some(result),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            result: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloseResult {
    pub amount0: U256,
    pub amount1: U256,
    pub fees0: U256,
    pub fees1: U256,
}

#[derive(Debug, Clone)]
pub struct Totals {
    pub cash0: U256,
    pub cash1: U256,
    pub in_position0: U256,
    pub in_position1: U256,
    pub unclaimed_fees_0: U256,
    pub unclaimed_fees_1: U256,
    pub collected_fees_0: U256,
    pub collected_fees_1: U256,
    pub initial_0: U256,
    pub initial_1: U256,
    pub total0: U256,
    pub total1: U256,
    pub total_value: f64,
}
