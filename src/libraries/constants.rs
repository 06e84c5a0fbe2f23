use ethnum::U256;
use lazy_static::lazy_static;

lazy_static! {
    /// 2^64, the fixed-point base of the Q64.64 sqrt-price representation.
    pub static ref Q64: U256 = U256::from(1u8) << 64;
    /// 2^128, the fixed-point base of the Q128.128 fee-growth accumulators.
    pub static ref Q128: U256 = U256::from_words(1, 0); // 2^128
}

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;
