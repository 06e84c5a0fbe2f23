use ethnum::{I256, U256};
use lazy_static::lazy_static;

use super::constants::{MAX_TICK, MIN_TICK};

pub struct TickMath;

// Precomputed constants using U256
lazy_static! {
    static ref TWO_POW_64: U256 = U256::from(1_u8) << 64;
    static ref TWO_POW_128: U256 = U256::from(1_u8) << 128;
    static ref TWO_POW_256_MINUS_1: U256 = U256::from_be_bytes([0xff; 32]);
    static ref CONSTANTS: [U256; 19] = [
        U256::from_str_radix("fff97272373d413259a46990580e213a", 16).unwrap(),
        U256::from_str_radix("fff2e50f5f656932ef12357cf3c7fdcc", 16).unwrap(),
        U256::from_str_radix("ffe5caca7e10e4e61c3624eaa0941cd0", 16).unwrap(),
        U256::from_str_radix("ffcb9843d60f6159c9db58835c926644", 16).unwrap(),
        U256::from_str_radix("ff973b41fa98c081472e6896dfb254c0", 16).unwrap(),
        U256::from_str_radix("ff2ea16466c96a3843ec78b326b52861", 16).unwrap(),
        U256::from_str_radix("fe5dee046a99a2a811c461f1969c3053", 16).unwrap(),
        U256::from_str_radix("fcbe86c7900a88aedcffc83b479aa3a4", 16).unwrap(),
        U256::from_str_radix("f987a7253ac413176f2b074cf7815e54", 16).unwrap(),
        U256::from_str_radix("f3392b0822b70005940c7a398e4b70f3", 16).unwrap(),
        U256::from_str_radix("e7159475a2c29b7443b29c7fa6e889d9", 16).unwrap(),
        U256::from_str_radix("d097f3bdfd2022b8845ad8f792aa5825", 16).unwrap(),
        U256::from_str_radix("a9f746462d870fdf8a65dc1f90e061e5", 16).unwrap(),
        U256::from_str_radix("70d869a156d2a1b890bb3df62baf32f7", 16).unwrap(),
        U256::from_str_radix("31be135f97d08fd981231505542fcfa6", 16).unwrap(),
        U256::from_str_radix("9aa508b5b7a84e1c677de54f3e99bc9", 16).unwrap(),
        U256::from_str_radix("5d6af8dedb81196699c329225ee604", 16).unwrap(),
        U256::from_str_radix("2216e584f5fa1ea926041bedfe98", 16).unwrap(),
        U256::from_str_radix("48a170391f7dc42444e8fa2", 16).unwrap(),
    ];
    static ref MSB_THRESHOLDS: [(U256, u32); 8] = [
        (U256::from_str_radix("ffffffffffffffffffffffffffffffff", 16).unwrap(), 128), // 2^128 - 1
        (U256::from_str_radix("ffffffffffffffff", 16).unwrap(), 64),         // 2^64 - 1
        (U256::from_str_radix("ffffffff", 16).unwrap(), 32),               // 2^32 - 1
        (U256::from_str_radix("ffff", 16).unwrap(), 16),                   // 2^16 - 1
        (U256::from_str_radix("ff", 16).unwrap(), 8),                      // 2^8 - 1
        (U256::from_str_radix("f", 16).unwrap(), 4),                       // 2^4 - 1
        (U256::from_str_radix("3", 16).unwrap(), 2),                       // 2^2 - 1
        (U256::from_str_radix("1", 16).unwrap(), 1),                       // 2^1 - 1
    ];
    static ref LOG_2_COEFF: I256 = I256::from_str_radix("255738958999603826347141", 10).unwrap();
    static ref TICK_LOW_OFFSET: I256 =
        I256::from_str_radix("3402992956809132418596140100660247210", 10).unwrap();
    static ref TICK_HI_OFFSET: I256 =
        I256::from_str_radix("291339464771989622907027621153398088495", 10).unwrap();

    /// sqrt(1.0001^MIN_TICK) in Q64.64, the smallest representable sqrt-price.
    pub static ref MIN_SQRT_RATIO: U256 = TickMath::get_sqrt_ratio_at_tick(MIN_TICK);
    /// sqrt(1.0001^MAX_TICK) in Q64.64, the largest representable sqrt-price.
    pub static ref MAX_SQRT_RATIO: U256 = TickMath::get_sqrt_ratio_at_tick(MAX_TICK);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TickMathError {
    #[error("tick out of bounds")]
    TickOutOfBounds,
    #[error("sqrt price out of bounds")]
    SqrtPriceOutOfBounds,
}

impl TickMath {
    /// Calculates sqrt(1.0001^tick) * 2^64 as a Q64.64 number (returns U256).
    pub fn get_sqrt_ratio_at_tick(tick: i32) -> U256 {
        if tick < MIN_TICK || tick > MAX_TICK {
            panic!("Bug: TickOutOfBounds")
        }

        let abs_tick = tick.unsigned_abs();
        let mut ratio = if abs_tick & 0x1 != 0 {
            U256::from_str_radix("fffcb933bd6fad37aa2d162d1a594001", 16).unwrap()
        } else {
            *TWO_POW_128
        };

        for (i, constant) in CONSTANTS.iter().enumerate() {
            if abs_tick & (1 << (i + 1)) != 0 {
                ratio = (ratio * constant) >> 128;
            }
        }

        if tick > 0 {
            ratio = *TWO_POW_256_MINUS_1 / ratio;
        }

        // ratio is Q128.128; shift down to Q64.64, rounding up on a nonzero remainder.
        let sqrt_price_x64 = (ratio >> 64)
            + if ratio % *TWO_POW_64 == U256::ZERO {
                U256::ZERO
            } else {
                U256::ONE
            };
        sqrt_price_x64
    }

    /// Computes the tick corresponding to a given sqrt_price_x64 (Q64.64).
    pub fn get_tick_at_sqrt_ratio(sqrt_price_x64: U256) -> i32 {
        if sqrt_price_x64 < *MIN_SQRT_RATIO || sqrt_price_x64 > *MAX_SQRT_RATIO {
            panic!("Bug: SqrtPriceOutOfBounds");
        }

        // Bring the Q64.64 value back up to Q128.128 for the log2 estimation below.
        let ratio = sqrt_price_x64 << 64;
        let msb = Self::compute_msb_fast(&ratio);
        let r = if msb >= 128 {
            ratio >> (msb - 127)
        } else {
            ratio << (127 - msb)
        };

        let log_2 = Self::compute_log_2(r, msb);
        let log_sqrt10001 = log_2 * *LOG_2_COEFF;

        let tick_low = ((log_sqrt10001 - *TICK_LOW_OFFSET) >> 128_u8).as_i32();
        let tick_hi = ((log_sqrt10001 + *TICK_HI_OFFSET) >> 128_u8).as_i32();

        if tick_low == tick_hi {
            tick_low
        } else {
            let sqrt_ratio_at_tick_hi = Self::get_sqrt_ratio_at_tick(tick_hi);
            if sqrt_ratio_at_tick_hi <= sqrt_price_x64 {
                tick_hi
            } else {
                tick_low
            }
        }
    }

    fn compute_msb_fast(value: &U256) -> u32 {
        let mut msb = 0;
        let mut r = *value;

        for &(threshold, bit) in MSB_THRESHOLDS.iter() {
            if r > threshold {
                msb |= bit;
                r >>= bit;
            }
        }
        msb
    }

    fn compute_log_2(mut r: U256, msb: u32) -> I256 {
        let mut log_2 = I256::from(msb as i32 - 128) << 64;

        for shift in (50..=63).rev() {
            r = (r * r) >> 127;
            let f: U256 = r >> 128;
            let f_u32 = f.as_u32();
            log_2 |= I256::from(f_u32) << shift;
            r >>= f_u32;
        }
        log_2
    }
}
