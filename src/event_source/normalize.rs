use ethnum::U256;
use serde_json::Value;

use super::types::{RawEvent, RawTransaction, SwapEvent};

/// `tick_index.bits` is a raw u32 two's-complement pattern; values at or
/// above 2^31 represent negative ticks.
pub fn sign_correct_tick(bits: u32) -> i32 {
    if bits >= 1u32 << 31 {
        (bits as i64 - (1i64 << 32)) as i32
    } else {
        bits as i32
    }
}

fn str_field<'a>(json: &'a Value, name: &str) -> Option<&'a str> {
    json.get(name).and_then(|v| v.as_str())
}

fn u256_field(json: &Value, name: &str) -> Option<U256> {
    let raw = json.get(name)?;
    if let Some(s) = raw.as_str() {
        U256::from_str_radix(s, 10).ok()
    } else if let Some(n) = raw.as_u64() {
        Some(U256::from(n))
    } else {
        None
    }
}

fn tick_bits_field(json: &Value, name: &str) -> Option<u32> {
    let bits = json.get(name)?.get("bits")?;
    if let Some(s) = bits.as_str() {
        s.parse::<u32>().ok()
    } else {
        bits.as_u64().map(|n| n as u32)
    }
}

fn bool_field(json: &Value, name: &str) -> Option<bool> {
    json.get(name).and_then(|v| v.as_bool())
}

struct SwapFields {
    amount_x: U256,
    amount_y: U256,
    fee_amount: U256,
    protocol_fee: U256,
    reserve_x: U256,
    reserve_y: U256,
    sqrt_price_before: U256,
    sqrt_price_after: U256,
    tick: i32,
    liquidity: u128,
    zero_for_one: bool,
}

/// Returns `None` (and logs a warning naming the missing field) when the
/// swap's own `parsedJson` fails the completeness check in the ingestion
/// contract.
fn parse_swap_fields(json: &Value, digest: &str) -> Option<SwapFields> {
    macro_rules! require {
        ($opt:expr, $field:literal) => {
            match $opt {
                Some(v) => v,
                None => {
                    tracing::warn!(tx_digest = digest, field = $field, "swap event missing field, skipping");
                    return None;
                }
            }
        };
    }

    let amount_x = require!(u256_field(json, "amount_x"), "amount_x");
    let amount_y = require!(u256_field(json, "amount_y"), "amount_y");
    let fee_amount = require!(u256_field(json, "fee_amount"), "fee_amount");
    let reserve_x = require!(u256_field(json, "reserve_x"), "reserve_x");
    let reserve_y = require!(u256_field(json, "reserve_y"), "reserve_y");
    let sqrt_price_before = require!(u256_field(json, "sqrt_price_before"), "sqrt_price_before");
    let sqrt_price_after = require!(u256_field(json, "sqrt_price_after"), "sqrt_price_after");
    let tick_bits = require!(tick_bits_field(json, "tick_index"), "tick_index.bits");
    let zero_for_one = require!(bool_field(json, "x_for_y"), "x_for_y");
    // protocol_fee is part of the data model but not named in the completeness
    // check; default to zero rather than reject, per the engine's documented
    // reading of the upstream contract.
    let protocol_fee = u256_field(json, "protocol_fee").unwrap_or(U256::ZERO);
    let liquidity = u256_field(json, "liquidity")
        .and_then(|v| u128::try_from(v).ok())
        .unwrap_or(0);

    Some(SwapFields {
        amount_x,
        amount_y,
        fee_amount,
        protocol_fee,
        reserve_x,
        reserve_y,
        sqrt_price_before,
        sqrt_price_after,
        tick: sign_correct_tick(tick_bits),
        liquidity,
        zero_for_one,
    })
}

struct RepayFields {
    amount_x_debt: U256,
    amount_y_debt: U256,
    paid_x: U256,
    paid_y: U256,
    reserve_x: U256,
    reserve_y: U256,
    sqrt_price_after: U256,
    tick: i32,
    liquidity: u128,
}

fn parse_repay_fields(json: &Value) -> Option<RepayFields> {
    Some(RepayFields {
        amount_x_debt: u256_field(json, "amount_x_debt")?,
        amount_y_debt: u256_field(json, "amount_y_debt")?,
        paid_x: u256_field(json, "paid_x")?,
        paid_y: u256_field(json, "paid_y")?,
        reserve_x: u256_field(json, "reserve_x")?,
        reserve_y: u256_field(json, "reserve_y")?,
        sqrt_price_after: u256_field(json, "sqrt_price_after")?,
        tick: sign_correct_tick(tick_bits_field(json, "tick_index")?),
        liquidity: u256_field(json, "liquidity")
            .and_then(|v| u128::try_from(v).ok())
            .unwrap_or(0),
    })
}

fn saturating_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        U256::ZERO
    }
}

/// Walks one transaction's raw event array, collapsing every Swap+Repay pair
/// for `pool_id` into one normalized `SwapEvent`, in the order they appear.
pub fn collapse_transaction(tx: &RawTransaction, pool_id: &str) -> Vec<SwapEvent> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < tx.events.len() {
        let ev = &tx.events[i];
        if !ev.is_swap() || str_field(&ev.parsed_json, "pool_id") != Some(pool_id) {
            i += 1;
            continue;
        }

        let Some(swap) = parse_swap_fields(&ev.parsed_json, &tx.digest) else {
            i += 1;
            continue;
        };

        let repay = tx.events.get(i + 1).filter(|next| {
            next.is_repay() && str_field(&next.parsed_json, "pool_id") == Some(pool_id)
        });

        let normalized = match repay.and_then(|r| parse_repay_fields(&r.parsed_json)) {
            Some(repay) => {
                let fee_amount = swap.fee_amount
                    + saturating_diff(repay.paid_x, repay.amount_x_debt)
                    + saturating_diff(repay.paid_y, repay.amount_y_debt);
                let (amount_in, amount_out) = if swap.zero_for_one {
                    (repay.amount_x_debt, repay.amount_y_debt)
                } else {
                    (repay.amount_y_debt, repay.amount_x_debt)
                };
                SwapEvent {
                    timestamp_ms: tx.timestamp_ms,
                    digest: tx.digest.clone(),
                    seq: ev.id.event_seq,
                    pool_id: pool_id.to_string(),
                    amount_in,
                    amount_out,
                    sqrt_price_before_x64: swap.sqrt_price_before,
                    sqrt_price_after_x64: repay.sqrt_price_after,
                    fee_amount,
                    protocol_fee: swap.protocol_fee,
                    reserve0: repay.reserve_x,
                    reserve1: repay.reserve_y,
                    tick: repay.tick,
                    liquidity: repay.liquidity,
                    zero_for_one: swap.zero_for_one,
                }
            }
            None => {
                let (amount_in, amount_out) = if swap.zero_for_one {
                    (swap.amount_x, swap.amount_y)
                } else {
                    (swap.amount_y, swap.amount_x)
                };
                SwapEvent {
                    timestamp_ms: tx.timestamp_ms,
                    digest: tx.digest.clone(),
                    seq: ev.id.event_seq,
                    pool_id: pool_id.to_string(),
                    amount_in,
                    amount_out,
                    sqrt_price_before_x64: swap.sqrt_price_before,
                    sqrt_price_after_x64: swap.sqrt_price_after,
                    fee_amount: swap.fee_amount,
                    protocol_fee: swap.protocol_fee,
                    reserve0: swap.reserve_x,
                    reserve1: swap.reserve_y,
                    tick: swap.tick,
                    liquidity: swap.liquidity,
                    zero_for_one: swap.zero_for_one,
                }
            }
        };
        out.push(normalized);
        i += 1;
    }
    out
}

pub fn sort_events(events: &mut [SwapEvent]) {
    events.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::types::RawEventId;

    fn raw_event(event_type: &str, seq: u64, json: Value) -> RawEvent {
        RawEvent {
            id: RawEventId {
                tx_digest: "tx1".into(),
                event_seq: seq,
            },
            event_type: event_type.to_string(),
            sender: None,
            parsed_json: json,
            bcs_encoding: None,
            bcs: None,
        }
    }

    #[test]
    fn sign_correct_round_trips_negative_and_positive() {
        assert_eq!(sign_correct_tick(0), 0);
        assert_eq!(sign_correct_tick(1), 1);
        assert_eq!(sign_correct_tick(u32::MAX), -1);
        assert_eq!(sign_correct_tick((1u32 << 31) + 100), -(1i32 << 31) + 100);
    }

    #[test]
    fn plain_swap_without_repay_uses_its_own_fields() {
        let swap = raw_event(
            "0xabc::trade::SwapEvent",
            0,
            serde_json::json!({
                "pool_id": "pool-1",
                "amount_x": "100",
                "amount_y": "90",
                "fee_amount": "3",
                "protocol_fee": "1",
                "reserve_x": "1000",
                "reserve_y": "2000",
                "sqrt_price_before": "18446744073709551616",
                "sqrt_price_after": "18446744073709541616",
                "tick_index": {"bits": 0},
                "x_for_y": true,
            }),
        );
        let tx = RawTransaction {
            digest: "tx1".into(),
            timestamp_ms: 1500,
            checkpoint: None,
            events: vec![swap],
        };
        let out = collapse_transaction(&tx, "pool-1");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount_in, U256::from(100u64));
        assert_eq!(out[0].amount_out, U256::from(90u64));
        assert_eq!(out[0].fee_amount, U256::from(3u64));
    }

    #[test]
    fn swap_followed_by_repay_merges_final_state() {
        let swap = raw_event(
            "0xabc::trade::SwapEvent",
            0,
            serde_json::json!({
                "pool_id": "pool-1",
                "amount_x": "100",
                "amount_y": "90",
                "fee_amount": "3",
                "protocol_fee": "0",
                "reserve_x": "1000",
                "reserve_y": "2000",
                "sqrt_price_before": "18446744073709551616",
                "sqrt_price_after": "18446744073709541616",
                "tick_index": {"bits": 0},
                "x_for_y": true,
            }),
        );
        let repay = raw_event(
            "0xabc::trade::RepayFlashSwapEvent",
            1,
            serde_json::json!({
                "pool_id": "pool-1",
                "amount_x_debt": "105",
                "amount_y_debt": "95",
                "paid_x": "106",
                "paid_y": "95",
                "reserve_x": "1010",
                "reserve_y": "1995",
                "sqrt_price_after": "18446744073709531616",
                "tick_index": {"bits": 1},
                "liquidity": "1000000",
            }),
        );
        let tx = RawTransaction {
            digest: "tx1".into(),
            timestamp_ms: 1500,
            checkpoint: None,
            events: vec![swap, repay],
        };
        let out = collapse_transaction(&tx, "pool-1");
        assert_eq!(out.len(), 1);
        let e = &out[0];
        assert_eq!(e.amount_in, U256::from(105u64));
        assert_eq!(e.amount_out, U256::from(95u64));
        assert_eq!(e.sqrt_price_after_x64, U256::from_str_radix("18446744073709531616", 10).unwrap());
        assert_eq!(e.liquidity, 1_000_000u128);
        assert_eq!(e.tick, 1);
        // fee = 3 (swap) + max(106-105,0) + max(95-95,0) = 4
        assert_eq!(e.fee_amount, U256::from(4u64));
    }

    #[test]
    fn incomplete_swap_is_skipped() {
        let swap = raw_event(
            "0xabc::trade::SwapEvent",
            0,
            serde_json::json!({
                "pool_id": "pool-1",
                "amount_x": "100",
                // amount_y missing
                "fee_amount": "3",
                "reserve_x": "1000",
                "reserve_y": "2000",
                "sqrt_price_before": "18446744073709551616",
                "sqrt_price_after": "18446744073709541616",
                "tick_index": {"bits": 0},
                "x_for_y": true,
            }),
        );
        let tx = RawTransaction {
            digest: "tx1".into(),
            timestamp_ms: 1500,
            checkpoint: None,
            events: vec![swap],
        };
        assert!(collapse_transaction(&tx, "pool-1").is_empty());
    }
}
