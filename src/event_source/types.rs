use ethnum::U256;
use serde::{de, Deserialize, Deserializer};

/// Normalized, time-ordered element of the input stream. This is the only
/// shape the rest of the engine ever sees; everything upstream of
/// normalization is backend-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub timestamp_ms: u64,
    pub digest: String,
    pub seq: u64,
    pub pool_id: String,

    pub amount_in: U256,
    pub amount_out: U256,
    pub sqrt_price_before_x64: U256,
    pub sqrt_price_after_x64: U256,
    pub fee_amount: U256,
    pub protocol_fee: U256,
    pub reserve0: U256,
    pub reserve1: U256,

    pub tick: i32,
    pub liquidity: u128,
    pub zero_for_one: bool,
}

impl SwapEvent {
    pub fn order_key(&self) -> (u64, String, u64) {
        (self.timestamp_ms, self.digest.clone(), self.seq)
    }
}

/// One page of the JSON file backend, or one page returned by a tabular
/// store row's embedded event array once decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct PageFile {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default, rename = "nextCursor")]
    pub next_cursor: Option<String>,
    pub data: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub digest: String,
    #[serde(rename = "timestampMs", deserialize_with = "de_u64_from_str_or_num")]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub checkpoint: Option<serde_json::Value>,
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEventId {
    #[serde(rename = "txDigest")]
    pub tx_digest: String,
    #[serde(rename = "eventSeq", deserialize_with = "de_u64_from_str_or_num")]
    pub event_seq: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub id: RawEventId,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(rename = "parsedJson")]
    pub parsed_json: serde_json::Value,
    #[serde(default, rename = "bcsEncoding")]
    pub bcs_encoding: Option<String>,
    #[serde(default)]
    pub bcs: Option<String>,
}

impl RawEvent {
    pub fn is_swap(&self) -> bool {
        self.event_type.ends_with("::trade::SwapEvent")
    }

    pub fn is_repay(&self) -> bool {
        self.event_type.ends_with("::trade::RepayFlashSwapEvent")
    }

    pub fn pool_id(&self) -> Option<&str> {
        self.parsed_json.get("pool_id").and_then(|v| v.as_str())
    }
}

/// Accepts either a JSON string or a JSON number for fields the source
/// encodes inconsistently across backends (timestamps, sequence numbers).
pub fn de_u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u64),
    }
    match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Str(s) => s.parse::<u64>().map_err(de::Error::custom),
        StrOrNum::Num(n) => Ok(n),
    }
}
