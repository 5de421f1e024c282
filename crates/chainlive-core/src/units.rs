//! Amount and time conversions: lovelace → ADA, slot → epoch, instant → age.
//!
//! Everything here is a pure function. Amounts are carried as 256-bit unsigned
//! integers so cumulative block totals can never lose precision.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Lovelace in one ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Fractional digits shown for ADA amounts.
const ADA_DECIMALS: usize = 6;

// ─── Lovelace ────────────────────────────────────────────────────────────────

/// An amount in lovelace, the chain's smallest indivisible unit.
///
/// Serialized as a decimal string so viewers without native big integers still
/// receive exact totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lovelace(U256);

impl Lovelace {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Parse a non-negative decimal integer. Returns `None` for anything else
    /// (signs, decimals, exponents, hex, whitespace-only, overflow).
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(digits, 10).ok().map(Self)
    }

    /// Parse an amount from a JSON leaf: a decimal string or a JSON integer.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => match n.as_u64() {
                Some(v) => Some(Self::from(v)),
                // Only reachable for integers outside u64 when serde_json keeps
                // the original digits; floats fail the digit check.
                None => Self::parse(&n.to_string()),
            },
            _ => None,
        }
    }

    /// Add without ever wrapping; clamps at the 256-bit maximum.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Render as an en-US formatted ADA amount, e.g. `1,234.5`.
    pub fn to_ada_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let scale = U256::from(LOVELACE_PER_ADA);
        let whole = self.0 / scale;
        // remainder < 10^6, so the low limb holds it exactly
        let frac = (self.0 % scale).as_limbs()[0];

        let mut out = group_thousands(&whole.to_string());
        if frac != 0 {
            let digits = format!("{frac:0width$}", width = ADA_DECIMALS);
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
        out
    }
}

impl From<u64> for Lovelace {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl From<U256> for Lovelace {
    fn from(v: U256) -> Self {
        Self(v)
    }
}

impl std::iter::Sum for Lovelace {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Lovelace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Lovelace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Lovelace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid lovelace amount: {value}")))
    }
}

/// Convert a lovelace amount given as text into an ADA display string.
///
/// `None`, zero, and anything that is not a non-negative integer yield `"0"`.
pub fn to_display_unit(amount: Option<&str>) -> String {
    amount
        .and_then(Lovelace::parse)
        .map(|l| l.to_ada_string())
        .unwrap_or_else(|| "0".to_string())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ─── Epochs ──────────────────────────────────────────────────────────────────

/// Known Cardano networks and their epoch lengths in slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn epoch_length(&self) -> u64 {
        match self {
            Self::Mainnet | Self::Preprod => 432_000,
            Self::Preview => 86_400,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Preprod => write!(f, "preprod"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "preprod" => Ok(Self::Preprod),
            "preview" => Ok(Self::Preview),
            other => Err(format!("unknown network '{other}' (expected mainnet, preprod or preview)")),
        }
    }
}

/// Maps slots to fixed-size epoch buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSchedule {
    epoch_length: u64,
}

impl EpochSchedule {
    /// `epoch_length` must be non-zero; [`crate::config::PipelineConfig::validate`]
    /// rejects zero before a schedule is built from configuration.
    pub fn new(epoch_length: u64) -> Self {
        Self {
            epoch_length: epoch_length.max(1),
        }
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(network.epoch_length())
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    /// `floor(slot / epoch_length)`.
    pub fn epoch_of(&self, slot: u64) -> u64 {
        slot / self.epoch_length
    }
}

impl Default for EpochSchedule {
    fn default() -> Self {
        Self::for_network(Network::Preprod)
    }
}

// ─── Ages ────────────────────────────────────────────────────────────────────

/// Coarse human-readable age of `timestamp` relative to `now`.
pub fn time_since(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = timestamp else {
        return "Just now".to_string();
    };
    let seconds = (now - ts).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if seconds < 60 {
        plural(seconds, "second")
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else {
        plural(hours, "hour")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn display_unit_basic() {
        assert_eq!(to_display_unit(Some("2000000")), "2");
        assert_eq!(to_display_unit(Some("1500000")), "1.5");
        assert_eq!(to_display_unit(Some("1")), "0.000001");
        assert_eq!(to_display_unit(Some("1234567890000")), "1,234,567.89");
    }

    #[test]
    fn display_unit_never_fails() {
        assert_eq!(to_display_unit(None), "0");
        assert_eq!(to_display_unit(Some("0")), "0");
        assert_eq!(to_display_unit(Some("")), "0");
        assert_eq!(to_display_unit(Some("not-a-number")), "0");
        assert_eq!(to_display_unit(Some("-5")), "0");
        assert_eq!(to_display_unit(Some("1.5")), "0");
    }

    #[test]
    fn display_unit_monotonic() {
        let samples = ["0", "1", "999999", "1000000", "1000001", "5000000000", "5000000001"];
        let parsed: Vec<Lovelace> = samples.iter().map(|s| Lovelace::parse(s).unwrap()).collect();
        for pair in parsed.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        // equal values render equally, distinct values render distinctly
        let rendered: Vec<String> = parsed.iter().map(Lovelace::to_ada_string).collect();
        for pair in rendered.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn display_unit_beyond_f64_precision() {
        // 2^60 + 1 lovelace; f64 would drop the trailing unit
        let l = Lovelace::parse("1152921504606846977").unwrap();
        assert_eq!(l.to_ada_string(), "1,152,921,504,606.846977");
    }

    #[test]
    fn lovelace_from_json() {
        assert_eq!(Lovelace::from_json(&serde_json::json!("42")), Some(Lovelace::from(42)));
        assert_eq!(Lovelace::from_json(&serde_json::json!(42)), Some(Lovelace::from(42)));
        assert_eq!(Lovelace::from_json(&serde_json::json!(4.2)), None);
        assert_eq!(Lovelace::from_json(&serde_json::json!(-1)), None);
        assert_eq!(Lovelace::from_json(&serde_json::json!({"lovelace": 1})), None);
    }

    #[test]
    fn lovelace_serializes_as_string() {
        let json = serde_json::to_string(&Lovelace::from(2_000_000)).unwrap();
        assert_eq!(json, "\"2000000\"");
        let back: Lovelace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Lovelace::from(2_000_000));
    }

    #[test]
    fn lovelace_sum_saturates() {
        let max = Lovelace::from(U256::MAX);
        let total: Lovelace = [max, Lovelace::from(1)].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn epoch_is_floor_division() {
        let schedule = EpochSchedule::new(432_000);
        assert_eq!(schedule.epoch_of(0), 0);
        assert_eq!(schedule.epoch_of(431_999), 0);
        assert_eq!(schedule.epoch_of(432_000), 1);
        assert_eq!(schedule.epoch_of(4_320_000), 10);
        for slot in [7u64, 86_400, 1_000_000_007, u64::MAX] {
            assert_eq!(schedule.epoch_of(slot), slot / 432_000);
            assert_eq!(schedule.epoch_of(slot), schedule.epoch_of(slot));
        }
    }

    #[test]
    fn network_presets() {
        assert_eq!(EpochSchedule::for_network(Network::Preview).epoch_length(), 86_400);
        assert_eq!(EpochSchedule::for_network(Network::Mainnet).epoch_length(), 432_000);
        assert_eq!("Preview".parse::<Network>().unwrap(), Network::Preview);
        assert!("sanchonet".parse::<Network>().is_err());
    }

    #[test]
    fn time_since_buckets() {
        let now = Utc::now();
        assert_eq!(time_since(None, now), "Just now");
        assert_eq!(time_since(Some(now), now), "0 seconds ago");
        assert_eq!(time_since(Some(now - Duration::seconds(1)), now), "1 second ago");
        assert_eq!(time_since(Some(now - Duration::seconds(59)), now), "59 seconds ago");
        assert_eq!(time_since(Some(now - Duration::seconds(60)), now), "1 minute ago");
        assert_eq!(time_since(Some(now - Duration::minutes(59)), now), "59 minutes ago");
        assert_eq!(time_since(Some(now - Duration::minutes(61)), now), "1 hour ago");
        assert_eq!(time_since(Some(now - Duration::hours(5)), now), "5 hours ago");
        assert_eq!(time_since(Some(now + Duration::seconds(30)), now), "0 seconds ago");
    }
}
