//! Shared types: raw upstream payloads, derived summaries, chain points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::units::Lovelace;

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A block as delivered by the upstream node, before summarization.
///
/// Deserialization is lenient: a missing, `null` or wrong-typed field takes
/// its default instead of failing the block, and the loosely-typed parts
/// (`issuer*`, output `value`/`address`) are kept as raw JSON and resolved by
/// the summarizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub slot: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_vk: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<Value>,
    #[serde(default, deserialize_with = "lenient::items")]
    pub transactions: Vec<RawTransaction>,
}

impl RawBlock {
    /// The pool descriptor as found on the block: `issuerVk`, then `issuer`,
    /// then `producer`. JSON `null`, `false` and `""` count as absent.
    pub fn pool_descriptor(&self) -> Option<&Value> {
        [&self.issuer_vk, &self.issuer, &self.producer]
            .into_iter()
            .flatten()
            .find(|v| !matches!(v, Value::Null | Value::Bool(false)) && v.as_str() != Some(""))
    }
}

/// A transaction inside a [`RawBlock`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::items")]
    pub outputs: Vec<RawOutput>,
}

/// A transaction output inside a [`RawTransaction`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RawOutput {
    /// The destination address, if it is a non-empty string.
    pub fn address_str(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Field deserializers that never reject a block over one bad value.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(Value::deserialize(d)?.as_u64().unwrap_or_default())
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(to_text(Value::deserialize(d)?))
    }

    /// A JSON array; anything else is empty. Elements that do not parse keep
    /// their slot as `T::default()` so counts stay intact.
    pub fn items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Value::deserialize(d)? {
            Value::Array(items) => Ok(items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn to_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ─── Derived summaries ───────────────────────────────────────────────────────

/// Denormalized view of one block. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub height: u64,
    pub slot: u64,
    pub epoch: u64,
    pub id: String,
    /// Number of transactions at ingestion time.
    pub transaction_count: usize,
    /// When the block was ingested (Unix milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Sum of all transaction outputs.
    pub total_output: Lovelace,
    pub pool: String,
}

/// Denormalized view of one transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: String,
    pub block_height: u64,
    pub slot: u64,
    pub epoch: u64,
    /// One entry per raw output, in order; missing addresses are placeholders.
    pub output_addresses: Vec<String>,
    pub total_output: Lovelace,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A block summary together with the summaries of its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedBlock {
    #[serde(flatten)]
    pub block: BlockSummary,
    pub transactions: Vec<TransactionSummary>,
}

// ─── Chain points ────────────────────────────────────────────────────────────

/// A point on the chain: either the origin or a specific block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Point {
    Block { slot: u64, id: String },
    Origin(Origin),
}

impl Point {
    pub fn origin() -> Self {
        Self::Origin(Origin::Origin)
    }

    pub fn slot(&self) -> Option<u64> {
        match self {
            Self::Block { slot, .. } => Some(*slot),
            Self::Origin(_) => None,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block { slot, id } => write!(f, "{slot}.{id}"),
            Self::Origin(_) => write!(f, "origin"),
        }
    }
}

/// The literal `"origin"` point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Origin,
}

/// The upstream node's current tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tip {
    Block { slot: u64, id: String, height: u64 },
    Origin(Origin),
}

impl Tip {
    /// The point a client should intersect at to resume from this tip.
    pub fn point(&self) -> Point {
        match self {
            Self::Block { slot, id, .. } => Point::Block {
                slot: *slot,
                id: id.clone(),
            },
            Self::Origin(_) => Point::origin(),
        }
    }

    pub fn height(&self) -> Option<u64> {
        match self {
            Self::Block { height, .. } => Some(*height),
            Self::Origin(_) => None,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
