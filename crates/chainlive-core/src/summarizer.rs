//! Block summarizer: turns one raw block into a [`SummarizedBlock`].
//!
//! Every malformed field is recovered locally:
//!
//! | Field              | Fallback                          |
//! |--------------------|-----------------------------------|
//! | pool descriptor    | [`UNKNOWN_POOL`]                  |
//! | transaction id     | `tx-<unix millis>-<random>`       |
//! | output amount      | zero (for that output only)       |
//! | output address     | [`MISSING_ADDRESS`]               |

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{BlockSummary, RawBlock, RawOutput, RawTransaction, SummarizedBlock, TransactionSummary};
use crate::units::{EpochSchedule, Lovelace};

/// Pool identity used when a block carries no usable issuer.
pub const UNKNOWN_POOL: &str = "Unknown Pool";

/// Placeholder for an output without a destination address.
pub const MISSING_ADDRESS: &str = "N/A";

// ─── Pool descriptor ─────────────────────────────────────────────────────────

/// The shapes a block issuer can take on the wire, in resolution order.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolDescriptor {
    /// A plain string such as `"pool1abc"`.
    Named(String),
    /// An object carrying `verificationKey`.
    VerificationKey(String),
    /// An object carrying `poolId`.
    PoolId(String),
    /// Anything else; rendered as compact JSON.
    Raw(Value),
    Absent,
}

impl PoolDescriptor {
    pub fn classify(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::Absent;
        };
        match value {
            Value::Null => Self::Absent,
            Value::String(s) if s.is_empty() => Self::Absent,
            Value::String(s) => Self::Named(s.clone()),
            Value::Object(map) => {
                if let Some(vk) = non_empty_str(map.get("verificationKey")) {
                    Self::VerificationKey(vk.to_string())
                } else if let Some(id) = non_empty_str(map.get("poolId")) {
                    Self::PoolId(id.to_string())
                } else {
                    Self::Raw(value.clone())
                }
            }
            other => Self::Raw(other.clone()),
        }
    }

    /// The display identity of the pool.
    pub fn resolve(self) -> String {
        match self {
            Self::Named(s) | Self::VerificationKey(s) | Self::PoolId(s) => s,
            Self::Raw(value) => serde_json::to_string(&value).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "unserializable pool descriptor");
                UNKNOWN_POOL.to_string()
            }),
            Self::Absent => UNKNOWN_POOL.to_string(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Resolve the pool identity of a raw block.
pub fn resolve_pool(raw: &RawBlock) -> String {
    PoolDescriptor::classify(raw.pool_descriptor()).resolve()
}

// ─── Amount shapes ───────────────────────────────────────────────────────────

/// The accepted nestings of an output amount, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountShape {
    /// `value.ada.lovelace` (Ogmios v6).
    AdaLovelace,
    /// `value.lovelace`.
    Lovelace,
    /// `value.coins` (Ogmios v5).
    Coins,
    /// `value` itself is the amount.
    Bare,
}

impl AmountShape {
    pub const PRECEDENCE: [AmountShape; 4] = [
        AmountShape::AdaLovelace,
        AmountShape::Lovelace,
        AmountShape::Coins,
        AmountShape::Bare,
    ];

    fn extract<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let found = match self {
            Self::AdaLovelace => value.get("ada").and_then(|ada| ada.get("lovelace")),
            Self::Lovelace => value.get("lovelace"),
            Self::Coins => value.get("coins"),
            Self::Bare => (!value.is_object()).then_some(value),
        };
        found.filter(|v| !v.is_null())
    }
}

/// Resolve the amount of one output. Missing or unparsable amounts are zero.
pub fn output_amount(output: &RawOutput) -> Lovelace {
    let Some(value) = output.value.as_ref() else {
        return Lovelace::ZERO;
    };
    let candidate = AmountShape::PRECEDENCE
        .iter()
        .find_map(|shape| shape.extract(value));

    match candidate {
        Some(leaf) => Lovelace::from_json(leaf).unwrap_or_else(|| {
            tracing::trace!(amount = %leaf, "unparsable output amount, counting as zero");
            Lovelace::ZERO
        }),
        None => Lovelace::ZERO,
    }
}

/// Sum of all output amounts of a transaction.
pub fn transaction_total(tx: &RawTransaction) -> Lovelace {
    tx.outputs.iter().map(output_amount).sum()
}

// ─── Summarizer ──────────────────────────────────────────────────────────────

/// Derives block and transaction summaries. Stateless apart from the epoch
/// schedule, so one instance can be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summarizer {
    schedule: EpochSchedule,
}

impl Summarizer {
    pub fn new(schedule: EpochSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> EpochSchedule {
        self.schedule
    }

    /// Summarize `raw` as ingested at `now`.
    pub fn summarize(&self, raw: &RawBlock, now: DateTime<Utc>) -> SummarizedBlock {
        let epoch = self.schedule.epoch_of(raw.slot);

        let transactions: Vec<TransactionSummary> = raw
            .transactions
            .iter()
            .map(|tx| TransactionSummary {
                id: transaction_id(tx, now),
                block_height: raw.height,
                slot: raw.slot,
                epoch,
                output_addresses: tx
                    .outputs
                    .iter()
                    .map(|o| o.address_str().unwrap_or(MISSING_ADDRESS).to_string())
                    .collect(),
                total_output: transaction_total(tx),
                timestamp: now,
            })
            .collect();

        let block = BlockSummary {
            height: raw.height,
            slot: raw.slot,
            epoch,
            id: raw.id.clone(),
            transaction_count: raw.transactions.len(),
            timestamp: now,
            total_output: transactions.iter().map(|t| t.total_output).sum(),
            pool: resolve_pool(raw),
        };

        SummarizedBlock { block, transactions }
    }
}

/// The transaction's own id or hash, else a synthetic display id.
///
/// Synthetic ids are not guaranteed unique; they only have to be stable
/// enough for a viewer to key a table row.
fn transaction_id(tx: &RawTransaction, now: DateTime<Utc>) -> String {
    [&tx.id, &tx.hash]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| {
            format!("tx-{}-{}", now.timestamp_millis(), uuid::Uuid::new_v4().simple())
        })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(v: Value) -> RawBlock {
        serde_json::from_value(v).unwrap()
    }

    fn summarizer() -> Summarizer {
        Summarizer::new(EpochSchedule::new(432_000))
    }

    #[test]
    fn end_to_end_single_transaction() {
        let raw = block(json!({
            "height": 100,
            "slot": 4_320_000,
            "id": "blk1",
            "transactions": [
                {"id": "tx1", "outputs": [{"address": "addr1", "value": {"lovelace": "2000000"}}]}
            ]
        }));
        let now = Utc::now();
        let out = summarizer().summarize(&raw, now);

        assert_eq!(out.block.height, 100);
        assert_eq!(out.block.slot, 4_320_000);
        assert_eq!(out.block.epoch, 10);
        assert_eq!(out.block.id, "blk1");
        assert_eq!(out.block.transaction_count, 1);
        assert_eq!(out.block.total_output, Lovelace::from(2_000_000));
        assert_eq!(out.block.timestamp, now);

        assert_eq!(out.transactions.len(), 1);
        let tx = &out.transactions[0];
        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.block_height, 100);
        assert_eq!(tx.epoch, 10);
        assert_eq!(tx.output_addresses, vec!["addr1".to_string()]);
        assert_eq!(serde_json::to_value(tx.total_output).unwrap(), json!("2000000"));
    }

    #[test]
    fn malformed_amount_contributes_zero() {
        let raw = block(json!({
            "height": 1,
            "slot": 1,
            "id": "b",
            "transactions": [{"id": "t", "outputs": [
                {"address": "a1", "value": {"ada": {"lovelace": "not-a-number"}}},
                {"address": "a2", "value": {"ada": {"lovelace": 5}}}
            ]}]
        }));
        let out = summarizer().summarize(&raw, Utc::now());
        assert_eq!(out.transactions[0].total_output, Lovelace::from(5));
        assert_eq!(out.block.total_output, Lovelace::from(5));
    }

    #[test]
    fn amount_shapes_in_precedence_order() {
        let cases = [
            (json!({"ada": {"lovelace": 1}, "lovelace": 2}), 1u64),
            (json!({"lovelace": "2"}), 2),
            (json!({"coins": 3}), 3),
            (json!("4"), 4),
            (json!(5), 5),
            (json!({"ada": {"lovelace": null}, "lovelace": 6}), 6),
            (json!({"assets": {}}), 0),
            (json!(true), 0),
        ];
        for (value, expected) in cases {
            let out = RawOutput { address: None, value: Some(value.clone()) };
            assert_eq!(output_amount(&out), Lovelace::from(expected), "value {value}");
        }
        assert_eq!(output_amount(&RawOutput::default()), Lovelace::ZERO);
    }

    #[test]
    fn k_transactions_yield_k_summaries() {
        let raw = block(json!({
            "height": 7,
            "slot": 8,
            "id": "b",
            "transactions": [
                {"id": "t1", "outputs": [{"address": "a"}, {}, {"address": null, "value": 1}]},
                {"hash": "t2", "outputs": []},
                {"outputs": [{"address": "z", "value": {"lovelace": 9}}]}
            ]
        }));
        let out = summarizer().summarize(&raw, Utc::now());
        assert_eq!(out.block.transaction_count, 3);
        assert_eq!(out.transactions.len(), 3);
        assert_eq!(out.transactions[0].output_addresses, vec!["a", MISSING_ADDRESS, MISSING_ADDRESS]);
        assert_eq!(out.transactions[1].id, "t2");
        assert!(out.transactions[1].output_addresses.is_empty());
        assert_eq!(out.transactions[1].total_output, Lovelace::ZERO);
        assert!(out.transactions[2].id.starts_with("tx-"));
        assert_eq!(out.block.total_output, Lovelace::from(10));
    }

    #[test]
    fn large_amounts_keep_precision() {
        // 2^60 + 1, well beyond f64's 53-bit mantissa
        let big = "1152921504606846977";
        let raw = block(json!({
            "transactions": [
                {"id": "t1", "outputs": [{"value": {"lovelace": big}}, {"value": {"lovelace": big}}]},
                {"id": "t2", "outputs": [{"value": {"ada": {"lovelace": big}}}]}
            ]
        }));
        let out = summarizer().summarize(&raw, Utc::now());
        assert_eq!(out.transactions[0].total_output.to_string(), "2305843009213693954");
        assert_eq!(out.block.total_output.to_string(), "3458764513820540931");
    }

    #[test]
    fn pool_precedence() {
        let cases = [
            (json!({"issuer": "pool1abc"}), "pool1abc"),
            (json!({"issuer": {"verificationKey": "vk1"}}), "vk1"),
            (json!({"issuer": {"poolId": "pool1xyz"}}), "pool1xyz"),
            (json!({}), UNKNOWN_POOL),
            (json!({"issuer": {"verificationKey": "vk1", "poolId": "pool1xyz"}}), "vk1"),
            (json!({"issuer": ""}), UNKNOWN_POOL),
            (json!({"issuer": {"vrf": "x"}}), r#"{"vrf":"x"}"#),
        ];
        for (raw, expected) in cases {
            assert_eq!(resolve_pool(&block(raw.clone())), expected, "block {raw}");
        }
    }

    #[test]
    fn pool_descriptor_classification() {
        assert_eq!(PoolDescriptor::classify(None), PoolDescriptor::Absent);
        assert_eq!(PoolDescriptor::classify(Some(&Value::Null)), PoolDescriptor::Absent);
        assert_eq!(
            PoolDescriptor::classify(Some(&json!(42))),
            PoolDescriptor::Raw(json!(42))
        );
        assert_eq!(PoolDescriptor::Raw(json!(42)).resolve(), "42");
    }

    #[test]
    fn synthetic_ids_embed_timestamp() {
        let now = Utc::now();
        let tx = RawTransaction::default();
        let id = transaction_id(&tx, now);
        assert!(id.starts_with(&format!("tx-{}-", now.timestamp_millis())));
        assert_ne!(id, transaction_id(&tx, now));
    }
}
