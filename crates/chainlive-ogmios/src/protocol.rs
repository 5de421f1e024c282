//! Ogmios v6 chain-synchronization methods and their results.

use chainlive_core::consumer::ChainSyncEvent;
use chainlive_core::types::{Point, RawBlock, Tip};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::request::JsonRpcError;

pub const FIND_INTERSECTION: &str = "findIntersection";
pub const NEXT_BLOCK: &str = "nextBlock";

/// Ogmios error code for `findIntersection` when no point is on chain.
pub const INTERSECTION_NOT_FOUND: i64 = 1000;

/// Result of a successful `findIntersection`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Intersection {
    pub intersection: Point,
    pub tip: Tip,
}

#[derive(Deserialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
enum NextBlockResult {
    Forward {
        block: RawBlock,
        #[serde(default)]
        tip: Option<Tip>,
    },
    Backward {
        point: Point,
        #[serde(default)]
        tip: Option<Tip>,
    },
}

/// `findIntersection` parameters for the given candidate points.
pub fn find_intersection_params(points: &[Point]) -> Value {
    json!({ "points": points })
}

pub fn parse_intersection(result: Value) -> Result<Intersection, TransportError> {
    serde_json::from_value(result).map_err(|e| TransportError::UnexpectedResponse {
        method: FIND_INTERSECTION.into(),
        reason: e.to_string(),
    })
}

/// Map a `findIntersection` error object onto a transport error.
pub fn intersection_error(error: JsonRpcError) -> TransportError {
    if error.code == INTERSECTION_NOT_FOUND {
        TransportError::IntersectionNotFound(error.message)
    } else {
        TransportError::Rpc {
            method: FIND_INTERSECTION.into(),
            error,
        }
    }
}

pub fn parse_next_block(result: Value) -> Result<ChainSyncEvent, TransportError> {
    let parsed: NextBlockResult =
        serde_json::from_value(result).map_err(|e| TransportError::UnexpectedResponse {
            method: NEXT_BLOCK.into(),
            reason: e.to_string(),
        })?;
    Ok(match parsed {
        NextBlockResult::Forward { block, tip } => ChainSyncEvent::RollForward { block, tip },
        NextBlockResult::Backward { point, tip } => ChainSyncEvent::RollBackward { point, tip },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlive_core::units::Lovelace;
    use chainlive_core::Summarizer;

    #[test]
    fn params_serialize_points() {
        let params = find_intersection_params(&[
            Point::origin(),
            Point::Block { slot: 5, id: "ab".into() },
        ]);
        assert_eq!(params, json!({"points": ["origin", {"slot": 5, "id": "ab"}]}));
    }

    #[test]
    fn intersection_at_origin() {
        let found = parse_intersection(json!({
            "intersection": "origin",
            "tip": {"slot": 1000, "id": "f00d", "height": 42}
        }))
        .unwrap();
        assert_eq!(found.intersection, Point::origin());
        assert_eq!(found.tip.height(), Some(42));
        assert_eq!(found.tip.point(), Point::Block { slot: 1000, id: "f00d".into() });
    }

    #[test]
    fn empty_chain_tip_is_origin() {
        let found = parse_intersection(json!({"intersection": "origin", "tip": "origin"})).unwrap();
        assert_eq!(found.tip.point(), Point::origin());
    }

    #[test]
    fn intersection_not_found_code() {
        let err = intersection_error(JsonRpcError {
            code: INTERSECTION_NOT_FOUND,
            message: "No intersection found.".into(),
            data: None,
        });
        assert!(matches!(err, TransportError::IntersectionNotFound(_)));
    }

    #[test]
    fn forward_with_praos_block() {
        let event = parse_next_block(json!({
            "direction": "forward",
            "block": {
                "type": "praos",
                "era": "babbage",
                "id": "blk",
                "height": 7,
                "slot": 864000,
                "issuer": {"verificationKey": "vk1", "vrfVerificationKey": "vrf"},
                "transactions": [{
                    "id": "tx",
                    "outputs": [{"address": "addr1", "value": {"ada": {"lovelace": 1500000}}}]
                }]
            },
            "tip": {"slot": 864000, "id": "blk", "height": 7}
        }))
        .unwrap();

        match event {
            ChainSyncEvent::RollForward { block, tip } => {
                assert_eq!(block.height, 7);
                assert_eq!(block.transactions.len(), 1);
                assert_eq!(block.pool_descriptor().unwrap()["verificationKey"], "vk1");
                assert_eq!(tip.and_then(|t| t.height()), Some(7));
            }
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn malformed_transaction_keeps_the_rest_of_the_block() {
        let event = parse_next_block(json!({
            "direction": "forward",
            "block": {
                "id": "blk",
                "height": 100,
                "slot": 4320000,
                "issuer": "pool1abc",
                "transactions": [
                    {"id": "good", "outputs": [{"address": "addr1", "value": {"ada": {"lovelace": 2000000}}}]},
                    {"id": "bad", "outputs": null},
                    {"id": 7}
                ]
            },
            "tip": {"slot": 4320000, "id": "blk", "height": 100}
        }))
        .unwrap();

        let ChainSyncEvent::RollForward { block, .. } = event else {
            panic!("expected forward");
        };
        let summary = Summarizer::default().summarize(&block, chrono::Utc::now());
        assert_eq!(summary.block.transaction_count, 3);
        assert_eq!(summary.transactions[0].id, "good");
        assert_eq!(summary.transactions[0].output_addresses, vec!["addr1".to_string()]);
        assert_eq!(summary.block.total_output, Lovelace::from(2_000_000));
        assert!(summary.transactions[1].output_addresses.is_empty());
        assert_eq!(summary.transactions[2].id, "7");
    }

    #[test]
    fn null_transactions_is_an_empty_block() {
        let event = parse_next_block(json!({
            "direction": "forward",
            "block": {"id": "blk", "height": 1, "slot": 1, "transactions": null}
        }))
        .unwrap();
        match event {
            ChainSyncEvent::RollForward { block, .. } => assert!(block.transactions.is_empty()),
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn backward_to_point() {
        let event = parse_next_block(json!({
            "direction": "backward",
            "point": {"slot": 10, "id": "p"},
            "tip": {"slot": 12, "id": "t", "height": 3}
        }))
        .unwrap();
        assert_eq!(
            event,
            ChainSyncEvent::RollBackward {
                point: Point::Block { slot: 10, id: "p".into() },
                tip: Some(Tip::Block { slot: 12, id: "t".into(), height: 3 }),
            }
        );
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = parse_next_block(json!({"direction": "sideways"})).unwrap_err();
        assert!(matches!(err, TransportError::UnexpectedResponse { .. }));
    }
}
