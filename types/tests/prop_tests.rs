use proptest::prelude::*;

use agora_types::{ConsensusTimestamp, ItemStatus, Outcome, Timestamp, VoteDirection};

/// Seconds between 1970 and 9999, the range where ISO strings stay fixed-width.
const MAX_SECS: i64 = 253_402_300_799;

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Approved), Just(Outcome::Rejected)]
}

proptest! {
    /// Parsing the rendered consensus timestamp recovers the same instant.
    #[test]
    fn consensus_timestamp_text_is_lossless(seconds in 0u64..=u32::MAX as u64, nanos in 0u32..1_000_000_000) {
        let ts = ConsensusTimestamp::new(seconds, nanos);
        prop_assert_eq!(ts.to_string().parse::<ConsensusTimestamp>().unwrap(), ts);
    }

    /// Ledger order is (seconds, nanos) lexicographic.
    #[test]
    fn consensus_timestamp_orders_by_seconds_then_nanos(
        a in (0u64..1_000, 0u32..1_000_000_000),
        b in (0u64..1_000, 0u32..1_000_000_000),
    ) {
        let ta = ConsensusTimestamp::new(a.0, a.1);
        let tb = ConsensusTimestamp::new(b.0, b.1);
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }

    /// Payload timestamps sort as strings the same way they sort as instants.
    #[test]
    fn iso_strings_sort_like_instants(a in 0i64..MAX_SECS, b in 0i64..MAX_SECS) {
        let ta = Timestamp::from_unix_secs(a);
        let tb = Timestamp::from_unix_secs(b);
        prop_assert_eq!(ta.to_iso().cmp(&tb.to_iso()), ta.cmp(&tb));
        prop_assert_eq!(ta.to_iso().parse::<Timestamp>().unwrap(), ta);
    }

    /// An outcome's status is terminal and maps back to the same outcome.
    #[test]
    fn outcome_status_is_terminal(outcome in outcome()) {
        let status = ItemStatus::from(outcome);
        prop_assert!(status.is_terminal());
        prop_assert_eq!(status.outcome(), Some(outcome));
        prop_assert_eq!(outcome.direction().outcome(), outcome);
    }
}

#[test]
fn pending_has_no_outcome() {
    assert!(!ItemStatus::Pending.is_terminal());
    assert_eq!(ItemStatus::Pending.outcome(), None);
    assert_eq!(VoteDirection::Reject.outcome(), Outcome::Rejected);
}
