use proptest::prelude::*;

use agora_consensus::{AdmissionError, CandidateVote, EventFolder, FoldedLog, VoteAdmission};
use agora_ledger::Event;
use agora_messages::{ItemFinalized, ItemSubmitted, ItemVoted, LedgerPayload};
use agora_types::{
    AgentId, Category, ConsensusParams, ConsensusTimestamp, ItemId, ItemStatus, Outcome,
    Timestamp, TopicId, VoteDirection,
};

const AGENTS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];
const ITEMS: [&str; 3] = ["kb-1", "kb-2", "kb-3"];

#[derive(Clone, Debug)]
enum Op {
    Submit { item: usize, author: usize },
    Vote { item: usize, voter: usize, approve: bool },
    Finalize { item: usize, approve: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0..ITEMS.len(), 0..AGENTS.len()).prop_map(|(item, author)| Op::Submit { item, author }),
        6 => (0..ITEMS.len(), 0..AGENTS.len(), any::<bool>())
            .prop_map(|(item, voter, approve)| Op::Vote { item, voter, approve }),
        1 => (0..ITEMS.len(), any::<bool>()).prop_map(|(item, approve)| Op::Finalize { item, approve }),
    ]
}

fn direction(approve: bool) -> VoteDirection {
    if approve {
        VoteDirection::Approve
    } else {
        VoteDirection::Reject
    }
}

fn to_events(ops: &[Op]) -> Vec<Event> {
    let ts = Timestamp::from_unix_secs(1_700_000_000);
    ops.iter()
        .enumerate()
        .map(|(i, op)| {
            let payload = match *op {
                Op::Submit { item, author } => LedgerPayload::ItemSubmitted(ItemSubmitted {
                    item_id: ItemId::new(ITEMS[item]),
                    author: AgentId::new(AGENTS[author]),
                    category: Category::Guide,
                    content: String::new(),
                    content_pointer: None,
                    timestamp: ts.to_iso(),
                }),
                Op::Vote { item, voter, approve } => LedgerPayload::ItemVoted(ItemVoted::new(
                    ItemId::new(ITEMS[item]),
                    AgentId::new(AGENTS[voter]),
                    direction(approve),
                    ts,
                )),
                Op::Finalize { item, approve } => LedgerPayload::ItemFinalized(ItemFinalized::new(
                    direction(approve).outcome(),
                    ItemId::new(ITEMS[item]),
                    AgentId::new("alice"),
                    vec![],
                    ts,
                )),
            };
            Event {
                topic_id: TopicId::new("0.0.200"),
                sequence_number: i as u64 + 1,
                consensus_timestamp: ConsensusTimestamp::new(i as u64, 0),
                payload,
            }
        })
        .collect()
}

fn fold(events: &[Event], threshold: u32) -> FoldedLog {
    EventFolder::new(ConsensusParams::new(threshold)).fold(events)
}

proptest! {
    /// Folding the same sequence twice yields identical aggregates.
    #[test]
    fn fold_is_idempotent(ops in prop::collection::vec(op(), 0..60), threshold in 1u32..4) {
        let events = to_events(&ops);
        prop_assert_eq!(fold(&events, threshold), fold(&events, threshold));
    }

    /// No counted vote is ever a self-vote or a repeat.
    #[test]
    fn counted_votes_are_unique_and_never_self(ops in prop::collection::vec(op(), 0..60)) {
        let folded = fold(&to_events(&ops), 2);
        for (item_id, votes) in &folded.votes_by_item {
            let author = &folded.submissions[item_id].author;
            let mut seen = std::collections::HashSet::new();
            for vote in votes {
                prop_assert_ne!(&vote.voter, author);
                prop_assert!(seen.insert(vote.voter.clone()), "voter counted twice");
            }
        }
    }

    /// Tallies never pass the threshold, and nothing counts after a finalized event.
    #[test]
    fn finalization_is_terminal(ops in prop::collection::vec(op(), 0..60), threshold in 1u32..4) {
        let folded = fold(&to_events(&ops), threshold);
        for item_id in folded.submissions.keys() {
            let tally = folded.tally(item_id);
            prop_assert!(tally.approvals <= threshold && tally.rejections <= threshold);
            if let Some(fin) = folded.finalized_by_item.get(item_id) {
                for vote in folded.votes(item_id) {
                    prop_assert!(vote.sequence_number < fin.sequence_number);
                }
            }
        }
    }

    /// A terminal status seen on a prefix of the log persists on every extension.
    #[test]
    fn terminal_status_survives_log_growth(
        ops in prop::collection::vec(op(), 1..60),
        cut in any::<prop::sample::Index>(),
    ) {
        let events = to_events(&ops);
        let prefix_len = cut.index(events.len());
        let prefix = fold(&events[..prefix_len], 2);
        let full = fold(&events, 2);
        for item_id in prefix.submissions.keys() {
            let before = prefix.status(item_id);
            if before.is_terminal() {
                prop_assert_eq!(before, full.status(item_id));
                prop_assert_eq!(prefix.tally(item_id), full.tally(item_id));
            }
        }
    }

    /// Admission refuses the author in every ledger state, and refuses anyone
    /// who already voted.
    #[test]
    fn admission_rules_hold(
        ops in prop::collection::vec(op(), 0..60),
        item in 0..ITEMS.len(),
        voter in 0..AGENTS.len(),
        approve in any::<bool>(),
    ) {
        let folded = fold(&to_events(&ops), 2);
        let candidate = CandidateVote {
            item_id: ItemId::new(ITEMS[item]),
            voter: AgentId::new(AGENTS[voter]),
            direction: direction(approve),
        };
        let result = VoteAdmission.admit(&folded, &candidate);
        match folded.submission(&candidate.item_id) {
            None => prop_assert!(matches!(result, Err(AdmissionError::ItemNotFound(_)))),
            Some(sub) if sub.author == candidate.voter => {
                prop_assert!(matches!(result, Err(AdmissionError::SelfVoteForbidden { .. })), "expected SelfVoteForbidden");
            }
            Some(_) if folded.has_voted(&candidate.item_id, &candidate.voter) => {
                prop_assert!(matches!(result, Err(AdmissionError::DuplicateVote { .. })), "expected DuplicateVote");
            }
            Some(_) => {
                let status = folded.status(&candidate.item_id);
                if status.is_terminal() {
                    prop_assert!(matches!(result, Err(AdmissionError::AlreadyFinalized { .. })), "expected AlreadyFinalized");
                } else {
                    prop_assert!(result.is_ok());
                }
                prop_assert_eq!(status == ItemStatus::Pending, result.is_ok());
            }
        }
    }
}

#[test]
fn threshold_outcomes_match_direction() {
    let ops = vec![
        Op::Submit { item: 0, author: 0 },
        Op::Vote { item: 0, voter: 1, approve: false },
        Op::Vote { item: 0, voter: 2, approve: false },
    ];
    let folded = fold(&to_events(&ops), 2);
    assert_eq!(folded.missing_finalization(&ItemId::new("kb-1")), Some(Outcome::Rejected));
}
