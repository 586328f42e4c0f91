//! Property-based tests for subscriptions and rosters.

use std::{collections::BTreeSet, time::Duration};

use proptest::prelude::*;
use talkroom_core::{RosterStore, SubscriptionManager, TrackingMode};

const ROOMS: [&str; 4] = ["lobby", "dev", "ops", "random"];
const PEOPLE: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Debug, Clone)]
enum SubscriptionOp {
    Track(usize),
    Untrack(usize),
}

fn subscription_op() -> impl Strategy<Value = SubscriptionOp> {
    prop_oneof![
        (0..ROOMS.len()).prop_map(SubscriptionOp::Track),
        (0..ROOMS.len()).prop_map(SubscriptionOp::Untrack),
    ]
}

#[derive(Debug, Clone)]
enum RosterOp {
    Join(usize, usize),
    Leave(usize, usize),
}

fn roster_op() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        3 => (0..ROOMS.len(), 0..PEOPLE.len()).prop_map(|(r, p)| RosterOp::Join(r, p)),
        1 => (0..ROOMS.len(), 0..PEOPLE.len()).prop_map(|(r, p)| RosterOp::Leave(r, p)),
    ]
}

proptest! {
    /// The subscribed set is exactly "tracked minus untracked", however
    /// often either call repeats.
    #[test]
    fn prop_track_untrack_idempotent(ops in prop::collection::vec(subscription_op(), 0..80)) {
        let mut subs: SubscriptionManager<Duration> = SubscriptionManager::new(TrackingMode::Eager);
        let mut model = BTreeSet::new();

        for op in &ops {
            match op {
                SubscriptionOp::Track(r) => {
                    let _ = subs.track(ROOMS[*r], Duration::ZERO);
                    model.insert(ROOMS[*r]);
                },
                SubscriptionOp::Untrack(r) => {
                    let _ = subs.untrack(ROOMS[*r]);
                    model.remove(ROOMS[*r]);
                },
            }
        }

        let subscribed: BTreeSet<&str> =
            ROOMS.iter().copied().filter(|room| subs.get(room).is_some()).collect();
        prop_assert_eq!(subscribed, model.clone());

        let with_roster: BTreeSet<&str> = subs.rosters().rooms().collect();
        prop_assert_eq!(with_roster, model);
    }

    /// A repeated track never issues a second join for the same room.
    #[test]
    fn prop_one_join_per_subscription(rooms in prop::collection::vec(0..ROOMS.len(), 0..40)) {
        let mut subs: SubscriptionManager<Duration> = SubscriptionManager::new(TrackingMode::Eager);
        let joins = subs.track_all(rooms.iter().map(|r| ROOMS[*r]), Duration::ZERO);

        let distinct: BTreeSet<usize> = rooms.iter().copied().collect();
        prop_assert_eq!(joins.len(), distinct.len());
    }

    /// Rosters never hold duplicates and keep first-join order.
    #[test]
    fn prop_roster_set_semantics(ops in prop::collection::vec(roster_op(), 0..100)) {
        let mut store = RosterStore::new();
        let mut model: Vec<Vec<&str>> = vec![Vec::new(); ROOMS.len()];
        for room in ROOMS {
            store.ensure(room);
        }

        for op in &ops {
            match op {
                RosterOp::Join(r, p) => {
                    let added = store.insert(ROOMS[*r], PEOPLE[*p]);
                    let expected = !model[*r].contains(&PEOPLE[*p]);
                    if expected {
                        model[*r].push(PEOPLE[*p]);
                    }
                    prop_assert_eq!(added, expected);
                },
                RosterOp::Leave(r, p) => {
                    let removed = store.remove(ROOMS[*r], PEOPLE[*p]);
                    let expected = model[*r].contains(&PEOPLE[*p]);
                    model[*r].retain(|m| *m != PEOPLE[*p]);
                    prop_assert_eq!(removed, expected);
                },
            }
        }

        for (r, room) in ROOMS.iter().enumerate() {
            prop_assert_eq!(store.snapshot(room), model[r].clone());
        }
    }
}
