//! Property-based invariant tests for vector-link mutation replay.
//!
//! These verify, for arbitrary edit scripts of Insert/Erase/Set events:
//!
//! 1. Replay equivalence: the sink always equals the result of applying the
//!    same edit script to a plain `Vec` reference model starting from the
//!    initial snapshot.
//! 2. Lockstep: shadow-array length equals sink length after every event.
//! 3. Release-exactly-once: no double release is ever recorded, and after
//!    `unlink` every retained reference has been released.
//! 4. Ordering: events are applied in delivery order with no coalescing
//!    (implied by 1, since the model applies them one at a time).

use proptest::prelude::*;

use oblink::memory::{HandleLedger, LedgerHandle, MemoryVector};
use oblink::{Payload, VectorLink, VectorLinkBuilder};

type Source = MemoryVector<u32, LedgerHandle>;

/// One step of an edit script. Indices are raw and reduced modulo the
/// current length when applied.
#[derive(Debug, Clone)]
enum ScriptOp {
    Insert { slot: usize, value: u32, managed: bool },
    Erase { slot: usize },
    Set { slot: usize, value: u32, managed: bool },
}

fn op_strategy() -> impl Strategy<Value = ScriptOp> {
    prop_oneof![
        (any::<usize>(), any::<u32>(), any::<bool>()).prop_map(|(slot, value, managed)| {
            ScriptOp::Insert {
                slot,
                value,
                managed,
            }
        }),
        any::<usize>().prop_map(|slot| ScriptOp::Erase { slot }),
        (any::<usize>(), any::<u32>(), any::<bool>()).prop_map(|(slot, value, managed)| {
            ScriptOp::Set {
                slot,
                value,
                managed,
            }
        }),
    ]
}

fn initial_strategy() -> impl Strategy<Value = Vec<(u32, bool)>> {
    proptest::collection::vec((any::<u32>(), any::<bool>()), 0..8)
}

fn script_strategy() -> impl Strategy<Value = Vec<ScriptOp>> {
    proptest::collection::vec(op_strategy(), 0..40)
}

/// Projection used for both the sink and the reference model: plain values
/// and managed resources map to distinct strings.
fn projected(payload: &Payload<u32, LedgerHandle>) -> String {
    match payload {
        Payload::Plain(v) => format!("p{v}"),
        Payload::Managed(h) => format!("m{}", h.resource()),
    }
}

struct Fixture {
    ledger: HandleLedger,
    source: Source,
    next_resource: u32,
}

impl Fixture {
    fn new() -> Self {
        Self {
            ledger: HandleLedger::new(),
            source: Source::new(),
            next_resource: 0,
        }
    }

    fn payload(&mut self, value: u32, managed: bool) -> Payload<u32, LedgerHandle> {
        if managed {
            let name = format!("r{}", self.next_resource);
            self.next_resource += 1;
            Payload::Managed(self.ledger.issue(&name))
        } else {
            Payload::Plain(value)
        }
    }

    /// Apply one script op to the source and, in parallel, to the reference
    /// model. Ops that cannot apply to the current length are reduced to a
    /// valid position (or skipped when the sequence is empty).
    fn step(&mut self, op: &ScriptOp, model: &mut Vec<String>) {
        let len = model.len();
        match op {
            ScriptOp::Insert {
                slot,
                value,
                managed,
            } => {
                let index = slot % (len + 1);
                let payload = self.payload(*value, *managed);
                model.insert(index, projected(&payload));
                self.source.insert(index, payload).unwrap();
            }
            ScriptOp::Erase { slot } => {
                if len == 0 {
                    return;
                }
                let index = slot % len;
                model.remove(index);
                self.source.remove(index).unwrap();
            }
            ScriptOp::Set {
                slot,
                value,
                managed,
            } => {
                if len == 0 {
                    return;
                }
                let index = slot % len;
                let payload = self.payload(*value, *managed);
                model[index] = projected(&payload);
                self.source.set(index, payload).unwrap();
            }
        }
    }
}

fn build_link(fixture: &Fixture) -> VectorLink<Source, String> {
    VectorLinkBuilder::new()
        .source(&fixture.source)
        .view_model(|payload: Payload<u32, LedgerHandle>| projected(&payload))
        .link()
        .unwrap()
}

proptest! {
    #[test]
    fn replay_matches_reference_model(
        initial in initial_strategy(),
        script in script_strategy(),
    ) {
        let mut fixture = Fixture::new();
        let mut model = Vec::new();
        for (value, managed) in initial {
            let payload = fixture.payload(value, managed);
            model.push(projected(&payload));
            fixture.source.push(payload).unwrap();
        }

        let link = build_link(&fixture);
        prop_assert_eq!(link.sink().to_vec(), model.clone());

        for op in &script {
            fixture.step(op, &mut model);
            prop_assert_eq!(link.sink().to_vec(), model.clone());
            prop_assert_eq!(link.shadow_len(), link.sink().len());
            prop_assert_eq!(fixture.ledger.double_release_count(), 0);
        }
    }

    #[test]
    fn every_retained_reference_is_released_exactly_once(
        initial in initial_strategy(),
        script in script_strategy(),
    ) {
        let mut fixture = Fixture::new();
        let mut model = Vec::new();
        for (value, managed) in initial {
            let payload = fixture.payload(value, managed);
            model.push(projected(&payload));
            fixture.source.push(payload).unwrap();
        }

        let link = build_link(&fixture);
        for op in &script {
            fixture.step(op, &mut model);
        }

        let _sink = link.unlink();
        prop_assert_eq!(
            fixture.ledger.retained_count(),
            fixture.ledger.released_count()
        );
        prop_assert_eq!(fixture.ledger.double_release_count(), 0);
        prop_assert_eq!(fixture.ledger.live_retained_count(), 0);
    }
}
