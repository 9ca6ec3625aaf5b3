use ble_service_browser_lib::core::bluetooth::{
    ConnectionState, DedupPolicy, PeripheralId, PeripheralRegistry,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Discover { id: u8, name: Option<u8>, rssi: i16 },
    Remove(u8),
    Connect(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6, proptest::option::of(0u8..3), -100i16..0)
            .prop_map(|(id, name, rssi)| Op::Discover { id, name, rssi }),
        1 => (0u8..6).prop_map(Op::Remove),
        1 => (0u8..6).prop_map(Op::Connect),
    ]
}

fn policy() -> impl Strategy<Value = DedupPolicy> {
    prop_oneof![
        Just(DedupPolicy::Identifier),
        Just(DedupPolicy::IdentifierThenName),
    ]
}

fn apply(registry: &mut PeripheralRegistry, op: &Op) {
    match op {
        Op::Discover { id, name, rssi } => {
            registry.on_discovered(
                PeripheralId::new(format!("dev-{id}")),
                name.map(|n| format!("name-{n}")),
                Some(*rssi),
            );
        }
        Op::Remove(id) => {
            registry.on_removed(&PeripheralId::new(format!("dev-{id}")));
        }
        Op::Connect(id) => {
            registry.set_state(&PeripheralId::new(format!("dev-{id}")), ConnectionState::Connected);
        }
    }
}

proptest! {
    #[test]
    fn identifiers_stay_unique(policy in policy(), ops in proptest::collection::vec(op(), 0..64)) {
        let mut registry = PeripheralRegistry::new(policy);
        for op in &ops {
            apply(&mut registry, op);
        }

        let mut ids: Vec<_> = registry.records().iter().map(|r| r.id.clone()).collect();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), len);
    }

    #[test]
    fn rediscovery_keeps_position(policy in policy(), ops in proptest::collection::vec(op(), 0..32), rssi in -100i16..0) {
        let mut registry = PeripheralRegistry::new(policy);
        for op in &ops {
            apply(&mut registry, op);
        }
        let before: Vec<_> = registry.records().iter().map(|r| r.id.clone()).collect();

        for id in &before {
            registry.on_discovered(id.clone(), None, Some(rssi));
        }

        let after: Vec<_> = registry.records().iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(&before, &after);
        prop_assert!(registry.records().iter().all(|r| r.rssi == Some(rssi)));
    }
}
