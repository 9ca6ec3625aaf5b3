//! Deduplicated, insertion-ordered list of discovered peripherals.

use log::{debug, info};

use crate::core::bluetooth::types::{
    ConnectionState, PeripheralId, PeripheralRecord, PeripheralUpdate,
};

/// How a newly discovered identifier is matched against existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// One record per platform identifier.
    #[default]
    Identifier,
    /// As `Identifier`, but an unseen identifier whose advertised name equals
    /// an existing record's name replaces that record.
    IdentifierThenName,
}

/// Outcome of a registry mutation, with the position it touched.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    Added(usize),
    Updated(usize),
    /// A record was replaced in place by a same-named peripheral.
    Replaced { index: usize, previous: PeripheralId },
    Removed(usize),
}

/// The peripheral list shown by the browser.
///
/// Performs no I/O. Additions append; updates and removals happen in place.
#[derive(Debug, Default)]
pub struct PeripheralRegistry {
    records: Vec<PeripheralRecord>,
    policy: DedupPolicy,
}

impl PeripheralRegistry {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            records: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DedupPolicy) {
        self.policy = policy;
    }

    /// Applies a scan callback.
    pub fn on_discovered(
        &mut self,
        id: PeripheralId,
        name: Option<String>,
        rssi: Option<i16>,
    ) -> RegistryChange {
        if let Some(index) = self.position(&id) {
            let record = &mut self.records[index];
            if name.is_some() {
                record.name = name;
            }
            if rssi.is_some() {
                record.rssi = rssi;
            }
            debug!("Duplicate identifier {}, updating record in place", id);
            return RegistryChange::Updated(index);
        }

        if self.policy == DedupPolicy::IdentifierThenName {
            if let Some(index) = self.position_by_name(name.as_deref()) {
                let previous = self.records[index].id.clone();
                info!(
                    "Peripheral {} shares its name with {}, replacing the earlier record",
                    id, previous
                );
                self.records[index] = PeripheralRecord::new(id, name, rssi);
                return RegistryChange::Replaced { index, previous };
            }
        }

        info!("New peripheral {} ({:?}) added to the list", id, name);
        self.records.push(PeripheralRecord::new(id, name, rssi));
        RegistryChange::Added(self.records.len() - 1)
    }

    /// Merges a partial update; unknown identifiers are ignored.
    pub fn on_updated(&mut self, id: &PeripheralId, update: PeripheralUpdate) -> Option<RegistryChange> {
        let index = self.position(id)?;
        update.apply_to(&mut self.records[index]);
        Some(RegistryChange::Updated(index))
    }

    /// Removes the record for `id`, if present.
    pub fn on_removed(&mut self, id: &PeripheralId) -> Option<(RegistryChange, PeripheralRecord)> {
        let index = self.position(id)?;
        let record = self.records.remove(index);
        Some((RegistryChange::Removed(index), record))
    }

    /// Empties the registry at the start of a scan cycle.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Sets the connection state; unknown identifiers are ignored.
    pub fn set_state(&mut self, id: &PeripheralId, state: ConnectionState) -> Option<RegistryChange> {
        let index = self.position(id)?;
        self.records[index].state = state;
        Some(RegistryChange::Updated(index))
    }

    pub fn get(&self, id: &PeripheralId) -> Option<&PeripheralRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn get_at(&self, index: usize) -> Option<&PeripheralRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[PeripheralRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &PeripheralId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    fn position_by_name(&self, name: Option<&str>) -> Option<usize> {
        let name = name?;
        self.records
            .iter()
            .position(|r| r.name.as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PeripheralId {
        PeripheralId::new(s)
    }

    #[test]
    fn additions_keep_insertion_order() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), Some("A".into()), Some(-40));
        registry.on_discovered(id("b"), Some("B".into()), Some(-50));
        registry.on_discovered(id("c"), None, None);

        let ids: Vec<_> = registry.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn rediscovery_updates_in_place() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), Some("A".into()), Some(-40));
        registry.on_discovered(id("b"), Some("B".into()), Some(-50));

        let change = registry.on_discovered(id("a"), None, Some(-30));

        assert_eq!(change, RegistryChange::Updated(0));
        assert_eq!(registry.len(), 2);
        let a = registry.get(&id("a")).unwrap();
        assert_eq!(a.rssi, Some(-30));
        assert_eq!(a.name.as_deref(), Some("A"));
    }

    #[test]
    fn update_for_unknown_id_is_ignored() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), None, None);

        let change = registry.on_updated(&id("zz"), PeripheralUpdate {
            rssi: Some(-1),
            ..Default::default()
        });

        assert!(change.is_none());
        assert_eq!(registry.get(&id("a")).unwrap().rssi, None);
    }

    #[test]
    fn removal_is_in_place() {
        let mut registry = PeripheralRegistry::default();
        for name in ["a", "b", "c"] {
            registry.on_discovered(id(name), None, None);
        }

        let (change, removed) = registry.on_removed(&id("b")).unwrap();

        assert_eq!(change, RegistryChange::Removed(1));
        assert_eq!(removed.id, id("b"));
        let ids: Vec<_> = registry.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(registry.on_removed(&id("b")).is_none());
    }

    #[test]
    fn same_name_is_a_different_peripheral_by_default() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), Some("Keyfob".into()), None);
        registry.on_discovered(id("b"), Some("Keyfob".into()), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn name_fallback_replaces_same_named_record() {
        let mut registry = PeripheralRegistry::new(DedupPolicy::IdentifierThenName);
        registry.on_discovered(id("a"), Some("Keyfob".into()), None);
        registry.on_discovered(id("x"), Some("Other".into()), None);

        let change = registry.on_discovered(id("b"), Some("Keyfob".into()), Some(-20));

        assert_eq!(
            change,
            RegistryChange::Replaced {
                index: 0,
                previous: id("a")
            }
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_at(0).unwrap().id, id("b"));
    }

    #[test]
    fn name_fallback_never_matches_unnamed_peripherals() {
        let mut registry = PeripheralRegistry::new(DedupPolicy::IdentifierThenName);
        registry.on_discovered(id("a"), None, None);
        registry.on_discovered(id("b"), None, None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_then_replay_is_idempotent() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), Some("A".into()), Some(-40));
        let before = registry.records().to_vec();

        registry.clear();
        assert!(registry.is_empty());
        registry.on_discovered(id("a"), Some("A".into()), Some(-40));

        assert_eq!(registry.records(), before.as_slice());
    }

    #[test]
    fn state_changes_target_one_record() {
        let mut registry = PeripheralRegistry::default();
        registry.on_discovered(id("a"), None, None);
        registry.on_discovered(id("b"), None, None);

        registry.set_state(&id("b"), ConnectionState::Connecting);

        assert_eq!(registry.get(&id("a")).unwrap().state, ConnectionState::Disconnected);
        assert_eq!(registry.get(&id("b")).unwrap().state, ConnectionState::Connecting);
        assert!(registry.set_state(&id("c"), ConnectionState::Connected).is_none());
    }
}
