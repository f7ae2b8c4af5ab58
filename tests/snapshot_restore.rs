#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the snapshot, apply and restore cycle.
//!
//! These tests drive [`MutationEngine`] over in-memory stores and pin the
//! engine's observable contract: restore returns a host to its captured
//! state, repeated applies are no-ops, invalid values never reach a store,
//! and one successful adapter is enough for the operation to succeed.

mod common;

use hosttune::domains::Domain;
use hosttune::error::{EngineError, ValidationError};
use hosttune::logging::Logger;
use hosttune::mutation::{MutationEngine, MutationRequest, ResourceOutcome};
use hosttune::resources::{Resource, StaticInventory};
use hosttune::setting::{Desired, SettingValue};
use hosttune::snapshot::SnapshotStore;
use hosttune::store::MemoryStore;

use common::{adapters, class_key};

struct Host {
    store: MemoryStore,
    inventory: StaticInventory,
    snapshots: SnapshotStore,
    log: Logger,
    dir: tempfile::TempDir,
}

impl Host {
    fn new(store: MemoryStore, resources: Vec<Resource>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            store,
            inventory: StaticInventory::new(resources),
            snapshots: SnapshotStore::new(dir.path()),
            log: Logger::new("test"),
            dir,
        }
    }

    fn engine(&self, domain: Domain) -> MutationEngine<'_> {
        MutationEngine::new(
            domain.spec(),
            &self.store,
            &self.inventory,
            &self.snapshots,
            &self.log,
        )
    }
}

fn mtu(value: i64) -> MutationRequest {
    MutationRequest {
        values: vec![("MTU".to_string(), Desired::Set(SettingValue::Integer(value)))],
        resource_filter: None,
        take_snapshot: true,
    }
}

fn preset(domain: Domain, name: &str) -> MutationRequest {
    MutationRequest {
        values: domain.spec().preset_values(name).unwrap(),
        resource_filter: None,
        take_snapshot: true,
    }
}

#[test]
fn restore_returns_mtu_to_captured_value() {
    let host = Host::new(
        MemoryStore::new().with_value("Ethernet", "MTU", SettingValue::Integer(1500)),
        vec![Resource::new("1", "Ethernet")],
    );
    let engine = host.engine(Domain::Mtu);

    let applied = engine.apply(&mtu(1400)).unwrap();
    assert!(applied.is_success());
    assert_eq!(host.store.get("Ethernet", "MTU"), Some(SettingValue::Integer(1400)));

    let restored = engine.restore(None).unwrap();
    assert_eq!(restored.summary(), "1 of 1 succeeded");
    assert_eq!(host.store.get("Ethernet", "MTU"), Some(SettingValue::Integer(1500)));
}

#[test]
fn restore_deletes_values_that_were_absent() {
    let host = Host::new(
        MemoryStore::new()
            .with_key(&class_key("1"))
            .with_key(&class_key("2")),
        adapters(),
    );
    let engine = host.engine(Domain::Lso);

    engine.apply(&preset(Domain::Lso, "disable")).unwrap();
    assert!(host.store.get(&class_key("2"), "*LsoV2IPv4").is_some());

    let restored = engine.restore(None).unwrap();
    assert_eq!(restored.succeeded, 2);
    for id in ["1", "2"] {
        assert_eq!(host.store.get(&class_key(id), "*LsoV2IPv4"), None);
        assert_eq!(host.store.get(&class_key(id), "*LsoV2IPv6"), None);
    }
}

#[test]
fn restore_twice_changes_nothing_the_second_time() {
    let host = Host::new(
        MemoryStore::new().with_value("Ethernet", "MTU", SettingValue::Integer(1500)),
        vec![Resource::new("1", "Ethernet")],
    );
    let engine = host.engine(Domain::Mtu);
    engine.apply(&mtu(1400)).unwrap();
    engine.restore(None).unwrap();
    let writes = host.store.mutation_count();

    let again = engine.restore(None).unwrap();
    assert_eq!(host.store.mutation_count(), writes);
    assert_eq!(again.reports[0].outcome, ResourceOutcome::Skipped);
}

#[test]
fn apply_twice_writes_once() {
    let host = Host::new(
        MemoryStore::new().with_key(&class_key("1")),
        vec![Resource::new("1", "Ethernet")],
    );
    let engine = host.engine(Domain::Lso);
    engine.apply(&preset(Domain::Lso, "disable")).unwrap();
    let writes = host.store.mutation_count();

    let again = engine.apply(&preset(Domain::Lso, "disable")).unwrap();
    assert!(again.is_success());
    assert_eq!(again.reports[0].outcome, ResourceOutcome::Skipped);
    assert_eq!(host.store.mutation_count(), writes);
}

#[test]
fn mtu_bounds_are_checked_before_any_write() {
    for (value, accepted) in [(575, false), (576, true), (9000, true), (9001, false)] {
        let host = Host::new(
            MemoryStore::new().with_value("Ethernet", "MTU", SettingValue::Integer(1500)),
            vec![Resource::new("1", "Ethernet")],
        );
        let outcome = host.engine(Domain::Mtu).apply(&mtu(value));
        if accepted {
            assert!(outcome.unwrap().is_success(), "MTU {value}");
        } else {
            assert!(
                matches!(
                    outcome,
                    Err(EngineError::Validation(
                        ValidationError::BelowMinimum { .. } | ValidationError::AboveMaximum { .. }
                    ))
                ),
                "MTU {value}"
            );
            assert_eq!(host.store.mutation_count(), 0, "MTU {value}");
            assert!(
                !host.dir.path().join("mtu_backup.json").exists(),
                "MTU {value} must not snapshot"
            );
        }
    }
}

#[test]
fn one_writable_adapter_of_three_is_success() {
    let resources = vec![
        Resource::new("1", "Ethernet"),
        Resource::new("2", "Wi-Fi"),
        Resource::new("3", "Ethernet 2"),
    ];
    let host = Host::new(
        MemoryStore::new()
            .with_key(&class_key("1"))
            .with_key(&class_key("2"))
            .with_key(&class_key("3"))
            .deny_writes(&class_key("1"))
            .deny_writes(&class_key("3")),
        resources.clone(),
    );
    let result = host
        .engine(Domain::AdapterPower)
        .apply(&preset(Domain::AdapterPower, "disable-saving"))
        .unwrap();
    assert_eq!((result.attempted, result.succeeded), (3, 1));
    assert!(result.is_success());

    let locked = Host::new(
        MemoryStore::new()
            .with_key(&class_key("1"))
            .with_key(&class_key("2"))
            .with_key(&class_key("3"))
            .deny_writes(&class_key("1"))
            .deny_writes(&class_key("2"))
            .deny_writes(&class_key("3")),
        resources,
    );
    let result = locked
        .engine(Domain::AdapterPower)
        .apply(&preset(Domain::AdapterPower, "disable-saving"))
        .unwrap();
    assert_eq!((result.attempted, result.succeeded), (3, 0));
    assert!(!result.is_success());
}

#[test]
fn restore_without_snapshot_is_nothing_to_do() {
    let host = Host::new(MemoryStore::new(), adapters());
    let result = host.engine(Domain::Dns).restore(None).unwrap();
    assert_eq!(result.attempted, 0);
    assert!(!result.is_success());
    assert_eq!(host.store.mutation_count(), 0);
}

#[test]
fn snapshot_document_is_readable_json() {
    let host = Host::new(
        MemoryStore::new().with_value("Ethernet", "MTU", SettingValue::Integer(1500)),
        vec![Resource::new("1", "Ethernet")],
    );
    let result = host.engine(Domain::Mtu).apply(&mtu(1450)).unwrap();
    let path = result.snapshot.unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["domain"], "mtu");
    assert_eq!(json["scopes"]["Ethernet"]["settings"]["MTU"]["state"], "present");
}

/// Disabling the update services and restoring puts every start type back,
/// including a service whose `Start` value was never set.
#[test]
fn service_start_types_are_restored() {
    let services = hosttune::domains::UPDATE_SERVICES;
    let store = MemoryStore::new()
        .with_key(services[0].1)
        .with_value(services[1].1, "Start", SettingValue::Integer(3))
        .with_value(services[2].1, "Start", SettingValue::Integer(2))
        .with_value(services[3].1, "Start", SettingValue::Integer(3));
    let host = Host::new(store, vec![]);
    let engine = host.engine(Domain::UpdateServices);
    let before: Vec<Option<SettingValue>> =
        services.iter().map(|(_, key)| host.store.get(key, "Start")).collect();

    let request = MutationRequest {
        values: Domain::UpdateServices.spec().preset_values("disable").unwrap(),
        resource_filter: None,
        take_snapshot: true,
    };
    let applied = engine.apply(&request).unwrap();
    assert_eq!((applied.succeeded, applied.attempted), (4, 4));
    for (_, key) in services {
        assert_eq!(host.store.get(key, "Start"), Some(SettingValue::Integer(4)));
    }

    let restored = engine.restore(None).unwrap();
    assert!(restored.is_success());
    let after: Vec<Option<SettingValue>> =
        services.iter().map(|(_, key)| host.store.get(key, "Start")).collect();
    assert_eq!(after, before);
    assert_eq!(after[0], None);
}
