// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based tests using proptest.
//!
//! These tests verify that stored values read back unchanged, that reads are newest first,
//! and that identifiers behave consistently for arbitrary inputs.

use proptest::prelude::*;
use std::collections::BTreeMap;
use verscfg::adapters::MemoryStore;
use verscfg::domain::{ConfigDomain, ConfigKey, MAX_IDENTIFIER_LEN};
use verscfg::service::ConfigStore;

fn store() -> ConfigStore {
    ConfigStore::new(MemoryStore::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_string_round_trip(value in ".*") {
        let store = store();
        store.set("d", "k", value.clone()).unwrap();
        prop_assert_eq!(store.get("d", "k", String::new()).unwrap(), vec![value]);
    }

    #[test]
    fn prop_map_round_trip(value in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..32)) {
        let store = store();
        store.set("d", "k", value.clone()).unwrap();
        let read: Vec<BTreeMap<String, i64>> = store.get_by_type("d", "k").unwrap();
        prop_assert_eq!(read, vec![value]);
    }

    #[test]
    fn prop_reads_are_newest_first(values in prop::collection::vec(any::<u32>(), 1..16), count in 0usize..20) {
        let store = store();
        for value in &values {
            store.set("d", "k", *value).unwrap();
        }

        let read: Vec<u32> = store.get_by_type_versions("d", "k", count).unwrap();
        let expected: Vec<u32> = values.iter().rev().take(count).copied().collect();
        prop_assert_eq!(read, expected);

        let entries = store.entries::<u32>("d", "k", values.len()).unwrap();
        let versions: Vec<u64> = entries.iter().map(|e| e.version).collect();
        let expected_versions: Vec<u64> = (1..=values.len() as u64).rev().collect();
        prop_assert_eq!(versions, expected_versions);
    }

    #[test]
    fn prop_default_only_when_empty(default in any::<i32>(), stored in prop::option::of(any::<i32>())) {
        let store = store();
        if let Some(value) = stored {
            store.set("d", "k", value).unwrap();
        }
        let read = store.get("d", "k", default).unwrap();
        prop_assert_eq!(read, vec![stored.unwrap_or(default)]);
    }

    #[test]
    fn prop_identifier_round_trip(name in "[a-zA-Z0-9_.-]{1,64}") {
        let key = ConfigKey::from(name.as_str());
        prop_assert_eq!(key.as_str(), name.as_str());
        prop_assert_eq!(key.to_string(), name.clone());
        prop_assert!(key.validate().is_ok());
        prop_assert_eq!(ConfigDomain::from(name.clone()).into_string(), name);
    }

    #[test]
    fn prop_oversized_identifiers_rejected(extra in 1usize..64) {
        let name = "x".repeat(MAX_IDENTIFIER_LEN + extra);
        prop_assert!(ConfigKey::from(name.as_str()).validate().is_err());
        prop_assert!(ConfigDomain::from(name).validate().is_err());
    }

    #[test]
    fn prop_domains_never_leak(a in any::<i64>(), b in any::<i64>()) {
        let store = store();
        store.set("left", "k", a).unwrap();
        store.set("right", "k", b).unwrap();
        prop_assert_eq!(store.get("left", "k", 0i64).unwrap(), vec![a]);
        prop_assert_eq!(store.get("right", "k", 0i64).unwrap(), vec![b]);
    }
}
