//! Integration tests for entry queries against an in-memory federation.

use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use wididit_core::{ClientError, Entry, QueryMode};
use wididit_testkit::prelude::*;

fn entryids(entries: &[Arc<Entry>]) -> BTreeSet<String> {
    entries.iter().map(|e| e.entryid()).collect()
}

#[test]
fn all_entries_of_a_host() {
    let test = scenarios::populated_federation(2);
    let entries = test.query(TEST_HOST).unwrap().fetch().unwrap();
    assert_eq!(entries.len(), 6);

    let requests = test.federation.requests();
    let listing = requests
        .iter()
        .find(|r| r.api_path() == "/entry/")
        .unwrap();
    assert!(listing.query.is_empty());
}

#[test]
fn filter_by_author() {
    let test = scenarios::populated_federation(2);
    let alice = test.user("alice");
    let entries = test
        .query(TEST_HOST)
        .unwrap()
        .filter_author(&alice)
        .fetch()
        .unwrap();
    assert_eq!(
        entryids(&entries),
        BTreeSet::from([
            "alice@test.wididit.net/1".to_string(),
            "alice@test.wididit.net/2".to_string(),
        ])
    );
    assert!(entries.iter().all(|e| *e.author() == alice));
}

#[test]
fn authors_accumulate() {
    let test = scenarios::populated_federation(1);
    let query = test
        .query(TEST_HOST)
        .unwrap()
        .filter_author("alice@test.wididit.net")
        .filter_author("bob@test.wididit.net");
    test.federation.clear_requests();
    let entries = query.fetch().unwrap();
    assert_eq!(entries.len(), 2);

    let requests = test.federation.requests();
    let listings: Vec<_> = requests
        .iter()
        .filter(|r| r.api_path() == "/entry/")
        .collect();
    assert_eq!(listings.len(), 1);
    assert_eq!(
        listings[0].query_values("author"),
        vec!["alice@test.wididit.net", "bob@test.wididit.net"]
    );
}

#[test]
fn authors_outside_the_registration_pattern() {
    let test = scenarios::populated_federation(1);
    let userid = test.federation.add_user("Al", TEST_HOST, "pw");
    test.federation
        .add_entry(&userid, json!({"content": "legacy account", "title": ""}));

    let entries = test.query(TEST_HOST).unwrap().fetch().unwrap();
    assert_eq!(entries.len(), 4);
    let legacy = entries
        .iter()
        .find(|e| e.author().username() == "Al")
        .unwrap();
    assert_eq!(legacy.entryid(), "Al@test.wididit.net/1");
    assert_eq!(legacy.content(), "legacy account");
}

#[test]
fn filter_by_content() {
    let test = scenarios::populated_federation(2);
    let entries = test
        .query(TEST_HOST)
        .unwrap()
        .filter_content("bob")
        .filter_content("entry 2")
        .fetch()
        .unwrap();
    assert_eq!(
        entryids(&entries),
        BTreeSet::from(["bob@test.wididit.net/2".to_string()])
    );
    assert_eq!(entries[0].content(), "bob entry 2");
}

#[test]
fn shared_only() {
    let test = scenarios::social_federation(2);
    let entries = test
        .query(TEST_HOST)
        .unwrap()
        .allow_native(false)
        .allow_shared(true)
        .fetch()
        .unwrap();
    assert_eq!(
        entryids(&entries),
        BTreeSet::from(["alice@test.wididit.net/1".to_string()])
    );
}

#[test]
fn nothing_allowed_is_empty() {
    let test = scenarios::social_federation(1);
    let entries = test
        .query(TEST_HOST)
        .unwrap()
        .allow_native(false)
        .fetch()
        .unwrap();
    assert!(entries.is_empty());
}

#[test]
fn timeline_of_connected_user() {
    let test = scenarios::social_federation(2);
    test.connect("tester");
    let query = test.timeline(TEST_HOST).unwrap();
    assert_eq!(query.mode(), QueryMode::Timeline);

    let entries = query.fetch().unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries
        .iter()
        .all(|e| matches!(e.author().username(), "alice" | "bob")));
}

#[test]
fn timeline_requires_connection() {
    let test = scenarios::social_federation(1);
    test.federation.clear_requests();
    let err = test.timeline(TEST_HOST).unwrap_err();
    assert!(matches!(err, ClientError::Forbidden { .. }));
    assert_eq!(test.federation.request_count(), 0);
}

#[test]
fn listed_entries_are_shared_instances() {
    let test = scenarios::populated_federation(1);
    let direct = test.entry("alice@test.wididit.net", 1).unwrap();
    let listed = test
        .query(TEST_HOST)
        .unwrap()
        .filter_author("alice@test.wididit.net")
        .fetch()
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(Arc::ptr_eq(&direct, &listed[0]));
}

#[test]
fn listing_refreshes_cached_entries() {
    let test = scenarios::populated_federation(1);
    let tester = test.connect("tester");
    let entry = test.entry(&tester, 1).unwrap();
    let before = entry.updated();

    entry.set_title("renamed").unwrap();
    test.query(TEST_HOST)
        .unwrap()
        .filter_author(&tester)
        .fetch()
        .unwrap();
    assert_eq!(entry.title(), "renamed");
    assert!(entry.updated() > before);
}

#[test]
fn unreachable_host() {
    let test = scenarios::populated_federation(1);
    let query = test.query(TEST_HOST).unwrap();
    test.federation.set_unreachable(TEST_HOST, true);
    let err = query.fetch().unwrap_err();
    assert!(matches!(err, ClientError::Unreachable { ref hostname } if hostname == TEST_HOST));
    assert!(err.is_server_error());
}
