//! Scale test: thousands of paths in one graph and a large wallet.
//!
//! Validates that resolution stays correct as fan-out and depth grow and
//! that snapshots survive a file round-trip at size.

use cpk::graph::{parse_path, PathStep};
use cpk::{
    CpkError, CryptoAdapter, FileBackend, GraphStore, Record, Service, StoreOptions, Wallet,
};

struct Plain;

impl CryptoAdapter for Plain {
    fn encrypt(&self, plaintext: &[u8]) -> cpk::Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> cpk::Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

fn user_path(service: usize, user: usize) -> Vec<PathStep> {
    vec![
        PathStep::attr_value("service", format!("svc{service}")),
        PathStep::attr_value("user", format!("user{user}")),
        PathStep::attr("password"),
    ]
}

#[test]
fn stress_10k_paths_create_and_find() {
    let mut store = GraphStore::in_memory().unwrap();
    let mut ids = Vec::with_capacity(10_000);

    for service in 0..100 {
        for user in 0..100 {
            let id = store
                .resolve(&user_path(service, user), true)
                .expect("create should succeed");
            ids.push(id);
        }
    }
    store.commit().unwrap();

    // root + 100 services + 10K users + 10K password nodes
    assert_eq!(store.node_count(), 1 + 100 + 10_000 + 10_000);
    assert_eq!(store.registry().len(), 4);

    for service in 0..100 {
        for user in 0..100 {
            let found = store.find(&user_path(service, user)).unwrap();
            assert_eq!(found, ids[service * 100 + user]);
        }
    }

    // Resolving again in create mode creates nothing.
    store.resolve(&user_path(42, 42), true).unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn stress_deep_path() {
    let mut store = GraphStore::in_memory().unwrap();
    let tokens: Vec<String> = (0..500).map(|i| format!("level{i}=v{i}")).collect();
    let path = parse_path(&tokens).unwrap();

    let leaf = store.resolve(&path, true).unwrap();
    store.commit().unwrap();
    assert_eq!(store.node_count(), 501);
    assert_eq!(store.find(&path).unwrap(), leaf);

    let mut broken = path.clone();
    broken[250] = PathStep::attr_value("level250", "other");
    assert!(matches!(
        store.find(&broken),
        Err(CpkError::PathNotFound { .. })
    ));
}

#[test]
fn stress_file_snapshot_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");

    let mut store = GraphStore::open(FileBackend::new(&path), StoreOptions::default()).unwrap();
    for service in 0..20 {
        for user in 0..50 {
            store.resolve(&user_path(service, user), true).unwrap();
        }
    }
    store.commit().unwrap();
    let before = store.snapshot();
    drop(store);

    let reopened = GraphStore::open(FileBackend::new(&path), StoreOptions::default()).unwrap();
    assert_eq!(reopened.snapshot(), before);
    let leaf = reopened.find(&user_path(19, 49)).unwrap();
    assert_eq!(reopened.parents(leaf).unwrap()[0].value, "user49");
}

#[test]
fn stress_wallet_5k_records() {
    let web = Service::new("web", ["user"], ["pass"]).unwrap();
    let mut wallet = Wallet::new();
    wallet.add_service(web.clone()).unwrap();
    for i in 0..5_000 {
        let user = format!("user{i}");
        let pass = format!("pass{i}");
        let record =
            Record::new(&web, [("user", user.as_str()), ("pass", pass.as_str())]).unwrap();
        wallet.add_record(record).unwrap();
    }

    let bytes = wallet.encode(&Plain).unwrap();
    let decoded = Wallet::decode(&bytes, &Plain).unwrap();
    assert_eq!(decoded.records().len(), 5_000);
    assert_eq!(decoded.records()[4_999].get("pass"), Some("pass4999"));
    assert_eq!(decoded, wallet);
}
