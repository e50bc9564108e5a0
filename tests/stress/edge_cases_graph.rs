//! Edge case tests: path resolution, ambiguity, password nodes, attribute
//! conflicts, backend failures and token parsing.

use cpk::graph::{parse_path, AttrRef, NodeId, PathStep};
use cpk::{Backend, CpkError, GraphSnapshot, GraphStore, MemoryBackend, StoreOptions};

fn store() -> GraphStore {
    GraphStore::in_memory().expect("in-memory store")
}

/// Backend whose saves can be switched off.
#[derive(Default)]
struct FlakyBackend {
    inner: MemoryBackend,
    fail: bool,
}

impl Backend for FlakyBackend {
    fn load(&self) -> cpk::Result<Option<GraphSnapshot>> {
        self.inner.load()
    }

    fn save(&mut self, snapshot: &GraphSnapshot) -> cpk::Result<()> {
        if self.fail {
            return Err(CpkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save(snapshot)
    }
}

// === Resolution ===

#[test]
fn edge_empty_path_is_root() {
    let mut s = store();
    assert_eq!(s.find(&[]).unwrap(), NodeId::ROOT);
    assert_eq!(s.resolve(&[], true).unwrap(), NodeId::ROOT);
    assert_eq!(s.node_count(), 1);
}

#[test]
fn edge_attribute_only_step_matches_any_value() {
    let mut s = store();
    let host = s
        .resolve(&[PathStep::attr_value("host", "example.org")], true)
        .unwrap();
    assert_eq!(s.find(&[PathStep::attr("host")]).unwrap(), host);
}

#[test]
fn edge_unknown_attribute_id_is_rejected() {
    let mut s = store();
    let step = PathStep::attr_value(AttrRef::Id(cpk::AttributeId(99)), "x");
    assert!(matches!(
        s.resolve(&[step], true),
        Err(CpkError::NotFound(_))
    ));
}

#[test]
fn edge_ambiguous_siblings_are_reported() {
    let mut s = store();
    let root = NodeId::ROOT;
    let a = s.add_child(root, None, "dup").unwrap();
    let b = s.add_child(root, None, "dup").unwrap();

    match s.find(&[PathStep::value("dup")]) {
        Err(CpkError::AmbiguousPath { matches, last }) => {
            let ids: Vec<NodeId> = matches.iter().map(|n| n.id).collect();
            assert_eq!(ids, vec![a, b]);
            assert!(last.is_root());
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    // Create mode does not paper over it either.
    assert!(matches!(
        s.resolve(&[PathStep::value("dup")], true),
        Err(CpkError::AmbiguousPath { .. })
    ));
}

#[test]
fn edge_ambiguity_message_names_matches() {
    let mut s = store();
    s.add_child(NodeId::ROOT, None, "dup").unwrap();
    s.add_child(NodeId::ROOT, None, "dup").unwrap();
    let message = s.find(&[PathStep::value("dup")]).unwrap_err().to_string();
    assert!(message.contains("2 nodes"), "got: {message}");
    assert!(message.contains("root"), "got: {message}");
}

#[test]
fn edge_shared_child_reachable_from_two_parents() {
    let mut s = store();
    let mail = s.resolve(&parse_path(["service=mail"]).unwrap(), true).unwrap();
    let web = s.resolve(&parse_path(["service=web"]).unwrap(), true).unwrap();
    let alice = s.add_child(mail, None, "alice").unwrap();
    assert!(s.link(web, alice).unwrap());
    assert!(!s.link(web, alice).unwrap(), "duplicate edge is a no-op");

    assert_eq!(s.find(&parse_path(["service=mail", "alice"]).unwrap()).unwrap(), alice);
    assert_eq!(s.find(&parse_path(["service=web", "alice"]).unwrap()).unwrap(), alice);
    assert_eq!(s.parents(alice).unwrap().len(), 2);
}

// === Password nodes ===

#[test]
fn edge_one_password_per_parent() {
    let mut s = store();
    let mail = s.resolve(&parse_path(["mail"]).unwrap(), true).unwrap();
    let password = s.password_attribute().unwrap();
    s.add_child(mail, Some(password), "").unwrap();
    s.add_child(mail, Some(password), "").unwrap();

    // Two password nodes under one parent: ambiguous, never a third one.
    let path = parse_path(["mail", "password="]).unwrap();
    assert!(matches!(
        s.resolve(&path, true),
        Err(CpkError::AmbiguousPath { .. })
    ));
}

#[test]
fn edge_password_with_new_value_is_created() {
    let mut s = store();
    let mail = s.resolve(&parse_path(["mail"]).unwrap(), true).unwrap();
    let password = s.password_attribute().unwrap();
    let old = s.add_child(mail, Some(password), "old").unwrap();

    // Zero matches in create mode always creates, even for a password step.
    let path = parse_path(["mail", "password=new"]).unwrap();
    let new = s.resolve(&path, true).unwrap();
    assert_ne!(new, old);
    assert_eq!(s.node(new).unwrap().value, "new");
    assert_eq!(s.find(&path).unwrap(), new);
    assert_eq!(s.children(mail).unwrap().len(), 2);
}

// === Transactions ===

#[test]
fn edge_attribute_conflict_rolls_back() {
    let mut s = store();
    s.resolve(&parse_path(["service=mail"]).unwrap(), true)
        .unwrap();
    s.commit().unwrap();
    let committed = s.snapshot();

    s.resolve(&parse_path(["service=mail", "user=alice"]).unwrap(), true)
        .unwrap();
    s.create_attribute("service", None).unwrap();
    assert!(matches!(
        s.commit(),
        Err(CpkError::AttributeConflict(ref n)) if n == "service"
    ));
    assert_eq!(s.snapshot(), committed);
    assert!(!s.is_dirty());
}

#[test]
fn edge_backend_failure_rolls_back() {
    let mut s = GraphStore::open(FlakyBackend::default(), StoreOptions::default()).unwrap();
    s.resolve(&parse_path(["kept"]).unwrap(), true).unwrap();
    s.commit().unwrap();
    let committed = s.snapshot();

    let mut backend = s.into_backend();
    backend.fail = true;
    let mut s = GraphStore::open(backend, StoreOptions::default()).unwrap();
    s.resolve(&parse_path(["lost"]).unwrap(), true).unwrap();
    assert!(matches!(s.commit(), Err(CpkError::Io(_))));
    assert_eq!(s.snapshot(), committed);
    assert!(s.find(&parse_path(["lost"]).unwrap()).is_err());
}

#[test]
fn edge_reopen_does_not_duplicate_bootstrap() {
    let s = store();
    let mut backend = s.into_backend();
    for _ in 0..3 {
        let s = GraphStore::open(backend, StoreOptions::default()).unwrap();
        assert_eq!(s.node_count(), 1);
        assert_eq!(s.registry().len(), 1);
        backend = s.into_backend();
    }
    assert_eq!(backend.commits(), 1);
}

// === Tokens ===

#[test]
fn edge_invalid_tokens() {
    assert!(matches!(parse_path([""]), Err(CpkError::InvalidToken(_))));
    assert!(matches!(parse_path(["="]), Err(CpkError::InvalidToken(_))));
    assert!(matches!(PathStep::new(None, None), Err(CpkError::EmptyPathStep)));

    let steps = parse_path(["=mail", "note=a=b"]).unwrap();
    assert_eq!(steps[0], PathStep::value("mail"));
    assert_eq!(steps[1], PathStep::attr_value("note", "a=b"));
}

#[test]
fn edge_invalid_attribute_names() {
    let mut s = store();
    assert!(matches!(
        s.create_attribute("has space", None),
        Err(CpkError::InvalidAttributeName(_))
    ));
    assert!(matches!(
        s.create_attribute("", None),
        Err(CpkError::InvalidAttributeName(_))
    ));
}
