use crate::{Ctrie, Insert, Lookup, Remove};

#[test]
fn empty_map() {
    let map: Ctrie<String, i32> = Ctrie::new();
    assert_eq!(map.size(), 0);
    assert!(map.is_empty());
}

#[test]
fn insert_one() {
    let map = Ctrie::new();
    let outcome = map.insert("hello", 42, false).unwrap();
    assert!(matches!(outcome, Insert::Inserted));
    assert_eq!(map.size(), 1);
    assert!(!map.is_empty());
}

#[test]
fn insert_and_get() {
    let map = Ctrie::new();
    map.insert("key", 100, false).unwrap();
    assert_eq!(map.get(&"key").as_deref(), Some(&100));
}

#[test]
fn get_missing_key() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    assert_eq!(map.get(&"b"), None);
    assert!(matches!(map.lookup(&"b"), Lookup::Absent));
}

#[test]
fn insert_multiple() {
    let map = Ctrie::new();
    for i in 0..10 {
        map.insert(i, i * 10, false).unwrap();
    }
    assert_eq!(map.size(), 10);
    for i in 0..10 {
        assert_eq!(map.get(&i).as_deref(), Some(&(i * 10)));
    }
}

#[test]
fn overwrite_value() {
    let map = Ctrie::new();
    assert!(matches!(map.insert("k", 1, false).unwrap(), Insert::Inserted));
    match map.insert("k", 2, false).unwrap() {
        Insert::Replaced(old) => assert_eq!(*old, 1),
        Insert::Inserted => panic!("expected a replace"),
    }
    assert_eq!(map.size(), 1);
    assert_eq!(map.get(&"k").as_deref(), Some(&2));
}

#[test]
fn insert_only_if_absent_preserves_existing() {
    let map = Ctrie::new();
    map.insert("k", 1, false).unwrap();
    match map.insert("k", 2, true).unwrap() {
        Insert::Replaced(old) => assert_eq!(*old, 1),
        Insert::Inserted => panic!("only_if_absent must not overwrite"),
    }
    assert_eq!(map.get(&"k").as_deref(), Some(&1));
    assert_eq!(map.size(), 1);
}

#[test]
fn contains_key_true() {
    let map = Ctrie::new();
    map.insert(42, "val", false).unwrap();
    assert!(map.contains_key(&42));
}

#[test]
fn contains_key_false() {
    let map = Ctrie::new();
    map.insert(1, "a", false).unwrap();
    assert!(!map.contains_key(&2));
}

#[test]
fn remove_existing() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    map.insert("b", 2, false).unwrap();
    match map.remove(&"a", None).unwrap() {
        Remove::Removed(v) => assert_eq!(*v, 1),
        Remove::Absent => panic!("expected a removal"),
    }
    assert_eq!(map.size(), 1);
    assert_eq!(map.get(&"a"), None);
    assert_eq!(map.get(&"b").as_deref(), Some(&2));
}

#[test]
fn remove_missing() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    assert!(matches!(map.remove(&"z", None).unwrap(), Remove::Absent));
    assert_eq!(map.size(), 1);
}

#[test]
fn remove_with_matching_witness() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    assert!(matches!(map.remove(&"a", Some(&1)).unwrap(), Remove::Removed(_)));
    assert_eq!(map.get(&"a"), None);
}

#[test]
fn remove_with_mismatched_witness_is_noop() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    assert!(matches!(map.remove(&"a", Some(&2)).unwrap(), Remove::Absent));
    assert_eq!(map.get(&"a").as_deref(), Some(&1));
    assert_eq!(map.size(), 1);
}

#[test]
fn remove_all() {
    let map = Ctrie::new();
    map.insert(1, 10, false).unwrap();
    map.insert(2, 20, false).unwrap();
    map.insert(3, 30, false).unwrap();
    assert!(matches!(map.remove(&1, None).unwrap(), Remove::Removed(_)));
    assert!(matches!(map.remove(&2, None).unwrap(), Remove::Removed(_)));
    assert!(matches!(map.remove(&3, None).unwrap(), Remove::Removed(_)));
    assert!(map.is_empty());
}

#[test]
fn mutating_a_read_only_snapshot_errors() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    let ro = map.snapshot(true);
    assert!(ro.insert("b", 2, false).is_err());
    assert!(ro.remove(&"a", None).is_err());
}

#[test]
fn snapshot_is_independent_of_parent() {
    let map = Ctrie::new();
    map.insert("a", 1, false).unwrap();
    let snap = map.snapshot(false);
    map.insert("b", 2, false).unwrap();
    snap.insert("c", 3, false).unwrap();

    assert_eq!(map.size(), 2);
    assert!(map.contains_key(&"a"));
    assert!(map.contains_key(&"b"));
    assert!(!map.contains_key(&"c"));

    assert_eq!(snap.size(), 2);
    assert!(snap.contains_key(&"a"));
    assert!(!snap.contains_key(&"b"));
    assert!(snap.contains_key(&"c"));
}

#[test]
fn traverse_yields_every_pair() {
    let map = Ctrie::new();
    for i in 0..50 {
        map.insert(i, i * i, false).unwrap();
    }
    let snap = map.snapshot(true);
    let mut seen: Vec<_> = snap.traverse().map(|e| (*e.key(), *e.value())).collect();
    seen.sort_unstable();
    let expected: Vec<_> = (0..50).map(|i| (i, i * i)).collect();
    assert_eq!(seen, expected);
}

#[test]
#[should_panic(expected = "read-only")]
fn traverse_on_a_writable_handle_panics() {
    let map: Ctrie<i32, i32> = Ctrie::new();
    let _ = map.traverse();
}
