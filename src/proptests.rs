use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Walks every reachable node and checks the ordering bounds, absence of
/// cycles or shared children, and agreement between reachability, `len`, and
/// arena occupancy.
fn validate_tree<K: Ord, V>(t: &OrderedTree<K, V>) {
    assert_eq!(
        t.nodes.occupied_slots(),
        t.len(),
        "occupied arena slots must match OrderedTree::len"
    );
    assert_eq!(t.root.is_null(), t.is_empty());

    let mut seen = vec![false; t.nodes.slot_count()];
    let mut stack: Vec<(Ptr, Option<&K>, Option<&K>)> = Vec::new();
    if !t.root.is_null() {
        stack.push((t.root, None, None));
    }

    let mut reachable = 0usize;
    while let Some((ptr, lower, upper)) = stack.pop() {
        let idx = ptr.index();
        assert!(!seen[idx], "node reachable twice (cycle or shared child)");
        seen[idx] = true;
        reachable += 1;

        let node = t.nodes.get(ptr);
        if let Some(lower) = lower {
            assert!(&node.key > lower, "key not above its left-turn ancestor");
        }
        if let Some(upper) = upper {
            assert!(&node.key < upper, "key not below its right-turn ancestor");
        }

        if !node.left.is_null() {
            stack.push((node.left, lower, Some(&node.key)));
        }
        if !node.right.is_null() {
            stack.push((node.right, Some(&node.key), upper));
        }
    }

    assert_eq!(reachable, t.len(), "reachable node count must match len");

    let keys: Vec<&K> = t.keys().collect();
    assert!(
        keys.windows(2).all(|w| w[0] < w[1]),
        "in-order traversal must be strictly ascending"
    );
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 25)]
    Delete(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 24)]
    Lookup(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 1)]
    Compact,
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=2000)) {
        let mut t: OrderedTree<u16, u32> = OrderedTree::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    if m.contains_key(&key) {
                        prop_assert_eq!(t.insert(key, value), Err(Error::DuplicateKey));
                        prop_assert_eq!(t.lookup(&key), Ok(&m[&key]));
                    } else {
                        prop_assert_eq!(t.insert(key, value), Ok(()));
                        m.insert(key, value);
                    }
                }
                Op::Delete(key) => {
                    let len = t.len();
                    match m.remove(&key) {
                        Some(value) => {
                            prop_assert_eq!(t.delete(&key), DeletionOutcome::Removed(value));
                            prop_assert_eq!(t.len(), len - 1);
                        }
                        None => prop_assert_eq!(t.delete(&key), DeletionOutcome::NotFound),
                    }
                    prop_assert_eq!(t.lookup(&key), Err(Error::NotFound));
                }
                Op::Lookup(key) => {
                    let expected = m.get(&key).ok_or(Error::NotFound);
                    prop_assert_eq!(t.lookup(&key), expected);
                }
                Op::Compact => {
                    t.compact();
                    prop_assert_eq!(t.nodes.vacant_slots(), 0);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_lookup_after_insert(keys in prop::collection::btree_set(any::<i64>(), 0..=300)) {
        let mut t: OrderedTree<i64, String> = OrderedTree::new();
        for &k in &keys {
            prop_assert_eq!(t.insert(k, k.to_string()), Ok(()));
        }

        for &k in &keys {
            let expected = k.to_string();
            prop_assert_eq!(t.lookup(&k), Ok(&expected));
        }
        for probe in [i64::MIN, -1, 0, 1, i64::MAX] {
            if !keys.contains(&probe) {
                prop_assert_eq!(t.lookup(&probe), Err(Error::NotFound));
            }
        }
        validate_tree(&t);
    }

    #[test]
    fn prop_delete_keeps_others(
        keys in prop::collection::vec(any::<u8>(), 1..=200),
        victim in any::<prop::sample::Index>(),
    ) {
        let mut t: OrderedTree<u8, u16> = OrderedTree::new();
        let mut m: BTreeMap<u8, u16> = BTreeMap::new();
        for (i, &k) in keys.iter().enumerate() {
            if t.insert(k, i as u16).is_ok() {
                m.insert(k, i as u16);
            }
        }

        let victim = *victim.get(&keys);
        let before = t.iter().count();
        prop_assert!(t.delete(&victim).is_removed());
        m.remove(&victim);

        prop_assert_eq!(t.iter().count(), before - 1);
        prop_assert_eq!(t.lookup(&victim), Err(Error::NotFound));
        for (k, v) in &m {
            prop_assert_eq!(t.lookup(k), Ok(v));
        }
        validate_tree(&t);
    }

    #[test]
    fn prop_traversal_idempotent(keys in prop::collection::vec(any::<u32>(), 0..=300)) {
        let mut t: OrderedTree<u32, ()> = OrderedTree::new();
        for k in keys {
            let _ = t.insert(k, ());
        }
        let first: Vec<_> = t.iter().collect();
        let second: Vec<_> = t.iter().collect();
        prop_assert_eq!(first, second);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<u32> = vec![5, 3, 8, 1, 4, 7];

    for_each_permutation(&keys, |perm| {
        let mut t: OrderedTree<u32, u32> = OrderedTree::new();
        for &k in &perm {
            t.insert(k, k + 100).unwrap();
        }
        for &k in &perm {
            assert_eq!(t.insert(k, 0), Err(Error::DuplicateKey));
        }

        validate_tree(&t);
        let got: Vec<(u32, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, [(1, 101), (3, 103), (4, 104), (5, 105), (7, 107), (8, 108)]);
    });
}

#[test]
fn exhaustive_delete_order_small_set() {
    let keys: Vec<u32> = vec![5, 3, 8, 1, 4, 7, 9];

    // Insert in a fixed order, then delete in all permutations.
    let mut base_tree: OrderedTree<u32, u32> = OrderedTree::new();
    let mut base_map: BTreeMap<u32, u32> = BTreeMap::new();
    for (i, &k) in keys.iter().enumerate() {
        let v = i as u32;
        base_tree.insert(k, v).unwrap();
        base_map.insert(k, v);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.delete(&k).into_value(), m.remove(&k));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
            let got: Vec<(u32, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(u32, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
            assert_eq!(got, expected);
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_null());
    });
}
