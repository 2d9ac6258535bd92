use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    Clear,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A small key space makes overwrites and hits on removal likely.
    let key = 0u16..512;
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        19 => key.prop_map(Op::Get),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: AvlTreeMap<u16, u32> = AvlTreeMap::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(key, value), m.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                    prop_assert!(!t.contains_key(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
            prop_assert_eq!(t.verify(), Ok(()));
        }

        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_height_bound(keys in prop::collection::btree_set(any::<i64>(), 0..=2000)) {
        let map: AvlTreeMap<i64, ()> = keys.iter().map(|&k| (k, ())).collect();
        let bound = 1.44 * ((map.len() + 2) as f64).log2();
        prop_assert!((map.height() as f64) <= bound);
        prop_assert!(map.keys().eq(keys.iter()));
    }

    #[test]
    fn prop_overwrite_keeps_shape(
        keys in prop::collection::vec(any::<u8>(), 1..=200),
        index in any::<prop::sample::Index>(),
    ) {
        let mut map: AvlTreeMap<u8, usize> = AvlTreeMap::new();
        for (i, &k) in keys.iter().enumerate() {
            map.insert(k, i);
        }
        let signature = map.signature();
        let key = keys[index.index(keys.len())];
        map.insert(key, usize::MAX);
        prop_assert_eq!(map.signature(), signature);
        prop_assert_eq!(map.get(&key), Some(&usize::MAX));
    }
}
