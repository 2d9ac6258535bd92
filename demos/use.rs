use avl_map::AvlTreeMap;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), avl_map::Error> {
    // RUST_LOG=avl_map=trace shows every rotation.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut map = AvlTreeMap::builder().default_value("unknown").build()?;
    map.insert(0, "zero");
    map.insert(1, "one");
    map.insert(2, "two");
    map.insert(2, "two");
    map.insert(3, "three");
    map.insert(4, "four");
    map.insert(5, "five");
    assert_eq!(map.get(&1), Some(&"one"));
    map.remove(&1);
    assert!(map.get(&1).is_none());
    assert_eq!(map.fetch(&1).as_deref(), Some(&"unknown"));

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    println!("{}", map.signature());
    print!("{}", map.dump());

    let mut groups = AvlTreeMap::<String, Vec<&str>>::with_default_fn(Vec::new);
    for word in ["apple", "avocado", "banana", "blueberry", "cherry"] {
        let mut group = groups.fetch(&word[..1]).unwrap_or_default().into_owned();
        group.push(word);
        groups.insert_from(&word[..1], group);
    }
    println!("{groups:?}");

    map.verify()
}
