//! Watcher end-to-end tests: readers keep seeing complete snapshots while
//! the roots are rewritten and rebuilt.

use opts_core::{
    CacheKey, CachedValue, GetOptionsPreferences, ManualChangeSource, OptionsRegistry,
    OptionsWatcher, SharedCache,
};
use opts_test_utils::FeatureDir;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

fn pair(version: u64) -> (Value, Value) {
    (
        json!({"options": {"pair": {"left": version}}}),
        json!({"imports": ["left"], "options": {"pair": {"right": version}}}),
    )
}

#[test]
fn test_readers_see_consistent_snapshots_during_rebuilds() {
    let dir = FeatureDir::new();
    let (left, right) = pair(0);
    dir.feature("left", left);
    dir.feature("right", right);

    let watcher = Arc::new(
        OptionsWatcher::builder()
            .add_directory(dir.root())
            .unwrap()
            .with_change_source(ManualChangeSource::new())
            .build()
            .unwrap(),
    );
    let cache: Arc<SharedCache<CacheKey, CachedValue>> = Arc::new(SharedCache::new(None));
    watcher.register_cache(cache.clone());

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let watcher = Arc::clone(&watcher);
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let preferences = GetOptionsPreferences::new();
                let mut reads = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let pair = watcher
                        .get_options_cached("pair", &["right"], &preferences, cache.as_ref())
                        .unwrap();
                    assert_eq!(pair["left"], pair["right"], "torn snapshot: {pair}");
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for version in 1..=10 {
        let (left, right) = pair(version);
        dir.feature("left", left);
        dir.feature("right", right);
        watcher.reload().unwrap();
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(
        watcher.get_options("pair", &["right"]).unwrap(),
        json!({"left": 10, "right": 10})
    );
}

#[test]
fn test_bad_edit_is_survived_until_fixed() {
    let dir = FeatureDir::new();
    dir.feature("app", json!({"options": {"mode": "ok"}}));

    let source = ManualChangeSource::new();
    let watcher = OptionsWatcher::builder()
        .add_directory(dir.root())
        .unwrap()
        .debounce(Duration::from_millis(10))
        .with_change_source(source.clone())
        .build()
        .unwrap();
    let (sender, receiver) = mpsc::channel();
    watcher.add_listener(move |state, _| {
        let _ = sender.send(state.generation());
    });
    let initial = watcher.state().generation();

    let path = dir.write("app.json", r#"{"options": {"mode": "#);
    source.trigger([path.clone()]);
    assert!(receiver.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(watcher.state().generation(), initial);
    assert_eq!(watcher.get_options("mode", &["app"]).unwrap(), json!("ok"));

    dir.feature("app", json!({"options": {"mode": "fixed"}}));
    source.trigger([path]);
    let generation = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(generation > initial);
    assert_eq!(watcher.get_options("mode", &["app"]).unwrap(), json!("fixed"));
}

#[test]
fn test_new_feature_and_alias_appear_after_rebuild() {
    let dir = FeatureDir::new();
    dir.feature("base", json!({"options": {"a": 1}}));
    let watcher = OptionsWatcher::builder()
        .add_directory(dir.root())
        .unwrap()
        .with_change_source(ManualChangeSource::new())
        .build()
        .unwrap();
    assert!(watcher.get_canonical_feature_name("extra").is_err());

    dir.write("nested/extra.yml", "metadata:\n  aliases: [more]\noptions:\n  a: 2\n");
    watcher.reload().unwrap();

    assert_eq!(watcher.get_canonical_feature_name("MORE").unwrap(), "nested/extra");
    assert_eq!(
        watcher.get_options("a", &["base", "more"]).unwrap(),
        json!(2)
    );
}
