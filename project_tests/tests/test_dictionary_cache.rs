use std::sync::Arc;

use lib_yamcs::mdb::cache::DictionaryCache;
use lib_yamcs::rest::RestClient;
use lib_yamcs::YamcsError;
use project_tests::fake_yamcs::{FakeParameter, FakeYamcs};

#[tokio::test]
async fn concurrent_loads_issue_exactly_one_network_call() {
    let server = FakeYamcs::spawn(vec![
        FakeParameter::new("Alpha", "float"),
        FakeParameter::new("Beta", "enumeration"),
        FakeParameter::untyped("Raw"),
    ])
    .await;
    let rest = Arc::new(RestClient::new(&server.config()).unwrap());
    let cache = Arc::new(DictionaryCache::new(rest, "simulator"));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.load().await }));
    }
    for handle in handles {
        let dictionary = handle.await.unwrap().unwrap();
        assert_eq!(dictionary.len(), 3);
    }
    assert_eq!(server.mdb_hits(), 1);

    // Later callers reuse the settled result without re-fetching.
    assert_eq!(
        cache.require("Alpha").await.unwrap().qualified_name,
        "/YSS/SIMULATOR/Alpha"
    );
    // An entry without a type block still resolves, just typeless.
    assert!(cache.require("Raw").await.unwrap().eng_type.is_none());
    assert_eq!(server.mdb_hits(), 1);
}

#[tokio::test]
async fn a_failed_load_poisons_the_instance_until_replaced() {
    let server = FakeYamcs::spawn(vec![FakeParameter::new("Alpha", "float")]).await;
    server.fail_mdb();
    let rest = Arc::new(RestClient::new(&server.config()).unwrap());

    let poisoned = DictionaryCache::new(Arc::clone(&rest), "simulator");
    assert!(matches!(
        poisoned.load().await,
        Err(YamcsError::DictionaryLoad(_))
    ));
    // Every later call observes the memoized failure; no silent retry.
    assert!(matches!(
        poisoned.load().await,
        Err(YamcsError::DictionaryLoad(_))
    ));
    assert!(matches!(
        poisoned.require("Alpha").await,
        Err(YamcsError::DictionaryLoad(_))
    ));
    assert_eq!(server.mdb_hits(), 1);

    // Recovery means constructing a fresh cache.
    server.restore_mdb();
    let fresh = DictionaryCache::new(rest, "simulator");
    assert_eq!(fresh.load().await.unwrap().len(), 1);
}
