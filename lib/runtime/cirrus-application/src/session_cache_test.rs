use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};

use cirrus_domain::{ExporterError, Language, MessageCatalog, TenantConfig};

use crate::session_cache::SessionCache;
use crate::testing::{FakeSessions, tenant};

fn cache(sessions: Arc<FakeSessions>) -> SessionCache {
    SessionCache::new(sessions, Arc::new(MessageCatalog::load(Language::En).unwrap()))
}

#[tokio::test]
async fn same_key_reuses_cached_session() {
    let sessions = Arc::new(FakeSessions::new());
    let cache = cache(Arc::clone(&sessions));
    let alpha = tenant(1, "alpha");
    let alpha_again = TenantConfig {
        index: 2,
        password: "rotated".into(),
        ..alpha.clone()
    };

    let first = cache.get_or_create(&alpha).await.unwrap();
    let second = cache.get_or_create(&alpha_again).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(sessions.calls(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn distinct_keys_get_distinct_sessions() {
    let sessions = Arc::new(FakeSessions::new());
    let cache = cache(Arc::clone(&sessions));

    cache.get_or_create(&tenant(1, "alpha")).await.unwrap();
    cache.get_or_create(&tenant(2, "beta")).await.unwrap();

    assert_eq!(sessions.calls(), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn failed_authentication_is_not_cached() {
    let sessions = Arc::new(FakeSessions::new().failing("alpha"));
    let cache = cache(Arc::clone(&sessions));
    let alpha = tenant(1, "alpha");

    let err = cache.get_or_create(&alpha).await.unwrap_err();
    assert!(matches!(err, ExporterError::Authentication { ref tenant, .. } if tenant == "alpha"));
    assert!(cache.is_empty());

    cache.get_or_create(&alpha).await.unwrap_err();
    assert_eq!(sessions.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_first_use_authenticates_once() {
    let sessions = Arc::new(FakeSessions::new().with_delay(Duration::from_millis(50)));
    let cache = cache(Arc::clone(&sessions));
    let alpha = tenant(1, "alpha");

    let (a, b) = tokio::join!(cache.get_or_create(&alpha), cache.get_or_create(&alpha));

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(sessions.calls(), 1);
}

#[tokio::test]
async fn expired_session_is_replaced() {
    let expired = Utc::now() - TimeDelta::minutes(5);
    let sessions = Arc::new(FakeSessions::new().expiring_at(expired));
    let cache = cache(Arc::clone(&sessions));
    let alpha = tenant(1, "alpha");

    let first = cache.get_or_create(&alpha).await.unwrap();
    let second = cache.get_or_create(&alpha).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(sessions.calls(), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn live_session_with_expiry_is_reused() {
    let later = Utc::now() + TimeDelta::hours(1);
    let sessions = Arc::new(FakeSessions::new().expiring_at(later));
    let cache = cache(Arc::clone(&sessions));
    let alpha = tenant(1, "alpha");

    cache.get_or_create(&alpha).await.unwrap();
    cache.get_or_create(&alpha).await.unwrap();
    assert_eq!(sessions.calls(), 1);
}
