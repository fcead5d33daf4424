//! Tests for [`SourceCache`]: time-boxed storage of raw source payloads.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use mimir::cache::{CacheConfig, ManualClock, SourceCache};
use mimir::types::{CatalogEntry, PricingEntry};

fn cache_with_clock() -> (SourceCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = SourceCache::with_clock(&CacheConfig::new(), clock.clone());
    (cache, clock)
}

#[test]
fn cache_miss_returns_none() {
    let (cache, _) = cache_with_clock();
    assert_eq!(cache.get::<Vec<CatalogEntry>>("openrouter_models").unwrap(), None);
}

#[test]
fn set_then_get_returns_clone() {
    let (cache, _) = cache_with_clock();
    let models = vec![CatalogEntry::new("openai/gpt-4o", "GPT-4o")];
    cache.set("openrouter_models", models.clone(), Duration::from_secs(300));

    let got = cache.get::<Vec<CatalogEntry>>("openrouter_models").unwrap();
    assert_eq!(got, Some(models));
}

#[test]
fn expiry_is_per_entry() {
    let (cache, clock) = cache_with_clock();
    cache.set("openrouter_models", Vec::<CatalogEntry>::new(), Duration::from_secs(300));
    cache.set(
        "litellm_pricing",
        BTreeMap::<String, PricingEntry>::new(),
        Duration::from_secs(1800),
    );

    clock.advance(Duration::from_secs(301));
    assert!(cache.get::<Vec<CatalogEntry>>("openrouter_models").unwrap().is_none());
    assert!(
        cache
            .get::<BTreeMap<String, PricingEntry>>("litellm_pricing")
            .unwrap()
            .is_some()
    );

    clock.advance(Duration::from_secs(1500));
    assert!(
        cache
            .get::<BTreeMap<String, PricingEntry>>("litellm_pricing")
            .unwrap()
            .is_none()
    );
}

#[test]
fn overwrite_replaces_value_and_ttl() {
    let (cache, clock) = cache_with_clock();
    cache.set("lmarena_text", 1u32, Duration::from_secs(10));
    clock.advance(Duration::from_secs(8));
    cache.set("lmarena_text", 2u32, Duration::from_secs(10));
    clock.advance(Duration::from_secs(8));

    assert_eq!(cache.get::<u32>("lmarena_text").unwrap(), Some(2));
}

#[test]
fn flush_all_drops_every_key() {
    let (cache, _) = cache_with_clock();
    cache.set("a", 1u8, Duration::from_secs(60));
    cache.set("b", 2u8, Duration::from_secs(60));
    assert_eq!(cache.len(), 2);

    cache.flush_all();
    assert!(cache.is_empty());
    assert!(cache.get::<u8>("a").unwrap().is_none());
}

#[test]
fn wrong_type_is_fatal() {
    let (cache, _) = cache_with_clock();
    cache.set("openrouter_models", "not a list".to_string(), Duration::from_secs(60));

    let err = cache
        .get::<Vec<CatalogEntry>>("openrouter_models")
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("openrouter_models"));
}

#[test]
fn thread_safety() {
    use std::thread;

    let cache = Arc::new(SourceCache::new());
    let mut handles = Vec::new();

    for i in 0..8u64 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            let key = format!("key-{i}");
            cache.set(key.clone(), i, Duration::from_secs(60));
            cache.get::<u64>(&key).unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(i as u64));
    }
    assert_eq!(cache.len(), 8);
}
