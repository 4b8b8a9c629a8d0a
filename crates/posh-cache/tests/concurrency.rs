//! Concurrent access to one manager from many threads.

use std::thread;

use posh_cache::{BackendKind, CacheConfig, CacheDuration, CacheManager, Scope};
use tempfile::TempDir;

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = 200;

#[test]
fn test_parallel_writers_all_persist() {
    let dir = TempDir::new().unwrap();
    let config = || {
        CacheConfig::new()
            .with_cache_dir(dir.path())
            .with_session_id("threads")
            .with_backend(BackendKind::File)
    };

    let manager = CacheManager::new(config());
    thread::scope(|s| {
        for t in 0..THREADS {
            let manager = &manager;
            s.spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    let key = format!("t{t}-k{i}");
                    manager.set(Scope::Session, key.clone(), (t * 1000 + i) as i64, &CacheDuration::ONE_HOUR);
                    assert_eq!(
                        manager.get::<i64>(Scope::Session, &key),
                        Some((t * 1000 + i) as i64)
                    );
                }
            });
        }
    });
    assert_eq!(manager.store(Scope::Session).len(), THREADS * KEYS_PER_THREAD);
    manager.close().unwrap();

    let reloaded = CacheManager::new(config());
    assert_eq!(reloaded.store(Scope::Session).len(), THREADS * KEYS_PER_THREAD);
    assert_eq!(reloaded.get::<i64>(Scope::Session, "t3-k17"), Some(3017));
}

#[test]
fn test_lazy_load_happens_once_under_contention() {
    let dir = TempDir::new().unwrap();
    let manager = CacheManager::new(
        CacheConfig::new()
            .with_cache_dir(dir.path())
            .with_session_id("contention"),
    );

    let stores: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let manager = &manager;
                s.spawn(move || manager.store(Scope::Device) as *const _ as usize)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(stores.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_readers_and_writers_on_same_key() {
    let dir = TempDir::new().unwrap();
    let manager = CacheManager::new(
        CacheConfig::new()
            .with_cache_dir(dir.path())
            .with_session_id("same-key"),
    );
    manager.set(Scope::Device, "shared", 0i64, &CacheDuration::ONE_HOUR);

    thread::scope(|s| {
        for t in 0..THREADS {
            let manager = &manager;
            s.spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    if t % 2 == 0 {
                        manager.set(Scope::Device, "shared", i as i64, &CacheDuration::ONE_HOUR);
                    } else {
                        let value = manager.get::<i64>(Scope::Device, "shared");
                        assert!(value.is_some_and(|v| (0..KEYS_PER_THREAD as i64).contains(&v)));
                    }
                }
            });
        }
    });
}
