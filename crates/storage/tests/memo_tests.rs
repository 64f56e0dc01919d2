//! Memoization behaviour across store backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use climate_common::Raster;
use storage::{CacheArgs, CacheStore, DiskStore, MemoCache, MemoryStore};

#[tokio::test]
async fn test_concurrent_callers_share_one_computation() {
    let memo = Arc::new(MemoCache::new(Arc::new(MemoryStore::new())));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let memo = memo.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                let args = CacheArgs::new().arg("date", "2001-06-01");
                memo.memoize("wind/mean_wind_speed_for_date", &args, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(vec![1.5f32, 2.5])
                })
                .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap(), vec![1.5f32, 2.5]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = memo.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
}

#[tokio::test]
async fn test_default_argument_hits_same_entry_as_omitted() {
    let memo = MemoCache::new(Arc::new(MemoryStore::new()));
    let calls = AtomicUsize::new(0);

    let omitted = CacheArgs::new().arg("band", "maximum_2m_air_temperature");
    let explicit = CacheArgs::new()
        .arg("band", "maximum_2m_air_temperature")
        .with_default("filter", serde_json::Value::Null, serde_json::Value::Null);

    for args in [&omitted, &explicit] {
        let value: f64 = memo
            .memoize("temperature/mean_daily", args, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(288.15)
            })
            .await
            .unwrap();
        assert_eq!(value, 288.15);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disk_entries_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let args = CacheArgs::new().arg("start", "1990-01-01").arg("end", "2000-01-01");
    let calls = AtomicUsize::new(0);

    {
        let memo = MemoCache::new(Arc::new(DiskStore::open(dir.path()).await.unwrap()));
        let value: Vec<f32> = memo
            .memoize("cloud_cover/segment", &args, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0.25, 0.5])
            })
            .await
            .unwrap();
        assert_eq!(value, vec![0.25, 0.5]);
    }

    let memo = MemoCache::new(Arc::new(DiskStore::open(dir.path()).await.unwrap()));
    assert!(memo.contains("cloud_cover/segment", &args).await.unwrap());
    let value: Vec<f32> = memo
        .memoize("cloud_cover/segment", &args, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![9.0, 9.0])
        })
        .await
        .unwrap();

    assert_eq!(value, vec![0.25, 0.5]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_racing_disk_writers_keep_one_value() {
    let dir = tempfile::tempdir().unwrap();
    let key = storage::CacheKey::new("race", &CacheArgs::new());

    let writers: Vec<_> = (0..6u8)
        .map(|i| {
            let root = dir.path().to_path_buf();
            let key = key.clone();
            tokio::spawn(async move {
                // separate store instances stand in for separate processes
                let store = DiskStore::open(root).await.unwrap();
                store.put(&key, bytes::Bytes::from(vec![i; 1024])).await.unwrap()
            })
        })
        .collect();

    let created: Vec<bool> = futures::future::join_all(writers)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(created.iter().filter(|c| **c).count(), 1);

    let store = DiskStore::open(dir.path()).await.unwrap();
    let stored = store.get(&key).await.unwrap().unwrap();
    assert_eq!(stored.len(), 1024);
    assert!(stored.iter().all(|b| *b == stored[0]));
}

#[tokio::test]
async fn test_masked_raster_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let args = CacheArgs::new().arg("date", "2001-01-01");
    let masked = Raster::new(vec![2.0, f32::NAN, 3.5, f32::NAN], 2, 2).unwrap();

    let first = MemoCache::new(Arc::new(DiskStore::open(dir.path()).await.unwrap()));
    let computed: Raster = first
        .memoize("dewpoint/high_dewpoint_for_date", &args, || async { Ok(masked.clone()) })
        .await
        .unwrap();
    assert_eq!(computed.shape(), (2, 2));

    let second = MemoCache::new(Arc::new(DiskStore::open(dir.path()).await.unwrap()));
    let cached: Raster = second
        .memoize("dewpoint/high_dewpoint_for_date", &args, || async {
            Ok(Raster::filled(2, 2, 0.0))
        })
        .await
        .unwrap();

    assert_eq!(second.stats().hits, 1);
    assert_eq!(cached.data[0], 2.0);
    assert!(cached.data[1].is_nan());
    assert_eq!(cached.data[2], 3.5);
    assert!(cached.data[3].is_nan());
}
