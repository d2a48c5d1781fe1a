// decision_core/src/capture/cache.rs

use crate::capture::Capture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

struct CacheEntry {
    cell: Arc<OnceCell<Capture>>,
    inserted_at: Instant,
}

/// # NDOC
/// component: `capture::cache`
/// purpose: TTL result cache keyed by normalized URL with single-flight
///          coalescing.
/// invariants:
///   - At most one capture runs per key at a time; latecomers await the same
///     completion cell and receive the same `Capture`.
///   - `refresh = true` bypasses lookup and invalidates the entry.
pub struct CaptureCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CaptureCache {
    pub fn new(ttl: Duration) -> Self {
        CaptureCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached capture for `key`, or runs `produce` exactly once
    /// across all concurrent callers and caches its result.
    pub async fn get_or_capture<F, Fut>(&self, key: &str, refresh: bool, produce: F) -> Capture
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Capture>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;

            if refresh {
                entries.remove(key);
            } else if let Some(entry) = entries.get(key) {
                let expired =
                    entry.cell.get().is_some() && entry.inserted_at.elapsed() > self.ttl;
                if expired {
                    entries.remove(key);
                }
            }

            entries
                .entry(key.to_string())
                .or_insert_with(|| CacheEntry {
                    cell: Arc::new(OnceCell::new()),
                    inserted_at: Instant::now(),
                })
                .cell
                .clone()
        };

        cell.get_or_init(produce).await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureStatus, ViewportCapture};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn capture_stub(url: &str) -> Capture {
        Capture {
            status: CaptureStatus::Ok,
            url: url.to_string(),
            desktop: ViewportCapture::missing_viewport(crate::capture::Viewport::Desktop),
            mobile: ViewportCapture::missing_viewport(crate::capture::Viewport::Mobile),
            extracted_text: String::new(),
        }
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_hits_cache() {
        let cache = CaptureCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let capture = cache
                .get_or_capture("https://example.com/", false, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    capture_stub("https://example.com/")
                })
                .await;
            assert_eq!(capture.url, "https://example.com/");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_bypasses_and_invalidates() {
        let cache = CaptureCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for refresh in [false, true] {
            cache
                .get_or_capture("https://example.com/", refresh, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    capture_stub("https://example.com/")
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_is_recaptured() {
        let cache = CaptureCache::new(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);

        cache
            .get_or_capture("https://example.com/", false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                capture_stub("https://example.com/")
            })
            .await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        cache
            .get_or_capture("https://example.com/", false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                capture_stub("https://example.com/")
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_coalesce_to_one_capture() {
        let cache = Arc::new(CaptureCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_capture("https://example.com/", false, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the in-flight window open so latecomers pile up.
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        capture_stub("https://example.com/")
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}
