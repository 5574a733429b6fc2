//! 请求执行器测试：缓存、TTL、并发去重、失效

use futures_util::future::{BoxFuture, FutureExt};
use league_admin::infrastructure::executor::{key_matches_prefix, ExecuteOptions, RequestExecutor};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, PartialEq)]
struct FetchError(String);

type Fetch<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, FetchError>> + Send>;

/// A fetch that counts its invocations and resolves with `value` after `delay`.
fn fetcher<T: Send + 'static>(calls: &Arc<AtomicUsize>, value: T, delay: Duration) -> Fetch<T> {
    let calls = Arc::clone(calls);
    Box::new(move || {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            Ok(value)
        }
        .boxed()
    })
}

fn failing(calls: &Arc<AtomicUsize>, message: &str, delay: Duration) -> Fetch<String> {
    let calls = Arc::clone(calls);
    let error = FetchError(message.to_string());
    Box::new(move || {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            Err(error)
        }
        .boxed()
    })
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[tokio::test]
async fn test_cache_hit_avoids_refetch() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_millis(1000));

    let first = executor
        .execute(fetcher(&calls, "lions".to_string(), Duration::ZERO), "K", opts)
        .await;
    let second = executor
        .execute(fetcher(&calls, "tigers".to_string(), Duration::ZERO), "K", opts)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, Ok("lions".to_string()));
    assert_eq!(second, Ok("lions".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_triggers_refetch() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_millis(10));

    let _ = executor
        .execute(fetcher(&calls, 1u32, Duration::ZERO), "K", opts)
        .await;
    sleep(Duration::from_millis(20)).await;
    let second = executor
        .execute(fetcher(&calls, 2u32, Duration::ZERO), "K", opts)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(second, Ok::<u32, FetchError>(2));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_share_one_fetch() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(5));

    let (a, b) = tokio::join!(
        executor.execute(fetcher(&calls, "first".to_string(), Duration::from_millis(50)), "K", opts),
        executor.execute(fetcher(&calls, "second".to_string(), Duration::from_millis(50)), "K", opts),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, Ok("first".to_string()));
    assert_eq!(b, Ok("first".to_string()));
    assert_eq!(executor.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dedup_applies_without_cache() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::new();

    let (a, b) = tokio::join!(
        executor.execute(fetcher(&calls, 7u32, Duration::from_millis(30)), "K", opts),
        executor.execute(fetcher(&calls, 8u32, Duration::from_millis(30)), "K", opts),
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, Ok::<u32, FetchError>(7));
    assert_eq!(b, Ok::<u32, FetchError>(7));

    // 未开启缓存：结束后再次调用会重新请求
    let c = executor
        .execute(fetcher(&calls, 9u32, Duration::ZERO), "K", opts)
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(c, Ok::<u32, FetchError>(9));
    assert!(!executor.is_cached("K"));
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let refreshed = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let _ = executor
        .execute(fetcher(&calls, "old".to_string(), Duration::ZERO), "K", opts)
        .await;

    let forced = executor
        .execute(
            fetcher(&refreshed, "new".to_string(), Duration::ZERO),
            "K",
            ExecuteOptions::new().with_force_refresh(true),
        )
        .await;
    assert_eq!(refreshed.load(Ordering::SeqCst), 1);
    assert_eq!(forced, Ok("new".to_string()));

    // 缓存应反映强制刷新的结果
    let cached = executor
        .execute(fetcher(&calls, "unused".to_string(), Duration::ZERO), "K", opts)
        .await;
    assert_eq!(cached, Ok("new".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_last_settlement_wins() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let slow = executor.execute(
        fetcher(&calls, "slow".to_string(), Duration::from_millis(100)),
        "K",
        opts,
    );
    let fast = async {
        sleep(Duration::from_millis(10)).await;
        executor
            .execute(
                fetcher(&calls, "fast".to_string(), Duration::from_millis(20)),
                "K",
                opts.with_force_refresh(true),
            )
            .await
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(slow, Ok("slow".to_string()));
    assert_eq!(fast, Ok("fast".to_string()));

    let cached = executor
        .execute(fetcher(&calls, "unused".to_string(), Duration::ZERO), "K", opts)
        .await;
    assert_eq!(cached, Ok("slow".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(executor.in_flight_len(), 0);
}

#[tokio::test]
async fn test_clear_cache_removes_entries() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let _ = executor
        .execute(fetcher(&calls, 1u8, Duration::ZERO), "fetchTeams", opts)
        .await;
    assert!(executor.is_cached("fetchTeams"));

    executor.clear_cache(&["fetchTeams"]);
    assert!(!executor.is_cached("fetchTeams"));

    let _ = executor
        .execute(fetcher(&calls, 2u8, Duration::ZERO), "fetchTeams", opts)
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_passthrough_is_not_cached() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let result = executor
        .execute(failing(&calls, "boom", Duration::ZERO), "K", opts)
        .await;
    assert_eq!(result, Err(FetchError("boom".to_string())));
    assert!(!executor.is_cached("K"));
    assert_eq!(executor.in_flight_len(), 0);

    let retry = executor
        .execute(fetcher(&calls, "ok".to_string(), Duration::ZERO), "K", opts)
        .await;
    assert_eq!(retry, Ok("ok".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shared_failure_reaches_every_caller() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let (a, b) = tokio::join!(
        executor.execute(failing(&calls, "down", Duration::from_millis(20)), "K", opts),
        executor.execute(failing(&calls, "other", Duration::from_millis(20)), "K", opts),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, Err(FetchError("down".to_string())));
    assert_eq!(b, Err(FetchError("down".to_string())));
}

#[tokio::test]
async fn test_clear_cache_unknown_key_is_noop() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let _ = executor
        .execute(fetcher(&calls, 1u8, Duration::ZERO), "fetchTeams", opts)
        .await;

    executor.clear_cache(&["nonexistent_key"]);
    executor.clear_cache(&["nonexistent_key"]);

    assert!(executor.is_cached("fetchTeams"));
    assert_eq!(executor.cached_len(), 1);
}

#[tokio::test]
async fn test_clear_cache_prefix_respects_segments() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    for key in ["fetchTeams", "fetchTeams_ab12", "fetchTeam_5", "fetchTeam_50"] {
        let _ = executor
            .execute(fetcher(&calls, 0u8, Duration::ZERO), key, opts)
            .await;
    }

    // 精确键只清除自身
    executor.clear_cache(&["fetchTeam_5"]);
    assert!(!executor.is_cached("fetchTeam_5"));
    assert!(executor.is_cached("fetchTeam_50"));

    // 操作名清除其所有参数变体，但不影响相似的操作名
    executor.clear_cache(&["fetchTeam"]);
    assert!(!executor.is_cached("fetchTeam_50"));
    assert!(executor.is_cached("fetchTeams"));

    executor.clear_cache(&["fetchTeams"]);
    assert!(!executor.is_cached("fetchTeams"));
    assert!(!executor.is_cached("fetchTeams_ab12"));
    assert_eq!(executor.cached_len(), 0);
}

#[test]
fn test_key_prefix_matching() {
    assert!(key_matches_prefix("fetchTeams", "fetchTeams"));
    assert!(key_matches_prefix("fetchTeams_1f", "fetchTeams"));
    assert!(key_matches_prefix("fetchTeam_5", "fetchTeam"));
    assert!(!key_matches_prefix("fetchTeams", "fetchTeam"));
    assert!(!key_matches_prefix("fetchTeam_50", "fetchTeam_5"));
    assert!(!key_matches_prefix("fetchTeams", ""));
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_during_flight_skips_cache_write() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let pending = executor.execute(
        fetcher(&calls, "stale".to_string(), Duration::from_millis(50)),
        "fetchTeams",
        opts,
    );
    let invalidate = async {
        sleep(Duration::from_millis(10)).await;
        assert!(executor.is_in_flight("fetchTeams"));
        executor.clear_cache(&["fetchTeams"]);
        assert!(!executor.is_in_flight("fetchTeams"));
    };
    let (result, ()) = tokio::join!(pending, invalidate);

    // 等待中的调用者仍然拿到结果，但结果不会写入缓存
    assert_eq!(result, Ok("stale".to_string()));
    assert!(!executor.is_cached("fetchTeams"));
}

#[tokio::test]
async fn test_type_mismatch_is_a_miss() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let _ = executor
        .execute(fetcher(&calls, "text".to_string(), Duration::ZERO), "K", opts)
        .await;
    let number = executor
        .execute(fetcher(&calls, 42u64, Duration::ZERO), "K", opts)
        .await;

    assert_eq!(number, Ok::<u64, FetchError>(42));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_purge_expired_entries() {
    let executor = RequestExecutor::new();
    let calls = counter();

    let _ = executor
        .execute(
            fetcher(&calls, 1u8, Duration::ZERO),
            "short",
            ExecuteOptions::cached(Duration::from_millis(10)),
        )
        .await;
    let _ = executor
        .execute(
            fetcher(&calls, 2u8, Duration::ZERO),
            "long",
            ExecuteOptions::cached(Duration::from_secs(10)),
        )
        .await;

    sleep(Duration::from_millis(20)).await;
    assert_eq!(executor.purge_expired(), 1);
    assert_eq!(executor.cached_len(), 1);
    assert!(executor.is_cached("long"));
}

#[tokio::test(start_paused = true)]
async fn test_default_ttl_applies_when_unset() {
    let executor = RequestExecutor::with_default_ttl(Duration::from_millis(100));
    let calls = counter();
    let opts = ExecuteOptions::new().with_cache(true);

    let _ = executor
        .execute(fetcher(&calls, 1u8, Duration::ZERO), "K", opts)
        .await;
    sleep(Duration::from_millis(50)).await;
    assert!(executor.is_cached("K"));
    sleep(Duration::from_millis(60)).await;
    assert!(!executor.is_cached("K"));
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_shared_then_cached() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_millis(5000));
    let lions = json!({ "id": 1, "name": "Lions" });
    let start = Instant::now();

    let first = async {
        let r = executor
            .execute(fetcher(&calls, lions.clone(), Duration::from_millis(50)), "team_1", opts)
            .await;
        (r, start.elapsed())
    };
    let second = async {
        sleep(Duration::from_millis(10)).await;
        let r = executor
            .execute(fetcher(&calls, json!(null), Duration::from_millis(50)), "team_1", opts)
            .await;
        (r, start.elapsed())
    };
    let third = async {
        sleep(Duration::from_millis(100)).await;
        let before = Instant::now();
        let r = executor
            .execute(fetcher(&calls, json!(null), Duration::from_millis(50)), "team_1", opts)
            .await;
        (r, before.elapsed())
    };

    let ((r1, t1), (r2, t2), (r3, wait3)) = tokio::join!(first, second, third);

    let expected: Result<Value, FetchError> = Ok(lions.clone());
    assert_eq!(r1, expected);
    assert_eq!(r2, expected);
    assert_eq!(r3, expected);
    assert!(t1 >= Duration::from_millis(50) && t1 < Duration::from_millis(60));
    assert!(t2 >= Duration::from_millis(50) && t2 < Duration::from_millis(60));
    assert_eq!(wait3, Duration::ZERO);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replaced_fetch_cannot_cache_after_clear() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let slow = executor.execute(
        fetcher(&calls, "stale".to_string(), Duration::from_millis(100)),
        "fetchTeams",
        opts,
    );
    let forced = async {
        sleep(Duration::from_millis(10)).await;
        executor
            .execute(
                fetcher(&calls, "forced".to_string(), Duration::from_millis(20)),
                "fetchTeams",
                opts.with_force_refresh(true),
            )
            .await
    };
    let clear = async {
        // 强制刷新已完成，原请求仍在进行
        sleep(Duration::from_millis(50)).await;
        executor.clear_cache(&["fetchTeams"]);
        assert!(!executor.is_cached("fetchTeams"));
        assert!(!executor.is_in_flight("fetchTeams"));
    };
    let (slow, forced, ()) = tokio::join!(slow, forced, clear);

    assert_eq!(slow, Ok("stale".to_string()));
    assert_eq!(forced, Ok("forced".to_string()));
    assert!(!executor.is_cached("fetchTeams"));

    let next = executor
        .execute(
            fetcher(&calls, "fresh".to_string(), Duration::ZERO),
            "fetchTeams",
            opts,
        )
        .await;
    assert_eq!(next, Ok("fresh".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_clear_all_blocks_pending_cache_writes() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let fetch = {
        let calls = Arc::clone(&calls);
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok::<u8, FetchError>(1)
        }
    };

    let pending = executor.execute(fetch, "K", opts);
    let control = async {
        let _ = started_rx.await;
        executor.clear_all();
        let _ = release_tx.send(());
    };
    let (result, ()) = tokio::join!(pending, control);

    assert_eq!(result, Ok(1));
    assert_eq!(executor.cached_len(), 0);
    assert_eq!(executor.in_flight_len(), 0);
}

#[tokio::test]
async fn test_unpolled_caller_leaves_no_record() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));

    let abandoned = executor.execute(fetcher(&calls, 1u8, Duration::ZERO), "K", opts);
    drop(abandoned);

    assert_eq!(executor.in_flight_len(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let later = executor
        .execute(fetcher(&calls, 2u8, Duration::ZERO), "K", opts)
        .await;
    assert_eq!(later, Ok::<u8, FetchError>(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_starter_fetch_is_driven_by_joiner() {
    let executor = RequestExecutor::new();
    let calls = counter();
    let opts = ExecuteOptions::cached(Duration::from_secs(60));
    let start = Instant::now();

    // 发起者在请求完成前被取消，记录仍保留
    let cancelled = tokio::time::timeout(
        Duration::from_millis(10),
        executor.execute(
            fetcher(&calls, "shared".to_string(), Duration::from_millis(50)),
            "K",
            opts,
        ),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(executor.in_flight_len(), 1);

    // 后来的调用者接管同一个请求，而不是卡住或重新请求
    let joined = executor
        .execute(
            fetcher(&calls, "other".to_string(), Duration::from_millis(50)),
            "K",
            opts,
        )
        .await;

    assert_eq!(joined, Ok("shared".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(60));
    assert_eq!(executor.in_flight_len(), 0);
    assert!(executor.is_cached("K"));
}
