use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt as _;
use futures::future::join_all;

use super::*;

fn counting_fetch<T>(
    calls: &Arc<AtomicUsize>,
    res: Result<T, String>,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, String>> + Send + 'static
where
    T: Send + 'static,
{
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            res
        }
        .boxed()
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn concurrent_identical_calls_fetch_once() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("condenser_api.get_accounts#alice");

    let results = join_all((0..8).map(|i| {
        dedup.run(
            key.clone(),
            counting_fetch(&calls, Ok::<_, String>(format!("value from fetch {i}"))),
        )
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(
        results
            .iter()
            .all(|r| r.as_deref() == Ok("value from fetch 0"))
    );
    assert_eq!(dedup.in_flight_len(), 0);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn errors_are_shared_identically() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let results: Vec<Result<u32, String>> = join_all(
        (0..5).map(|_| dedup.run(key.clone(), counting_fetch(&calls, Err("all nodes failed".into())))),
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(
        results
            .iter()
            .all(|r| r == &Err("all nodes failed".to_string()))
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn settled_fetch_is_not_replayed() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let first: Result<u32, String> = dedup.run(key.clone(), counting_fetch(&calls, Ok(1))).await;
    let second: Result<u32, String> = dedup.run(key.clone(), counting_fetch(&calls, Ok(2))).await;

    assert_eq!(first, Ok(1));
    assert_eq!(second, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn failed_fetch_is_not_replayed_either() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let first: Result<u32, String> = dedup
        .run(key.clone(), counting_fetch(&calls, Err("boom".into())))
        .await;
    let second: Result<u32, String> = dedup.run(key.clone(), counting_fetch(&calls, Ok(7))).await;

    assert!(first.is_err());
    assert_eq!(second, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn different_keys_fetch_independently() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b): (Result<u32, String>, Result<u32, String>) = tokio::join!(
        dedup.run(RequestKey::named("a"), counting_fetch(&calls, Ok(1))),
        dedup.run(RequestKey::named("b"), counting_fetch(&calls, Ok(2))),
    );

    assert_eq!((a, b), (Ok(1), Ok(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn subscribers_are_counted_while_in_flight() {
    let dedup = Arc::new(Deduplicator::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let dedup = dedup.clone();
            let key = key.clone();
            let fetch = counting_fetch(&calls, Ok::<u32, String>(5));
            tokio::spawn(async move { dedup.run(key, fetch).await })
        })
        .collect();

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(dedup.subscribers(&key), Some(3));
    assert_eq!(dedup.in_flight_len(), 1);

    for task in tasks {
        assert_eq!(task.await.expect("task finished"), Ok(5));
    }
    assert_eq!(dedup.subscribers(&key), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn late_joiner_after_settle_starts_fresh() {
    let dedup = Arc::new(Deduplicator::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let early = {
        let dedup = dedup.clone();
        let key = key.clone();
        let fetch = counting_fetch(&calls, Ok::<u32, String>(1));
        tokio::spawn(async move { dedup.run(key, fetch).await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(early.await.expect("task finished"), Ok(1));

    let late: Result<u32, String> = dedup.run(key, counting_fetch(&calls, Ok(2))).await;
    assert_eq!(late, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn abandoned_fetch_still_settles_and_unregisters() {
    let dedup = Deduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let gave_up = tokio::time::timeout(
        Duration::from_millis(10),
        dedup.run(key.clone(), counting_fetch(&calls, Ok::<u32, String>(1))),
    )
    .await;
    assert!(gave_up.is_err());

    // Nobody waits anymore, the fetch keeps going
    assert_eq!(dedup.in_flight_len(), 1);
    assert_eq!(dedup.subscribers(&key), Some(0));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(dedup.in_flight_len(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let next: Result<u32, String> = dedup.run(key, counting_fetch(&calls, Ok(2))).await;
    assert_eq!(next, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn dropped_waiter_does_not_disturb_the_others() {
    let dedup = Arc::new(Deduplicator::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = RequestKey::named("k");

    let patient = {
        let dedup = dedup.clone();
        let key = key.clone();
        let fetch = counting_fetch(&calls, Ok::<u32, String>(3));
        tokio::spawn(async move { dedup.run(key, fetch).await })
    };
    let impatient = {
        let dedup = dedup.clone();
        let key = key.clone();
        let fetch = counting_fetch(&calls, Ok::<u32, String>(4));
        tokio::spawn(async move {
            tokio::time::timeout(Duration::from_millis(10), dedup.run(key, fetch)).await
        })
    };

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(dedup.subscribers(&key), Some(2));

    assert!(impatient.await.expect("task finished").is_err());
    assert_eq!(dedup.subscribers(&key), Some(1));

    assert_eq!(patient.await.expect("task finished"), Ok(3));
    assert_eq!(dedup.in_flight_len(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
