// crates/resilience/tests/resilience_tests.rs
//! Integration tests for debouncing and timeouts

use earmark_resilience::{with_timeout, Debouncer, ResilienceError};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_burst_of_ticks_fires_once_with_last_value() {
    let mut debouncer = Debouncer::new(Duration::from_millis(2000));
    let mut fired = Vec::new();

    // Ten ticks a quarter second apart: all inside one quiet window of each other
    for position in 0..10 {
        debouncer.schedule(position);
        tokio::time::advance(Duration::from_millis(250)).await;
    }

    fired.push(debouncer.fired().await);

    let nothing_else = with_timeout(Duration::from_secs(30), debouncer.fired()).await;
    assert!(matches!(nothing_else, Err(ResilienceError::Timeout(_))));
    assert_eq!(fired, vec![9]);
}

#[tokio::test(start_paused = true)]
async fn test_separate_bursts_fire_separately() {
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    debouncer.schedule("first");
    assert_eq!(debouncer.fired().await, "first");

    debouncer.schedule("second");
    assert_eq!(debouncer.fired().await, "second");
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_in_select_loop() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<u32>(16);
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let start = Instant::now();

    tokio::spawn(async move {
        for value in 1..=3 {
            let _ = tx.send(value).await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let mut delivered = Vec::new();
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(value) => {
                    debouncer.schedule(value);
                }
                None => {
                    if !debouncer.is_pending() {
                        break;
                    }
                    delivered.push(debouncer.fired().await);
                    break;
                }
            },
            value = debouncer.fired() => delivered.push(value),
        }
    }

    assert_eq!(delivered, vec![3]);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_bounds_slow_operation() {
    let result = with_timeout(
        Duration::from_millis(50),
        tokio::time::sleep(Duration::from_secs(5)),
    )
    .await;
    assert!(matches!(result, Err(ResilienceError::Timeout(d)) if d == Duration::from_millis(50)));
}
