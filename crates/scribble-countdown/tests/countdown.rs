//! Integration tests for countdown expiry and cancellation.
//!
//! Time is paused, so sleeps resolve as soon as the runtime is idle and
//! `tokio::time::advance` moves the clock explicitly.

use std::time::Duration;

use scribble_countdown::{Countdown, CountdownSequence};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Lets spawned countdown tasks observe a clock change.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_expiry_message_arrives_after_duration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = CountdownSequence::new();
    let start = Instant::now();

    let countdown = Countdown::start(seq.next_id(), Duration::from_secs(5), tx, "done");
    assert_eq!(countdown.duration(), Duration::from_secs(5));
    assert_eq!(countdown.deadline(), start + Duration::from_secs(5));

    let msg = rx.recv().await.expect("expiry");
    assert_eq!(msg, "done");
    assert_eq!(Instant::now() - start, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_nothing_arrives_before_deadline() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = CountdownSequence::new();
    let countdown = Countdown::start(seq.next_id(), Duration::from_secs(5), tx, ());

    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(countdown.remaining(), Duration::from_secs(1));

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert!(rx.try_recv().is_ok());
    assert_eq!(countdown.remaining(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_expiry() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    let mut seq = CountdownSequence::new();
    let mut countdown = Countdown::start(seq.next_id(), Duration::from_secs(5), tx, 1);

    countdown.cancel();
    assert!(countdown.is_cancelled());
    // Cancelling twice is harmless.
    countdown.cancel();

    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert!(countdown.is_finished());
    // The only sender lived in the aborted task, so the channel is closed
    // without ever delivering a message.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_drop_prevents_expiry() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    let mut seq = CountdownSequence::new();
    drop(Countdown::start(seq.next_id(), Duration::from_secs(5), tx, 1));

    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_replacing_countdown_fires_only_the_second() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = CountdownSequence::new();
    let start = Instant::now();

    let first_id = seq.next_id();
    let mut current = Countdown::start(first_id, Duration::from_secs(5), tx.clone(), first_id);

    tokio::time::advance(Duration::from_secs(2)).await;
    let second_id = seq.next_id();
    current.cancel();
    current = Countdown::start(second_id, Duration::from_secs(5), tx, second_id);
    assert_eq!(current.id(), second_id);

    let fired = rx.recv().await.expect("expiry");
    assert_eq!(fired, second_id);
    assert_eq!(Instant::now() - start, Duration::from_secs(7));

    drop(current);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_zero_duration_expires_immediately() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = CountdownSequence::new();
    let _countdown = Countdown::start(seq.next_id(), Duration::ZERO, tx, "now");
    settle().await;
    assert_eq!(rx.try_recv().ok(), Some("now"));
}
