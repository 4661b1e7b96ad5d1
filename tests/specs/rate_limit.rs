//! Daily rate limiter: budget, denial, and midnight rollover.

use std::time::Duration;
use vet_core::{Clock, FakeClock};
use vet_engine::RateLimiter;

#[test]
fn limit_three_allows_three_then_rolls_over() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(0);
    let limiter = RateLimiter::new(3, clock.clone());

    let outcomes: Vec<bool> = (0..4).map(|_| limiter.consume().allowed).collect();
    assert_eq!(outcomes, vec![true, true, true, false]);
    assert_eq!(limiter.stats().count, 3);

    // Next calendar day: the counter resets before the consume is judged.
    let day = clock.date_stamp();
    clock.advance(Duration::from_secs(24 * 3600));
    assert_ne!(clock.date_stamp(), day);

    assert!(limiter.consume().allowed);
    let stats = limiter.stats();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.remaining, 2);
}

#[test]
fn concurrent_consumers_never_exceed_the_daily_budget() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(0);
    let limiter = std::sync::Arc::new(RateLimiter::new(100, clock));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let limiter = std::sync::Arc::clone(&limiter);
        handles.push(std::thread::spawn(move || {
            (0..50).filter(|_| limiter.consume().allowed).count()
        }));
    }
    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap_or(0)).sum();

    // 8 × 50 = 400 attempts against a budget of 100.
    assert_eq!(allowed, 100);
    assert_eq!(limiter.stats().count, 100);
}
