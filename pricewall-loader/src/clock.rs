//! Live clock for relative-time labels.
//!
//! One ticker per process. Components that print "3s ago" subscribe and
//! re-render their label when a new tick is observed; nothing else listens,
//! so a tick never reaches classification, flattening or the virtualizer.
//! The number of subscribers does not grow the number of timers.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
struct Shared {
    tick: AtomicU64,
    subscribers: AtomicUsize,
    stop: AtomicBool,
}

/// Process-scoped tick counter.
#[derive(Debug)]
pub struct LiveClock {
    shared: Arc<Shared>,
    ticker: Option<JoinHandle<()>>,
}

impl LiveClock {
    /// Start the background ticker.
    pub fn start(interval: Duration) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        let ticker = thread::Builder::new()
            .name("pricewall-clock".into())
            .spawn(move || {
                while !worker.stop.load(Ordering::Relaxed) {
                    thread::park_timeout(interval);
                    if worker.stop.load(Ordering::Relaxed) {
                        break;
                    }
                    worker.tick.fetch_add(1, Ordering::Relaxed);
                }
            })?;
        Ok(Self {
            shared,
            ticker: Some(ticker),
        })
    }

    /// A clock that only moves on [`LiveClock::advance`]. For tests.
    pub fn manual() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            ticker: None,
        }
    }

    pub fn advance(&self) {
        self.shared.tick.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tick(&self) -> u64 {
        self.shared.tick.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.subscribers.fetch_add(1, Ordering::Relaxed);
        Subscription {
            shared: Arc::clone(&self.shared),
            seen: self.tick(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.load(Ordering::Relaxed)
    }
}

impl Drop for LiveClock {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

/// Handle held by one relative-time consumer. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    shared: Arc<Shared>,
    seen: u64,
}

impl Subscription {
    /// True once per new tick since the last call.
    pub fn poll(&mut self) -> bool {
        let tick = self.shared.tick.load(Ordering::Relaxed);
        if tick != self.seen {
            self.seen = tick;
            true
        } else {
            false
        }
    }

    pub fn tick(&self) -> u64 {
        self.seen
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Human-relative label for `ts` as seen from `now`: "just now", "3s ago",
/// "in 2m".
pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    let magnitude = secs.unsigned_abs();
    if magnitude < 1 {
        return "just now".to_string();
    }
    let amount = match magnitude {
        s if s < 60 => format!("{s}s"),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    };
    if secs > 0 {
        format!("{amount} ago")
    } else {
        format!("in {amount}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn manual_clock_ticks_on_advance() {
        let clock = LiveClock::manual();
        let mut sub = clock.subscribe();
        assert!(!sub.poll());
        clock.advance();
        assert!(sub.poll());
        assert!(!sub.poll());
        assert_eq!(sub.tick(), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let clock = LiveClock::manual();
        let a = clock.subscribe();
        let b = clock.subscribe();
        assert_eq!(clock.subscriber_count(), 2);
        drop(a);
        assert_eq!(clock.subscriber_count(), 1);
        drop(b);
        assert_eq!(clock.subscriber_count(), 0);
    }

    #[test]
    fn background_ticker_advances_and_stops() {
        let clock = LiveClock::start(Duration::from_millis(5)).unwrap();
        let mut sub = clock.subscribe();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !sub.poll() {
            assert!(std::time::Instant::now() < deadline, "clock never ticked");
            thread::sleep(Duration::from_millis(2));
        }
        drop(sub);
        drop(clock);
    }

    #[test]
    fn relative_labels() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - ChronoDuration::seconds(3), now), "3s ago");
        assert_eq!(relative_time(now + ChronoDuration::seconds(120), now), "in 2m");
        assert_eq!(relative_time(now - ChronoDuration::hours(5), now), "5h ago");
        assert_eq!(relative_time(now - ChronoDuration::days(2), now), "2d ago");
    }
}
