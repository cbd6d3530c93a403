//! Background processing: daily player name cache flush.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::{debug, error, info};

use mcstat_core::collector::IdentityResolver;

/// Fallback wait when the target time cannot be computed.
const FALLBACK_WAIT: Duration = Duration::from_secs(24 * 3600);

// ============================================================
// Name cache flush
// ============================================================

/// Flushes the name cache every day at `hour`:00 local time, so renamed
/// players show up under their new name.
pub(crate) async fn flush_loop(identity: Arc<IdentityResolver>, hour: u32) {
    loop {
        let wait = until_next(Local::now(), hour);
        debug!(wait_secs = wait.as_secs(), hour, "next name cache flush scheduled");
        tokio::time::sleep(wait).await;
        flush_cache(&identity).await;
    }
}

/// Empties the name cache off the async runtime; returns the flushed count.
///
/// A scrape holds the cache lock for the length of a remote lookup.
pub(crate) async fn flush_cache(identity: &Arc<IdentityResolver>) -> Option<usize> {
    let resolver = Arc::clone(identity);
    match tokio::task::spawn_blocking(move || resolver.flush()).await {
        Ok(entries) => {
            info!(entries, "player name cache flushed");
            Some(entries)
        }
        Err(e) => {
            error!(error = %e, "name cache flush panicked in spawn_blocking");
            None
        }
    }
}

/// Time from `now` until the next `hour`:00 in `now`'s time zone.
///
/// Exactly on the hour counts as already passed, so the result is never zero.
pub(crate) fn until_next<Tz: TimeZone>(now: DateTime<Tz>, hour: u32) -> Duration {
    let now: NaiveDateTime = now.naive_local();
    let Some(mut target) = now.date().and_hms_opt(hour, 0, 0) else {
        return FALLBACK_WAIT;
    };
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(FALLBACK_WAIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Instant;

    use chrono::Utc;
    use mcstat_core::collector::{LookupError, ProfileLookup};

    /// Lookup that parks until released, holding the resolver's cache lock.
    struct GatedLookup {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl ProfileLookup for GatedLookup {
        fn lookup(&self, _id: &str) -> Result<String, LookupError> {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5));
            Ok("Notch".to_string())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_flush_waits_off_runtime_during_lookup() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let identity = Arc::new(IdentityResolver::new().with_remote(GatedLookup {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));

        let scrape = {
            let identity = Arc::clone(&identity);
            std::thread::spawn(move || identity.resolve("069a79f4-44e9-4726-a5be-fca90e38aaf5"))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let flush = {
            let identity = Arc::clone(&identity);
            tokio::spawn(async move { flush_cache(&identity).await })
        };

        // the runtime thread stays free while the flush waits for the lock
        let t0 = Instant::now();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(t0.elapsed() < Duration::from_secs(2));

        release_tx.send(()).unwrap();
        assert_eq!(scrape.join().unwrap().as_deref(), Some("Notch"));
        assert_eq!(flush.await.unwrap(), Some(1));
        assert_eq!(identity.cached(), 0);
    }

    #[test]
    fn test_until_next_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 30, 0).unwrap();
        assert_eq!(until_next(now, 1), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_until_next_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        assert_eq!(until_next(now, 1), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_until_next_exactly_on_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap();
        assert_eq!(until_next(now, 1), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_until_next_invalid_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap();
        assert_eq!(until_next(now, 24), FALLBACK_WAIT);
    }
}
