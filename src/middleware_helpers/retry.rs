use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Fixed-interval polling budget
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of probes before giving up
    pub max_attempts: u32,
    /// Delay between consecutive probes
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(500),
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on the time spent sleeping between probes
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The probe never became ready within `attempts` tries
    Exhausted { attempts: u32 },
    /// The probe reported a terminal failure; no further attempts were made
    Failed(E),
}

/// Calls `probe` until it is ready, fails, or the attempt budget runs out.
///
/// `probe` receives the 1-based attempt number. There is no backoff: every
/// pending probe is followed by the same fixed sleep, except the last one.
pub async fn poll_until<F, Fut, T, E>(config: &PollConfig, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match probe(attempt).await {
            Ok(PollStatus::Ready(value)) => {
                debug!(attempt, "poll completed");
                return Ok(value);
            }
            Ok(PollStatus::Pending) => {
                if attempt < max_attempts {
                    sleep(config.interval).await;
                }
            }
            Err(error) => {
                warn!(attempt, %error, "poll aborted");
                return Err(PollError::Failed(error));
            }
        }
    }

    warn!(attempts = max_attempts, "poll exhausted without completing");
    Err(PollError::Exhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn quick(max_attempts: u32) -> PollConfig {
        PollConfig::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn ready_on_third_attempt() {
        let result: Result<&str, PollError<String>> = poll_until(&quick(5), |attempt| async move {
            if attempt == 3 {
                Ok(PollStatus::Ready("done"))
            } else {
                Ok(PollStatus::Pending)
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn failure_short_circuits_remaining_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), PollError<String>> = poll_until(&quick(30), move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 2 {
                    Err("FAILED".to_string())
                } else {
                    Ok(PollStatus::Pending)
                }
            }
        })
        .await;

        assert_matches!(result, Err(PollError::Failed(reason)) if reason == "FAILED");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_stops_at_attempt_bound() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), PollError<String>> = poll_until(&quick(4), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStatus::Pending) }
        })
        .await;

        assert_eq!(result, Err(PollError::Exhausted { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn pending_probes_sleep_the_fixed_interval() {
        let config = PollConfig::new(3, Duration::from_millis(20));
        let started = Instant::now();

        let result: Result<(), PollError<String>> =
            poll_until(&config, |_| async { Ok(PollStatus::Pending) }).await;

        assert!(result.is_err());
        assert!(started.elapsed() >= config.budget());
    }

    #[test]
    fn default_budget_matches_export_window() {
        let config = PollConfig::default();
        assert_eq!(config.max_attempts, 30);
        assert!(config.budget() < Duration::from_secs(15));
    }
}
