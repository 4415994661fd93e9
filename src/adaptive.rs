use crate::profile::ScanConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// EMA smoothing factor for probe latency.
const LATENCY_ALPHA: f64 = 0.2;
/// Consecutive failures tolerated before concurrency is cut.
const ERROR_STREAK_LIMIT: u32 = 5;
/// Multiplier applied to concurrency on a cut.
const BACKOFF_FACTOR: f64 = 0.75;

#[derive(Debug)]
struct EngineState {
    concurrency: usize,
    latency_ema: Duration,
    error_streak: u32,
}

/// Feedback controller for probe concurrency and timeout (AIMD-style).
///
/// All three state fields sit behind a single mutex so that a
/// [`record_result`](Self::record_result) call is observed as one step by
/// concurrent readers.
#[derive(Debug)]
pub struct AdaptiveEngine {
    config: ScanConfig,
    state: Mutex<EngineState>,
}

impl AdaptiveEngine {
    pub fn new(config: ScanConfig) -> Self {
        let initial = config.initial_concurrency.max(1);
        Self {
            config: ScanConfig {
                initial_concurrency: initial,
                ..config
            },
            state: Mutex::new(EngineState {
                concurrency: initial,
                latency_ema: Duration::ZERO,
                error_streak: 0,
            }),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn initial_concurrency(&self) -> usize {
        self.config.initial_concurrency
    }

    /// Current recommended number of in-flight probes.
    pub fn concurrency(&self) -> usize {
        self.lock().concurrency
    }

    /// Smoothed probe latency; zero until the first sample.
    pub fn latency_estimate(&self) -> Duration {
        self.lock().latency_ema
    }

    /// Twice the latency estimate, clamped to `[min_timeout, max_timeout]`.
    pub fn timeout(&self) -> Duration {
        let ema = self.lock().latency_ema;
        ema.saturating_mul(2)
            .max(self.config.min_timeout)
            .min(self.config.max_timeout)
    }

    /// Feed one probe outcome back into the controller and return the
    /// concurrency that results from it.
    pub fn record_result(&self, latency: Duration, success: bool) -> usize {
        let ceiling = self.config.initial_concurrency.saturating_mul(2);
        let mut state = self.lock();

        state.latency_ema = if state.latency_ema.is_zero() {
            latency
        } else {
            latency.mul_f64(LATENCY_ALPHA) + state.latency_ema.mul_f64(1.0 - LATENCY_ALPHA)
        };

        if success {
            if state.error_streak == 0 && state.concurrency < ceiling {
                state.concurrency += 1;
            }
        } else {
            state.error_streak += 1;
            if state.error_streak > ERROR_STREAK_LIMIT {
                let cut = (state.concurrency as f64 * BACKOFF_FACTOR) as usize;
                state.concurrency = cut.max(1);
                state.error_streak = 0;
            }
        }

        state.concurrency
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // State is plain numbers, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn error_streak(&self) -> u32 {
        self.lock().error_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{resolve, Profile};
    use std::sync::Arc;

    fn engine_with(concurrency: usize) -> AdaptiveEngine {
        AdaptiveEngine::new(ScanConfig {
            initial_concurrency: concurrency,
            ..Profile::Balanced.config()
        })
    }

    #[test]
    fn cold_start_timeout_is_min() {
        for p in Profile::ALL {
            let e = AdaptiveEngine::new(p.config());
            assert_eq!(e.timeout(), p.config().min_timeout);
        }
    }

    #[test]
    fn first_sample_initialises_ema() {
        let e = engine_with(10);
        e.record_result(Duration::from_millis(120), true);
        assert_eq!(e.latency_estimate(), Duration::from_millis(120));

        e.record_result(Duration::from_millis(220), true);
        // 0.2 * 220 + 0.8 * 120
        let ms = e.latency_estimate().as_secs_f64() * 1_000.0;
        assert!((ms - 140.0).abs() < 0.001, "got {ms}");
    }

    #[test]
    fn timeout_stays_within_bounds() {
        let cfg = resolve("balanced");
        let e = AdaptiveEngine::new(cfg);
        e.record_result(Duration::from_millis(1), true);
        assert_eq!(e.timeout(), cfg.min_timeout);

        let e = AdaptiveEngine::new(cfg);
        e.record_result(Duration::from_secs(60), false);
        assert_eq!(e.timeout(), cfg.max_timeout);

        let e = AdaptiveEngine::new(cfg);
        e.record_result(Duration::from_millis(400), true);
        assert_eq!(e.timeout(), Duration::from_millis(800));
    }

    #[test]
    fn six_failures_cut_concurrency_by_a_quarter() {
        let e = engine_with(50);
        for _ in 0..5 {
            e.record_result(Duration::from_millis(10), false);
        }
        assert_eq!(e.concurrency(), 50);
        assert_eq!(e.error_streak(), 5);

        e.record_result(Duration::from_millis(10), false);
        assert_eq!(e.concurrency(), 37);
        assert_eq!(e.error_streak(), 0);
    }

    #[test]
    fn cuts_never_go_below_one() {
        let e = engine_with(2);
        for _ in 0..60 {
            e.record_result(Duration::from_millis(10), false);
            assert!(e.concurrency() >= 1);
        }
        assert_eq!(e.concurrency(), 1);
    }

    #[test]
    fn successes_ramp_linearly_up_to_double() {
        let e = engine_with(4);
        for expected in 5..=8 {
            assert_eq!(e.record_result(Duration::from_millis(5), true), expected);
        }
        for _ in 0..10 {
            e.record_result(Duration::from_millis(5), true);
        }
        assert_eq!(e.concurrency(), 8);
    }

    #[test]
    fn pending_failure_streak_blocks_ramp_up() {
        let e = engine_with(4);
        e.record_result(Duration::from_millis(5), false);
        e.record_result(Duration::from_millis(5), true);
        assert_eq!(e.concurrency(), 4);
    }

    #[test]
    fn zero_initial_concurrency_is_raised_to_one() {
        let e = engine_with(0);
        assert_eq!(e.concurrency(), 1);
        assert_eq!(e.initial_concurrency(), 1);
    }

    #[test]
    fn concurrent_updates_keep_invariants() {
        let cfg = resolve("aggressive");
        let e = Arc::new(AdaptiveEngine::new(cfg));
        std::thread::scope(|s| {
            for worker in 0..8 {
                let e = Arc::clone(&e);
                s.spawn(move || {
                    for i in 0..500u64 {
                        let ok = (i + worker) % 3 != 0;
                        e.record_result(Duration::from_micros(100 + i), ok);
                        let t = e.timeout();
                        assert!(t >= cfg.min_timeout && t <= cfg.max_timeout);
                        let c = e.concurrency();
                        assert!((1..=cfg.initial_concurrency * 2).contains(&c));
                    }
                });
            }
        });
    }
}
