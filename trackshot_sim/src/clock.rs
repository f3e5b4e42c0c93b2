//! Simulated frame clock implementing FrameClock for deterministic testing.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use trackshot_env::FrameClock;

/// Frame clock backed by virtual time and a seeded RNG.
///
/// This implements `FrameClock` using:
/// - A virtual clock advanced by a fixed frame step on every `tick()`
/// - Optional Gaussian jitter on each step, drawn from a ChaCha8 RNG
///
/// Clones share the same virtual time, so a harness can keep a handle to
/// read the time while the frame loop owns the clock.
pub struct SimClock {
    /// Master seed for this clock
    seed: u64,

    /// Nominal frame step
    frame_step: Duration,

    /// Frame-step jitter (standard deviation), if any
    jitter: Option<Normal<f64>>,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Deterministic RNG for frame jitter
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimClock {
    /// Creates a jitter-free clock ticking at `fps` frames per second.
    pub fn new(seed: u64, fps: u32) -> Self {
        Self {
            seed,
            frame_step: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            jitter: None,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Adds Gaussian jitter with the given standard deviation (seconds) to
    /// every frame step. Zero, negative or non-finite values disable jitter.
    pub fn with_jitter(mut self, std_dev_secs: f64) -> Self {
        self.jitter = if std_dev_secs.is_finite() && std_dev_secs > 0.0 {
            Normal::new(0.0, std_dev_secs).ok()
        } else {
            None
        };
        self
    }

    /// Nominal frame step.
    pub fn frame_step(&self) -> Duration {
        self.frame_step
    }

    /// Advances virtual time by the given duration without marking a frame.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_step(&self) -> Duration {
        let nominal = self.frame_step.as_secs_f64();
        let Some(jitter) = self.jitter else {
            return self.frame_step;
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        // Never run backwards, never stall completely
        let step = (nominal + jitter.sample(&mut *rng)).max(nominal * 0.1);
        Duration::from_secs_f64(step)
    }
}

impl Clone for SimClock {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            frame_step: self.frame_step,
            jitter: self.jitter,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            rng: Arc::clone(&self.rng),
        }
    }
}

impl FrameClock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn tick(&mut self) -> f64 {
        let step = self.next_step();
        self.advance_time(step);
        step.as_secs_f64()
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
