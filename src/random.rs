//! Seeded random processes for interarrival and service durations.
//!
//! Every stochastic input to the simulation flows through a
//! `RandomProcess`: a lazy, infinite, restartable sequence of duration
//! samples. Each station/population pair owns its own stream — there is
//! no process-wide shared generator, so independent runs and independent
//! streams never correlate. Streams are carved out of a single scenario
//! seed with ChaCha's independent stream counters.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution as _, Exp};

use crate::error::{SimError, SimResult};

// ── Distribution spec ─────────────────────────────────────────────────

/// Closed-form duration distribution selected in scenario configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DurationDistribution {
    /// Exponential with the given rate (mean `1 / rate`).
    Exponential { rate: f64 },
    /// Always the same duration.
    Deterministic { value: f64 },
    /// Uniform on `[low, high]`.
    Uniform { low: f64, high: f64 },
}

impl DurationDistribution {
    /// Mean of the distribution.
    pub fn mean(&self) -> f64 {
        match *self {
            DurationDistribution::Exponential { rate } => 1.0 / rate,
            DurationDistribution::Deterministic { value } => value,
            DurationDistribution::Uniform { low, high } => (low + high) / 2.0,
        }
    }

    /// Validate parameters; surfaced at scenario setup, never mid-run.
    pub fn validate(&self, what: &'static str) -> SimResult<()> {
        match *self {
            DurationDistribution::Exponential { rate } => {
                if rate <= 0.0 || !rate.is_finite() {
                    return Err(SimError::NonPositive { what, value: rate });
                }
            }
            DurationDistribution::Deterministic { value } => {
                if value < 0.0 || !value.is_finite() {
                    return Err(SimError::NegativeDuration { value });
                }
            }
            DurationDistribution::Uniform { low, high } => {
                if !(low <= high) || !low.is_finite() || !high.is_finite() {
                    return Err(SimError::UniformBounds { low, high });
                }
                if low < 0.0 {
                    return Err(SimError::NegativeDuration { value: low });
                }
            }
        }
        Ok(())
    }
}

// ── Random process ────────────────────────────────────────────────────

/// Prepared sampler, built once so the hot path never re-validates.
#[derive(Debug, Clone)]
enum Sampler {
    Exp(Exp<f64>),
    Deterministic(f64),
    Uniform { low: f64, high: f64 },
}

/// A lazy, infinite, restartable stream of duration samples.
///
/// Restartable: the seed and stream id are kept, so `restart()` replays
/// the exact same sequence. Also an `Iterator<Item = f64>`.
#[derive(Debug, Clone)]
pub struct RandomProcess {
    spec: DurationDistribution,
    sampler: Sampler,
    rng: ChaCha8Rng,
    seed: u64,
    stream: u64,
}

impl RandomProcess {
    /// Build a process for `spec`, on stream `stream` of `seed`.
    ///
    /// Fails on invalid parameters — the same checks scenario validation
    /// performs, so a validated configuration never errors here.
    pub fn new(spec: DurationDistribution, seed: u64, stream: u64) -> SimResult<Self> {
        spec.validate("distribution rate")?;
        let sampler = match spec {
            DurationDistribution::Exponential { rate } => Sampler::Exp(
                Exp::new(rate).map_err(|_| SimError::NonPositive {
                    what: "distribution rate",
                    value: rate,
                })?,
            ),
            DurationDistribution::Deterministic { value } => Sampler::Deterministic(value),
            DurationDistribution::Uniform { low, high } => Sampler::Uniform { low, high },
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Ok(RandomProcess {
            spec,
            sampler,
            rng,
            seed,
            stream,
        })
    }

    /// Draw the next duration sample.
    pub fn sample(&mut self) -> f64 {
        match self.sampler {
            Sampler::Exp(exp) => exp.sample(&mut self.rng),
            Sampler::Deterministic(value) => value,
            Sampler::Uniform { low, high } => {
                if low == high {
                    low
                } else {
                    self.rng.gen_range(low..high)
                }
            }
        }
    }

    /// Rewind the stream to its first sample.
    pub fn restart(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.rng.set_stream(self.stream);
    }

    /// The distribution this process samples from.
    pub fn spec(&self) -> DurationDistribution {
        self.spec
    }
}

impl Iterator for RandomProcess {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let spec = DurationDistribution::Exponential { rate: 2.0 };
        let mut a = RandomProcess::new(spec, 42, 7).unwrap();
        let mut b = RandomProcess::new(spec, 42, 7).unwrap();

        let sa: Vec<f64> = (0..100).map(|_| a.sample()).collect();
        let sb: Vec<f64> = (0..100).map(|_| b.sample()).collect();
        assert_eq!(sa, sb, "stream is not deterministic");
    }

    #[test]
    fn test_different_streams_differ() {
        let spec = DurationDistribution::Exponential { rate: 2.0 };
        let mut a = RandomProcess::new(spec, 42, 0).unwrap();
        let mut b = RandomProcess::new(spec, 42, 1).unwrap();
        assert_ne!(a.sample(), b.sample());
    }

    #[test]
    fn test_restart_replays() {
        let spec = DurationDistribution::Uniform { low: 1.0, high: 4.0 };
        let mut p = RandomProcess::new(spec, 99, 3).unwrap();
        let first: Vec<f64> = (0..10).map(|_| p.sample()).collect();
        p.restart();
        let second: Vec<f64> = (0..10).map(|_| p.sample()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exponential_mean() {
        let rate = 0.5;
        let mut p =
            RandomProcess::new(DurationDistribution::Exponential { rate }, 7, 0).unwrap();
        let n = 50_000;
        let mean: f64 = (0..n).map(|_| p.sample()).sum::<f64>() / n as f64;
        let expected = 1.0 / rate;
        assert!(
            (mean - expected).abs() / expected < 0.05,
            "sample mean {} too far from {}",
            mean,
            expected
        );
    }

    #[test]
    fn test_deterministic_is_constant() {
        let mut p =
            RandomProcess::new(DurationDistribution::Deterministic { value: 3.25 }, 1, 0)
                .unwrap();
        for _ in 0..20 {
            assert_eq!(p.sample(), 3.25);
        }
    }

    #[test]
    fn test_uniform_range() {
        let mut p = RandomProcess::new(
            DurationDistribution::Uniform { low: 2.0, high: 5.0 },
            11,
            0,
        )
        .unwrap();
        for _ in 0..1000 {
            let v = p.sample();
            assert!((2.0..5.0).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn test_iterator_is_lazy_and_infinite() {
        let p = RandomProcess::new(DurationDistribution::Exponential { rate: 1.0 }, 5, 0)
            .unwrap();
        let samples: Vec<f64> = p.take(5).collect();
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(RandomProcess::new(
            DurationDistribution::Exponential { rate: 0.0 },
            1,
            0
        )
        .is_err());
        assert!(RandomProcess::new(
            DurationDistribution::Deterministic { value: -1.0 },
            1,
            0
        )
        .is_err());
        assert!(RandomProcess::new(
            DurationDistribution::Uniform { low: 5.0, high: 2.0 },
            1,
            0
        )
        .is_err());
    }

    #[test]
    fn test_mean() {
        assert_eq!(DurationDistribution::Exponential { rate: 0.5 }.mean(), 2.0);
        assert_eq!(DurationDistribution::Deterministic { value: 3.0 }.mean(), 3.0);
        assert_eq!(
            DurationDistribution::Uniform { low: 1.0, high: 3.0 }.mean(),
            2.0
        );
    }
}
