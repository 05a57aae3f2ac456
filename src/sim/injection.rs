//! Injection Processes.
//!
//! Per-class stochastic processes deciding, each cycle, whether a node
//! attempts to inject. Selected by name through a factory mirroring the
//! traffic-pattern factory: `bernoulli` fires independently each cycle,
//! `on_off` modulates a burst state per node with the configured
//! transition probabilities.

use crate::common::ConfigError;
use rand::{Rng, RngCore};

/// Per-cycle injection decision process.
pub trait InjectionProcess {
    /// Returns true when `source` should attempt an injection this cycle.
    fn test(&mut self, source: usize, rng: &mut dyn RngCore) -> bool;

    /// Average injection rate in messages per node per cycle.
    fn rate(&self) -> f64;
}

/// Builds the process named by `spec` for `nodes` endpoints.
pub fn build(
    spec: &str,
    nodes: usize,
    rate: f64,
    alpha: f64,
    beta: f64,
) -> Result<Box<dyn InjectionProcess>, ConfigError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::Invalid(format!(
            "injection rate {} outside [0, 1]",
            rate
        )));
    }
    match spec {
        "bernoulli" => Ok(Box::new(Bernoulli::new(rate))),
        "on_off" => Ok(Box::new(OnOff::new(nodes, rate, alpha, beta)?)),
        other => Err(ConfigError::UnknownInjectionProcess(other.to_string())),
    }
}

/// Independent coin flip at the configured rate every cycle.
pub struct Bernoulli {
    rate: f64,
}

impl Bernoulli {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl InjectionProcess for Bernoulli {
    fn test(&mut self, _source: usize, rng: &mut dyn RngCore) -> bool {
        rng.gen::<f64>() < self.rate
    }

    fn rate(&self) -> f64 {
        self.rate
    }
}

/// Two-state burst process.
///
/// Each node flips off->on with probability `alpha` and on->off with
/// probability `beta` per cycle, and injects while on at the compensated
/// rate `rate * (alpha + beta) / alpha` so the long-run average meets
/// the configured rate.
pub struct OnOff {
    rate: f64,
    alpha: f64,
    beta: f64,
    burst_rate: f64,
    state: Vec<bool>,
}

impl OnOff {
    pub fn new(nodes: usize, rate: f64, alpha: f64, beta: f64) -> Result<Self, ConfigError> {
        if alpha <= 0.0 || beta <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "on_off transition probabilities must be positive (alpha = {}, beta = {})",
                alpha, beta
            )));
        }
        let burst_rate = rate * (alpha + beta) / alpha;
        if burst_rate > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "on_off burst rate {} exceeds 1; lower the rate or raise alpha",
                burst_rate
            )));
        }
        Ok(Self {
            rate,
            alpha,
            beta,
            burst_rate,
            state: vec![false; nodes],
        })
    }
}

impl InjectionProcess for OnOff {
    fn test(&mut self, source: usize, rng: &mut dyn RngCore) -> bool {
        let r = rng.gen::<f64>();
        if self.state[source] {
            if r < self.beta {
                self.state[source] = false;
            }
        } else if r < self.alpha {
            self.state[source] = true;
        }

        self.state[source] && rng.gen::<f64>() < self.burst_rate
    }

    fn rate(&self) -> f64 {
        self.rate
    }
}
