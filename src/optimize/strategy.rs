//! Acceptance rules for proposed moves.

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::Strategy;

/// Below this temperature annealing no longer accepts worse layouts.
const FROZEN_TEMPERATURE: f64 = 1e-9;

pub(crate) trait Acceptance {
    fn accept(&mut self, current: f64, candidate: f64, rng: &mut StdRng) -> bool;

    /// Called once per iteration, accepted or not.
    fn step(&mut self) {}
}

pub(crate) struct HillClimbing;

impl Acceptance for HillClimbing {
    fn accept(&mut self, current: f64, candidate: f64, _rng: &mut StdRng) -> bool {
        candidate < current
    }
}

pub(crate) struct SimulatedAnnealing {
    temperature: f64,
    cooling_rate: f64,
}

impl SimulatedAnnealing {
    pub(crate) fn new(initial_temperature: f64, cooling_rate: f64) -> Self {
        Self {
            temperature: initial_temperature,
            cooling_rate,
        }
    }
}

impl Acceptance for SimulatedAnnealing {
    fn accept(&mut self, current: f64, candidate: f64, rng: &mut StdRng) -> bool {
        let delta = candidate - current;
        if delta < 0.0 {
            return true;
        }
        if self.temperature < FROZEN_TEMPERATURE {
            return false;
        }
        let accepted = rng.random::<f64>() < (-delta / self.temperature).exp();
        if accepted && delta > 0.0 {
            log::trace!(delta = delta, temperature = self.temperature; "Accepted worse layout");
        }
        accepted
    }

    fn step(&mut self) {
        self.temperature *= self.cooling_rate;
    }
}

pub(crate) fn acceptance_for(strategy: &Strategy) -> Box<dyn Acceptance> {
    match *strategy {
        Strategy::HillClimbing => Box::new(HillClimbing),
        Strategy::SimulatedAnnealing {
            initial_temperature,
            cooling_rate,
        } => Box::new(SimulatedAnnealing::new(initial_temperature, cooling_rate)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_hill_climbing_accepts_only_improvements() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut hc = HillClimbing;
        assert!(hc.accept(10.0, 9.0, &mut rng));
        assert!(!hc.accept(10.0, 10.0, &mut rng));
        assert!(!hc.accept(10.0, 11.0, &mut rng));
    }

    #[test]
    fn test_frozen_annealing_rejects_worse() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sa = SimulatedAnnealing::new(1e-12, 0.5);
        assert!(!sa.accept(10.0, 10.5, &mut rng));
        assert!(sa.accept(10.0, 9.5, &mut rng));
    }

    #[test]
    fn test_hot_annealing_sometimes_accepts_worse() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sa = SimulatedAnnealing::new(1e6, 0.999);
        let accepted = (0..100).filter(|_| sa.accept(10.0, 11.0, &mut rng)).count();
        assert!(accepted > 90);
    }

    #[test]
    fn test_cooling() {
        let mut sa = SimulatedAnnealing::new(8.0, 0.5);
        sa.step();
        sa.step();
        assert_eq!(sa.temperature, 2.0);
    }
}
