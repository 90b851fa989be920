//! l1-merit strategy: Armijo decrease of `rho f + violation`, no memory.

use super::{check_finiteness, GlobalizationStrategy, SufficientDecrease};
use crate::iterate::ProgressMeasures;
use crate::options::Options;
use crate::statistics::Statistics;

pub struct L1MeritStrategy {
    armijo: SufficientDecrease,
}

impl L1MeritStrategy {
    pub fn new(options: &Options) -> Self {
        Self {
            armijo: SufficientDecrease {
                decrease_fraction: options.armijo_decrease_fraction,
                tolerance: options.armijo_tolerance,
            },
        }
    }

    fn merit(progress: &ProgressMeasures, objective_multiplier: f64) -> f64 {
        progress.optimality.evaluate(objective_multiplier)
            + progress.auxiliary
            + progress.infeasibility
    }
}

impl GlobalizationStrategy for L1MeritStrategy {
    fn initialize(&mut self, _statistics: &mut Statistics, _initial_progress: &ProgressMeasures) {}

    fn is_iterate_acceptable(
        &mut self,
        _statistics: &mut Statistics,
        current_progress: &ProgressMeasures,
        trial_progress: &ProgressMeasures,
        predicted_reduction: &ProgressMeasures,
        objective_multiplier: f64,
    ) -> bool {
        check_finiteness(trial_progress, objective_multiplier);
        let predicted = Self::merit(predicted_reduction, objective_multiplier);
        let actual = Self::merit(current_progress, objective_multiplier)
            - Self::merit(trial_progress, objective_multiplier);
        self.armijo.is_satisfied(predicted, actual)
    }

    fn is_infeasibility_acceptable(&self, _infeasibility: f64) -> bool {
        true
    }

    fn register_current_progress(&mut self, _current_progress: &ProgressMeasures) {}

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterate::OptimalityMeasure;

    fn progress(infeasibility: f64, objective: f64) -> ProgressMeasures {
        ProgressMeasures {
            infeasibility,
            optimality: OptimalityMeasure::Objective(objective),
            auxiliary: 0.0,
        }
    }

    #[test]
    fn test_merit_decrease_accepted() {
        let mut strategy = L1MeritStrategy::new(&Options::default());
        let mut statistics = Statistics::new(10);
        let current = progress(1.0, 5.0);
        let trial = progress(0.2, 4.9); // merit: 6.0 -> 5.1
        let predicted = progress(0.8, 0.1);
        assert!(strategy.is_iterate_acceptable(&mut statistics, &current, &trial, &predicted, 1.0));
    }

    #[test]
    fn test_merit_increase_rejected() {
        let mut strategy = L1MeritStrategy::new(&Options::default());
        let mut statistics = Statistics::new(10);
        let current = progress(1.0, 5.0);
        let trial = progress(1.5, 5.0);
        let predicted = progress(0.5, 0.0);
        assert!(!strategy.is_iterate_acceptable(&mut statistics, &current, &trial, &predicted, 1.0));
    }
}
