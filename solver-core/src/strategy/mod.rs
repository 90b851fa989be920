//! Step-acceptance strategies.
//!
//! All variants share the Armijo sufficient-decrease test on the
//! unconstrained predicted reduction, and a switching condition that
//! classifies a trial step as f-type (driving optimality) or h-type (driving
//! feasibility):
//!
//! ```text
//! Armijo:     actual > eta * max(0, predicted - epsilon)
//! switching:  predicted > kappa * infeasibility^theta
//! ```

pub mod filter;
pub mod funnel;
pub mod l1_merit;

pub use filter::{FilterMethod, FilterVariant};
pub use funnel::{FunnelMethod, FunnelPhase};
pub use l1_merit::L1MeritStrategy;

use crate::iterate::ProgressMeasures;
use crate::statistics::Statistics;

/// Uniform acceptance predicate over progress measures.
pub trait GlobalizationStrategy {
    /// Register statistics columns and prime any memory from the initial
    /// progress measures.
    fn initialize(&mut self, statistics: &mut Statistics, initial_progress: &ProgressMeasures);

    /// Decide whether the trial progress is acceptable; strategies with
    /// memory (filter, funnel) update it here on h-type acceptance.
    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures,
        trial_progress: &ProgressMeasures,
        predicted_reduction: &ProgressMeasures,
        objective_multiplier: f64,
    ) -> bool;

    /// Whether an iterate with this infeasibility is admissible at all
    /// (used for the restoration exit test).
    fn is_infeasibility_acceptable(&self, infeasibility: f64) -> bool;

    /// Re-seed the memory with the given progress (phase switches).
    fn register_current_progress(&mut self, current_progress: &ProgressMeasures);

    fn reset(&mut self);
}

/// Armijo sufficient-decrease parameters shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct SufficientDecrease {
    pub decrease_fraction: f64,
    pub tolerance: f64,
}

impl SufficientDecrease {
    pub fn is_satisfied(&self, predicted_reduction: f64, actual_reduction: f64) -> bool {
        actual_reduction > self.decrease_fraction * (predicted_reduction - self.tolerance).max(0.0)
    }
}

/// f-type versus h-type classification: the predicted reduction must
/// dominate a power of the current infeasibility.
pub fn switching_condition(
    predicted_reduction: f64,
    current_infeasibility: f64,
    switching_fraction: f64,
    infeasibility_exponent: f64,
) -> bool {
    predicted_reduction > switching_fraction * current_infeasibility.powf(infeasibility_exponent)
}

/// The measure the strategies compare: optimality at multiplier 1 plus the
/// auxiliary terms.
pub(crate) fn unconstrained_measure(progress: &ProgressMeasures) -> f64 {
    progress.optimality.evaluate(1.0) + progress.auxiliary
}

/// NaN progress measures abort the solve: they indicate an evaluation fault
/// that should have been caught earlier.
pub(crate) fn check_finiteness(progress: &ProgressMeasures, objective_multiplier: f64) {
    assert!(
        !progress.infeasibility.is_nan(),
        "the infeasibility measure is not a number"
    );
    assert!(
        !progress.optimality.evaluate(objective_multiplier).is_nan(),
        "the optimality measure is not a number"
    );
    assert!(
        !progress.auxiliary.is_nan(),
        "the auxiliary measure is not a number"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterate::OptimalityMeasure;

    #[test]
    fn test_armijo() {
        let armijo = SufficientDecrease {
            decrease_fraction: 1e-4,
            tolerance: 1e-9,
        };
        assert!(armijo.is_satisfied(1.0, 0.5));
        assert!(!armijo.is_satisfied(1.0, 1e-8));
        // nonpositive predictions degenerate to "any positive actual"
        assert!(armijo.is_satisfied(-3.0, 1e-16));
    }

    #[test]
    fn test_switching_condition_sign() {
        // a nonpositive predicted reduction never switches: only h-type
        // acceptance is possible
        for predicted in [-1.0, -1e-8, 0.0] {
            assert!(!switching_condition(predicted, 0.5, 0.9999, 2.0));
            assert!(!switching_condition(predicted, 0.0, 0.9999, 2.0));
        }
        assert!(switching_condition(1.0, 0.1, 0.9999, 2.0));
    }

    #[test]
    fn test_unconstrained_measure() {
        let progress = ProgressMeasures {
            infeasibility: 0.5,
            optimality: OptimalityMeasure::Objective(2.0),
            auxiliary: 0.25,
        };
        assert_eq!(unconstrained_measure(&progress), 2.25);
    }
}
