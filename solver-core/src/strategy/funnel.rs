//! Funnel method: a single scalar bound on infeasibility.
//!
//! The funnel width Phi is the only memory. A trial point is admissible iff
//! its infeasibility fits under Phi; f-type steps must additionally pass
//! Armijo on the unconstrained reduction, while h-type steps shrink the
//! funnel:
//!
//! ```text
//! optimality phase:   Phi <- max(kappa1 Phi, eta_trial + kappa2 (Phi - eta_trial))
//! restoration phase:  Phi <- min(kappa1 Phi, eta_trial + kappa2 (eta_cur - eta_trial))
//!                     when the current iterate sits outside the funnel
//! ```
//!
//! Both updates are contractions, so Phi never grows on accepted steps.

use super::{
    check_finiteness, switching_condition, unconstrained_measure, GlobalizationStrategy,
    SufficientDecrease,
};
use crate::iterate::ProgressMeasures;
use crate::options::Options;
use crate::statistics::{Statistics, DOUBLE_WIDTH};

/// Which acceptance flow the instance implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelPhase {
    Optimality,
    Restoration,
}

#[derive(Debug, Clone, Copy)]
struct FunnelParameters {
    kappa_initial_upper_bound: f64,
    kappa_initial_multiplication: f64,
    switching_fraction: f64,
    switching_infeasibility_exponent: f64,
    kappa_infeasibility_1: f64,
    kappa_infeasibility_2: f64,
}

pub struct FunnelMethod {
    phase: FunnelPhase,
    width: f64,
    initial_width: f64,
    armijo: SufficientDecrease,
    parameters: FunnelParameters,
    statistics_column_order: i32,
}

impl FunnelMethod {
    pub fn new(phase: FunnelPhase, options: &Options) -> Self {
        Self {
            phase,
            width: f64::INFINITY,
            initial_width: f64::INFINITY,
            armijo: SufficientDecrease {
                decrease_fraction: options.armijo_decrease_fraction,
                tolerance: options.armijo_tolerance,
            },
            parameters: FunnelParameters {
                kappa_initial_upper_bound: options.funnel_kappa_initial_upper_bound,
                kappa_initial_multiplication: options.funnel_kappa_initial_multiplication,
                switching_fraction: options.funnel_delta,
                switching_infeasibility_exponent: options.funnel_switching_infeasibility_exponent,
                kappa_infeasibility_1: options.funnel_kappa_infeasibility_1,
                kappa_infeasibility_2: options.funnel_kappa_infeasibility_2,
            },
            statistics_column_order: options.statistics_funnel_width_column_order,
        }
    }

    pub fn funnel_width(&self) -> f64 {
        self.width
    }

    fn update_funnel_width(&mut self, current_infeasibility: f64, trial_infeasibility: f64) {
        let parameters = &self.parameters;
        self.width = match self.phase {
            FunnelPhase::Optimality => (parameters.kappa_infeasibility_1 * self.width).max(
                trial_infeasibility
                    + parameters.kappa_infeasibility_2 * (self.width - trial_infeasibility),
            ),
            FunnelPhase::Restoration => {
                if current_infeasibility > self.width {
                    // the current iterate escaped the funnel: contract onto
                    // the restoration progress instead
                    (parameters.kappa_infeasibility_1 * self.width).min(
                        trial_infeasibility
                            + parameters.kappa_infeasibility_2
                                * (current_infeasibility - trial_infeasibility),
                    )
                } else {
                    (parameters.kappa_infeasibility_1 * self.width).max(
                        trial_infeasibility
                            + parameters.kappa_infeasibility_2
                                * (self.width - trial_infeasibility),
                    )
                }
            }
        };
    }

    /// Optimality flow: funnel admissibility, then f-type (Armijo) or h-type
    /// (funnel shrink).
    fn accept_optimality(
        &mut self,
        current_progress: &ProgressMeasures,
        trial_progress: &ProgressMeasures,
        predicted_reduction: &ProgressMeasures,
    ) -> bool {
        if !self.is_infeasibility_acceptable(trial_progress.infeasibility) {
            return false;
        }
        let unconstrained_predicted = unconstrained_measure(predicted_reduction);
        if switching_condition(
            unconstrained_predicted,
            current_progress.infeasibility,
            self.parameters.switching_fraction,
            self.parameters.switching_infeasibility_exponent,
        ) {
            let actual_reduction =
                unconstrained_measure(current_progress) - unconstrained_measure(trial_progress);
            self.armijo.is_satisfied(unconstrained_predicted, actual_reduction)
        } else {
            // h-type: admit and tighten the funnel
            self.update_funnel_width(
                current_progress.infeasibility,
                trial_progress.infeasibility,
            );
            true
        }
    }

    /// Restoration flow: the optimality measure is the original
    /// infeasibility; switching must hold and Armijo decides.
    fn accept_restoration(
        &mut self,
        current_progress: &ProgressMeasures,
        trial_progress: &ProgressMeasures,
        predicted_reduction: &ProgressMeasures,
    ) -> bool {
        let unconstrained_predicted = unconstrained_measure(predicted_reduction);
        let current_measure = unconstrained_measure(current_progress);
        let trial_measure = unconstrained_measure(trial_progress);
        if !switching_condition(
            unconstrained_predicted,
            current_progress.infeasibility,
            self.parameters.switching_fraction,
            self.parameters.switching_infeasibility_exponent,
        ) {
            return false;
        }
        let accept = self
            .armijo
            .is_satisfied(unconstrained_predicted, current_measure - trial_measure);
        if accept && self.is_infeasibility_acceptable(trial_measure) {
            self.update_funnel_width(current_measure, trial_measure);
        }
        accept
    }
}

impl GlobalizationStrategy for FunnelMethod {
    fn initialize(&mut self, statistics: &mut Statistics, initial_progress: &ProgressMeasures) {
        statistics.add_column("funnel width", DOUBLE_WIDTH, self.statistics_column_order);
        self.initial_width = self.parameters.kappa_initial_upper_bound.max(
            self.parameters.kappa_initial_multiplication * initial_progress.infeasibility,
        );
        self.width = self.initial_width;
    }

    fn is_iterate_acceptable(
        &mut self,
        statistics: &mut Statistics,
        current_progress: &ProgressMeasures,
        trial_progress: &ProgressMeasures,
        predicted_reduction: &ProgressMeasures,
        objective_multiplier: f64,
    ) -> bool {
        check_finiteness(trial_progress, objective_multiplier);
        statistics.set("funnel width", self.width);
        match self.phase {
            FunnelPhase::Optimality => {
                self.accept_optimality(current_progress, trial_progress, predicted_reduction)
            }
            FunnelPhase::Restoration => {
                self.accept_restoration(current_progress, trial_progress, predicted_reduction)
            }
        }
    }

    fn is_infeasibility_acceptable(&self, infeasibility: f64) -> bool {
        infeasibility <= self.width
    }

    fn register_current_progress(&mut self, _current_progress: &ProgressMeasures) {
        // the width never grows; admissibility of the new current iterate is
        // re-derived from the width on the next acceptance test
    }

    fn reset(&mut self) {
        self.width = self.initial_width;
    }
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

    fn funnel() -> (FunnelMethod, Statistics) {
        let options = Options::default();
        let mut method = FunnelMethod::new(FunnelPhase::Optimality, &options);
        let mut statistics = Statistics::new(10);
        method.initialize(&mut statistics, &progress(0.5, 10.0));
        (method, statistics)
    }

    #[test]
    fn test_initial_width() {
        let (method, _) = funnel();
        // max(kappa_ubd, kappa_mult * eta_0) = max(1, 100 * 0.5)
        assert_eq!(method.funnel_width(), 50.0);
    }

    #[test]
    fn test_reject_outside_funnel() {
        let (mut method, mut statistics) = funnel();
        let current = progress(0.5, 10.0);
        let trial = progress(60.0, 0.0);
        let predicted = progress(0.0, 5.0);
        assert!(!method.is_iterate_acceptable(&mut statistics, &current, &trial, &predicted, 1.0));
    }

    #[test]
    fn test_f_type_needs_armijo() {
        let (mut method, mut statistics) = funnel();
        let current = progress(0.0, 10.0);
        let predicted = progress(0.0, 5.0); // switching holds (eta = 0)
        // actual reduction 4.0 > 1e-4 * 5 -> accept, funnel untouched
        let good_trial = progress(0.0, 6.0);
        assert!(method.is_iterate_acceptable(&mut statistics, &current, &good_trial, &predicted, 1.0));
        assert_eq!(method.funnel_width(), 50.0);
        // actual reduction 1e-9: Armijo fails -> reject
        let bad_trial = progress(0.0, 10.0 - 1e-9);
        assert!(!method.is_iterate_acceptable(&mut statistics, &current, &bad_trial, &predicted, 1.0));
    }

    #[test]
    fn test_h_type_shrinks_funnel_monotonically() {
        let (mut method, mut statistics) = funnel();
        let mut width = method.funnel_width();
        let mut current_infeasibility = 0.5;
        // a run of h-type steps (no predicted optimality reduction)
        for trial_infeasibility in [0.4, 0.3, 0.2, 0.05, 0.02] {
            let current = progress(current_infeasibility, 1.0);
            let trial = progress(trial_infeasibility, 1.0);
            let predicted = progress(current_infeasibility - trial_infeasibility, 0.0);
            assert!(method.is_iterate_acceptable(
                &mut statistics,
                &current,
                &trial,
                &predicted,
                1.0
            ));
            let new_width = method.funnel_width();
            assert!(
                new_width <= width,
                "funnel grew from {width} to {new_width}"
            );
            width = new_width;
            current_infeasibility = trial_infeasibility;
        }
    }

    #[test]
    fn test_restoration_update_contracts() {
        let options = Options::default();
        let mut method = FunnelMethod::new(FunnelPhase::Restoration, &options);
        let mut statistics = Statistics::new(10);
        method.initialize(&mut statistics, &progress(2.0, 0.0));
        let width = method.funnel_width();

        // restoration measures: optimality carries the original violation
        let current = ProgressMeasures {
            infeasibility: 0.0,
            optimality: OptimalityMeasure::Violation(width + 1.0), // outside
            auxiliary: 0.0,
        };
        let trial = ProgressMeasures {
            infeasibility: 0.0,
            optimality: OptimalityMeasure::Violation(1.0),
            auxiliary: 0.0,
        };
        let predicted = ProgressMeasures {
            infeasibility: 0.0,
            optimality: OptimalityMeasure::Violation(width),
            auxiliary: 0.0,
        };
        assert!(method.is_iterate_acceptable(&mut statistics, &current, &trial, &predicted, 0.0));
        assert!(method.funnel_width() <= width);
    }
}
