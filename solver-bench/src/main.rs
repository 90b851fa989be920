//! Run the scenario problems and print a pass/fail summary.

use solver_bench::test_problems::scenario_problems;
use solver_core::{minimize, Options};

fn main() {
    let mut failures = 0;
    println!("{:<26} {:>10} {:>8} {:>14}  outcome", "problem", "status", "iters", "objective");
    for problem in scenario_problems() {
        let options = Options {
            max_iterations: problem.maximum_iterations,
            unbounded_objective_threshold: -1e9,
            ..Default::default()
        };
        let model = (problem.builder)();
        match minimize(model, &options) {
            Ok(report) => {
                let status_matches = report.status == problem.expected_status;
                let objective_matches = match problem.expected_objective {
                    Some(expected) => {
                        (report.iterate.evaluations.objective - expected).abs() <= 1e-5
                    }
                    None => true,
                };
                let outcome = if status_matches && objective_matches {
                    "ok"
                } else {
                    failures += 1;
                    "MISMATCH"
                };
                println!(
                    "{:<26} {:>10} {:>8} {:>14.6e}  {}",
                    problem.name,
                    format!("{:?}", report.status),
                    report.iterations,
                    report.iterate.evaluations.objective,
                    outcome,
                );
            }
            Err(error) => {
                failures += 1;
                println!("{:<26} solver error: {error}", problem.name);
            }
        }
    }
    if failures > 0 {
        eprintln!("\n{failures} scenario(s) failed");
        std::process::exit(1);
    }
}
