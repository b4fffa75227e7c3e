//! Greedy construction: one sweep over the original variables in position
//! order, assigning each the conflict-free domain value that scores highest
//! under a caller-supplied heuristic. No backtracking: a variable's
//! assignment is never revisited once chosen. Unlike [`super::BranchAndBound`]
//! and the other exhaustive searches, a variable with no conflict-free value
//! at all is a dead end this algorithm cannot recover from, so it fails
//! outright rather than falling back to a merely least-bad choice.

use tracing::trace;

use crate::{error::SolverError, model::domain::Domain, problem::Problem, solution::Solution};

use super::propagate_auxiliaries;

/// Builds a complete assignment in one sweep, greedily maximizing `heuristic`
/// over conflict-free candidates at each step.
///
/// Fails with [`SolverError::Overconstrained`] naming the first variable for
/// which every domain value conflicts with an already-decided neighbor.
pub fn greedy_construct<V, D>(
	problem: &Problem<V, D>,
	heuristic: impl Fn(&Problem<V, D>, &Solution<V>) -> i64,
) -> Result<Solution<V>, SolverError>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let mut solution = Solution::new(problem.len());
	for var in 0..problem.original_count() {
		let Some(cell) = problem.variable(var).domain() else {
			continue;
		};

		let mut best: Option<(V, i64)> = None;
		{
			let domain = cell.borrow();
			let mut cursor = domain.cursor();
			while let Some(value) = domain.advance(&mut cursor) {
				solution.assign(var, value.clone());
				let conflict_free = problem.conflict_count(var, &solution) == 0;
				let score = conflict_free.then(|| heuristic(problem, &solution));
				solution.unassign(var);

				let Some(score) = score else { continue };
				let improves = best.as_ref().map_or(true, |&(_, best_score)| score > best_score);
				if improves {
					best = Some((value, score));
				}
			}
		}

		let Some((value, score)) = best else {
			trace!(variable = var, "greedy: no conflict-free value, failing");
			return Err(SolverError::Overconstrained(problem.variable(var).id));
		};
		trace!(variable = var, score, "greedy: assigned");
		solution.assign(var, value);
		propagate_auxiliaries(problem, &mut solution);
	}
	Ok(solution)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{model::IntervalDomain, problem::ProblemBuilder};

	fn no_heuristic<V, D>(_: &Problem<V, D>, _: &Solution<V>) -> i64 {
		0
	}

	#[test]
	fn greedy_solves_all_different_over_matching_ranges() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("three", vec![IntervalDomain::range(1, 3).unwrap(); 3]);
		b.constrain_each_two(|view| view.value(0) != view.value(1));
		let problem = b.build();

		let solution = greedy_construct(&problem, no_heuristic).unwrap();
		assert!(problem.is_satisfied(&solution));
		let values: Vec<i64> = solution.values().iter().map(|v| v.unwrap()).collect();
		assert_eq!(values, vec![1, 2, 3]);
	}

	#[test]
	fn greedy_prefers_the_highest_scoring_conflict_free_value() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("single", vec![IntervalDomain::range(1, 5).unwrap()]);
		let problem = b.build();

		let solution = greedy_construct(&problem, |_, solution| *solution.value(0, 0).unwrap()).unwrap();
		assert_eq!(*solution.value(0, 0).unwrap(), 5);
	}

	#[test]
	fn greedy_fails_when_no_conflict_free_value_exists() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::singleton(1); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();

		assert_eq!(
			greedy_construct(&problem, no_heuristic),
			Err(SolverError::Overconstrained(1))
		);
	}
}
