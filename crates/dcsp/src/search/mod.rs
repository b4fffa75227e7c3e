//! Search algorithms: the five ways a solution can be found, bounded, or
//! approximated once a problem is built and, optionally, made consistent.
//!
//! All five share one rule for auxiliary variables: an auxiliary becomes
//! assignable the instant every variable its relation reads is assigned,
//! and is assigned automatically rather than chosen by the search.
//! [`propagate_auxiliaries`] implements that cascade once so each algorithm
//! only ever decides values for base variables.

mod backtracking;
mod branch_and_bound;
mod forward_checking;
mod greedy;
mod min_conflicts;

pub use backtracking::Backtracking;
pub use branch_and_bound::{BranchAndBound, Objective};
pub use forward_checking::ForwardChecking;
pub use greedy::greedy_construct;
pub use min_conflicts::{ConflictMinimizing, Mode};

use std::time::Instant;

use crate::{error::SolverError, model::domain::Domain, model::variable::Relation, problem::Problem, solution::Solution};

/// The driver contract [`crate::solver::Solver`] wraps: a resumable,
/// exhaustive search that emits one solution per call, in a fixed
/// enumeration order, and can report whether its tree is fully explored.
///
/// [`Backtracking`] and [`ForwardChecking`] both implement this; the other
/// three algorithms ([`BranchAndBound`], [`greedy_construct`],
/// [`ConflictMinimizing`]) have shapes `Solver` doesn't fit — an improving
/// sequence instead of a declaration-order enumeration, a single one-shot
/// construction, and a stochastic search with no notion of exhaustion —
/// and are driven directly instead.
pub trait Search<V, D: Domain<V>> {
	/// Finds the next solution, resuming from wherever the previous call
	/// left off.
	fn next_solution(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError>;

	/// Like [`Self::next_solution`], but gives up and returns `Ok(None)`
	/// once `deadline` has passed, without marking the search exhausted.
	fn next_solution_within(&mut self, problem: &Problem<V, D>, deadline: Option<Instant>) -> Result<Option<Solution<V>>, SolverError>;

	/// Whether the search has proven its tree fully explored.
	fn is_exhausted(&self) -> bool;

	/// Discards all progress and starts over from an empty assignment.
	fn reset(&mut self, problem: &Problem<V, D>);
}

impl<V, D> Search<V, D> for Backtracking<V, D>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	fn next_solution(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError> {
		Backtracking::next_solution(self, problem)
	}

	fn next_solution_within(&mut self, problem: &Problem<V, D>, deadline: Option<Instant>) -> Result<Option<Solution<V>>, SolverError> {
		Backtracking::next_solution_within(self, problem, deadline)
	}

	fn is_exhausted(&self) -> bool {
		Backtracking::is_exhausted(self)
	}

	fn reset(&mut self, _problem: &Problem<V, D>) {
		Backtracking::reset(self)
	}
}

impl<V, D> Search<V, D> for ForwardChecking<V, D>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	fn next_solution(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError> {
		ForwardChecking::next_solution(self, problem)
	}

	fn next_solution_within(&mut self, problem: &Problem<V, D>, deadline: Option<Instant>) -> Result<Option<Solution<V>>, SolverError> {
		ForwardChecking::next_solution_within(self, problem, deadline)
	}

	fn is_exhausted(&self) -> bool {
		ForwardChecking::is_exhausted(self)
	}

	fn reset(&mut self, problem: &Problem<V, D>) {
		ForwardChecking::reset(self, problem)
	}
}

/// Assigns every auxiliary variable whose relation inputs are all currently
/// assigned, cascading through chains of auxiliaries, until no more can be
/// assigned. Returns the positions assigned, in assignment order, so a
/// caller can undo exactly those positions later (in reverse order).
pub(crate) fn propagate_auxiliaries<V, D>(problem: &Problem<V, D>, solution: &mut Solution<V>) -> Vec<usize>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let mut assigned_now = Vec::new();
	loop {
		let mut progressed = false;
		for (idx, variable) in problem.variables().iter().enumerate() {
			if solution.is_assigned(idx) {
				continue;
			}
			let Some(relation) = variable.relation() else {
				continue;
			};
			if relation.inputs().iter().any(|&i| !solution.is_assigned(i)) {
				continue;
			}
			let value = evaluate_relation(problem, solution, relation);
			solution.assign(idx, value);
			assigned_now.push(idx);
			progressed = true;
		}
		if !progressed {
			return assigned_now;
		}
	}
}

fn evaluate_relation<V, D>(problem: &Problem<V, D>, solution: &Solution<V>, relation: &Relation<V>) -> V
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	match relation {
		Relation::Unary(i, f) => {
			let input = solution
				.value(*i, problem.variable(*i).id)
				.expect("relation input just checked assigned")
				.clone();
			f(input)
		}
		Relation::Binary(l, r, f) => {
			let lv = solution
				.value(*l, problem.variable(*l).id)
				.expect("relation input just checked assigned")
				.clone();
			let rv = solution
				.value(*r, problem.variable(*r).id)
				.expect("relation input just checked assigned")
				.clone();
			f(lv, rv)
		}
	}
}

/// Unassigns every position in `positions`, in the order given. Callers pass
/// the reverse of whatever order [`propagate_auxiliaries`] assigned them in.
pub(crate) fn unassign_all<V: Clone>(solution: &mut Solution<V>, positions: &[usize]) {
	for &p in positions {
		solution.unassign(p);
	}
}

/// Whether every constraint touching `index` or any position in `extra` is
/// currently satisfied. A constraint with any unassigned tuple member never
/// counts as violated, so this is safe to call with a partial assignment.
pub(crate) fn locally_consistent<V, D>(problem: &Problem<V, D>, solution: &Solution<V>, index: usize, extra: &[usize]) -> bool
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let one_ok = |idx: usize| problem.arcs(idx).iter().all(|&ci| !problem.constraint(ci).is_violated(solution));
	one_ok(index) && extra.iter().copied().all(one_ok)
}
