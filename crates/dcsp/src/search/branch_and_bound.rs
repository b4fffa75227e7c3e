//! Branch and bound: exhaustive search over the entire tree, pruning any
//! branch whose best possible outcome cannot beat the best complete
//! solution found so far.
//!
//! Minimization and maximization share one implementation by sign
//! normalization: internally every cost is negated when the objective is
//! [`Objective::Minimize`], so the pruning comparison is always "does this
//! branch's optimistic bound fail to improve on the current best". Like
//! [`super::Backtracking`], this is a resumable, stack-based depth-first
//! search rather than the recursive sweep a one-shot "find the optimum"
//! function would use: each call to [`BranchAndBound::next_solution`]
//! returns the *next* improving solution, not the final one, so a caller
//! watching the sequence sees a strictly improving score at every step.

use std::{fmt, rc::Rc, time::Instant};

use tracing::trace;

use crate::{
	error::SolverError,
	model::domain::Domain,
	problem::Problem,
	solution::Solution,
};

use super::{locally_consistent, propagate_auxiliaries, unassign_all};

/// Whether [`BranchAndBound`] is looking for the smallest or largest
/// achievable cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
	/// Find the solution with the smallest cost.
	Minimize,
	/// Find the solution with the largest cost.
	Maximize,
}

#[derive(Debug)]
struct Frame<C> {
	cursor: C,
	aux_assigned: Vec<usize>,
}

/// A resumable, pruning search for successively better complete solutions
/// under a caller-supplied cost.
///
/// `evaluate` scores a *complete* assignment; `estimate` gives an optimistic
/// bound (as if every remaining variable could costlessly take its best
/// value) for a *partial* assignment, used to prune branches that can never
/// improve on the best solution found so far. Both are normalized
/// internally (negated under [`Objective::Minimize`]) so pruning is always
/// "is this branch's bound no better than the current best".
pub struct BranchAndBound<V, D: Domain<V>> {
	objective: Objective,
	evaluate: Rc<dyn Fn(&Solution<V>) -> i64>,
	estimate: Rc<dyn Fn(&Problem<V, D>, &Solution<V>) -> i64>,
	solution: Solution<V>,
	stack: Vec<Frame<D::Cursor>>,
	best_score: Option<i64>,
	exhausted: bool,
	emitted_trivial: bool,
}

impl<V, D: Domain<V>> fmt::Debug for BranchAndBound<V, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BranchAndBound")
			.field("objective", &self.objective)
			.field("best_score", &self.best_score)
			.field("exhausted", &self.exhausted)
			.finish_non_exhaustive()
	}
}

impl<V, D> BranchAndBound<V, D>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	/// Builds a search over `problem` for `objective`, scoring complete
	/// assignments with `evaluate` and bounding partial ones with `estimate`.
	pub fn new(
		problem: &Problem<V, D>,
		objective: Objective,
		evaluate: impl Fn(&Solution<V>) -> i64 + 'static,
		estimate: impl Fn(&Problem<V, D>, &Solution<V>) -> i64 + 'static,
	) -> Self {
		Self {
			objective,
			evaluate: Rc::new(evaluate),
			estimate: Rc::new(estimate),
			solution: Solution::new(problem.len()),
			stack: Vec::new(),
			best_score: None,
			exhausted: false,
			emitted_trivial: false,
		}
	}

	/// Whether `isMinimize` per the external interface: this search is
	/// looking for the smallest cost.
	pub fn is_minimize(&self) -> bool {
		self.objective == Objective::Minimize
	}

	/// Whether this search is looking for the largest cost.
	pub fn is_maximize(&self) -> bool {
		self.objective == Objective::Maximize
	}

	/// The (un-normalized) cost of the most recently emitted solution, if
	/// any.
	pub fn evaluation(&self) -> Option<i64> {
		self.best_score.map(|normalized| self.denormalize(normalized))
	}

	fn normalize(&self, cost: i64) -> i64 {
		match self.objective {
			Objective::Minimize => -cost,
			Objective::Maximize => cost,
		}
	}

	fn denormalize(&self, cost: i64) -> i64 {
		// Normalization is its own inverse (negate-or-not).
		self.normalize(cost)
	}

	/// Whether the search has proven its tree fully explored.
	pub fn is_exhausted(&self) -> bool {
		self.exhausted
	}

	/// Finds the next strictly-better solution, resuming from wherever the
	/// previous call left off.
	pub fn next_solution(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError> {
		self.next_solution_within(problem, None)
	}

	/// Like [`Self::next_solution`], but gives up and returns `Ok(None)`
	/// once `deadline` has passed, without marking the search exhausted.
	pub fn next_solution_within(
		&mut self,
		problem: &Problem<V, D>,
		deadline: Option<Instant>,
	) -> Result<Option<Solution<V>>, SolverError> {
		if self.exhausted {
			return Ok(None);
		}
		let original_count = problem.original_count();
		if original_count == 0 {
			if self.emitted_trivial {
				self.exhausted = true;
				return Ok(None);
			}
			self.emitted_trivial = true;
			self.best_score = Some(self.normalize((self.evaluate)(&self.solution)));
			return Ok(Some(self.solution.clone()));
		}

		let mut var = if self.solution.is_complete() {
			original_count - 1
		} else {
			self.stack.len()
		};

		loop {
			if let Some(deadline) = deadline {
				if Instant::now() >= deadline {
					return Ok(None);
				}
			}
			if !self.advance_frame(problem, var)? {
				trace!(variable = var, "branch and bound: bound exceeded or domain exhausted");
				if var == 0 {
					self.exhausted = true;
					return Ok(None);
				}
				var -= 1;
				continue;
			}
			var += 1;
			if var == original_count {
				let cost = self.normalize((self.evaluate)(&self.solution));
				let improves = self.best_score.map_or(true, |best| cost > best);
				if improves {
					trace!(cost = self.denormalize(cost), "branch and bound: new best solution");
					self.best_score = Some(cost);
					return Ok(Some(self.solution.clone()));
				}
				// A complete but non-improving leaf is a dead end: retreat
				// and try the deepest variable's next candidate, exactly
				// like a failed domain-exhaustion check.
				var -= 1;
			}
		}
	}

	/// Tries the next locally-consistent, bound-surviving candidate value for
	/// `var`. Returns whether one was found; on failure the frame is popped
	/// (or, for a first visit pruned by the bound, never pushed) and `var` is
	/// left unassigned.
	fn advance_frame(&mut self, problem: &Problem<V, D>, var: usize) -> Result<bool, SolverError> {
		if self.stack.len() == var {
			if let Some(best) = self.best_score {
				let bound = self.normalize((self.estimate)(problem, &self.solution));
				if bound <= best {
					return Ok(false);
				}
			}
			let cursor = problem
				.variable(var)
				.domain()
				.expect("original variables are always base variables")
				.borrow()
				.cursor();
			self.stack.push(Frame {
				cursor,
				aux_assigned: Vec::new(),
			});
		} else {
			let aux = std::mem::take(&mut self.stack[var].aux_assigned);
			unassign_all(&mut self.solution, &aux);
			self.solution.unassign(var);
		}

		loop {
			let next_value = {
				let domain = problem
					.variable(var)
					.domain()
					.expect("original variables are always base variables")
					.borrow();
				let mut cursor = self.stack[var].cursor;
				let value = domain.advance(&mut cursor);
				self.stack[var].cursor = cursor;
				value
			};
			let Some(value) = next_value else {
				self.stack.pop();
				return Ok(false);
			};

			self.solution.assign(var, value);
			let aux = propagate_auxiliaries(problem, &mut self.solution);
			if locally_consistent(problem, &self.solution, var, &aux) {
				self.stack[var].aux_assigned = aux;
				return Ok(true);
			}
			unassign_all(&mut self.solution, &aux);
			self.solution.unassign(var);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{model::IntervalDomain, problem::ProblemBuilder};

	fn lower_bound_remaining(problem: &Problem<i64, IntervalDomain>, solution: &Solution<i64>) -> i64 {
		let mut total = 0;
		for i in 0..problem.original_count() {
			total += match solution.value(i, problem.variable(i).id) {
				Ok(v) => *v,
				Err(_) => problem
					.variable(i)
					.domain()
					.expect("original variable")
					.borrow()
					.min()
					.unwrap_or(0),
			};
		}
		total
	}

	fn upper_bound_remaining(problem: &Problem<i64, IntervalDomain>, solution: &Solution<i64>) -> i64 {
		let mut total = 0;
		for i in 0..problem.original_count() {
			total += match solution.value(i, problem.variable(i).id) {
				Ok(v) => *v,
				Err(_) => problem.variable(i).domain().unwrap().borrow().max().unwrap_or(0),
			};
		}
		total
	}

	fn sum_evaluation(solution: &Solution<i64>) -> i64 {
		solution.values().iter().map(|v| v.unwrap()).sum()
	}

	#[test]
	fn minimizes_sum_subject_to_difference_constraint() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::range(1, 5).unwrap(); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();

		let mut bnb: BranchAndBound<i64, IntervalDomain> =
			BranchAndBound::new(&problem, Objective::Minimize, sum_evaluation, lower_bound_remaining);
		let mut best = None;
		while let Some(solution) = bnb.next_solution(&problem).unwrap() {
			best = Some(solution);
		}
		let sum: i64 = best.expect("at least one solution exists").values().iter().map(|v| v.unwrap()).sum();
		assert_eq!(sum, 3);
	}

	#[test]
	fn maximizes_sum_subject_to_difference_constraint() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::range(1, 5).unwrap(); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();

		let mut bnb: BranchAndBound<i64, IntervalDomain> =
			BranchAndBound::new(&problem, Objective::Maximize, sum_evaluation, upper_bound_remaining);
		let mut best = None;
		while let Some(solution) = bnb.next_solution(&problem).unwrap() {
			best = Some(solution);
		}
		let sum: i64 = best.expect("at least one solution exists").values().iter().map(|v| v.unwrap()).sum();
		assert_eq!(sum, 9);
	}

	#[test]
	fn emits_a_strictly_improving_score_sequence() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("triple", vec![IntervalDomain::range(1, 4).unwrap(); 3]);
		b.constrain_each_two(|view| view.value(0) != view.value(1));
		let problem = b.build();

		let mut bnb: BranchAndBound<i64, IntervalDomain> =
			BranchAndBound::new(&problem, Objective::Maximize, sum_evaluation, upper_bound_remaining);
		let mut scores = Vec::new();
		while let Some(solution) = bnb.next_solution(&problem).unwrap() {
			scores.push(sum_evaluation(&solution));
		}
		assert!(!scores.is_empty());
		for pair in scores.windows(2) {
			assert!(pair[1] > pair[0], "scores must strictly improve: {scores:?}");
		}
		assert_eq!(*scores.last().unwrap(), 9);
	}

	#[test]
	fn overconstrained_problem_has_no_best_solution() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::singleton(1); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();
		let mut bnb: BranchAndBound<i64, IntervalDomain> =
			BranchAndBound::new(&problem, Objective::Minimize, sum_evaluation, lower_bound_remaining);
		assert_eq!(bnb.next_solution(&problem).unwrap(), None);
	}
}
