//! Plain chronological backtracking: depth-first search over the original
//! variables in position order, checking constraints only against variables
//! already decided. No domain pruning ahead of the current variable — that
//! refinement is [`super::ForwardChecking`]'s job.

use std::time::Instant;

use tracing::trace;

use crate::{
	error::SolverError,
	model::domain::Domain,
	problem::Problem,
	solution::Solution,
};

use super::{locally_consistent, propagate_auxiliaries, unassign_all};

#[derive(Debug)]
struct Frame<C> {
	cursor: C,
	aux_assigned: Vec<usize>,
}

/// A resumable backtracking search.
///
/// Each call to [`Self::next_solution`] returns the next solution in
/// depth-first order, or `None` once the search space is exhausted. A
/// solution found by one call is deliberately left assigned on the stack
/// rather than unassigned immediately: the next call resumes by trying the
/// next candidate value for the deepest variable first, which is what makes
/// "give me another solution" cheap instead of restarting from scratch.
#[derive(Debug)]
pub struct Backtracking<V, D: Domain<V>> {
	solution: Solution<V>,
	stack: Vec<Frame<D::Cursor>>,
	exhausted: bool,
	emitted_trivial: bool,
}

impl<V, D> Backtracking<V, D>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	/// A fresh search over `problem`, starting from an empty assignment.
	pub fn new(problem: &Problem<V, D>) -> Self {
		Self {
			solution: Solution::new(problem.len()),
			stack: Vec::new(),
			exhausted: false,
			emitted_trivial: false,
		}
	}

	/// Discards all progress and starts over from an empty assignment.
	pub fn reset(&mut self) {
		self.solution.reset();
		self.stack.clear();
		self.exhausted = false;
		self.emitted_trivial = false;
	}

	/// Finds the next solution, resuming from wherever the previous call
	/// left off.
	pub fn next_solution(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError> {
		self.next_solution_within(problem, None)
	}

	/// Whether the search has proven its tree fully explored. Distinguishes
	/// a genuine exhaustion from [`Self::next_solution_within`] giving up at
	/// its deadline: both return `Ok(None)`, but only the former sets this.
	pub fn is_exhausted(&self) -> bool {
		self.exhausted
	}

	/// Like [`Self::next_solution`], but gives up and returns `Ok(None)`
	/// once `deadline` has passed, without marking the search exhausted: a
	/// later call resumes exactly where this one left off. The deadline is
	/// checked once per node, so it is a soft bound, not a hard one.
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
				trace!(variable = var, "backtracking: domain exhausted, retreating");
				if var == 0 {
					self.exhausted = true;
					return Ok(None);
				}
				var -= 1;
				continue;
			}
			var += 1;
			if var == original_count {
				return Ok(Some(self.solution.clone()));
			}
		}
	}

	/// Tries the next locally-consistent candidate value for variable `var`,
	/// creating its stack frame on first visit. Returns whether a value was
	/// found; on failure the frame is popped and `var` is left unassigned.
	fn advance_frame(&mut self, problem: &Problem<V, D>, var: usize) -> Result<bool, SolverError> {
		if self.stack.len() == var {
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
			// Retrying this level after a deeper one failed: the previous
			// candidate's cascaded auxiliaries are still assigned and would
			// otherwise go stale once we overwrite `var` below, since
			// `propagate_auxiliaries` only ever fills in *unassigned*
			// auxiliaries.
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
				trace!(variable = var, "backtracking: assigned");
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
	use crate::{
		consistency::{arc_consistency, node_consistency},
		model::{IntervalDomain, ObjectDomain},
		problem::ProblemBuilder,
	};

	#[test]
	fn generic_object_domain_dialect_solves_through_consistency_and_backtracking() {
		// The non-integer dialect: three variables over a shared vocabulary of
		// colors, required to all differ, with one unary clue pinning the
		// first. Node then arc consistency should prune before Backtracking
		// ever runs.
		let colors = || ObjectDomain::from_values(vec!["red", "green", "blue"]);
		let mut b: ProblemBuilder<&str, ObjectDomain<&str>> =
			ProblemBuilder::with_domains("colors", vec![colors(), colors(), colors()]);
		b.constrain(&[0], |view| *view.value(0) != "blue");
		b.constrain_each_two(|view| view.value(0) != view.value(1));
		let problem = b.build();

		node_consistency(&problem).unwrap();
		arc_consistency(&problem).unwrap();
		assert!(!problem.variable(0).domain().unwrap().borrow().contains(&"blue"));

		let mut search: Backtracking<&str, ObjectDomain<&str>> = Backtracking::new(&problem);
		let solution = search.next_solution(&problem).unwrap().expect("three colors for three variables is feasible");
		assert!(problem.is_satisfied(&solution));
		assert_ne!(*solution.value(0, 0).unwrap(), "blue");
	}

	fn four_queens() -> Problem<i64, IntervalDomain> {
		let mut b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::with_domains(
			"four-queens",
			vec![IntervalDomain::range(0, 3).unwrap(); 4],
		);
		b.constrain_each_two(|view| view.value(0) != view.value(1));
		for i in 0..4usize {
			for j in (i + 1)..4usize {
				let d = (j - i) as i64;
				b.constrain(&[i, j], move |view| (view.value(0) - view.value(1)).abs() != d);
			}
		}
		b.build()
	}

	#[test]
	fn finds_all_four_queens_solutions() {
		let problem = four_queens();
		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		let mut solutions = Vec::new();
		while let Some(solution) = search.next_solution(&problem).unwrap() {
			solutions.push(solution);
		}
		assert_eq!(solutions.len(), 2);
		for s in &solutions {
			assert!(problem.is_satisfied(s));
		}
	}

	#[test]
	fn overconstrained_problem_yields_no_solutions() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::singleton(1); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();
		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		assert_eq!(search.next_solution(&problem).unwrap(), None);
	}

	#[test]
	fn trivial_problem_yields_exactly_one_empty_solution() {
		let b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::of("empty");
		let problem = b.build();
		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		assert!(search.next_solution(&problem).unwrap().is_some());
		assert_eq!(search.next_solution(&problem).unwrap(), None);
	}

	#[test]
	fn retrying_a_level_recomputes_its_cascaded_auxiliary() {
		// v0's first candidate (1) cascades an auxiliary (aux = v0 + 10) that
		// only conflicts with v1 once v1 is actually assigned; the retreat
		// from v1's exhausted domain must force v0's second candidate (2) to
		// recompute aux to 12, not leave it stuck at the stale 11.
		let mut b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::with_domains(
			"aux-retry",
			vec![IntervalDomain::range(1, 3).unwrap(), IntervalDomain::singleton(1)],
		);
		let aux_pos = b.constrain_var(0).plus(10).position();
		b.constrain(&[aux_pos, 1], |view| *view.value(0) - 10 != *view.value(1));
		let problem = b.build();

		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		let solution = search.next_solution(&problem).unwrap().expect("v0=2, v1=1 satisfies the constraint");
		assert!(problem.is_satisfied(&solution));
		assert_eq!(*solution.value(0, problem.variable(0).id).unwrap(), 2);
		assert_eq!(*solution.value(aux_pos, problem.variable(aux_pos).id).unwrap(), 12);
	}
}
