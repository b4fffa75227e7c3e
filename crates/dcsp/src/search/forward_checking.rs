//! Forward checking: backtracking augmented with a minimum-remaining-values
//! (MRV) variable ordering and a domain-pruning lookahead, so a dead end is
//! discovered the moment it becomes unavoidable rather than only once every
//! variable involved has actually been assigned.
//!
//! Every value forward checking removes from a neighbor's domain is
//! recorded in that decision's stack frame; retrying or backtracking past
//! the decision restores exactly those values before anything else happens,
//! so the shared domain instances end a search in the same state they
//! started it in.

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
struct Frame<V, C> {
	var: usize,
	cursor: C,
	aux_assigned: Vec<usize>,
	pruned: Vec<(usize, V)>,
}

/// A resumable forward-checking search. See [`super::Backtracking`] for the
/// shared resumption contract: a found solution is left assigned, and the
/// next call resumes by retrying the deepest decision with its next
/// candidate.
#[derive(Debug)]
pub struct ForwardChecking<V, D: Domain<V>> {
	solution: Solution<V>,
	stack: Vec<Frame<V, D::Cursor>>,
	exhausted: bool,
	emitted_trivial: bool,
}

impl<V, D> ForwardChecking<V, D>
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

	/// Discards all progress and starts over from an empty assignment,
	/// restoring every value forward checking has pruned from a shared
	/// domain along the way.
	pub fn reset(&mut self, problem: &Problem<V, D>) {
		for frame in self.stack.drain(..).rev() {
			Self::restore_pruned(problem, &frame.pruned);
		}
		self.solution.reset();
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

		let mut depth = if self.solution.is_complete() {
			self.stack.len() - 1
		} else {
			self.stack.len()
		};

		loop {
			if let Some(deadline) = deadline {
				if Instant::now() >= deadline {
					return Ok(None);
				}
			}
			if !self.advance_frame(problem, depth) {
				trace!(depth, "forward checking: retreating");
				if depth == 0 {
					self.exhausted = true;
					return Ok(None);
				}
				depth -= 1;
				continue;
			}
			depth += 1;
			if depth == original_count {
				return Ok(Some(self.solution.clone()));
			}
		}
	}

	/// The unassigned original variable with the fewest remaining domain
	/// values (ties broken by position).
	fn select_var(&self, problem: &Problem<V, D>) -> Option<usize> {
		(0..problem.original_count())
			.filter(|&i| !self.solution.is_assigned(i))
			.min_by_key(|&i| {
				problem
					.variable(i)
					.domain()
					.expect("original variables are always base variables")
					.borrow()
					.size()
			})
	}

	fn restore_pruned(problem: &Problem<V, D>, pruned: &[(usize, V)]) {
		for (var, value) in pruned {
			problem
				.variable(*var)
				.domain()
				.expect("pruned entries only ever name base variables")
				.borrow_mut()
				.add(value.clone());
		}
	}

	/// Tries the next locally-consistent, forward-checking-surviving
	/// candidate for the decision at `depth`, creating its frame (choosing
	/// its variable via MRV) on first visit.
	fn advance_frame(&mut self, problem: &Problem<V, D>, depth: usize) -> bool {
		if self.stack.len() == depth {
			let var = self
				.select_var(problem)
				.expect("depth < original_count implies an unassigned variable remains");
			let cursor = problem
				.variable(var)
				.domain()
				.expect("original variables are always base variables")
				.borrow()
				.cursor();
			self.stack.push(Frame {
				var,
				cursor,
				aux_assigned: Vec::new(),
				pruned: Vec::new(),
			});
		} else {
			let var = self.stack[depth].var;
			let pruned = std::mem::take(&mut self.stack[depth].pruned);
			Self::restore_pruned(problem, &pruned);
			let aux = std::mem::take(&mut self.stack[depth].aux_assigned);
			unassign_all(&mut self.solution, &aux);
			self.solution.unassign(var);
		}

		let var = self.stack[depth].var;
		loop {
			let next_value = {
				let domain = problem
					.variable(var)
					.domain()
					.expect("original variables are always base variables")
					.borrow();
				let mut cursor = self.stack[depth].cursor;
				let value = domain.advance(&mut cursor);
				self.stack[depth].cursor = cursor;
				value
			};
			let Some(value) = next_value else {
				self.stack.pop();
				return false;
			};

			self.solution.assign(var, value);
			let aux = propagate_auxiliaries(problem, &mut self.solution);
			if !locally_consistent(problem, &self.solution, var, &aux) {
				unassign_all(&mut self.solution, &aux);
				self.solution.unassign(var);
				continue;
			}

			let (pruned, wiped_out) = self.forward_check(problem, var);
			if wiped_out {
				Self::restore_pruned(problem, &pruned);
				unassign_all(&mut self.solution, &aux);
				self.solution.unassign(var);
				continue;
			}

			trace!(variable = var, "forward checking: assigned");
			self.stack[depth].aux_assigned = aux;
			self.stack[depth].pruned = pruned;
			return true;
		}
	}

	/// Prunes, from every unassigned neighbor of `var` reachable by a binary
	/// constraint, every value with no remaining support now that `var`
	/// holds its current value. Returns the pruned `(variable, value)`
	/// pairs and whether any neighbor's domain was emptied.
	fn forward_check(&mut self, problem: &Problem<V, D>, var: usize) -> (Vec<(usize, V)>, bool) {
		let mut pruned = Vec::new();
		for &ci in problem.arcs(var) {
			if !problem.constraint(ci).is_binary() {
				continue;
			}
			let tuple = &problem.constraint(ci).tuple;
			let other = if tuple[0] == var { tuple[1] } else { tuple[0] };
			if self.solution.is_assigned(other) {
				continue;
			}
			let Some(cell) = problem.variable(other).domain() else {
				continue;
			};

			let mut doomed = Vec::new();
			{
				let domain = cell.borrow();
				let mut cursor = domain.cursor();
				while let Some(v) = domain.advance(&mut cursor) {
					self.solution.assign(other, v.clone());
					let ok = !problem.constraint(ci).is_violated(&self.solution);
					self.solution.unassign(other);
					if !ok {
						doomed.push((domain.current_index(&cursor).expect("cursor just advanced"), v));
					}
				}
			}
			if doomed.is_empty() {
				continue;
			}
			{
				let mut domain = cell.borrow_mut();
				for (pos, _) in doomed.iter().rev() {
					domain
						.remove_at(*pos)
						.expect("position was just read from this same domain");
				}
			}
			for (_, v) in doomed {
				pruned.push((other, v));
			}
			if cell.borrow().size() == 0 {
				return (pruned, true);
			}
		}
		(pruned, false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{model::IntervalDomain, problem::ProblemBuilder};

	fn four_queens() -> Problem<i64, IntervalDomain> {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("four-queens", vec![IntervalDomain::range(0, 3).unwrap(); 4]);
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
		let mut search: ForwardChecking<i64, IntervalDomain> = ForwardChecking::new(&problem);
		let mut solutions = Vec::new();
		while let Some(solution) = search.next_solution(&problem).unwrap() {
			solutions.push(solution);
		}
		assert_eq!(solutions.len(), 2);
	}

	fn four_queens_one_to_four() -> Problem<i64, IntervalDomain> {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("four-queens", vec![IntervalDomain::range(1, 4).unwrap(); 4]);
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
	fn four_queens_on_a_one_to_four_board_has_exactly_the_two_known_solutions() {
		let problem = four_queens_one_to_four();
		let mut search: ForwardChecking<i64, IntervalDomain> = ForwardChecking::new(&problem);
		let mut solutions = Vec::new();
		while let Some(solution) = search.next_solution(&problem).unwrap() {
			assert!(problem.is_satisfied(&solution));
			let row = |col: usize| *solution.value(col, problem.variable(col).id).unwrap();
			solutions.push((row(0), row(1), row(2), row(3)));
		}
		solutions.sort_unstable();
		assert_eq!(solutions, vec![(2, 4, 1, 3), (3, 1, 4, 2)]);
	}

	#[test]
	fn pruned_domains_are_restored_on_backtrack() {
		let problem = four_queens();
		let mut search: ForwardChecking<i64, IntervalDomain> = ForwardChecking::new(&problem);
		while search.next_solution(&problem).unwrap().is_some() {}
		for i in 0..4 {
			assert_eq!(problem.variable(i).domain().unwrap().borrow().size(), 4);
		}
	}

	#[test]
	fn overconstrained_pair_is_caught_by_lookahead() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::singleton(1); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();
		let mut search: ForwardChecking<i64, IntervalDomain> = ForwardChecking::new(&problem);
		assert_eq!(search.next_solution(&problem).unwrap(), None);
	}
}
