//! The solver: ties consistency preprocessing to a resumable search
//! algorithm, exposing both an exhaustive mode and a time-bounded one.

use std::time::{Duration, Instant};

use crate::{
	consistency::achieve_consistency,
	error::SolverError,
	model::domain::Domain,
	problem::Problem,
	search::{Backtracking, ForwardChecking, Search},
	solution::Solution,
};

/// Drives any [`Search`] algorithm over `problem`, running consistency
/// preprocessing once up front.
///
/// Domains are shared through [`crate::model::variable::SharedDomain`]
/// (`Rc<RefCell<_>>`), so a `Solver` is intentionally single-threaded: the
/// time-bounded mode checks a deadline cooperatively between search
/// decisions rather than running the search on a worker thread, which would
/// require the domain types to be `Send`.
#[derive(Debug)]
pub struct Solver<V, D: Domain<V>, S: Search<V, D> = Backtracking<V, D>> {
	search: S,
	consistency_checked: bool,
	_domain: std::marker::PhantomData<(V, D)>,
}

impl<V, D> Solver<V, D, Backtracking<V, D>>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	/// A solver over `problem` backed by [`Backtracking`], starting from an
	/// empty assignment.
	pub fn new(problem: &Problem<V, D>) -> Self {
		Self::with_search(Backtracking::new(problem))
	}
}

impl<V, D> Solver<V, D, ForwardChecking<V, D>>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	/// A solver over `problem` backed by [`ForwardChecking`], starting from
	/// an empty assignment.
	pub fn with_forward_checking(problem: &Problem<V, D>) -> Self {
		Self::with_search(ForwardChecking::new(problem))
	}
}

impl<V, D, S> Solver<V, D, S>
where
	V: Clone + PartialEq,
	D: Domain<V>,
	S: Search<V, D>,
{
	/// A solver wrapping an already-constructed search algorithm.
	pub fn with_search(search: S) -> Self {
		Self {
			search,
			consistency_checked: false,
			_domain: std::marker::PhantomData,
		}
	}

	/// Runs node and arc consistency preprocessing, once. A no-op on
	/// subsequent calls.
	pub fn prepare(&mut self, problem: &Problem<V, D>) -> Result<(), SolverError> {
		if !self.consistency_checked {
			achieve_consistency(problem)?;
			self.consistency_checked = true;
		}
		Ok(())
	}

	/// Finds the next solution, running consistency preprocessing first if
	/// it has not already run.
	pub fn solve(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError> {
		self.prepare(problem)?;
		self.search.next_solution(problem)
	}

	/// Like [`Self::solve`], but gives up and returns `Ok(None)` once
	/// `limit` has elapsed, even if the tree is not yet exhausted.
	///
	/// A caller that gets `Ok(None)` back cannot tell "no solution exists"
	/// apart from "ran out of time" from the return value alone; check
	/// [`Self::is_exhausted`] to distinguish them, or call again with a
	/// longer limit to resume.
	pub fn solve_in(&mut self, problem: &Problem<V, D>, limit: Duration) -> Result<Option<Solution<V>>, SolverError> {
		self.prepare(problem)?;
		let deadline = Instant::now() + limit;
		self.search.next_solution_within(problem, Some(deadline))
	}

	/// Whether the most recent search has proven the tree fully explored.
	pub fn is_exhausted(&self) -> bool {
		self.search.is_exhausted()
	}

	/// Restarts the underlying search from an empty assignment. Consistency
	/// preprocessing is not undone or re-run.
	pub fn reset(&mut self, problem: &Problem<V, D>) {
		self.search.reset(problem);
	}
}
