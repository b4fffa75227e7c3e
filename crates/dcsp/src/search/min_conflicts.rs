//! Min-conflicts: stochastic local search over complete assignments.
//!
//! Starting from a random complete assignment, each step reassigns one
//! conflicted variable to the domain value that leaves it with the fewest
//! conflicts (ties broken at random). A plateau — a full sweep that leaves
//! every variable's conflict count unchanged — means the greedy step has hit
//! a fixed point; [`Mode::Global`] escapes it with a fully random kick,
//! while [`Mode::Local`] simply accepts the partial optimum and stops, since
//! a pure greedy walk can otherwise cycle between a small set of
//! equally-conflicted states forever.

use std::fmt;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, trace};

use crate::{error::SolverError, model::domain::Domain, problem::Problem, solution::Solution};

use super::propagate_auxiliaries;

/// Unassigns every auxiliary variable, so a following [`propagate_auxiliaries`]
/// recomputes each one fresh from the base variables' current values rather
/// than leaving any of them holding a value cascaded from a since-reassigned
/// input. Auxiliaries whose inputs never depended on the variable that just
/// changed simply recompute to the same value they already held.
fn unassign_auxiliaries<V: Clone, D>(problem: &Problem<V, D>, solution: &mut Solution<V>) {
	for idx in problem.original_count()..problem.len() {
		solution.unassign(idx);
	}
}

/// Whether a plateau (no variable's conflict count changed across a full
/// sweep) is escaped with a random kick or accepted as the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// On a plateau, reassign one random variable to a random value and keep
	/// going; only a satisfying assignment or the step budget ends the
	/// search.
	Global,
	/// On a plateau, stop and report the current (possibly unsatisfying)
	/// assignment as success.
	Local,
}

/// A min-conflicts search, seeded for reproducibility.
pub struct ConflictMinimizing {
	rng: StdRng,
	mode: Mode,
	max_steps: usize,
}

impl fmt::Debug for ConflictMinimizing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConflictMinimizing")
			.field("mode", &self.mode)
			.field("max_steps", &self.max_steps)
			.finish_non_exhaustive()
	}
}

impl ConflictMinimizing {
	/// A search seeded with `seed`, operating in `mode`, trying at most
	/// `max_steps` reassignments before giving up.
	pub fn new(seed: u64, mode: Mode, max_steps: usize) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
			mode,
			max_steps,
		}
	}

	/// The step budget the source formula prescribes for a problem of
	/// `variable_count` original variables, `domain_sizes` (one per original
	/// variable) and `constraint_count` constraints:
	/// `2 * |Z| * sum(|D_i|) + 2 * |C|`.
	pub fn default_budget(domain_sizes: &[usize], constraint_count: usize) -> usize {
		2 * domain_sizes.len() * domain_sizes.iter().sum::<usize>() + 2 * constraint_count
	}

	/// A search seeded with `seed`, in `mode`, budgeted per
	/// [`Self::default_budget`] for `problem`.
	pub fn for_problem<V, D>(seed: u64, mode: Mode, problem: &Problem<V, D>) -> Self
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		let domain_sizes: Vec<usize> = (0..problem.original_count())
			.filter_map(|i| problem.variable(i).domain().map(|d| d.borrow().size()))
			.collect();
		let budget = Self::default_budget(&domain_sizes, problem.constraints().len());
		Self::new(seed, mode, budget)
	}

	/// Searches for a satisfying assignment, starting from a random complete
	/// assignment. Returns `None` if `max_steps` is exhausted first without
	/// success (only possible in [`Mode::Global`]), or fails with
	/// [`SolverError::Overconstrained`] if some variable's domain is empty to
	/// begin with.
	pub fn search<V, D>(&mut self, problem: &Problem<V, D>) -> Result<Option<Solution<V>>, SolverError>
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		let mut solution = self.random_assignment(problem)?;
		let mut conflicts = self.init_conflicts(problem, &solution);
		if conflicts.iter().all(|&c| c == 0) {
			debug!("min-conflicts: random assignment already satisfies every constraint");
			return Ok(Some(solution));
		}

		for step in 0..self.max_steps {
			let Some(var) = most_conflicted(&conflicts) else {
				debug!(step, "min-conflicts: no conflicted variable left");
				return Ok(Some(solution));
			};
			self.assign_min_conflict_value(problem, &mut solution, var);
			trace!(step, variable = var, "min-conflicts: reassigned most-conflicted variable");

			let fresh = self.init_conflicts(problem, &solution);
			let unchanged = fresh == conflicts;
			conflicts = fresh;

			if conflicts.iter().all(|&c| c == 0) {
				debug!(step, "min-conflicts: found satisfying assignment");
				return Ok(Some(solution));
			}

			if unchanged {
				match self.mode {
					Mode::Local => {
						debug!(step, "min-conflicts: plateau reached, local mode stopping");
						return Ok(Some(solution));
					}
					Mode::Global => {
						let var = (0..problem.original_count())
							.collect::<Vec<_>>()
							.choose(&mut self.rng)
							.copied()
							.expect("original_count > 0, checked by random_assignment");
						trace!(step, variable = var, "min-conflicts: plateau reached, global mode kicking");
						self.assign_random_value(problem, &mut solution, var);
						conflicts = self.init_conflicts(problem, &solution);
						if conflicts.iter().all(|&c| c == 0) {
							debug!(step, "min-conflicts: found satisfying assignment after kick");
							return Ok(Some(solution));
						}
					}
				}
			}
		}
		debug!(steps = self.max_steps, "min-conflicts: step budget exhausted");
		Ok(None)
	}

	/// Recomputes every variable's conflict count from scratch against
	/// `solution`.
	fn init_conflicts<V, D>(&self, problem: &Problem<V, D>, solution: &Solution<V>) -> Vec<usize>
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		(0..problem.original_count())
			.map(|i| problem.conflict_count(i, solution))
			.collect()
	}

	fn random_assignment<V, D>(&mut self, problem: &Problem<V, D>) -> Result<Solution<V>, SolverError>
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		let mut solution = Solution::new(problem.len());
		for var in 0..problem.original_count() {
			let Some(cell) = problem.variable(var).domain() else {
				continue;
			};
			let values = collect_values(&cell.borrow());
			let Some(value) = values.choose(&mut self.rng) else {
				return Err(SolverError::Overconstrained(problem.variable(var).id));
			};
			solution.assign(var, value.clone());
		}
		propagate_auxiliaries(problem, &mut solution);
		Ok(solution)
	}

	fn assign_min_conflict_value<V, D>(&mut self, problem: &Problem<V, D>, solution: &mut Solution<V>, var: usize)
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		let Some(cell) = problem.variable(var).domain() else {
			return;
		};
		let values = collect_values(&cell.borrow());

		solution.unassign(var);
		let mut best_conflicts = usize::MAX;
		let mut best: Vec<V> = Vec::new();
		for value in values {
			solution.assign(var, value.clone());
			let conflicts = problem.conflict_count(var, solution);
			solution.unassign(var);
			match conflicts.cmp(&best_conflicts) {
				std::cmp::Ordering::Less => {
					best_conflicts = conflicts;
					best = vec![value];
				}
				std::cmp::Ordering::Equal => best.push(value),
				std::cmp::Ordering::Greater => {}
			}
		}
		if let Some(choice) = best.choose(&mut self.rng) {
			solution.assign(var, choice.clone());
		}
		// `var`'s own incident constraints above only ever compare it against
		// already-settled neighbors, never against an auxiliary fed by `var`
		// itself, so the trial loop needed no resync. Any auxiliary that
		// reads `var` does need one now that the final value is in place.
		unassign_auxiliaries(problem, solution);
		propagate_auxiliaries(problem, solution);
	}

	fn assign_random_value<V, D>(&mut self, problem: &Problem<V, D>, solution: &mut Solution<V>, var: usize)
	where
		V: Clone + PartialEq,
		D: Domain<V>,
	{
		let Some(cell) = problem.variable(var).domain() else {
			return;
		};
		let values = collect_values(&cell.borrow());
		if let Some(value) = values.choose(&mut self.rng) {
			solution.unassign(var);
			unassign_auxiliaries(problem, solution);
			solution.assign(var, value.clone());
			propagate_auxiliaries(problem, solution);
		}
	}
}

/// The variable with the largest positive conflict count, or `None` if every
/// variable is currently conflict-free. Ties are broken by index order,
/// matching the deterministic sweep the other exhaustive algorithms use.
fn most_conflicted(conflicts: &[usize]) -> Option<usize> {
	conflicts
		.iter()
		.enumerate()
		.filter(|&(_, &c)| c > 0)
		.max_by_key(|&(i, &c)| (c, std::cmp::Reverse(i)))
		.map(|(i, _)| i)
}

fn collect_values<V: Clone, D: Domain<V>>(domain: &D) -> Vec<V> {
	let mut cursor = domain.cursor();
	let mut values = Vec::with_capacity(domain.size());
	while let Some(v) = domain.advance(&mut cursor) {
		values.push(v);
	}
	values
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
	fn finds_a_four_queens_solution_in_global_mode() {
		let problem = four_queens();
		let mut search = ConflictMinimizing::new(7, Mode::Global, 500);
		let solution = search.search(&problem).unwrap().expect("min-conflicts should find a solution within budget");
		assert!(problem.is_satisfied(&solution));
	}

	#[test]
	fn local_mode_stops_at_the_first_plateau() {
		// A single variable whose domain has only one value: the very first
		// conflict sweep is already a plateau (the only reassignable value
		// is the one already held), so local mode must return immediately
		// instead of spinning for the whole step budget.
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::singleton(1); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();

		let mut search = ConflictMinimizing::new(3, Mode::Local, 10_000);
		let solution = search.search(&problem).unwrap().expect("local mode always reports its current assignment");
		assert!(solution.is_complete());
	}

	#[test]
	fn overconstrained_variable_is_rejected_up_front() {
		let mut b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::of("empty-domain");
		b.add_variable(IntervalDomain::empty());
		let problem = b.build();
		let mut search = ConflictMinimizing::new(1, Mode::Global, 10);
		assert_eq!(search.search(&problem), Err(SolverError::Overconstrained(0)));
	}

	#[test]
	fn default_budget_matches_source_formula() {
		let problem = four_queens();
		let search = ConflictMinimizing::for_problem(1, Mode::Global, &problem);
		// |Z|=4, sum|D_i|=16, |C|=12 (6 from constrain_each_two, 6 diagonal)
		// -> 2*4*16 + 2*12 = 128 + 24 = 152.
		assert_eq!(search.max_steps, 152);
	}

	#[test]
	fn reassigning_a_base_variable_keeps_its_auxiliary_in_sync() {
		// v0 and v1 each feed `aux = v0 + v1`, which is in turn pinned equal
		// to v2 by a constraint that only ever shows up in v2's and aux's
		// arcs, not v0's or v1's. Min-conflicts reassigns v0 and v1 by their
		// own tracked conflict counts, which never mention that constraint
		// directly — if a reassignment left `aux` stale, the search could
		// declare success while the (aux, v2) constraint it never tracks is
		// still violated.
		let mut b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::with_domains(
			"aux-cascade",
			vec![
				IntervalDomain::range(1, 3).unwrap(),
				IntervalDomain::range(1, 3).unwrap(),
				IntervalDomain::range(2, 6).unwrap(),
			],
		);
		let aux_pos = b.constrain_var(0).plus_term(1).position();
		b.constrain(&[aux_pos, 2], |view| view.value(0) == view.value(1));
		let problem = b.build();

		for seed in 0u64..20 {
			let mut search = ConflictMinimizing::new(seed, Mode::Global, 2_000);
			if let Some(solution) = search.search(&problem).unwrap() {
				assert!(problem.is_satisfied(&solution), "seed {seed} reported success but left the cascaded constraint violated: {solution}");
			}
		}
	}
}
