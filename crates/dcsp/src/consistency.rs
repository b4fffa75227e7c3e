//! Node and arc consistency preprocessing, and minimal-width variable
//! reordering.
//!
//! Node consistency removes domain values that violate a variable's own
//! unary constraints; arc consistency repeatedly removes values that have no
//! supporting value in a binary-constrained neighbor, until a fixpoint is
//! reached. Both are the classical AC-1 formulation: a full pass is repeated
//! until nothing changes, rather than the work-queue refinement used by
//! AC-3. Arc consistency does not itself prove satisfiability — a domain can
//! stay nonempty and arc-consistent for a problem with no solution at all
//! (an odd cycle of "must differ" constraints is the textbook case) — so
//! callers still have to run a search.

use std::rc::Rc;

use tracing::warn;

use crate::{
	error::SolverError,
	model::{domain::Domain, Constraint},
	problem::Problem,
};

/// Runs [`check_no_shared_domains`], [`node_consistency`], then
/// [`arc_consistency`] to a fixpoint, in that order.
pub fn achieve_consistency<V, D>(problem: &Problem<V, D>) -> Result<(), SolverError>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	check_no_shared_domains(problem)?;
	node_consistency(problem)?;
	arc_consistency(problem)
}

/// Fails with [`SolverError::SharedDomain`] if any two base variables of
/// `problem` reference the same domain instance.
///
/// Consistency preprocessing mutates domains in place; if two variables
/// alias the same instance, pruning one silently prunes the other under a
/// different variable's name, which is never the caller's intent.
pub fn check_no_shared_domains<V, D>(problem: &Problem<V, D>) -> Result<(), SolverError>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let variables = problem.variables();
	for i in 0..variables.len() {
		let Some(di) = variables[i].domain() else { continue };
		for j in (i + 1)..variables.len() {
			let Some(dj) = variables[j].domain() else { continue };
			if Rc::ptr_eq(di, dj) {
				return Err(SolverError::SharedDomain(variables[i].id, variables[j].id));
			}
		}
	}
	Ok(())
}

/// Removes, from every variable's domain, every value that violates one of
/// that variable's own unary constraints.
///
/// Two-phase: every unary constraint on every variable is evaluated against
/// the domains exactly as they stood on entry — nothing is mutated while
/// marking — and only once no variable's marked set would empty its domain
/// are the marked positions actually removed. This is what makes the
/// documented guarantee hold: if variable B turns out to be over-constrained,
/// variable A's already-computed (but not yet applied) marks from an earlier
/// constraint in the same pass are simply discarded, so the problem is left
/// byte-for-byte unchanged rather than partially pruned.
///
/// Fails with [`SolverError::Overconstrained`] if a variable's domain would
/// be emptied entirely.
pub fn node_consistency<V, D>(problem: &Problem<V, D>) -> Result<(), SolverError>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let mut values: Vec<Option<V>> = vec![None; problem.len()];
	let mut marks: Vec<Vec<usize>> = vec![Vec::new(); problem.len()];

	for constraint in problem.constraints() {
		if !constraint.is_unary() {
			continue;
		}
		let var = constraint.tuple[0];
		let Some(cell) = problem.variable(var).domain() else {
			continue;
		};
		let domain = cell.borrow();

		let mut cursor = domain.cursor();
		while let Some(v) = domain.advance(&mut cursor) {
			values[var] = Some(v);
			let ok = constraint.holds(&values);
			values[var] = None;
			if !ok {
				marks[var].push(domain.current_index(&cursor).expect("cursor just advanced"));
			}
		}
	}

	for (var, positions) in marks.iter_mut().enumerate() {
		if positions.is_empty() {
			continue;
		}
		positions.sort_unstable();
		positions.dedup();
		let Some(cell) = problem.variable(var).domain() else {
			continue;
		};
		if positions.len() == cell.borrow().size() {
			warn!(variable = problem.variable(var).id, "node consistency would empty a domain");
			return Err(SolverError::Overconstrained(problem.variable(var).id));
		}
	}

	for (var, positions) in marks.into_iter().enumerate() {
		if positions.is_empty() {
			continue;
		}
		let Some(cell) = problem.variable(var).domain() else {
			continue;
		};
		let mut domain = cell.borrow_mut();
		for pos in positions.into_iter().rev() {
			domain.remove_at(pos)?;
		}
	}
	Ok(())
}

/// Repeatedly removes, from every variable's domain, every value with no
/// supporting value in a binary-constrained neighbor, until a full pass
/// leaves every domain unchanged.
///
/// Each pass is itself two-phase, for the same reason as [`node_consistency`]:
/// every binary constraint is revised from both directions against the
/// domains as they stood when the pass began — marking only, no mutation —
/// and the marks for every variable in this pass are applied together only
/// after confirming none of them would empty a domain. A later pass over the
/// narrower domains may still find more unsupported values; the outer loop
/// repeats until a pass marks nothing at all.
///
/// Fails with [`SolverError::Overconstrained`] if any variable's domain would
/// be emptied.
pub fn arc_consistency<V, D>(problem: &Problem<V, D>) -> Result<(), SolverError>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let mut values: Vec<Option<V>> = vec![None; problem.len()];
	loop {
		let mut marks: Vec<Vec<usize>> = vec![Vec::new(); problem.len()];
		for constraint in problem.constraints() {
			if !constraint.is_binary() {
				continue;
			}
			let (a, b) = (constraint.tuple[0], constraint.tuple[1]);
			mark_unsupported(problem, constraint, &mut values, a, b, &mut marks);
			mark_unsupported(problem, constraint, &mut values, b, a, &mut marks);
		}

		let any_marked = marks.iter().any(|positions| !positions.is_empty());
		if !any_marked {
			return Ok(());
		}

		for (var, positions) in marks.iter_mut().enumerate() {
			if positions.is_empty() {
				continue;
			}
			positions.sort_unstable();
			positions.dedup();
			let Some(cell) = problem.variable(var).domain() else {
				continue;
			};
			if positions.len() == cell.borrow().size() {
				warn!(variable = problem.variable(var).id, "arc consistency would empty a domain");
				return Err(SolverError::Overconstrained(problem.variable(var).id));
			}
		}

		for (var, positions) in marks.into_iter().enumerate() {
			if positions.is_empty() {
				continue;
			}
			let Some(cell) = problem.variable(var).domain() else {
				continue;
			};
			let mut domain = cell.borrow_mut();
			for pos in positions.into_iter().rev() {
				domain.remove_at(pos)?;
			}
		}
	}
}

/// Marks, into `marks[target]`, every position in `target`'s domain with no
/// supporting value for `constraint` in `other`'s domain. Reads both domains
/// without mutating either, so a caller can call this for every binary
/// constraint in a pass before deciding whether any of the accumulated marks
/// would empty a domain.
fn mark_unsupported<V, D>(
	problem: &Problem<V, D>,
	constraint: &Constraint<V>,
	values: &mut [Option<V>],
	target: usize,
	other: usize,
	marks: &mut [Vec<usize>],
) where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	if target == other {
		return;
	}
	let (Some(target_cell), Some(other_cell)) = (problem.variable(target).domain(), problem.variable(other).domain())
	else {
		return;
	};

	let target_domain = target_cell.borrow();
	let other_domain = other_cell.borrow();

	let mut t_cursor = target_domain.cursor();
	while let Some(tv) = target_domain.advance(&mut t_cursor) {
		values[target] = Some(tv);
		let mut supported = false;
		let mut o_cursor = other_domain.cursor();
		while let Some(ov) = other_domain.advance(&mut o_cursor) {
			values[other] = Some(ov);
			if constraint.holds(values) {
				supported = true;
				break;
			}
		}
		values[other] = None;
		if !supported {
			marks[target].push(target_domain.current_index(&t_cursor).expect("cursor just advanced"));
		}
	}
	values[target] = None;
}

/// Reorders the original (non-auxiliary) variables of `problem` by
/// descending constraint degree, an approximation to minimal-width
/// ordering: placing the most-constrained variables first tends to shrink
/// the search tree, since a forward-checking or backtracking search commits
/// to the hardest decisions while the most context is still available.
///
/// Auxiliary variables, if any, are left in place at the end of the
/// variable vector.
pub fn minimal_width_order<V, D>(problem: &mut Problem<V, D>)
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	let n = problem.original_count();
	for i in 0..n {
		let (best, _) = (i..n)
			.map(|j| (j, problem.arcs(j).len()))
			.max_by_key(|&(_, degree)| degree)
			.expect("range i..n is non-empty since i < n");
		if best != i {
			problem.swap_variables(i, best);
		}
	}
}
