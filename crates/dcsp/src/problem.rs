//! The problem graph: a fixed collection of variables and constraints, plus
//! the per-variable adjacency list ("arcs") that search and consistency
//! preprocessing walk to find the constraints touching a given variable.

use std::{cell::RefCell, ops::Range, rc::Rc};

use crate::{
	model::{
		constraint::AssignmentView,
		domain::Domain,
		variable::{Relation, SharedDomain, Variable, VariableStorage},
		Constraint,
	},
	solution::Solution,
};

/// The immutable (outside minimal-width reordering) collection of variables
/// and constraints a search runs over.
#[derive(Debug)]
pub struct Problem<V, D> {
	name: String,
	variables: Vec<Variable<V, D>>,
	constraints: Vec<Constraint<V>>,
	arcs: Vec<Vec<usize>>,
	original_count: usize,
}

impl<V, D> Problem<V, D>
where
	V: Clone + PartialEq,
	D: Domain<V>,
{
	/// The problem's name, as given to the builder.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The number of variables, original and auxiliary.
	pub fn len(&self) -> usize {
		self.variables.len()
	}

	/// Whether the problem has no variables at all.
	pub fn is_empty(&self) -> bool {
		self.variables.is_empty()
	}

	/// The number of non-auxiliary ("original") variables. Auxiliaries, if
	/// any, occupy positions `original_count..len()`.
	pub fn original_count(&self) -> usize {
		self.original_count
	}

	/// The variable at position `index`.
	pub fn variable(&self, index: usize) -> &Variable<V, D> {
		&self.variables[index]
	}

	/// All variables, in position order.
	pub fn variables(&self) -> &[Variable<V, D>] {
		&self.variables
	}

	/// All constraints, in declaration order.
	pub fn constraints(&self) -> &[Constraint<V>] {
		&self.constraints
	}

	/// The constraint at position `index`.
	pub fn constraint(&self, index: usize) -> &Constraint<V> {
		&self.constraints[index]
	}

	/// The indices of the constraints whose tuple contains variable
	/// `index` — that variable's arcs.
	pub fn arcs(&self, index: usize) -> &[usize] {
		&self.arcs[index]
	}

	/// Whether every constraint in the problem is satisfied by `solution`.
	pub fn is_satisfied(&self, solution: &Solution<V>) -> bool {
		self.constraints.iter().all(|c| !c.is_violated(solution))
	}

	/// The number of `index`'s incident constraints currently violated by
	/// `solution`.
	pub fn conflict_count(&self, index: usize, solution: &Solution<V>) -> usize {
		self.arcs[index]
			.iter()
			.filter(|&&ci| self.constraints[ci].is_violated(solution))
			.count()
	}

	/// Swaps variables at positions `i0` and `i1`, rewriting every
	/// constraint tuple occurrence of either index and swapping their arc
	/// lists. Used by minimal-width reordering. A relabeling only: the set
	/// of satisfying assignments is unchanged up to permutation.
	pub(crate) fn swap_variables(&mut self, i0: usize, i1: usize) {
		if i0 == i1 {
			return;
		}
		let mut touched: Vec<usize> = self.arcs[i0]
			.iter()
			.chain(self.arcs[i1].iter())
			.copied()
			.collect();
		touched.sort_unstable();
		touched.dedup();
		for ci in touched {
			for slot in &mut self.constraints[ci].tuple {
				if *slot == i0 {
					*slot = i1;
				} else if *slot == i1 {
					*slot = i0;
				}
			}
		}
		self.variables.swap(i0, i1);
		self.arcs.swap(i0, i1);
	}
}

impl<V, D> Variable<V, D> {
	/// This variable's domain, if it is a base variable.
	pub fn domain(&self) -> Option<&SharedDomain<D>> {
		match &self.storage {
			VariableStorage::Base(d) => Some(d),
			VariableStorage::Auxiliary(_) => None,
		}
	}

	/// This variable's pinning relation, if it is an auxiliary variable.
	pub fn relation(&self) -> Option<&Relation<V>> {
		match &self.storage {
			VariableStorage::Auxiliary(r) => Some(r),
			VariableStorage::Base(_) => None,
		}
	}
}

/// Builds a [`Problem`] from variables and constraints, mirroring the
/// external builder surface: `of(name, count, shared_domain)`,
/// `of(name, domains…)`, `of(name, variables…)`, `constrain`, and the
/// `constrain_each*`/`constrain_sequentially*`/`constrain_each_two*`
/// convenience loops. The builder is consumed by [`ProblemBuilder::build`],
/// so it cannot be reused afterwards.
pub struct ProblemBuilder<V, D> {
	name: String,
	variables: Vec<Variable<V, D>>,
	constraints: Vec<Constraint<V>>,
	next_var_id: i64,
	next_aux_id: i64,
	next_constraint_id: i64,
}

impl<V, D> ProblemBuilder<V, D>
where
	V: Clone + PartialEq + 'static,
	D: Domain<V>,
{
	/// An empty builder; variables are added with [`Self::add_variable`].
	pub fn of(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			variables: Vec::new(),
			constraints: Vec::new(),
			next_var_id: 0,
			next_aux_id: -1,
			next_constraint_id: 0,
		}
	}

	/// Creates `count` variables that all reference the *same* domain
	/// instance. This is the constructor form that can legitimately trigger
	/// [`crate::error::SolverError::SharedDomain`] during consistency
	/// preprocessing — use [`Self::with_domains`] for the common case of one
	/// domain per variable.
	pub fn with_shared_domain(name: impl Into<String>, count: usize, domain: D) -> Self {
		let mut builder = Self::of(name);
		let shared = Rc::new(RefCell::new(domain));
		for _ in 0..count {
			builder.push_base(Rc::clone(&shared));
		}
		builder
	}

	/// Creates one variable per domain in `domains`, each with its own
	/// instance.
	pub fn with_domains(name: impl Into<String>, domains: Vec<D>) -> Self {
		let mut builder = Self::of(name);
		for d in domains {
			builder.add_variable(d);
		}
		builder
	}

	/// Wraps a pre-built list of variables (for callers constructing
	/// variables directly rather than through [`Self::add_variable`]).
	pub fn with_variables(name: impl Into<String>, variables: Vec<Variable<V, D>>) -> Self {
		let next_var_id = variables.iter().map(|v| v.id).filter(|&id| id >= 0).max().map_or(0, |m| m + 1);
		let next_aux_id = variables.iter().map(|v| v.id).filter(|&id| id < 0).min().map_or(-1, |m| m - 1);
		Self {
			name: name.into(),
			variables,
			constraints: Vec::new(),
			next_var_id,
			next_aux_id,
			next_constraint_id: 0,
		}
	}

	fn push_base(&mut self, domain: SharedDomain<D>) -> usize {
		let id = self.next_var_id;
		self.next_var_id += 1;
		self.variables.push(Variable {
			id,
			label: None,
			storage: VariableStorage::Base(domain),
		});
		self.variables.len() - 1
	}

	/// Adds a single base variable with its own domain, returning its
	/// position.
	pub fn add_variable(&mut self, domain: D) -> usize {
		self.push_base(Rc::new(RefCell::new(domain)))
	}

	/// Adds an auxiliary variable pinned by `relation`, returning its
	/// position. Used internally by the integer-expression builder.
	pub fn add_auxiliary(&mut self, relation: Relation<V>) -> usize {
		let id = self.next_aux_id;
		self.next_aux_id -= 1;
		self.variables.push(Variable {
			id,
			label: None,
			storage: VariableStorage::Auxiliary(relation),
		});
		self.variables.len() - 1
	}

	/// The number of variables added so far.
	pub fn variable_count(&self) -> usize {
		self.variables.len()
	}

	/// Adds an n-ary constraint over `tuple`, satisfied exactly when
	/// `predicate` returns true. Returns the constraint's id.
	pub fn constrain(
		&mut self,
		tuple: &[usize],
		predicate: impl Fn(&AssignmentView<V>) -> bool + 'static,
	) -> i64 {
		let id = self.next_constraint_id;
		self.next_constraint_id += 1;
		self.constraints.push(Constraint::new(id, tuple.to_vec(), Rc::new(predicate)));
		id
	}

	/// Adds one unary constraint per variable in `range`, all sharing
	/// `predicate`.
	pub fn constrain_each_in_range(
		&mut self,
		range: Range<usize>,
		predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static,
	) {
		for i in range {
			self.constrain(&[i], predicate.clone());
		}
	}

	/// [`Self::constrain_each_in_range`] over every variable in the problem.
	pub fn constrain_each(&mut self, predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static) {
		self.constrain_each_in_range(0..self.variables.len(), predicate);
	}

	/// Adds one binary constraint per adjacent pair within `range`, all
	/// sharing `predicate`.
	pub fn constrain_sequentially_in_range(
		&mut self,
		range: Range<usize>,
		predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static,
	) {
		let indices: Vec<usize> = range.collect();
		for pair in indices.windows(2) {
			self.constrain(&[pair[0], pair[1]], predicate.clone());
		}
	}

	/// [`Self::constrain_sequentially_in_range`] over every variable in the
	/// problem.
	pub fn constrain_sequentially(&mut self, predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static) {
		self.constrain_sequentially_in_range(0..self.variables.len(), predicate);
	}

	/// Adds one binary constraint per unordered pair within `range`, all
	/// sharing `predicate`.
	pub fn constrain_each_two_in_range(
		&mut self,
		range: Range<usize>,
		predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static,
	) {
		let indices: Vec<usize> = range.collect();
		for i in 0..indices.len() {
			for j in (i + 1)..indices.len() {
				self.constrain(&[indices[i], indices[j]], predicate.clone());
			}
		}
	}

	/// [`Self::constrain_each_two_in_range`] over every variable in the
	/// problem.
	pub fn constrain_each_two(&mut self, predicate: impl Fn(&AssignmentView<V>) -> bool + Clone + 'static) {
		self.constrain_each_two_in_range(0..self.variables.len(), predicate);
	}

	/// Finalizes the builder into a [`Problem`], computing each variable's
	/// arc list. Consumes the builder: it cannot be reused after `build`.
	pub fn build(self) -> Problem<V, D> {
		let mut arcs = vec![Vec::new(); self.variables.len()];
		for (ci, c) in self.constraints.iter().enumerate() {
			for &v in &c.tuple {
				arcs[v].push(ci);
			}
		}
		let original_count = self.variables.iter().filter(|v| !v.is_auxiliary()).count();
		Problem {
			name: self.name,
			variables: self.variables,
			constraints: self.constraints,
			arcs,
			original_count,
		}
	}
}

impl<D: Domain<i64>> ProblemBuilder<i64, D> {
	/// Entry point into the integer-expression builder: begins an
	/// arithmetic chain rooted at the variable at `position`.
	pub fn constrain_var(&mut self, position: usize) -> crate::model::expr::Term<'_, D> {
		crate::model::expr::Term::new(self, position)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::IntervalDomain;

	#[test]
	fn arcs_collect_incident_constraints() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("pair", vec![IntervalDomain::range(1, 2).unwrap(); 2]);
		b.constrain(&[0, 1], |view| view.value(0) != view.value(1));
		let problem = b.build();
		assert_eq!(problem.arcs(0), &[0]);
		assert_eq!(problem.arcs(1), &[0]);
	}

	#[test]
	fn swap_variables_rewrites_constraint_tuples() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("three", vec![IntervalDomain::range(1, 3).unwrap(); 3]);
		b.constrain(&[0, 2], |view| view.value(0) != view.value(1));
		let mut problem = b.build();
		problem.swap_variables(0, 1);
		assert_eq!(problem.constraint(0).tuple, vec![1, 2]);
		assert_eq!(problem.arcs(1), &[0]);
		assert_eq!(problem.arcs(0), &[] as &[usize]);
	}
}
