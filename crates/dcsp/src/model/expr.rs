//! The integer-expression builder: fluent arithmetic chains over variables
//! that synthesize auxiliary variables rather than evaluating eagerly.
//!
//! `builder.constrain_var(i).plus(5).times(2)` does not compute a number:
//! each call introduces one auxiliary variable pinned to the previous term's
//! value by a [`Relation`], and its actual value is only discovered once the
//! variables the relation reads are assigned during search. This mirrors
//! `constrain_var`'s role as the integer-dialect counterpart to the
//! generic-dialect `constrain`/`constrain_each` family: both ultimately just
//! add auxiliary variables and constraints to the same [`ProblemBuilder`].
//!
//! A two-term operation (`plus_term`, `equals_term`, …) takes the other
//! term's *position* rather than a second live `Term`: a `Term` holds the
//! builder by exclusive reference for its whole lifetime, so two terms
//! cannot be alive over the same builder at once. Capture the other chain's
//! position with `.position()` (or a terminal like `.equals(..)`, which
//! already returns it) before starting the next chain.
use std::rc::Rc;

use crate::{
	model::{domain::Domain, variable::Relation},
	problem::ProblemBuilder,
};

/// One term in an arithmetic chain, tracking the position of the variable
/// (original or auxiliary) that currently holds the chain's running value.
///
/// Each `plus`/`minus`/`times`/`dividing_by` call consumes `self` and
/// returns a new `Term` pointing at a freshly synthesized auxiliary
/// variable; the chain is therefore append-only; there is no way to branch
/// back to an earlier term except by calling `constrain_var` again.
pub struct Term<'a, D> {
	builder: &'a mut ProblemBuilder<i64, D>,
	position: usize,
}

impl<'a, D: Domain<i64>> Term<'a, D> {
	pub(crate) fn new(builder: &'a mut ProblemBuilder<i64, D>, position: usize) -> Self {
		Self { builder, position }
	}

	/// The position of the variable this term currently evaluates to.
	pub fn position(&self) -> usize {
		self.position
	}

	fn push_unary(&mut self, f: impl Fn(i64) -> i64 + 'static) -> usize {
		self.builder.add_auxiliary(Relation::Unary(self.position, Rc::new(f)))
	}

	fn push_binary(&mut self, other: usize, f: impl Fn(i64, i64) -> i64 + 'static) -> usize {
		self.builder
			.add_auxiliary(Relation::Binary(self.position, other, Rc::new(f)))
	}

	/// `term + constant`.
	pub fn plus(mut self, constant: i64) -> Self {
		self.position = self.push_unary(move |v| v + constant);
		self
	}

	/// `term - constant`.
	pub fn minus(mut self, constant: i64) -> Self {
		self.position = self.push_unary(move |v| v - constant);
		self
	}

	/// `term * constant`.
	pub fn times(mut self, constant: i64) -> Self {
		self.position = self.push_unary(move |v| v * constant);
		self
	}

	/// `term / constant`, truncating toward zero.
	///
	/// The divisor is always a fixed constant, never another term: a
	/// variable divisor would make the auxiliary's reachable bounds
	/// impossible to compute ahead of search, so division only ever appears
	/// on the constant side of the chain.
	///
	/// # Panics
	///
	/// Panics if `constant` is zero.
	pub fn dividing_by(mut self, constant: i64) -> Self {
		assert!(constant != 0, "dividing_by constant must not be zero");
		self.position = self.push_unary(move |v| v / constant);
		self
	}

	/// `|term|`.
	pub fn abs(mut self) -> Self {
		self.position = self.push_unary(i64::abs);
		self
	}

	/// `term + other`, where `other` is the position of another chain's
	/// current term (see the module docs for why it's a position, not a
	/// second live [`Term`]).
	pub fn plus_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, |a, b| a + b);
		self
	}

	/// `term - other`.
	pub fn minus_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, |a, b| a - b);
		self
	}

	/// `term * other`.
	pub fn times_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, |a, b| a * b);
		self
	}

	/// `term / other`, truncating toward zero.
	///
	/// The source's division builder derives the auxiliary's reachable
	/// bounds from `min(term)/value` and `max(term)/value`, which breaks
	/// down when `other` can be negative or straddle zero; since auxiliary
	/// variables here carry no domain of their own to bound (they are pure
	/// cascaded values, not pruned during search), that miscomputation
	/// cannot arise, but a runtime divisor of exactly zero still panics,
	/// same as native integer division. Callers should constrain `other`
	/// away from zero before chaining this.
	pub fn dividing_by_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, |a, b| a / b);
		self
	}

	/// `max(term, other)`.
	pub fn max_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, i64::max);
		self
	}

	/// `min(term, other)`.
	pub fn min_term(mut self, other: usize) -> Self {
		self.position = self.push_binary(other, i64::min);
		self
	}

	/// Adds a constraint pinning this term to exactly `value`, consuming the
	/// term. Returns the position of the term's variable.
	pub fn equals(self, value: i64) -> usize {
		let position = self.position;
		self.builder.constrain(&[position], move |view| *view.value(0) == value);
		position
	}

	/// Adds a constraint requiring this term to be strictly less than
	/// `value`.
	pub fn less_than(self, value: i64) -> usize {
		let position = self.position;
		self.builder.constrain(&[position], move |view| *view.value(0) < value);
		position
	}

	/// Adds a constraint requiring this term to be strictly greater than
	/// `value`.
	pub fn greater_than(self, value: i64) -> usize {
		let position = self.position;
		self.builder.constrain(&[position], move |view| *view.value(0) > value);
		position
	}

	/// Adds a constraint requiring this term to equal the term at
	/// `other_position`.
	pub fn equals_term(self, other_position: usize) -> usize {
		let position = self.position;
		self.builder
			.constrain(&[position, other_position], |view| view.value(0) == view.value(1));
		position
	}

	/// Adds a constraint requiring this term to differ from the term at
	/// `other_position`.
	pub fn differs_from_term(self, other_position: usize) -> usize {
		let position = self.position;
		self.builder
			.constrain(&[position, other_position], |view| view.value(0) != view.value(1));
		position
	}

	/// Adds a constraint requiring this term to be strictly greater than the
	/// term at `other_position`.
	pub fn greater_than_term(self, other_position: usize) -> usize {
		let position = self.position;
		self.builder
			.constrain(&[position, other_position], |view| view.value(0) > view.value(1));
		position
	}

	/// Adds a constraint requiring this term to be strictly less than the
	/// term at `other_position`.
	pub fn less_than_term(self, other_position: usize) -> usize {
		let position = self.position;
		self.builder
			.constrain(&[position, other_position], |view| view.value(0) < view.value(1));
		position
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::IntervalDomain;

	#[test]
	fn arithmetic_chain_synthesizes_auxiliaries() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("chain", vec![IntervalDomain::range(0, 10).unwrap()]);
		let before = b.variable_count();
		let _ = b.constrain_var(0).plus(5).times(2);
		// plus and times each synthesize one auxiliary variable.
		assert_eq!(b.variable_count(), before + 2);
	}

	#[test]
	fn equals_terminal_adds_a_unary_constraint() {
		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("single", vec![IntervalDomain::range(0, 10).unwrap()]);
		let pos = b.constrain_var(0).plus(1).equals(6);
		let problem = b.build();
		assert_eq!(problem.arcs(pos), &[0]);
	}

	#[test]
	fn abs_and_max_and_min_and_division_cascade_through_search() {
		use crate::search::Backtracking;

		// v0 in [-5, 5], v1 in [1, 5].
		// aux0 = |v0|, aux1 = max(aux0, v1), aux2 = min(aux0, v1), aux3 = aux1 / v1.
		let mut b: ProblemBuilder<i64, IntervalDomain> = ProblemBuilder::with_domains(
			"arith",
			vec![IntervalDomain::range(-5, 5).unwrap(), IntervalDomain::range(1, 5).unwrap()],
		);
		let abs_pos = b.constrain_var(0).abs().position();
		let max_pos = b.constrain_var(abs_pos).max_term(1).position();
		let min_pos = b.constrain_var(abs_pos).min_term(1).position();
		let div_pos = b.constrain_var(max_pos).dividing_by_term(1).position();
		// Pin v0 = -3, v1 = 2 so every derived value is checkable by hand.
		b.constrain(&[0], |view| *view.value(0) == -3);
		b.constrain(&[1], |view| *view.value(0) == 2);

		let problem = b.build();
		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		let solution = search.next_solution(&problem).unwrap().expect("v0=-3, v1=2 is feasible");

		assert_eq!(*solution.value(abs_pos, problem.variable(abs_pos).id).unwrap(), 3);
		assert_eq!(*solution.value(max_pos, problem.variable(max_pos).id).unwrap(), 3);
		assert_eq!(*solution.value(min_pos, problem.variable(min_pos).id).unwrap(), 2);
		assert_eq!(*solution.value(div_pos, problem.variable(div_pos).id).unwrap(), 1);
	}

	#[test]
	fn greater_than_term_constrains_relative_order() {
		use crate::search::Backtracking;

		let mut b: ProblemBuilder<i64, IntervalDomain> =
			ProblemBuilder::with_domains("order", vec![IntervalDomain::range(1, 3).unwrap(); 2]);
		let _ = b.constrain_var(0).greater_than_term(1);
		let problem = b.build();

		let mut search: Backtracking<i64, IntervalDomain> = Backtracking::new(&problem);
		let mut count = 0;
		while let Some(solution) = search.next_solution(&problem).unwrap() {
			let v0 = *solution.value(0, 0).unwrap();
			let v1 = *solution.value(1, 1).unwrap();
			assert!(v0 > v1);
			count += 1;
		}
		assert_eq!(count, 3); // (2,1), (3,1), (3,2)
	}
}
