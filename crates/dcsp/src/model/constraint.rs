//! Constraints: an identity, an ordered tuple of variable indices, and a
//! predicate evaluated over a projected view of those variables' current
//! values.

use std::rc::Rc;

use crate::solution::Solution;

/// A read-only, by-position view over the values a constraint's variable
/// tuple currently holds.
///
/// Predicates reference their operands by *formal* position (`0..degree`)
/// rather than by absolute variable index, which is what makes the same
/// predicate closure reusable across many different tuples (see
/// `constrain_each`/`constrain_each_two` on the builder).
pub struct AssignmentView<'a, V> {
	tuple: &'a [usize],
	values: &'a [Option<V>],
}

impl<'a, V> AssignmentView<'a, V> {
	pub(crate) fn new(tuple: &'a [usize], values: &'a [Option<V>]) -> Self {
		Self { tuple, values }
	}

	/// The number of variables in the constraint's tuple.
	pub fn degree(&self) -> usize {
		self.tuple.len()
	}

	/// The current value of the `pos`-th variable in the tuple.
	///
	/// Panics if `pos` is out of range or the variable is unassigned; callers
	/// are [`Constraint::is_violated`], which only builds a view once every
	/// tuple member is assigned.
	pub fn value(&self, pos: usize) -> &V {
		self.values[self.tuple[pos]]
			.as_ref()
			.expect("AssignmentView is only built once every tuple member is assigned")
	}
}

/// A constraint: an id, the tuple of variable indices it is defined over,
/// and a predicate over their currently-assigned values.
pub struct Constraint<V> {
	/// The constraint's identity.
	pub id: i64,
	/// The variable indices (positions in the problem's variable vector)
	/// this constraint is defined over, in tuple order.
	pub tuple: Vec<usize>,
	predicate: Rc<dyn Fn(&AssignmentView<V>) -> bool>,
}

impl<V> Constraint<V> {
	/// Creates a new constraint over `tuple`, satisfied exactly when
	/// `predicate` returns `true`.
	pub fn new(id: i64, tuple: Vec<usize>, predicate: Rc<dyn Fn(&AssignmentView<V>) -> bool>) -> Self {
		Self {
			id,
			tuple,
			predicate,
		}
	}

	/// The constraint's degree: the length of its variable tuple.
	pub fn degree(&self) -> usize {
		self.tuple.len()
	}

	/// A constraint touching exactly one variable.
	pub fn is_unary(&self) -> bool {
		self.degree() == 1
	}

	/// A constraint touching exactly two variables.
	pub fn is_binary(&self) -> bool {
		self.degree() == 2
	}

	/// Whether this constraint is currently violated.
	///
	/// A constraint with any unassigned tuple member is inactive and never
	/// reports a violation; otherwise the predicate is evaluated against the
	/// projected view and violation is the predicate's negation.
	pub fn is_violated(&self, solution: &Solution<V>) -> bool {
		if self.tuple.iter().any(|&v| !solution.is_assigned(v)) {
			return false;
		}
		!self.holds(solution.values())
	}

	/// Evaluates the predicate directly against a by-position value array,
	/// independent of whether every slot is assigned. Used by node/arc
	/// consistency, which probes one candidate value at a time against
	/// otherwise-unassigned neighbors.
	///
	/// Panics if any tuple member's slot is `None`, for the same reason as
	/// [`AssignmentView::value`].
	pub fn holds(&self, values: &[Option<V>]) -> bool {
		let view = AssignmentView::new(&self.tuple, values);
		(self.predicate)(&view)
	}
}

impl<V> std::fmt::Debug for Constraint<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Constraint")
			.field("id", &self.id)
			.field("tuple", &self.tuple)
			.finish_non_exhaustive()
	}
}
