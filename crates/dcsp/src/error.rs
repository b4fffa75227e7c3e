//! Error signals produced by the solver core.
//!
//! Errors fall into two observable kinds: infeasibility, which is
//! caller-recoverable by revising the problem, and contract violations, which
//! indicate a programmer error (bad index, reading an unassigned variable,
//! reusing a domain object across variables). Exhaustion and cancellation are
//! not represented here at all: they surface as `Ok(None)` from
//! [`crate::search::Search::next_solution`] and
//! [`crate::search::Search::is_exhausted`] instead, never as an `Err`.

use thiserror::Error;

/// Errors that can be returned by the solver's public operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
	/// Consistency preprocessing determined that `variable`'s domain would be
	/// emptied entirely; the problem is over-constrained and was left
	/// unchanged.
	#[error("variable {0} is over-constrained: every value was pruned")]
	Overconstrained(i64),

	/// Two variables of the same problem reference the same domain instance.
	/// Consistency preprocessing refuses to run under this precondition
	/// violation.
	#[error("variables {0} and {1} share the same domain instance")]
	SharedDomain(i64, i64),

	/// A min/max/get query was made against an empty domain.
	#[error("domain is empty")]
	Empty,

	/// An indexed domain access fell outside `[0, size)`.
	#[error("index {index} is out of range for a domain of size {size}")]
	OutOfRange {
		/// The offending index.
		index: usize,
		/// The domain's size at the time of the access.
		size: usize,
	},

	/// The value of `variable` was read while it was still unassigned.
	#[error("variable {0} is unassigned")]
	Unassigned(i64),

	/// An operation was invoked in a state that does not support it: calling
	/// a cursor's `remove` before its first `next`, or asking an algorithm
	/// that has not just produced a solution for that solution.
	#[error("illegal state: {0}")]
	IllegalState(&'static str),
}
