//! The common shape shared by [`crate::model::IntervalDomain`] and
//! [`crate::model::ObjectDomain`].
//!
//! Both domain kinds expose the same indexed-access and position-tracking
//! iteration contract; the trait lets the rest of the engine (problem graph,
//! consistency preprocessing, search algorithms) stay generic over which kind
//! of domain a given variable carries.

use crate::error::SolverError;

/// An ordered, indexable, mutable set of values of type `V`.
///
/// The iteration contract is unusual: rather than returning a borrowing
/// iterator object, a domain hands out a small [`Copy`] cursor token. This
/// keeps search algorithms free to hold one cursor per variable for the
/// lifetime of a search run without fighting the borrow checker over shared
/// mutable access to the domain itself: cursor operations borrow the domain
/// only for the duration of the call that needs it.
pub trait Domain<V> {
	/// The cursor type used to walk this domain's values in ascending
	/// insertion/ordering position.
	type Cursor: Copy + std::fmt::Debug;

	/// The number of values currently in the domain.
	fn size(&self) -> usize;

	/// Returns a fresh cursor positioned before the first element.
	fn cursor(&self) -> Self::Cursor;

	/// The value at ascending position `index`.
	fn get(&self, index: usize) -> Result<V, SolverError>;

	/// The position of `value`, or `None` if absent.
	fn index_of(&self, value: &V) -> Option<usize>;

	/// Whether `value` is currently in the domain.
	fn contains(&self, value: &V) -> bool;

	/// Inserts `value`, merging with neighbors where applicable. A no-op if
	/// already present.
	fn add(&mut self, value: V);

	/// Removes the first occurrence of `value`. Returns whether it was
	/// present.
	fn remove(&mut self, value: &V) -> bool;

	/// Removes and returns the value at ascending position `index`.
	fn remove_at(&mut self, index: usize) -> Result<V, SolverError>;

	/// Empties the domain.
	fn clear(&mut self);

	/// Whether `cursor` has at least one more element to yield.
	fn has_next(&self, cursor: &Self::Cursor) -> bool;

	/// Advances `cursor` and returns the value it now points to, or `None` if
	/// the domain is exhausted.
	fn advance(&self, cursor: &mut Self::Cursor) -> Option<V>;

	/// The ascending position `cursor` currently points to, or `None` before
	/// the first `advance`.
	fn current_index(&self, cursor: &Self::Cursor) -> Option<usize>;

	/// Removes the value `cursor` currently points to and repositions
	/// `cursor` so the next `advance` yields the value that logically
	/// followed it.
	///
	/// Fails with [`SolverError::IllegalState`] if `cursor` has not yet been
	/// advanced past its initial position.
	fn remove_current(&mut self, cursor: &mut Self::Cursor) -> Result<V, SolverError>;

	/// Repositions `cursor` before the first element.
	fn reset(&self, cursor: &mut Self::Cursor);
}
