//! Variables, domains, and constraints: the vocabulary every problem is built
//! from.
//!
//! A problem is a triple `(variables, domains, constraints)`. This module
//! defines the shapes of all three, plus the interval-compressed and
//! object-backed domain implementations described in the design, and the
//! integer-expression builder that decomposes arithmetic terms into
//! auxiliary variables and binary/ternary constraints.

pub mod constraint;
pub mod domain;
pub mod expr;
pub mod interval_domain;
pub mod object_domain;
pub mod variable;

pub use constraint::{AssignmentView, Constraint};
pub use domain::Domain;
pub use expr::Term;
pub use interval_domain::{IntervalCursor, IntervalDomain};
pub use object_domain::{ObjectCursor, ObjectDomain};
pub use variable::{Relation, SharedDomain, Variable, VariableStorage};
