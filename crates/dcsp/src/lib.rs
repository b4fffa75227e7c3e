//! A finite-domain constraint satisfaction and optimization solver.
//!
//! A [`problem::Problem`] is built from [`model::Variable`]s over
//! [`model::Domain`]s, constrained by [`model::Constraint`]s, optionally
//! tightened ahead of search with [`consistency`], and solved with one of
//! the algorithms in [`search`]: exhaustive [`search::Backtracking`] and
//! [`search::ForwardChecking`] for satisfaction, [`search::BranchAndBound`]
//! for optimization, and [`search::greedy_construct`] /
//! [`search::ConflictMinimizing`] for fast, incomplete heuristics.
//! [`solver::Solver`] wraps whichever of the two exhaustive algorithms
//! implements [`search::Search`] — backtracking by default, or forward
//! checking via [`solver::Solver::with_forward_checking`] — running
//! consistency once up front and optionally bounding each call by a
//! deadline.

pub mod consistency;
pub mod error;
pub mod model;
pub mod problem;
pub mod search;
pub mod solution;
pub mod solver;

pub use error::SolverError;
pub use problem::{Problem, ProblemBuilder};
pub use solution::Solution;
pub use solver::Solver;
