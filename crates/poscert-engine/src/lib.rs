//! Certificate builder for if-then systems over recurrence-defined
//! functions.
//!
//! The [`ComplexityEstimator`] takes a parsed program, encodes every
//! implication through a Putinar or Handelman positivity ansatz, reduces
//! the unknown-coefficient matching to an SDP feasibility problem, solves
//! it through an external backend, and renders the solved certificate as a
//! standalone sympy verification script.

pub mod cert;
pub mod config;
pub mod error;
pub mod estimator;
pub mod sos;
pub mod templates;

pub use config::{Engine, Feasibility, Method, SolverConfig};
pub use error::EstimatorError;
pub use estimator::ComplexityEstimator;
pub use sos::{get_sos, GramIdAllocator};
pub use templates::build_function_template;
