//! Simulation dynamics: integration and constraint solving.

pub mod integrator;
pub mod solver;

pub use integrator::Integrator;
pub use solver::ConstraintSolver;
