//! # Engine Module
//!
//! This module implements the stateful relaxation engine: the shared run
//! state, the per-algorithm optimizer state, and the dispatcher that advances
//! the geometry by one step at a time from solver-supplied forces.
//!
//! ## Overview
//!
//! A relaxation run is strictly sequential and step-driven. The caller
//! allocates a [`dispatcher::RelaxDispatcher`] once, then feeds it one
//! `(forces, total_energy)` pair per ionic step; the selected algorithm
//! mutates the geometry in place and may set the convergence flag. The engine
//! never suspends, never parallelizes internally, and never calls back into
//! the solver.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Method selection, convergence tolerance,
//!   and step-length bounds
//! - **State Tracking** ([`state`]) - The shared per-run state every algorithm
//!   reads and the dispatcher writes
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user
//!   feedback mechanisms
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Algorithms** (private) - Steepest descent, conjugate gradient,
//!   quasi-Newton (BFGS), and the hybrid phase switch
//!
//! Numerical degeneracy (a vanishing force norm in the conjugate-gradient
//! update, a failed curvature condition in BFGS) is never an error: the
//! affected step degrades to a steepest-descent-like move, a diagnostic
//! counter is incremented, and a warning is logged. Only misconfiguration is
//! fatal to a run.

pub(crate) mod algorithms;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod progress;
pub mod state;

pub use algorithms::HybridPhase;
