//! # geomopt Core Library
//!
//! A geometry relaxation engine for atomistic simulations. Each relaxation
//! step receives per-atom forces and a total energy from an external
//! electronic-structure solver and moves the atoms toward a force-equilibrium
//! configuration, choosing among steepest descent, conjugate gradient,
//! quasi-Newton (BFGS), and a hybrid CG-then-BFGS strategy.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   ([`Geometry`](core::models::geometry::Geometry)) and the small vector
//!   utilities the algorithms share.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer owns the relaxation
//!   process: the shared [`RelaxState`](engine::state::RelaxState), the
//!   per-algorithm optimizer state, and the
//!   [`RelaxDispatcher`](engine::dispatcher::RelaxDispatcher) that delegates
//!   each step to the configured method.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   [`workflows::relax::run`] drives a full relaxation against any
//!   caller-supplied [`ForceModel`](workflows::relax::ForceModel), reporting
//!   progress and stopping on convergence or a step budget.
//!
//! The engine itself performs no force evaluation and no file I/O; it reads a
//! geometry, and produces displacements. Everything it knows about the
//! physical system arrives through the forces and energies the caller feeds
//! into each step.

pub mod core;
pub mod engine;
pub mod workflows;
