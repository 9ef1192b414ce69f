pub(crate) mod conjugate_gradient;
pub(crate) mod hybrid;
pub(crate) mod quasi_newton;
pub(crate) mod steepest_descent;

pub use hybrid::HybridPhase;
