//! Mesh processing algorithms.
//!
//! - **Curvature**: discrete Gaussian, mean and principal curvatures
//! - **Remeshing**: uniform and curvature-adaptive incremental remeshing
//! - **Spatial**: bounding volume hierarchy for closest-point queries
//!
//! Long-running algorithms take a [`Progress`] handle for reporting and
//! cancellation.

pub mod curvature;
pub mod progress;
pub mod remesh;
pub mod spatial;

pub use progress::Progress;
