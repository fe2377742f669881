//! The ray/scene intersection interface.

use crate::{ShadingPoint, ShadingRay};

/// Finds the nearest hit along a ray.
///
/// Implementations are shared read-only across worker threads.
pub trait Intersector: Send + Sync {
    /// Trace `ray` and fill `shading_point` with the nearest hit inside the
    /// ray's range. Returns whether anything was hit.
    ///
    /// `parent` is the shading point the ray starts from, if any; the hit
    /// it records must not be reported again.
    fn trace<'a>(
        &'a self,
        ray: &ShadingRay,
        shading_point: &mut ShadingPoint<'a>,
        parent: Option<&ShadingPoint<'_>>,
    ) -> bool;
}
