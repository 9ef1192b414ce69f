use nalgebra::DVector;

/// Largest absolute component of a vector. Zero for the zero vector.
#[inline]
pub fn largest_component(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

/// Uniformly rescales `v` so that no component exceeds `cap` in magnitude,
/// preserving its direction. Returns the scale factor applied (1.0 when the
/// vector was already within the cap).
#[inline]
pub fn clip_to_component_cap(v: &mut DVector<f64>, cap: f64) -> f64 {
    let largest = largest_component(v);
    if largest <= cap || largest == 0.0 {
        return 1.0;
    }
    let scale = cap / largest;
    *v *= scale;
    scale
}
