pub mod vectors;

/// Clamps `value` into `[min, max]`. Never panics on an inverted range, `max` wins.
pub fn bound(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}
