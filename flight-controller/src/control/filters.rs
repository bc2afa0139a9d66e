use crate::util::math::vectors::Vector3D;

/// Single pole IIR low-pass: `filtered = alpha * new + (1 - alpha) * filtered`.
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter {
    alpha: f32,
    value: f32,
}

impl LowPassFilter {
    pub const fn new(alpha: f32) -> Self {
        Self { alpha, value: 0.0 }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter3D {
    x: LowPassFilter,
    y: LowPassFilter,
    z: LowPassFilter,
}

impl LowPassFilter3D {
    pub const fn new(alpha: f32) -> Self {
        Self {
            x: LowPassFilter::new(alpha),
            y: LowPassFilter::new(alpha),
            z: LowPassFilter::new(alpha),
        }
    }

    pub fn update(&mut self, sample: &Vector3D) -> Vector3D {
        Vector3D {
            x: self.x.update(sample.x),
            y: self.y.update(sample.y),
            z: self.z.update(sample.z),
        }
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn converges_towards_constant_input() {
        let mut filter = LowPassFilter::new(0.2);

        assert_abs_diff_eq!(filter.update(1.0), 0.2);
        assert_abs_diff_eq!(filter.update(1.0), 0.36);
        for _ in 0..100 {
            filter.update(1.0);
        }
        assert_abs_diff_eq!(filter.update(1.0), 1.0, epsilon = 1e-6);

        filter.reset();
        assert_abs_diff_eq!(filter.update(1.0), 0.2);
    }
}
