use libm::{asinf, atan2f};

/// Body-frame vector. For angular rates `x` is the roll axis, `y` pitch and
/// `z` yaw, in rad/s.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3D {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationVector3D {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationVector2D {
    pub pitch: f32,
    pub roll: f32,
}

/// Attitude quaternion, scalar first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub q0: f32,
    pub q1: f32,
    pub q2: f32,
    pub q3: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        q0: 1.0,
        q1: 0.0,
        q2: 0.0,
        q3: 0.0,
    };

    pub const fn new(q0: f32, q1: f32, q2: f32, q3: f32) -> Self {
        Self { q0, q1, q2, q3 }
    }

    /// Rotation of `angle_rad` about a unit `axis`.
    pub fn from_axis_angle(axis: Vector3D, angle_rad: f32) -> Self {
        let half = angle_rad / 2.0;
        let (sin, cos) = (libm::sinf(half), libm::cosf(half));
        Self::new(cos, axis.x * sin, axis.y * sin, axis.z * sin)
    }

    /// Pitch and roll in radians (Z-Y-X Euler extraction).
    pub fn pitch_roll(&self) -> RotationVector2D {
        let Quaternion { q0, q1, q2, q3 } = *self;
        let roll = atan2f(
            2.0 * (q0 * q1 + q2 * q3),
            1.0 - 2.0 * (q1 * q1 + q2 * q2),
        );
        // Guard asin against numerical drift of a slightly non-unit quaternion
        let pitch = asinf((2.0 * (q0 * q2 - q1 * q3)).clamp(-1.0, 1.0));
        RotationVector2D { pitch, roll }
    }
}
