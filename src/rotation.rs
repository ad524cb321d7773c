//! Accumulated mesh rotation in sixteenths of a degree.

/// Angle units per full turn (360 degrees at 16 units per degree).
pub const FULL_TURN: i32 = 360 * 16;

/// Wraps an angle into `[0, FULL_TURN)`.
///
/// A full turn wraps to zero, so `normalize_angle(FULL_TURN) == 0`.
pub fn normalize_angle(angle: i32) -> i32 {
    angle.rem_euclid(FULL_TURN)
}

/// Converts an angle in sixteenths of a degree to degrees.
pub fn to_degrees(angle: i32) -> f32 {
    angle as f32 / 16.0
}

/// Three rotation accumulators, one per axis.
///
/// The setters normalize and report whether the stored value changed. [`rotate_by`]
/// adds raw deltas without normalizing; the next setter call on an axis brings that
/// axis back into range.
///
/// [`rotate_by`]: RotationState::rotate_by
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RotationState {
    x_rot: i32,
    y_rot: i32,
    z_rot: i32,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x_rot(&self) -> i32 {
        self.x_rot
    }

    pub fn y_rot(&self) -> i32 {
        self.y_rot
    }

    pub fn z_rot(&self) -> i32 {
        self.z_rot
    }

    /// Returns `true` if the stored angle changed.
    pub fn set_x_rotation(&mut self, angle: i32) -> bool {
        Self::store(&mut self.x_rot, angle)
    }

    /// Returns `true` if the stored angle changed.
    pub fn set_y_rotation(&mut self, angle: i32) -> bool {
        Self::store(&mut self.y_rot, angle)
    }

    /// Returns `true` if the stored angle changed.
    pub fn set_z_rotation(&mut self, angle: i32) -> bool {
        Self::store(&mut self.z_rot, angle)
    }

    /// Adds raw deltas to all three accumulators.
    pub fn rotate_by(&mut self, dx: i32, dy: i32, dz: i32) {
        self.x_rot = self.x_rot.wrapping_add(dx);
        self.y_rot = self.y_rot.wrapping_add(dy);
        self.z_rot = self.z_rot.wrapping_add(dz);
    }

    fn store(slot: &mut i32, angle: i32) -> bool {
        let angle = normalize_angle(angle);
        if angle == *slot {
            return false;
        }
        *slot = angle;
        true
    }
}
