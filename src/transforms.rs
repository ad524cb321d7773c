//! Matrices for the background and object passes.
//!
//! All projections target wgpu clip space (depth in `[0, 1]`, right-handed view space).

use glam::{Mat3, Mat4, Vec3};

use crate::rotation::{RotationState, to_degrees};

/// Vertical field of view of the object pass, in degrees.
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 100.0;

/// Distance the static camera sits back from the origin along the view axis.
pub const CAMERA_DISTANCE: f32 = 1.0;

/// Light position handed to the object shader.
pub const LIGHT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 70.0);

/// Fixed X-axis offset correcting the imported mesh's authoring orientation.
pub const X_ORIENTATION_OFFSET_DEGREES: f32 = 180.0;

/// Maps the unit quad into clip space with y pointing down the screen,
/// pushed into the middle of the `[1, 3]` depth slab.
pub fn background_matrix() -> Mat4 {
    let ortho = Mat4::orthographic_rh(0.0, 1.0, 1.0, 0.0, 1.0, 3.0);
    ortho * Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0))
}

/// Perspective projection for a viewport of `width` x `height` pixels.
///
/// A zero height is treated as one pixel so the aspect ratio stays finite.
pub fn perspective(width: u32, height: u32) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    Mat4::perspective_rh(
        FIELD_OF_VIEW_DEGREES.to_radians(),
        aspect,
        NEAR_PLANE,
        FAR_PLANE,
    )
}

/// The camera never rotates; apparent motion comes from the world matrix.
pub fn camera_matrix() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DISTANCE))
}

/// World matrix: rotate about X, then Y, then Z, each post-multiplied onto identity.
pub fn world_matrix(rotation: &RotationState) -> Mat4 {
    let x = X_ORIENTATION_OFFSET_DEGREES - to_degrees(rotation.x_rot());
    let y = to_degrees(rotation.y_rot());
    let z = to_degrees(rotation.z_rot());

    Mat4::IDENTITY
        * Mat4::from_rotation_x(x.to_radians())
        * Mat4::from_rotation_y(y.to_radians())
        * Mat4::from_rotation_z(z.to_radians())
}

/// Inverse-transpose of the upper 3x3 of `world`.
pub fn normal_matrix(world: &Mat4) -> Mat3 {
    Mat3::from_mat4(*world).inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec4, Vec4Swizzles};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn background_corners_cover_clip_space() {
        let m = background_matrix();
        let top_left = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = m * Vec4::new(1.0, 1.0, 0.0, 1.0);

        assert!(approx(top_left.xyz(), Vec3::new(-1.0, 1.0, 0.5)));
        assert!(approx(bottom_right.xyz(), Vec3::new(1.0, -1.0, 0.5)));
    }

    #[test]
    fn rest_pose_flips_about_x() {
        let world = world_matrix(&RotationState::new());
        let up = world.transform_vector3(Vec3::Y);
        assert!(approx(up, Vec3::NEG_Y));
        let forward = world.transform_vector3(Vec3::Z);
        assert!(approx(forward, Vec3::NEG_Z));
    }

    #[test]
    fn rotations_apply_x_then_y_then_z() {
        let mut rotation = RotationState::new();
        rotation.set_x_rotation(45 * 16);
        rotation.set_y_rotation(30 * 16);
        rotation.set_z_rotation(60 * 16);

        let expected = Mat4::from_rotation_x(135f32.to_radians())
            * Mat4::from_rotation_y(30f32.to_radians())
            * Mat4::from_rotation_z(60f32.to_radians());

        assert!(world_matrix(&rotation).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn normal_matrix_of_rotation_is_rotation() {
        let mut rotation = RotationState::new();
        rotation.set_y_rotation(1000);
        let world = world_matrix(&rotation);

        assert!(normal_matrix(&world).abs_diff_eq(Mat3::from_mat4(world), 1e-5));
    }

    #[test]
    fn perspective_tolerates_zero_height() {
        let proj = perspective(640, 0);
        assert!(proj.is_finite());
        assert_eq!(proj, perspective(640, 1));
    }

    #[test]
    fn camera_only_translates() {
        let camera = camera_matrix();
        assert_eq!(camera.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(camera.transform_vector3(Vec3::X), Vec3::X);
    }
}
