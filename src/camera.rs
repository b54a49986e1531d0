use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::math;

/// Camera consumed by the diffuse color pass.
///
/// The camera assumes a right-handed system with the +Z axis going _out_ of
/// the screen; positive rotations are counterclockwise around the axis of
/// rotation. View and projection matrices are built by the same matrix
/// builders the light passes use, so the whole pipeline shares one set of
/// conventions.
pub struct Camera {
    /// The position of the camera in world space.
    eye: Vec3,
    /// The target position the camera looks at.
    target: Vec3,
    /// The camera's up direction.
    up: Vec3,
    /// Vertical field of view in degrees.
    v_fov_deg: f32,
    /// Fragments closer than `z_near` are not rendered.
    z_near: f32,
    /// Fragments further than `z_far` are not rendered.
    z_far: f32,
    /// Ratio of viewport width to height.
    aspect: f32,
}

impl Camera {
    /// Create a new camera at `eye` looking at `target` with `up` as the
    /// camera's upward direction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        v_fov_deg: f32,
        z_near: f32,
        z_far: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Self {
        assert!(v_fov_deg > 0.0);
        assert!(z_near > 0.0);
        assert!(z_far > z_near);
        assert!(eye != target);

        Self {
            eye,
            target,
            up: up.normalize(),
            v_fov_deg,
            z_near,
            z_far,
            aspect: if viewport_width > 0 && viewport_height > 0 {
                viewport_width as f32 / viewport_height as f32
            } else {
                0.0
            },
        }
    }

    /// World space position of the camera.
    pub fn position(&self) -> Vec3 {
        self.eye
    }

    /// World space point the camera is looking at.
    pub fn view_point(&self) -> Vec3 {
        self.target
    }

    /// The camera's up direction.
    pub fn up_dir(&self) -> Vec3 {
        self.up
    }

    /// Vertical field of view in degrees.
    pub fn v_fov_deg(&self) -> f32 {
        self.v_fov_deg
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn near_clip(&self) -> f32 {
        self.z_near
    }

    pub fn far_clip(&self) -> f32 {
        self.z_far
    }

    /// Move the camera to `eye` and aim it at `target`.
    pub fn reorient(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
    }

    /// Matrix transforming world space points into the camera frame.
    pub fn view_matrix(&self) -> Mat4 {
        math::world_to_view(self.eye, self.target, self.up)
    }

    /// Perspective projection for this camera, GL-style NDC.
    pub fn projection_matrix(&self) -> Mat4 {
        math::perspective(self.v_fov_deg, self.aspect, self.z_near, self.z_far)
    }

    /// Resize the camera's viewport.
    pub fn set_viewport_size(
        &mut self,
        new_width: u32,
        new_height: u32,
    ) -> Result<(), InvalidCameraSize> {
        if new_width > 0 && new_height > 0 {
            self.aspect = new_width as f32 / new_height as f32;
            Ok(())
        } else {
            Err(InvalidCameraSize(new_width, new_height))
        }
    }
}

#[derive(Debug, Error)]
#[error("camera viewport width and height must be larger than zero but width was {} and height was {}", .0, .1)]
pub struct InvalidCameraSize(u32, u32);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::project_point;

    fn test_camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            45.0,
            0.1,
            100.0,
            100,
            200,
        )
    }

    #[test]
    fn set_valid_viewport_size() {
        let mut camera = test_camera();
        assert_eq!(0.5, camera.aspect_ratio());

        assert!(camera.set_viewport_size(600, 300).is_ok());
        assert_eq!(2.0, camera.aspect_ratio());
    }

    #[test]
    fn set_invalid_viewport_size() {
        let mut camera = test_camera();

        let err = camera.set_viewport_size(0, 100).unwrap_err();
        assert_eq!(0, err.0);
        assert_eq!(100, err.1);

        let err = camera.set_viewport_size(600, 0).unwrap_err();
        assert_eq!(600, err.0);
        assert_eq!(0, err.1);

        assert!(camera.set_viewport_size(0, 0).is_err());
    }

    #[test]
    fn view_matrix_centers_the_eye() {
        let camera = test_camera();
        let local = project_point(camera.view_matrix(), camera.position());

        assert!(local.length() < 1e-4);
    }
}
