use glam::{Mat4, Vec3, Vec4};

/// Build a matrix that transforms a point in world space to a point in the
/// camera (or light) frame.
///
/// The frame is a right-handed orthonormal basis with `n` pointing from
/// `target` back towards `eye`, so the viewer looks down its own -Z axis.
///
/// The basis is undefined when `up` is parallel to `eye - target`; callers
/// must not supply a view direction collinear with `up`.
pub fn world_to_view(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let n = (eye - target).normalize();
    let u = up.cross(n).normalize();
    // Unit length already since u and n are orthonormal.
    let v = n.cross(u);

    Mat4::from_cols(
        Vec4::new(u.x, v.x, n.x, 0.0),
        Vec4::new(u.y, v.y, n.y, 0.0),
        Vec4::new(u.z, v.z, n.z, 0.0),
        Vec4::new(-u.dot(eye), -v.dot(eye), -n.dot(eye), 1.0),
    )
}

/// Build a symmetric perspective projection with GL-style normalized device
/// coordinates: depth `-1` at the near plane and `+1` at the far plane.
///
/// `fovy_deg` is the vertical field of view in degrees. Behavior is undefined
/// for `near <= 0` or `near >= far`.
///
/// Pipelines expect clip depth in `[0, 1]`, so multiply by [`NDC_TO_WGPU`]
/// before handing the composed view-projection to a shader.
pub fn perspective(fovy_deg: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fovy_deg.to_radians() / 2.0).tan();

    Mat4::from_cols(
        Vec4::new(f / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, f, 0.0, 0.0),
        Vec4::new(0.0, 0.0, (far + near) / (near - far), -1.0),
        Vec4::new(0.0, 0.0, (2.0 * far * near) / (near - far), 0.0),
    )
}

/// Fixed transform scaling and translating the NDC cube `[-1, 1]^3` into the
/// unit box `[0, 1]^3`.
///
/// Post-multiplying a light's view-projection with this yields a matrix that
/// maps world-space points into depth-texture sampling space. The z component
/// is directly comparable with stored depth; texture v grows downward, so
/// sampling a layer the rasterizer wrote takes `v = 1 - y`.
pub fn ndc_to_unit_box() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new(0.5, 0.5, 0.5, 1.0),
    )
}

/// Adjusts a GL-style clip space (depth `-1..1`) to the WebGPU convention
/// (depth `0..1`). X and Y are untouched.
///
/// The z mapping here is identical to the one in [`ndc_to_unit_box`], which is
/// what keeps depth values written by the rasterizer comparable against the
/// depths produced by a `world_to_shadow` transform.
pub const NDC_TO_WGPU: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

/// Apply `m` to a point and perform the perspective divide.
pub fn project_point(m: Mat4, p: Vec3) -> Vec3 {
    let h = m * p.extend(1.0);
    Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn view_basis_is_orthonormal() {
        let m = world_to_view(
            Vec3::new(3.0, 4.0, -2.0),
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::Y,
        );

        // Rows of the upper-left 3x3 block are the basis axes.
        let rows = [
            Vec3::new(m.x_axis.x, m.y_axis.x, m.z_axis.x),
            Vec3::new(m.x_axis.y, m.y_axis.y, m.z_axis.y),
            Vec3::new(m.x_axis.z, m.y_axis.z, m.z_axis.z),
        ];

        for r in rows {
            assert!((r.length() - 1.0).abs() < EPS);
        }

        assert!(rows[0].dot(rows[1]).abs() < EPS);
        assert!(rows[0].dot(rows[2]).abs() < EPS);
        assert!(rows[1].dot(rows[2]).abs() < EPS);
    }

    #[test]
    fn view_maps_eye_to_origin() {
        let eye = Vec3::new(-7.0, 2.5, 11.0);
        let m = world_to_view(eye, Vec3::ZERO, Vec3::Y);

        assert_vec3_near(project_point(m, eye), Vec3::ZERO);
    }

    #[test]
    fn view_looks_down_negative_z() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let m = world_to_view(eye, Vec3::ZERO, Vec3::Y);

        // A point in front of the viewer lands on the -Z axis.
        let p = project_point(m, Vec3::new(0.0, 0.0, 5.0));
        assert_vec3_near(p, Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let (near, far) = (10.0, 400.0);
        let m = perspective(60.0, 1.0, near, far);

        let at_near = project_point(m, Vec3::new(0.0, 0.0, -near));
        let at_far = project_point(m, Vec3::new(0.0, 0.0, -far));

        assert!((at_near.z - -1.0).abs() < EPS);
        assert!((at_far.z - 1.0).abs() < EPS);
    }

    #[test]
    fn unit_box_maps_ndc_corners() {
        let m = ndc_to_unit_box();

        assert_vec3_near(
            project_point(m, Vec3::new(-1.0, -1.0, -1.0)),
            Vec3::ZERO,
        );
        assert_vec3_near(project_point(m, Vec3::new(1.0, 1.0, 1.0)), Vec3::ONE);
        assert_vec3_near(project_point(m, Vec3::ZERO), Vec3::splat(0.5));
    }

    #[test]
    fn wgpu_adjustment_remaps_depth_only() {
        let p = project_point(NDC_TO_WGPU, Vec3::new(0.25, -0.75, -1.0));
        assert_vec3_near(p, Vec3::new(0.25, -0.75, 0.0));

        let p = project_point(NDC_TO_WGPU, Vec3::new(0.0, 0.0, 1.0));
        assert_vec3_near(p, Vec3::new(0.0, 0.0, 1.0));
    }
}
