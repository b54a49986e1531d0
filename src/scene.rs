use std::path::PathBuf;

use glam::Mat4;
use tracing::{info, warn};

use crate::bbox::BBox;
use crate::camera::Camera;
use crate::lights::{rotation_speeds, ClassifiedLights, Light, ShadowPlan, SpotLight};
use crate::math;
use crate::object::SceneObject;
use crate::renderer::{
    begin_check, log_check, shadow_matrices, BindGroupLayouts, DiffuseTarget, PassUniforms,
    RenderError, ShaderSources, ShadowDirection, ShadowResources, ShadowSettings, ShadowSlot,
};

/// Edge length of the square diffuse color target, in texels.
const DIFFUSE_TARGET_SIZE: u32 = 1024;

/// The renderable world and its multi-pass pipeline.
///
/// A `Scene` owns its objects, the classified light lists and every render
/// target the passes draw into. Composition is fixed after construction:
/// targets are allocated once, sized to the number of shadowed spotlights,
/// and never reallocated (a documented limitation, not a bug).
///
/// Per frame the external driver sequences, in order: shadow passes for each
/// shadowed light, the diffuse color pass, optionally the shadow
/// visualization, and the spotlight animation. All passes are recorded into
/// caller-supplied command encoders against one device, strictly
/// sequentially; a wgpu render pass ends when it is dropped, so target state
/// cannot leak from one pass into the next.
pub struct Scene {
    objects: Vec<Box<dyn SceneObject>>,
    directional_lights: Vec<crate::lights::DirectionalLight>,
    point_lights: Vec<crate::lights::PointLight>,
    spot_lights: Vec<SpotLight>,
    /// One fixed angular speed per shadowed spotlight, assigned at
    /// construction.
    spot_rotation_speeds: Vec<f32>,
    plan: ShadowPlan,
    settings: ShadowSettings,
    layouts: BindGroupLayouts,
    /// Uniforms for the plain scene pass into the caller's output target.
    frame_uniforms: PassUniforms,
    /// Shadow targets and pipelines; `None` when no spotlight is shadowed,
    /// which turns every shadow operation into a no-op.
    shadow: Option<ShadowResources>,
    diffuse: DiffuseTarget,
    shader_dir: Option<PathBuf>,
}

impl Scene {
    /// Build a scene from objects and lights, allocating all render targets.
    ///
    /// `layouts` is the registry the caller already used to build its
    /// objects' bind groups. `output_format` is the format of the view later
    /// passed to [`Scene::render`] and [`Scene::visualize_shadow_map`].
    /// `shader_dir`, when set, overrides the embedded WGSL sources and
    /// enables on-disk shader reloading.
    ///
    /// Target validation failures are returned, not fatal: the driver picks
    /// between aborting and running without shadows.
    pub fn new(
        device: &wgpu::Device,
        layouts: BindGroupLayouts,
        objects: Vec<Box<dyn SceneObject>>,
        lights: Vec<Light>,
        settings: ShadowSettings,
        shader_dir: Option<PathBuf>,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let ClassifiedLights {
            directional,
            point,
            spot,
        } = ClassifiedLights::classify(lights);

        let plan = ShadowPlan::new(spot.len(), settings.max_shadowed_lights);
        let spot_rotation_speeds = rotation_speeds(
            plan.shadowed_lights(),
            settings.rotation_speed_range,
            &mut rand::thread_rng(),
        );

        let sources = ShaderSources::load(shader_dir.as_deref())?;

        let shadow = if plan.is_empty() {
            None
        } else {
            info!(lights = plan.shadowed_lights(), "setting up shadow assets");
            Some(ShadowResources::new(
                device,
                &layouts,
                plan.shadowed_lights(),
                &settings,
                &sources,
                output_format,
            )?)
        };

        let diffuse = DiffuseTarget::new(device, &layouts, DIFFUSE_TARGET_SIZE)?;
        let frame_uniforms = PassUniforms::new(
            device,
            Some("scene frame uniforms"),
            &layouts.per_pass_layout,
        );

        info!(
            objects = objects.len(),
            directional = directional.len(),
            point = point.len(),
            spot = spot.len(),
            shadowed = plan.shadowed_lights(),
            "scene constructed"
        );

        Ok(Self {
            objects,
            directional_lights: directional,
            point_lights: point,
            spot_lights: spot,
            spot_rotation_speeds,
            plan,
            settings,
            layouts,
            frame_uniforms,
            shadow,
            diffuse,
            shader_dir,
        })
    }

    /// Number of spotlights that receive shadow map pairs.
    pub fn num_shadowed_lights(&self) -> usize {
        self.plan.shadowed_lights()
    }

    pub fn num_spot_lights(&self) -> usize {
        self.spot_lights.len()
    }

    pub fn spot_lights(&self) -> &[SpotLight] {
        &self.spot_lights
    }

    pub fn directional_lights(&self) -> &[crate::lights::DirectionalLight] {
        &self.directional_lights
    }

    pub fn point_lights(&self) -> &[crate::lights::PointLight] {
        &self.point_lights
    }

    pub fn layouts(&self) -> &BindGroupLayouts {
        &self.layouts
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// The offscreen diffuse target written by
    /// [`Scene::render_diffuse_color_pass`].
    pub fn diffuse_target(&self) -> &DiffuseTarget {
        &self.diffuse
    }

    /// Shadow resources, present only when at least one spotlight is
    /// shadowed.
    pub fn shadow_resources(&self) -> Option<&ShadowResources> {
        self.shadow.as_ref()
    }

    /// The transform mapping world space into `[0,1]^3` depth-texture
    /// sampling space for one shadow slot, as stored by the most recent
    /// [`Scene::render_shadow_pass`] for that light. Stale until the current
    /// frame's shadow pass has run.
    pub fn world_to_shadow(&self, light_index: usize, direction: ShadowDirection) -> Option<Mat4> {
        self.shadow
            .as_ref()?
            .pairs()
            .get(light_index)
            .map(|pair| pair.slot(direction).world_to_shadow())
    }

    /// World space bounds of every object in the scene.
    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::empty();
        for obj in &self.objects {
            bbox.expand(obj.bbox());
        }
        bbox
    }

    /// Draw every object's full-shaded representation from `camera` into the
    /// caller's output target, clearing it first.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        camera: &Camera,
    ) {
        begin_check(device);

        let view_projection = camera_view_projection(camera);
        self.frame_uniforms.set_view_projection(view_projection);
        self.frame_uniforms.update_gpu(queue);

        for obj in &self.objects {
            obj.prepare(queue);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, self.frame_uniforms.bind_group(), &[]);

            for obj in &self.objects {
                obj.draw(&mut render_pass, view_projection);
            }
        }

        log_check(device, "scene render");
    }

    /// Draw every object's full-shaded representation from `camera` into the
    /// offscreen diffuse color target.
    pub fn render_diffuse_color_pass(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
    ) {
        begin_check(device);

        let view_projection = camera_view_projection(camera);
        self.diffuse
            .uniforms_mut()
            .set_view_projection(view_projection);
        self.diffuse.uniforms().update_gpu(queue);

        for obj in &self.objects {
            obj.prepare(queue);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("diffuse color render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.diffuse.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.diffuse.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, self.diffuse.uniforms().bind_group(), &[]);

            for obj in &self.objects {
                obj.draw_diffuse_color(&mut render_pass, view_projection);
            }
        }

        log_check(device, "diffuse color pass");
    }

    /// Render both shadow passes for shadowed spotlight `light_index`.
    ///
    /// The forward pass looks along the light's direction from its position;
    /// the backward pass looks back from a vantage point far beyond the
    /// light, covering the opposite hemisphere of occluders. A single
    /// spotlight projection cannot cover the geometry behind the light's
    /// nominal cone, and the two opposed renders approximate that coverage
    /// far cheaper than a cube map.
    ///
    /// Stores the slot pair's world-to-shadow transforms for downstream
    /// shading. A no-op when no spotlight is shadowed.
    pub fn render_shadow_pass(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        light_index: usize,
    ) {
        if self.shadow.is_none() {
            return;
        }
        if light_index >= self.plan.shadowed_lights() {
            warn!(
                light_index,
                shadowed = self.plan.shadowed_lights(),
                "shadow pass requested for an unshadowed light"
            );
            return;
        }

        begin_check(device);

        let spot = self.spot_lights[light_index];
        let forward = shadow_matrices(spot.position, spot.direction, spot.angle_deg, &self.settings);

        // Vantage point past the light, looking back along the cone axis.
        let vantage = spot.position + spot.direction * self.settings.backward_offset;
        let backward = shadow_matrices(vantage, -spot.direction, spot.angle_deg, &self.settings);

        if let Some(shadow) = self.shadow.as_mut() {
            let pair = &mut shadow.pairs_mut()[light_index];
            pair.forward.store_matrices(queue, &forward);
            pair.backward.store_matrices(queue, &backward);
        }

        for obj in &self.objects {
            obj.prepare(queue);
        }

        let Some(shadow) = self.shadow.as_ref() else {
            return;
        };
        let pair = &shadow.pairs()[light_index];

        encode_shadow_slot(
            encoder,
            shadow.pipeline(),
            &pair.forward,
            &self.objects,
            forward.view_projection,
        );
        log_check(device, "forward shadow pass");

        begin_check(device);
        encode_shadow_slot(
            encoder,
            shadow.pipeline(),
            &pair.backward,
            &self.objects,
            backward.view_projection,
        );
        log_check(device, "backward shadow pass");
    }

    /// Draw the shadow texture arrays onto `output_view` for inspection.
    /// Read-only; a no-op when no spotlight is shadowed.
    pub fn visualize_shadow_map(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
    ) {
        let Some(shadow) = self.shadow.as_ref() else {
            return;
        };

        begin_check(device);
        shadow.viz().draw(encoder, output_view);
        log_check(device, "shadow viz");
    }

    /// Advance each shadowed spotlight's direction by its fixed angular
    /// speed. Independent of pass order within a frame: passes read light
    /// directions at the start of their own step.
    pub fn rotate_spot_lights(&mut self) {
        for (light, speed) in self
            .spot_lights
            .iter_mut()
            .zip(&self.spot_rotation_speeds)
        {
            light.rotate(*speed);
        }
    }

    /// Rebuild every pipeline from shader sources, re-reading the shader
    /// directory when one was configured. Resource identities are unchanged;
    /// objects are asked to reload their own shaders as well.
    pub fn reload_shaders(&mut self, device: &wgpu::Device) -> Result<(), RenderError> {
        info!("reloading all shaders");

        let sources = ShaderSources::load(self.shader_dir.as_deref())?;

        if let Some(shadow) = self.shadow.as_mut() {
            shadow.rebuild_pipelines(device, &self.layouts, &sources)?;
        }

        for obj in &mut self.objects {
            obj.reload_shaders(device)?;
        }

        Ok(())
    }
}

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// View-projection for `camera` in WebGPU clip conventions.
fn camera_view_projection(camera: &Camera) -> Mat4 {
    let view = math::world_to_view(camera.position(), camera.view_point(), camera.up_dir());
    let projection = math::perspective(
        camera.v_fov_deg(),
        camera.aspect_ratio(),
        camera.near_clip(),
        camera.far_clip(),
    );

    math::NDC_TO_WGPU * projection * view
}

/// Encode one shadow slot's render pass: bind the slot's layer targets,
/// clear, and draw every object's shadow representation.
fn encode_shadow_slot<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    pipeline: &'a wgpu::RenderPipeline,
    slot: &'a ShadowSlot,
    objects: &'a [Box<dyn SceneObject>],
    view_projection: Mat4,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("shadow render pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: slot.color_view(),
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: slot.depth_view(),
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, slot.uniforms().bind_group(), &[]);

    for obj in objects {
        obj.draw_shadow(&mut render_pass, view_projection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::project_point;
    use glam::Vec3;

    fn test_camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            60.0,
            1.0,
            100.0,
            800,
            600,
        )
    }

    #[test]
    fn camera_clip_depth_spans_zero_to_one() {
        let camera = test_camera();
        let vp = camera_view_projection(&camera);

        let near = Vec3::new(0.0, 0.0, 10.0 - camera.near_clip());
        let far = Vec3::new(0.0, 0.0, 10.0 - camera.far_clip());

        assert!(project_point(vp, near).z.abs() < 1e-4);
        assert!((project_point(vp, far).z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn points_ahead_of_the_camera_project_inside_clip_space() {
        let camera = test_camera();
        let vp = camera_view_projection(&camera);
        let p = project_point(vp, Vec3::ZERO);

        assert!(p.x.abs() < 1.0);
        assert!(p.y.abs() < 1.0);
        assert!((0.0..=1.0).contains(&p.z));
    }
}
