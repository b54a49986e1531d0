use std::path::Path;

use glam::{Mat4, Vec3};
use tracing::{debug, info};

use crate::math;

use super::gpu_check;
use super::layouts::BindGroupLayouts;
use super::uniforms::PassUniforms;
use super::viz::ShadowVizPass;
use super::RenderError;

/// Tuning knobs for the shadow subsystem. The defaults are the constants the
/// pipeline was tuned with.
#[derive(Clone, Copy, Debug)]
pub struct ShadowSettings {
    /// Upper bound on the number of spotlights that receive shadow maps.
    pub max_shadowed_lights: usize,
    /// Edge length of each square shadow map layer, in texels.
    pub texture_size: u32,
    /// The shadow projection's field of view is the light's cone angle times
    /// this factor, to leave a safety margin around the cone.
    pub fov_widen_factor: f32,
    /// Lower clamp on the widened field of view, in degrees.
    pub min_fov_deg: f32,
    /// Near clip distance of the shadow projection.
    pub z_near: f32,
    /// Far clip distance of the shadow projection.
    pub z_far: f32,
    /// How far past the light the backward pass places its vantage point,
    /// along the light's nominal direction.
    pub backward_offset: f32,
    /// Width of the symmetric range spotlight rotation speeds are sampled
    /// from, in radians per frame.
    pub rotation_speed_range: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            max_shadowed_lights: 4,
            texture_size: 1024,
            fov_widen_factor: 1.4,
            min_fov_deg: 60.0,
            z_near: 10.0,
            z_far: 400.0,
            backward_offset: 1000.0,
            rotation_speed_range: 0.04,
        }
    }
}

/// One of the two shadow passes rendered per shadowed light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowDirection {
    /// Rendered from the light's position along its nominal direction.
    Forward,
    /// Rendered back towards the light from a vantage point far beyond it,
    /// covering the hemisphere of occluders behind the nominal cone.
    Backward,
}

/// Matrices composed for one shadow pass.
#[derive(Clone, Copy, Debug)]
pub struct ShadowMatrices {
    /// Clip transform handed to the rasterizer (WebGPU depth convention).
    pub view_projection: Mat4,
    /// World space to `[0,1]^3` depth-texture sampling space. The z output
    /// compares directly against stored depth; consumers sampling a
    /// rasterized layer flip v (`v = 1 - y`) since texture v grows downward.
    pub world_to_shadow: Mat4,
}

/// Field of view used for a shadow projection: the cone angle widened by the
/// configured factor and clamped to the configured minimum.
pub fn widened_fovy(cone_angle_deg: f32, settings: &ShadowSettings) -> f32 {
    (settings.fov_widen_factor * cone_angle_deg).max(settings.min_fov_deg)
}

/// Compose the view, projection and normalization transforms for a shadow
/// pass rendered from `origin` along `direction` with world +Y as up.
pub fn shadow_matrices(
    origin: Vec3,
    direction: Vec3,
    cone_angle_deg: f32,
    settings: &ShadowSettings,
) -> ShadowMatrices {
    let view = math::world_to_view(origin, origin + direction, Vec3::Y);
    let projection = math::perspective(
        widened_fovy(cone_angle_deg, settings),
        1.0,
        settings.z_near,
        settings.z_far,
    );
    let clip_from_world = projection * view;

    ShadowMatrices {
        view_projection: math::NDC_TO_WGPU * clip_from_world,
        world_to_shadow: math::ndc_to_unit_box() * clip_from_world,
    }
}

/// Vertex buffer layout the shadow pipeline consumes: a position-only stream.
pub fn shadow_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

/// WGSL sources for the two shadow shader programs.
///
/// Sources are read from `<dir>/shadow_pass.wgsl` and `<dir>/shadow_viz.wgsl`
/// when a shader directory is configured, and fall back to the embedded
/// defaults otherwise. Reload re-reads the directory and rebuilds pipelines
/// without touching texture or buffer identities.
#[derive(Debug)]
pub struct ShaderSources {
    pub shadow_pass: String,
    pub shadow_viz: String,
}

impl ShaderSources {
    const DEFAULT_SHADOW_PASS: &'static str = include_str!("shaders/shadow_pass.wgsl");
    const DEFAULT_SHADOW_VIZ: &'static str = include_str!("shaders/shadow_viz.wgsl");

    pub fn load(shader_dir: Option<&Path>) -> Result<Self, RenderError> {
        match shader_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "loading shader sources");
                Ok(Self {
                    shadow_pass: read_shader(&dir.join("shadow_pass.wgsl"))?,
                    shadow_viz: read_shader(&dir.join("shadow_viz.wgsl"))?,
                })
            }
            None => {
                debug!("using embedded shader sources");
                Ok(Self::embedded())
            }
        }
    }

    pub fn embedded() -> Self {
        Self {
            shadow_pass: Self::DEFAULT_SHADOW_PASS.to_owned(),
            shadow_viz: Self::DEFAULT_SHADOW_VIZ.to_owned(),
        }
    }
}

fn read_shader(path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path).map_err(|source| RenderError::ShaderRead {
        path: path.to_owned(),
        source,
    })
}

/// Render targets and uniforms for one shadow pass direction: a depth layer
/// view, a color layer view, the pass uniforms and the slot's world-to-shadow
/// transform.
pub struct ShadowSlot {
    depth_view: wgpu::TextureView,
    color_view: wgpu::TextureView,
    uniforms: PassUniforms,
    world_to_shadow: Mat4,
}

impl ShadowSlot {
    /// Store this pass's matrices: the world-to-shadow transform for
    /// downstream shading and the view-projection for the GPU.
    pub fn store_matrices(&mut self, queue: &wgpu::Queue, matrices: &ShadowMatrices) {
        self.world_to_shadow = matrices.world_to_shadow;
        self.uniforms.set_view_projection(matrices.view_projection);
        self.uniforms.update_gpu(queue);
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn uniforms(&self) -> &PassUniforms {
        &self.uniforms
    }

    pub fn world_to_shadow(&self) -> Mat4 {
        self.world_to_shadow
    }
}

/// The pair of shadow slots belonging to one shadowed spotlight.
pub struct ShadowSlotPair {
    pub forward: ShadowSlot,
    pub backward: ShadowSlot,
}

impl ShadowSlotPair {
    pub fn slot(&self, direction: ShadowDirection) -> &ShadowSlot {
        match direction {
            ShadowDirection::Forward => &self.forward,
            ShadowDirection::Backward => &self.backward,
        }
    }
}

/// All GPU resources owned by the shadow subsystem: the depth and color
/// texture arrays spanning every slot, the per-slot layer views and uniforms,
/// the shadow-depth pipeline and the visualization pass.
///
/// Created once at scene construction and never reallocated; only the
/// pipelines are replaced on shader reload.
pub struct ShadowResources {
    depth_array: wgpu::Texture,
    color_array: wgpu::Texture,
    depth_array_view: wgpu::TextureView,
    color_array_view: wgpu::TextureView,
    pairs: Vec<ShadowSlotPair>,
    pipeline: wgpu::RenderPipeline,
    viz: ShadowVizPass,
}

impl ShadowResources {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Allocate targets for `shadowed_lights` spotlights (must be non-zero)
    /// and build the shadow and visualization pipelines.
    ///
    /// Construction runs inside a validation checkpoint; a failure here means
    /// the targets are unusable and is returned to the caller, which decides
    /// between aborting and running without shadows.
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        shadowed_lights: usize,
        settings: &ShadowSettings,
        sources: &ShaderSources,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        assert!(shadowed_lights > 0);
        let layer_count = (2 * shadowed_lights) as u32;

        gpu_check::begin(device);

        let depth_array = create_array(
            device,
            "shadow depth array",
            Self::DEPTH_FORMAT,
            settings.texture_size,
            layer_count,
        );
        let color_array = create_array(
            device,
            "shadow color array",
            Self::COLOR_FORMAT,
            settings.texture_size,
            layer_count,
        );

        let depth_array_view = depth_array.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow depth array view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let color_array_view = color_array.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow color array view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let pairs = (0..shadowed_lights)
            .map(|light| ShadowSlotPair {
                forward: create_slot(device, layouts, &depth_array, &color_array, 2 * light as u32),
                backward: create_slot(
                    device,
                    layouts,
                    &depth_array,
                    &color_array,
                    2 * light as u32 + 1,
                ),
            })
            .collect();

        // Any invalid texture, view or buffer above surfaces here.
        gpu_check::finish(device, "shadow target setup")?;

        gpu_check::begin(device);

        let pipeline = create_shadow_pipeline(device, layouts, &sources.shadow_pass);
        let viz = ShadowVizPass::new(
            device,
            layouts,
            &sources.shadow_viz,
            &depth_array_view,
            &color_array_view,
            layer_count,
            output_format,
        );

        gpu_check::finish(device, "shadow pipeline setup")?;

        info!(
            layers = layer_count,
            size = settings.texture_size,
            "created shadow render targets"
        );

        Ok(Self {
            depth_array,
            color_array,
            depth_array_view,
            color_array_view,
            pairs,
            pipeline,
            viz,
        })
    }

    pub fn pairs(&self) -> &[ShadowSlotPair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [ShadowSlotPair] {
        &mut self.pairs
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn viz(&self) -> &ShadowVizPass {
        &self.viz
    }

    /// The depth texture array spanning every shadow slot.
    pub fn depth_array(&self) -> &wgpu::Texture {
        &self.depth_array
    }

    /// The color texture array spanning every shadow slot.
    pub fn color_array(&self) -> &wgpu::Texture {
        &self.color_array
    }

    /// View over every depth layer, for downstream shading.
    pub fn depth_array_view(&self) -> &wgpu::TextureView {
        &self.depth_array_view
    }

    /// View over every color layer, for downstream shading.
    pub fn color_array_view(&self) -> &wgpu::TextureView {
        &self.color_array_view
    }

    /// Replace the shadow and visualization pipelines with ones built from
    /// `sources`. Texture and buffer identities are untouched.
    pub fn rebuild_pipelines(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        sources: &ShaderSources,
    ) -> Result<(), RenderError> {
        gpu_check::begin(device);

        self.pipeline = create_shadow_pipeline(device, layouts, &sources.shadow_pass);
        self.viz.rebuild_pipeline(device, layouts, &sources.shadow_viz);

        gpu_check::finish(device, "shadow shader reload")
    }
}

fn create_array(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: u32,
    layer_count: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: layer_count,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[format],
    })
}

fn create_slot(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    depth_array: &wgpu::Texture,
    color_array: &wgpu::Texture,
    layer: u32,
) -> ShadowSlot {
    let layer_view = |texture: &wgpu::Texture, label: &str| {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    };

    ShadowSlot {
        depth_view: layer_view(depth_array, "shadow slot depth view"),
        color_view: layer_view(color_array, "shadow slot color view"),
        uniforms: PassUniforms::new(
            device,
            Some("shadow slot uniforms"),
            &layouts.per_pass_layout,
        ),
        world_to_shadow: Mat4::IDENTITY,
    }
}

fn create_shadow_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shadow pass shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shadow pass render pipeline"),
        layout: Some(
            &device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow pass pipeline layout"),
                bind_group_layouts: &[&layouts.per_pass_layout, &layouts.per_model_layout],
                push_constant_ranges: &[],
            }),
        ),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[shadow_vertex_layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // No culling so single-sided geometry still casts shadows from
            // both pass directions.
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: ShadowResources::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: ShadowResources::COLOR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::project_point;

    /// Route log output through the test harness so `--nocapture` shows it.
    fn init_test_logging() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[test]
    fn default_settings_match_tuned_constants() {
        let s = ShadowSettings::default();

        assert_eq!(1024, s.texture_size);
        assert_eq!(1.4, s.fov_widen_factor);
        assert_eq!(60.0, s.min_fov_deg);
        assert_eq!(10.0, s.z_near);
        assert_eq!(400.0, s.z_far);
        assert_eq!(1000.0, s.backward_offset);
    }

    #[test]
    fn fovy_is_widened_and_clamped() {
        let s = ShadowSettings::default();

        // Narrow cones clamp to the minimum.
        assert_eq!(60.0, widened_fovy(20.0, &s));
        // Wide cones get the safety margin.
        assert!((widened_fovy(50.0, &s) - 70.0).abs() < 1e-5);
    }

    #[test]
    fn world_to_shadow_maps_the_light_axis_into_the_unit_box() {
        let s = ShadowSettings::default();
        let origin = Vec3::new(5.0, 40.0, -3.0);
        let direction = Vec3::new(1.0, 0.0, 0.5).normalize();

        let m = shadow_matrices(origin, direction, 30.0, &s);

        // Points along the axis between the clip planes land at the center of
        // the texture with depth inside [0, 1].
        for t in [s.z_near + 1.0, 100.0, s.z_far - 1.0] {
            let p = project_point(m.world_to_shadow, origin + direction * t);

            assert!((p.x - 0.5).abs() < 1e-3, "u off-center at t={t}: {p}");
            assert!((p.y - 0.5).abs() < 1e-3, "v off-center at t={t}: {p}");
            assert!((0.0..=1.0).contains(&p.z), "depth outside box at t={t}: {p}");
        }
    }

    #[test]
    fn shadow_depth_matches_rasterized_depth() {
        // The unit-box z mapping and the GPU clip-space adjustment must agree
        // so sampled depth is comparable with world-to-shadow depth.
        let s = ShadowSettings::default();
        let origin = Vec3::ZERO;
        let direction = Vec3::X;
        let m = shadow_matrices(origin, direction, 45.0, &s);

        let world = origin + direction * 123.0;
        let sample_depth = project_point(m.world_to_shadow, world).z;
        let raster_depth = project_point(m.view_projection, world).z;

        assert!((sample_depth - raster_depth).abs() < 1e-5);
    }

    #[test]
    fn points_behind_the_vantage_fall_outside_the_box() {
        let s = ShadowSettings::default();
        let m = shadow_matrices(Vec3::ZERO, Vec3::X, 45.0, &s);

        let behind = project_point(m.world_to_shadow, Vec3::new(-50.0, 0.0, 0.0));
        assert!(!(0.0..=1.0).contains(&behind.z));
    }

    #[test]
    fn embedded_shader_sources_are_the_fallback() {
        init_test_logging();
        let sources = ShaderSources::load(None).unwrap();

        assert!(sources.shadow_pass.contains("vs_main"));
        assert!(sources.shadow_viz.contains("texture_2d_array"));
    }

    #[test]
    fn missing_shader_directory_is_reported() {
        init_test_logging();
        let err = ShaderSources::load(Some(Path::new("/nonexistent/shaders"))).unwrap_err();

        match err {
            RenderError::ShaderRead { path, .. } => {
                assert!(path.ends_with("shadow_pass.wgsl"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
