use super::gpu_check;
use super::layouts::BindGroupLayouts;
use super::uniforms::PassUniforms;
use super::RenderError;

/// The offscreen render target for the main diffuse color pass: a square
/// color texture with a matching depth buffer and the pass's own uniforms.
pub struct DiffuseTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    uniforms: PassUniforms,
    size: u32,
}

impl DiffuseTarget {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        size: u32,
    ) -> Result<Self, RenderError> {
        gpu_check::begin(device);

        let create = |label: &str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[format],
            })
        };

        let color = create("diffuse color texture", Self::COLOR_FORMAT);
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = create("diffuse depth texture", Self::DEPTH_FORMAT);
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = PassUniforms::new(
            device,
            Some("diffuse pass uniforms"),
            &layouts.per_pass_layout,
        );

        gpu_check::finish(device, "diffuse target setup")?;

        Ok(Self {
            color,
            color_view,
            depth_view,
            uniforms,
            size,
        })
    }

    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color
    }

    /// The color attachment, also sampled by downstream consumers.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn uniforms(&self) -> &PassUniforms {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut PassUniforms {
        &mut self.uniforms
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}
