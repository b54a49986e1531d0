use wgpu::util::DeviceExt;

use super::layouts::BindGroupLayouts;

/// A lightweight vertex for the fullscreen visualization quad: position plus
/// one set of texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl QuadVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Two triangles spanning `[-1, 1]^2` at depth `z`, with `[0, 1]^2` texture
/// coordinates. Six unindexed vertices, counterclockwise winding.
pub fn quad_vertices(z: f32) -> [QuadVertex; 6] {
    let v = |x: f32, y: f32, u: f32, t: f32| QuadVertex {
        position: [x, y, z],
        tex_coords: [u, t],
    };

    [
        v(-1.0, -1.0, 0.0, 0.0),
        v(1.0, -1.0, 1.0, 0.0),
        v(1.0, 1.0, 1.0, 1.0),
        v(-1.0, -1.0, 0.0, 0.0),
        v(1.0, 1.0, 1.0, 1.0),
        v(-1.0, 1.0, 0.0, 1.0),
    ]
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct VizUniformData {
    layer_count: u32,
    _padding: [u32; 3],
}

/// Draws the shadow depth and color texture arrays onto a fullscreen quad for
/// inspection. Read-only with respect to shadow state.
pub struct ShadowVizPass {
    vertex_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    output_format: wgpu::TextureFormat,
}

impl ShadowVizPass {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        source: &str,
        depth_array_view: &wgpu::TextureView,
        color_array_view: &wgpu::TextureView,
        layer_count: u32,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow viz quad vertex buffer"),
            contents: bytemuck::cast_slice(&quad_vertices(0.0)),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow viz uniforms"),
            contents: bytemuck::bytes_of(&VizUniformData {
                layer_count,
                _padding: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow viz sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow viz bind group"),
            layout: &layouts.shadow_viz_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(depth_array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(color_array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline = create_viz_pipeline(device, layouts, source, output_format);

        Self {
            vertex_buffer,
            bind_group,
            pipeline,
            output_format,
        }
    }

    /// Encode the visualization draw over `output_view`.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, output_view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow viz render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        // Two triangles covering the viewport.
        render_pass.draw(0..6, 0..1);
    }

    /// Replace the pipeline with one built from `source`. The quad, bind
    /// group and uniforms keep their identities.
    pub fn rebuild_pipeline(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        source: &str,
    ) {
        self.pipeline = create_viz_pipeline(device, layouts, source, self.output_format);
    }
}

fn create_viz_pipeline(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    source: &str,
    output_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shadow viz shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shadow viz render pipeline"),
        layout: Some(
            &device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow viz pipeline layout"),
                bind_group_layouts: &[&layouts.shadow_viz_layout],
                push_constant_ranges: &[],
            }),
        ),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[QuadVertex::desc()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
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

    #[test]
    fn quad_spans_clip_space_at_the_given_depth() {
        let verts = quad_vertices(0.25);

        assert_eq!(6, verts.len());
        for v in &verts {
            assert_eq!(0.25, v.position[2]);
            assert!(v.position[0].abs() == 1.0 && v.position[1].abs() == 1.0);
        }
    }

    #[test]
    fn quad_texcoords_sample_the_unit_square() {
        let verts = quad_vertices(0.0);

        // Texture coordinates track the positive quadrant of each position.
        for v in &verts {
            assert_eq!(v.tex_coords[0], (v.position[0] + 1.0) / 2.0);
            assert_eq!(v.tex_coords[1], (v.position[1] + 1.0) / 2.0);
        }
    }
}
