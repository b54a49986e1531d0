use std::cell::Cell;

use glam::Mat4;
use wgpu::util::DeviceExt;

/// Uniform values shared by every draw in one render pass.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PassUniformData {
    pub view_projection: Mat4,
}

/// Per-pass shader uniforms with CPU side storage that can be copied back to
/// the GPU.
///
/// Each pass target (the diffuse target, every shadow slot, the scene's main
/// output) owns its own instance so the writes for one frame never overlap:
/// `queue.write_buffer` submissions all land before the frame's command
/// buffer executes.
#[derive(Debug)]
pub struct PassUniforms {
    values: PassUniformData,
    gpu_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// True if `values` is potentially out of sync with the GPU buffer.
    is_dirty: Cell<bool>,
}

impl PassUniforms {
    pub fn new(
        device: &wgpu::Device,
        label: Option<&str>,
        bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let values = PassUniformData::default();

        let gpu_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label,
            contents: bytemuck::bytes_of(&values),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: gpu_buffer.as_entire_binding(),
            }],
        });

        Self {
            values,
            gpu_buffer,
            bind_group,
            is_dirty: Cell::new(false),
        }
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.values.view_projection = view_projection;
        self.is_dirty.set(true);
    }

    /// Copy the values stored in this uniform buffer to the GPU and clear the
    /// dirty flag.
    pub fn update_gpu(&self, queue: &wgpu::Queue) {
        self.is_dirty.set(false);
        queue.write_buffer(&self.gpu_buffer, 0, bytemuck::bytes_of(&self.values));
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }
}
