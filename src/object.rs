use glam::Mat4;

use crate::bbox::BBox;

/// A renderable entity owned by the scene.
///
/// Objects own their mesh, material and per-model uniform state. The scene
/// only sequences passes: for every pass it binds the pass-level target and
/// uniforms (bind group 0, see [`BindGroupLayouts`]) and then hands each
/// object the render pass plus the composed view-projection for that pass.
///
/// [`BindGroupLayouts`]: crate::renderer::BindGroupLayouts
pub trait SceneObject {
    /// Upload any dirty per-object GPU state (uniforms, instance buffers).
    ///
    /// Called before each pass is encoded; implementations should be cheap
    /// when nothing changed.
    fn prepare(&self, queue: &wgpu::Queue) {
        let _ = queue;
    }

    /// Draw this object's full-shaded representation into the caller-bound
    /// output target.
    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, view_projection: Mat4);

    /// Draw this object's full-shaded representation for the offscreen
    /// diffuse color pass.
    ///
    /// Pipelines used here must use the per-pass bind group layout at group 0
    /// and cull back faces.
    fn draw_diffuse_color<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        view_projection: Mat4,
    );

    /// Draw this object's shadow-depth representation.
    ///
    /// The shadow pipeline is already bound: supply a position-only vertex
    /// stream matching [`shadow_vertex_layout`] plus the object's model
    /// uniforms at group 1, then issue the draw.
    ///
    /// [`shadow_vertex_layout`]: crate::renderer::shadow_vertex_layout
    fn draw_shadow<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, view_projection: Mat4);

    /// Rebuild this object's shader modules and pipelines. Resource identities
    /// (buffers, textures) must not change.
    fn reload_shaders(&mut self, device: &wgpu::Device) -> anyhow::Result<()> {
        let _ = device;
        Ok(())
    }

    /// World space bounds of this object.
    fn bbox(&self) -> BBox;
}
