//! Multi-pass scene rendering with shadowed spotlights on wgpu.
//!
//! The crate renders a scene of caller-supplied objects lit by directional,
//! point and spot lights. The first N spotlights get shadow maps: each frame
//! a forward and a backward depth pass per shadowed light write into shared
//! texture arrays, followed by a diffuse color pass and an optional on-screen
//! visualization of the shadow maps. Shadowed spotlights rotate around the
//! world up axis at fixed per-light speeds.
//!
//! [`scene::Scene`] sequences the passes; callers implement
//! [`object::SceneObject`] to supply geometry and pipelines for each pass.

pub mod bbox;
pub mod camera;
pub mod lights;
pub mod math;
pub mod object;
pub mod renderer;
pub mod scene;

pub use bbox::BBox;
pub use camera::Camera;
pub use lights::{DirectionalLight, Light, PointLight, SpotLight};
pub use object::SceneObject;
pub use renderer::{
    BindGroupLayouts, DiffuseTarget, RenderError, ShadowDirection, ShadowResources, ShadowSettings,
};
pub use scene::Scene;
