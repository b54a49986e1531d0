//! Labeled device checkpoints built on wgpu validation error scopes.
//!
//! Each checkpoint brackets a stretch of device work: [`begin`] pushes a
//! validation scope and [`finish`] pops it, turning any captured error into a
//! [`RenderError::Validation`] that names the checkpoint. Resource
//! construction treats these as fatal; per-frame passes log and keep going via
//! [`log_only`], preferring a visibly corrupt frame over a crash.

use tracing::error;

use super::RenderError;

pub fn begin(device: &wgpu::Device) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
}

pub fn finish(device: &wgpu::Device, checkpoint: &'static str) -> Result<(), RenderError> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(RenderError::Validation {
            checkpoint,
            message: error.to_string(),
        }),
        None => Ok(()),
    }
}

pub fn log_only(device: &wgpu::Device, checkpoint: &'static str) {
    if let Err(e) = finish(device, checkpoint) {
        error!("{e}");
    }
}
