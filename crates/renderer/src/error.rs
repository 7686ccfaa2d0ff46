//! Renderer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface frame unavailable: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error("shader composition failed: {0}")]
    Shader(#[from] effects::EffectError),
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("decoded image is empty")]
    EmptyImage,
    #[error("glTF decode failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("mesh `{mesh}` has no {attribute} attribute")]
    MissingAttribute { mesh: String, attribute: &'static str },
}

pub type Result<T> = std::result::Result<T, RenderError>;
