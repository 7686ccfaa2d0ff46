//! wgpu rendering for the cloud sea scene.

pub mod assets;
pub mod camera;
pub mod cloud_pass;
pub mod depth_target;
pub mod error;
pub mod fog_pass;
pub mod instances;
pub mod lit_pass;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod shaders;
pub mod texture;
pub mod tree_pass;
pub mod vertex;

pub use assets::{decode_image, load_gltf, GltfMesh};
pub use camera::*;
pub use depth_target::GpuDepthTarget;
pub use error::{RenderError, Result};
pub use lit_pass::{LitProgram, MaterialId};
pub use mesh::*;
pub use pipeline::{LitUniform, PipelinePreset};
pub use renderer::*;
pub use texture::*;
pub use tree_pass::TreeTextures;
pub use vertex::*;
