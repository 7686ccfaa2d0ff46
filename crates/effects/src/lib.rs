//! Cloud-sea visual effects.
//!
//! CPU side of every effect in the scene: the fog particle lifecycle, the
//! static tree pool, the bobbing islands, the cloud depth pre-pass and the
//! numeric reference of each shader program. Nothing here touches the GPU;
//! the renderer uploads what these types produce.

pub mod cloud;
pub mod compositor;
pub mod depth_fade;
pub mod error;
pub mod fog;
pub mod foliage;
pub mod homespace;
pub mod instance_buffer;
pub mod islands;
pub mod lighting;
pub mod math;
pub mod sampler;
pub mod trees;
pub mod uniforms;

pub use cloud::CloudConfig;
pub use compositor::{DepthCompositor, DepthTarget, SceneVisibility, VisibilityScope};
pub use depth_fade::DepthFadeConfig;
pub use error::{EffectError, Result};
pub use fog::{FogConfig, FogSimulator, FogSlot};
pub use homespace::{HookPoint, MaterialOverride, ShaderComposer};
pub use instance_buffer::{
    AttributeChannel, ChannelId, DirtyChannel, FogChannels, InstanceLayout, InstancedParticleBuffer,
    TreeChannels,
};
pub use islands::{IslandBobber, IslandMotion, SceneFog};
pub use lighting::{Light, LightCache, LightKind};
pub use sampler::{ConstantSampler, NoiseSampler};
pub use trees::{LeafType, TreePool, TreeSpec, TREE_LAYOUT};
pub use uniforms::{CloudUniform, FogUniform, HomespaceUniform, TreeUniform};
