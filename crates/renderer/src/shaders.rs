//! WGSL programs. Each one mirrors the CPU reference in the `effects` crate.

/// Camera block shared by every program at group 0.
const CAMERA_BLOCK: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    position: vec4<f32>,
    viewport: vec2<f32>,
    near: f32,
    far: f32,
};

@group(0) @binding(0)
var<uniform> camera: Camera;
"#;

/// Cloud sea: flow-map displacement in the vertex stage, depth fade in the fragment stage.
pub const CLOUD_SHADER: &str = r#"
struct Cloud {
    time: f32,
    camera_near: f32,
    camera_far: f32,
    noise_height: f32,
    resolution: vec2<f32>,
    depth_scale: f32,
    depth_falloff: f32,
    jump: vec2<f32>,
    tiling: f32,
    speed: f32,
    flow_strength: f32,
    flow_offset: f32,
    noise_scale: f32,
    detail_scroll: f32,
    base_noise_scale: f32,
    base_noise_speed: f32,
    base_noise_strength: f32,
    cloud_width: f32,
};

@group(1) @binding(0) var<uniform> cloud: Cloud;
@group(1) @binding(1) var t_noise: texture_2d<f32>;
@group(1) @binding(2) var t_flow: texture_2d<f32>;
@group(1) @binding(3) var s_repeat: sampler;
@group(1) @binding(4) var t_scene_depth: texture_2d<f32>;
@group(1) @binding(5) var t_mask_depth: texture_depth_2d;

const VALLEY_COLOR: vec3<f32> = vec3<f32>(0.310, 0.585, 0.970);
const PEAK_COLOR: vec3<f32> = vec3<f32>(1.0, 1.0, 1.0);

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) model_0: vec4<f32>,
    @location(5) model_1: vec4<f32>,
    @location(6) model_2: vec4<f32>,
    @location(7) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) noise: f32,
};

fn fract_glsl(x: f32) -> f32 {
    return x - floor(x);
}

fn flow_uvw(uv: vec2<f32>, flow_vector: vec2<f32>, jump: vec2<f32>, flow_offset: f32, tiling: f32, time: f32, flow_b: bool) -> vec3<f32> {
    let phase_offset = select(0.0, 0.5, flow_b);
    let progress = fract_glsl(time + phase_offset);
    var xy = uv - flow_vector * (progress + flow_offset);
    xy = xy * tiling;
    xy = xy + vec2<f32>(phase_offset);
    xy = xy + (time - progress) * jump;
    let w = 1.0 - abs(1.0 - 2.0 * progress);
    return vec3<f32>(xy, w);
}

@vertex
fn vs_main(v: VertexInput, inst: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    let rest = model * vec4<f32>(v.position, 1.0);

    let pos_uv = rest.xz * cloud.noise_scale;
    let flow = textureSampleLevel(t_flow, s_repeat, pos_uv, 0.0);
    let flow_vector = (flow.xy * 2.0 - 1.0) * cloud.flow_strength;
    let flow_time = cloud.time * cloud.speed + flow.a;

    let a = flow_uvw(pos_uv, flow_vector, cloud.jump, cloud.flow_offset, cloud.tiling, flow_time, false);
    let b = flow_uvw(pos_uv, flow_vector, cloud.jump, cloud.flow_offset, cloud.tiling, flow_time, true);
    let scroll = vec2<f32>(cloud.time * cloud.detail_scroll);
    let n1 = textureSampleLevel(t_noise, s_repeat, a.xy + scroll, 0.0).r * a.z;
    let n2 = textureSampleLevel(t_noise, s_repeat, b.xy + scroll, 0.0).r * b.z;

    let base_uv = rest.xz * cloud.base_noise_scale + vec2<f32>(cloud.time * cloud.base_noise_speed);
    let base = textureSampleLevel(t_noise, s_repeat, base_uv, 0.0).r * cloud.base_noise_strength;
    let noise = n1 + n2 + base / (cloud.base_noise_strength + 1.0);

    let displaced = v.position + vec3<f32>(0.0, 0.0, 1.0) * noise * cloud.noise_height;
    let world = model * vec4<f32>(displaced, 1.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.noise = noise;
    return out;
}

fn perspective_depth_to_view_z(depth: f32, near: f32, far: f32) -> f32 {
    return (near * far) / ((far - near) * depth - far);
}

fn view_z_to_orthographic_depth(view_z: f32, near: f32, far: f32) -> f32 {
    return (view_z + near) / (near - far);
}

fn depth_fade(fragment_z: f32, scene_z: f32, depth_scale: f32, depth_falloff: f32) -> f32 {
    return pow(clamp(1.0 - (fragment_z - scene_z) / depth_scale, 0.0, 1.0), depth_falloff);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let half_width = cloud.cloud_width * 0.5;
    let distance_lerp = clamp(length(in.world_position.xz) / half_width, 0.0, 1.0);
    let valley = mix(VALLEY_COLOR, vec3<f32>(1.0), distance_lerp);
    let peak = mix(PEAK_COLOR, vec3<f32>(1.0), distance_lerp);
    let color = mix(valley, peak, in.noise);

    let screen_uv = in.clip_position.xy / camera.viewport;
    let dims = vec2<i32>(textureDimensions(t_scene_depth));
    let texel = clamp(vec2<i32>(screen_uv * cloud.resolution), vec2<i32>(0), dims - vec2<i32>(1));
    let scene_depth = textureLoad(t_scene_depth, texel, 0).r;
    let mask_depth = textureLoad(t_mask_depth, texel, 0);

    let near = cloud.camera_near;
    let far = cloud.camera_far;
    let fragment_z = perspective_depth_to_view_z(in.clip_position.z, near, far);
    let scene_z = perspective_depth_to_view_z(scene_depth, near, far);
    let fade = depth_fade(fragment_z, scene_z, cloud.depth_scale, cloud.depth_falloff);

    let mask_ortho = view_z_to_orthographic_depth(perspective_depth_to_view_z(mask_depth, near, far), near, far);
    var alpha = 1.0;
    if (mask_depth < 1.0 && mask_ortho < 1.0) {
        alpha = 1.0 - fade;
    }
    return vec4<f32>(color, alpha);
}
"#;

/// Camera-facing smoke billboards driven by the fog instance channels.
pub const FOG_SHADER: &str = r#"
struct Fog {
    camera_quaternion: vec4<f32>,
    time: f32,
    group_offset_y: f32,
    _pad0: f32,
    _pad1: f32,
};

@group(1) @binding(0) var<uniform> fog: Fog;
@group(1) @binding(1) var t_smoke: texture_2d<f32>;
@group(1) @binding(2) var s_smoke: sampler;

const CUT_OUT: f32 = 200.0;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) positions: vec3<f32>,
    @location(5) scales: vec3<f32>,
    @location(6) opacity: f32,
    @location(7) distortion: f32,
    @location(8) texture_rotation: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) opacity: f32,
    @location(3) texture_rotation: f32,
};

fn rotate_vec_quat(v: vec3<f32>, q: vec4<f32>) -> vec3<f32> {
    return v + 2.0 * cross(q.xyz, cross(q.xyz, v) + q.w * v);
}

@vertex
fn vs_main(v: VertexInput, inst: InstanceInput) -> VertexOutput {
    var pos = rotate_vec_quat(v.position, fog.camera_quaternion);
    pos = pos * inst.scales + inst.positions;
    let world = pos + vec3<f32>(0.0, fog.group_offset_y, 0.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.world_position = world;
    out.uv = v.uv;
    out.opacity = inst.opacity;
    out.texture_rotation = inst.texture_rotation;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let c = cos(in.texture_rotation);
    let s = sin(in.texture_rotation);
    let mid = 0.5;
    let rotated = vec2<f32>(
        c * (in.uv.x - mid) - s * (in.uv.y - mid) + mid,
        c * (in.uv.y - mid) + s * (in.uv.x - mid) + mid,
    );
    let smoke = textureSample(t_smoke, s_smoke, rotated);

    let distance_fade = clamp(length(in.world_position.xz) / CUT_OUT, 0.0, 1.0);
    let height_fade = clamp((in.world_position.y + CUT_OUT) / CUT_OUT, 0.0, 1.0);
    return vec4<f32>(vec3<f32>(1.0), in.opacity * smoke.r * height_fade * distance_fade);
}
"#;

/// Instanced trees: wind sway on foliage, two-texture leaf cutout, stylised lighting.
pub const TREE_SHADER: &str = r#"
struct Tree {
    light_pos: vec3<f32>,
    time: f32,
    eye: vec3<f32>,
    _pad: f32,
};

@group(1) @binding(0) var<uniform> tree: Tree;
@group(1) @binding(1) var t_noise: texture_2d<f32>;
@group(1) @binding(2) var s_repeat: sampler;
@group(1) @binding(3) var t_leaf_one: texture_2d<f32>;
@group(1) @binding(4) var t_leaf_two: texture_2d<f32>;
@group(1) @binding(5) var t_bark: texture_2d<f32>;
@group(1) @binding(6) var s_clamp: sampler;

const PI: f32 = 3.14159265;
const TAU: f32 = 6.2831853;
const PHASES: vec4<f32> = vec4<f32>(0.34, 0.48, 0.27, 0.0);
const AMPLITUDES: vec4<f32> = vec4<f32>(4.02, 0.34, 0.65, 0.0);
const FREQUENCIES: vec4<f32> = vec4<f32>(0.0, 0.48, 0.08, 0.0);
const OFFSETS: vec4<f32> = vec4<f32>(0.21, 0.33, 0.06, -0.38);

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) positions: vec3<f32>,
    @location(5) scales: vec3<f32>,
    @location(6) rotation: f32,
    @location(7) leaf_type: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
    @location(4) leaf_type: f32,
};

fn yaw(v: vec3<f32>, angle: f32) -> vec3<f32> {
    // Row-vector multiply by the Y rotation matrix.
    let c = cos(angle);
    let s = sin(angle);
    return vec3<f32>(c * v.x - s * v.z, v.y, s * v.x + c * v.z);
}

@vertex
fn vs_main(v: VertexInput, inst: InstanceInput) -> VertexOutput {
    var pos = yaw(v.position * inst.scales.x, inst.rotation) + inst.positions;
    if (v.color.r > 0.1) {
        let wind_uv = pos.xz * 0.1 + vec2<f32>(tree.time * 0.01);
        let noise = textureSampleLevel(t_noise, s_repeat, wind_uv, 0.0);
        pos = pos + noise.r * vec3<f32>(2.0, 0.0, 2.0);
    }

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(pos, 1.0);
    out.world_position = pos;
    out.normal = yaw(v.normal, inst.rotation);
    out.uv = v.uv;
    out.color = v.color;
    out.leaf_type = inst.leaf_type;
    return out;
}

fn dggx(a2: f32, n_dot_h: f32) -> f32 {
    let d = (n_dot_h * a2 - n_dot_h) * n_dot_h + 1.0;
    return a2 / (PI * d * d);
}

fn cos_gradient(x: f32, phase: vec4<f32>, amp: vec4<f32>, freq: vec4<f32>, offset: vec4<f32>) -> vec4<f32> {
    let p = phase * TAU;
    let t = x * TAU;
    return offset + amp * 0.5 * cos(t * freq + p) + vec4<f32>(0.5);
}

fn safe_normalize(v: vec3<f32>) -> vec3<f32> {
    let len = length(v);
    if (len < 1e-6) {
        return vec3<f32>(0.0);
    }
    return v / len;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let foliage = in.color.r > 0.1;
    // Sampled up front: implicit-lod sampling must stay in uniform control flow.
    let leaf_uv = vec2<f32>(in.uv.x + 0.05, in.uv.y - 0.24) * 1.25;
    let one = textureSample(t_leaf_one, s_clamp, leaf_uv);
    let two = textureSample(t_leaf_two, s_clamp, leaf_uv);
    let bark = textureSample(t_bark, s_repeat, in.uv * 10.0);

    var tex = bark;
    var cutout = 0.99;
    if (foliage) {
        tex = vec4<f32>(0.0);
        if (in.leaf_type < 1.5) {
            tex = one;
        } else if (in.leaf_type < 2.5) {
            tex = two;
        }
        cutout = 0.9;
    }
    if (tex.a < cutout) {
        discard;
    }

    let eye_dir = safe_normalize(tree.eye - in.world_position);
    let normal = safe_normalize(in.normal);
    let light_dir = safe_normalize(tree.light_pos);
    let n_dot_l = max(0.0, dot(light_dir, normal));

    let ambient = cos_gradient(n_dot_l, PHASES, AMPLITUDES, FREQUENCIES, OFFSETS).rgb;
    let albedo = mix(vec3<f32>(0.0399, 0.570, 0.164), vec3<f32>(0.483, 0.950, 0.171), n_dot_l + 0.7);
    let diffuse = mix(ambient * albedo, albedo, n_dot_l);

    let half_dir = safe_normalize(tree.light_pos + tree.eye);
    let specular = dggx(0.6 * 0.6, dot(normal, half_dir));
    var specular_color = vec3<f32>(specular * 0.9);
    if (foliage) {
        specular_color = albedo * specular * 0.9;
    }

    var rgb: vec3<f32>;
    if (foliage) {
        let back_dir = safe_normalize(normal + tree.light_pos);
        let back = clamp(dot(eye_dir, -back_dir), 0.0, 1.0);
        let back_intensity = smoothstep(0.8, 1.0, back) * 0.5;
        let back_sss = clamp(back * back_intensity, 0.0, 1.0);

        let base = (diffuse + albedo + specular_color) * 0.3;
        rgb = mix(base * 0.8, base, tex.r);
        let top = dot(vec3<f32>(0.0, 1.0, 0.0), normal) * 0.5 + 0.5;
        rgb = rgb * smoothstep(0.1, 0.99, top) + vec3<f32>(back_sss);
    } else {
        rgb = (tex.rgb + specular_color) * 0.3 * 0.5;
    }
    return vec4<f32>(rgb, tex.a);
}
"#;

/// Lit model program. Declares `pre_main`, `declarations` and `map_sample`
/// hooks for `effects::ShaderComposer`.
pub const LIT_SHADER: &str = r#"
struct Material {
    light_pos: vec3<f32>,
    time: f32,
    fog_color: vec3<f32>,
    fog_density: f32,
    roughness: f32,
    metalness: f32,
    _pad0: f32,
    _pad1: f32,
};

@group(1) @binding(0) var<uniform> material: Material;
@group(1) @binding(1) var t_map: texture_2d<f32>;
@group(1) @binding(2) var s_map: sampler;

const PI: f32 = 3.14159265;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) model_0: vec4<f32>,
    @location(5) model_1: vec4<f32>,
    @location(6) model_2: vec4<f32>,
    @location(7) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
    @location(4) normal_raw: vec3<f32>,
};

@vertex
fn vs_main(v: VertexInput, inst: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    let model_normal = v.normal;
    var out: VertexOutput;
    out.normal_raw = vec3<f32>(0.0, 1.0, 0.0);
    //@hook:pre_main
    let world = model * vec4<f32>(v.position, 1.0);
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.normal = normalize((model * vec4<f32>(model_normal, 0.0)).xyz);
    out.uv = v.uv;
    out.color = v.color;
    return out;
}

//@hook:declarations

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var diffuse_color = in.color;
    //@hook:map_sample

    let n = normalize(in.normal);
    var l = vec3<f32>(0.3, 1.0, 0.5);
    if (length(material.light_pos) > 1e-4) {
        l = material.light_pos;
    }
    l = normalize(l);
    let v = normalize(camera.position.xyz - in.world_position);
    let h = normalize(l + v);
    let n_dot_l = max(dot(n, l), 0.0);
    let n_dot_h = max(dot(n, h), 0.0);

    let a = material.roughness * material.roughness;
    let a2 = a * a;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    let specular = a2 / (PI * d * d) * n_dot_l;
    let f0 = mix(vec3<f32>(0.04), diffuse_color.rgb, material.metalness);

    var color = diffuse_color.rgb * (0.35 + n_dot_l * (1.0 - material.metalness)) + f0 * specular * 0.25;

    let view_distance = length(camera.position.xyz - in.world_position);
    let fog_d = material.fog_density * view_distance;
    let fog = 1.0 - exp(-fog_d * fog_d);
    color = mix(color, material.fog_color, fog);
    return vec4<f32>(color, diffuse_color.a);
}
"#;

/// Depth-only override used by the cloud pre-pass. Writes clip depth to an R32Float target.
pub const DEPTH_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(4) model_0: vec4<f32>,
    @location(5) model_1: vec4<f32>,
    @location(6) model_2: vec4<f32>,
    @location(7) model_3: vec4<f32>,
};

@vertex
fn vs_main(v: VertexInput, inst: InstanceInput) -> @builtin(position) vec4<f32> {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    return camera.view_proj * model * vec4<f32>(v.position, 1.0);
}

@fragment
fn fs_main(@builtin(position) clip_position: vec4<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(clip_position.z, 0.0, 0.0, 1.0);
}
"#;

/// Prefix the shared camera block onto a program body.
pub fn with_camera(body: &str) -> String {
    let mut source = String::with_capacity(CAMERA_BLOCK.len() + body.len());
    source.push_str(CAMERA_BLOCK);
    source.push_str(body);
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use effects::homespace::{default_fills, homespace_fills};
    use effects::{HookPoint, ShaderComposer};

    #[test]
    fn lit_program_declares_every_hook() {
        let hooks = ShaderComposer::hooks(LIT_SHADER).unwrap();
        assert_eq!(hooks, vec![HookPoint::PreMain, HookPoint::Declarations, HookPoint::MapSample]);
    }

    #[test]
    fn homespace_and_default_fills_compose() {
        let patched = ShaderComposer::compose(LIT_SHADER, &homespace_fills()).unwrap();
        assert!(patched.contains("fn wrap_ramp_nl"));
        assert!(patched.contains("out.normal_raw = model_normal;"));
        assert!(!patched.contains("//@hook:"));

        let plain = ShaderComposer::compose(LIT_SHADER, &default_fills()).unwrap();
        assert!(!plain.contains("wrap_ramp_nl"));
        assert!(plain.contains("textureSample(t_map, s_map, in.uv)"));
    }

    #[test]
    fn programs_have_entry_points() {
        for src in [CLOUD_SHADER, FOG_SHADER, TREE_SHADER, LIT_SHADER, DEPTH_SHADER] {
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
        }
    }

    #[test]
    fn camera_block_is_prepended() {
        let src = with_camera(DEPTH_SHADER);
        assert!(src.starts_with("\nstruct Camera"));
        assert!(src.contains("var<uniform> camera: Camera;"));
    }
}
