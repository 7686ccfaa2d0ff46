//! Environment-lit material patch for the homespace model.
//!
//! The base lit program declares named extension points as `//@hook:<name>`
//! marker lines. [`ShaderComposer`] fills them at build time; a stage that
//! does not declare a hook cannot be patched through it, and a declared hook
//! must be filled (possibly with an empty snippet).

use std::collections::HashMap;

use glam::{Vec3, Vec4};

use crate::error::{EffectError, Result};
use crate::math::{smoothstep, smoothstep3};

const MARKER: &str = "//@hook:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// First statements of the vertex entry point.
    PreMain,
    /// Module-scope items ahead of the fragment entry point.
    Declarations,
    /// Replaces the diffuse map sample in the fragment stage.
    MapSample,
}

impl HookPoint {
    pub const ALL: [HookPoint; 3] = [HookPoint::PreMain, HookPoint::Declarations, HookPoint::MapSample];

    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::PreMain => "pre_main",
            HookPoint::Declarations => "declarations",
            HookPoint::MapSample => "map_sample",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }
}

pub struct ShaderComposer;

impl ShaderComposer {
    /// Hooks declared by `source`, in order of appearance.
    pub fn hooks(source: &str) -> Result<Vec<HookPoint>> {
        let mut found = Vec::new();
        for line in source.lines() {
            if let Some(name) = marker_name(line) {
                let hook = HookPoint::from_name(name)
                    .ok_or_else(|| EffectError::UnknownHook(name.to_string()))?;
                if found.contains(&hook) {
                    return Err(EffectError::DuplicateHook(name.to_string()));
                }
                found.push(hook);
            }
        }
        Ok(found)
    }

    /// Replace every marker line in `source` with its snippet, indented like the marker.
    pub fn compose(source: &str, fills: &[(HookPoint, &str)]) -> Result<String> {
        let declared = Self::hooks(source)?;
        let mut snippets: HashMap<HookPoint, &str> = HashMap::new();
        for &(hook, snippet) in fills {
            if !declared.contains(&hook) {
                return Err(EffectError::UnknownHook(hook.name().to_string()));
            }
            if snippets.insert(hook, snippet).is_some() {
                return Err(EffectError::DuplicateHook(hook.name().to_string()));
            }
        }
        if let Some(missing) = declared.iter().find(|h| !snippets.contains_key(h)) {
            return Err(EffectError::UnfilledHook(missing.name().to_string()));
        }

        let mut out = String::with_capacity(source.len());
        for line in source.lines() {
            match marker_name(line).and_then(HookPoint::from_name) {
                Some(hook) => {
                    let indent = &line[..line.len() - line.trim_start().len()];
                    for snippet_line in snippets[&hook].lines() {
                        if snippet_line.trim().is_empty() {
                            out.push('\n');
                        } else {
                            out.push_str(indent);
                            out.push_str(snippet_line.trim_start());
                            out.push('\n');
                        }
                    }
                }
                None => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }
}

fn marker_name(line: &str) -> Option<&str> {
    line.trim().strip_prefix(MARKER).map(str::trim)
}

/// Smoothstep window of width `smoothness` centred on `threshold`.
#[inline]
pub fn wrap_ramp_nl(nl: f32, threshold: f32, smoothness: f32) -> f32 {
    smoothstep(threshold - smoothness * 0.5, threshold + smoothness * 0.5, nl)
}

/// Map sample after the homespace patch: contrast curve, then a wrapped
/// lambert against the raw (unnormalised) light position.
pub fn homespace_map_color(sampled: Vec4, light_pos: Vec3, normal: Vec3) -> Vec4 {
    let n = normal.normalize_or_zero();
    let lambert = wrap_ramp_nl(light_pos.dot(n).max(0.0), 0.1, 0.8);
    let rgb = smoothstep3(0.01, 1.0, sampled.truncate()) * lambert * 1.5;
    rgb.extend(sampled.w)
}

/// PBR factors forced onto named parts of the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialOverride {
    pub roughness: f32,
    pub metalness: f32,
}

pub const GLASS_OVERRIDE: MaterialOverride = MaterialOverride {
    roughness: 0.1,
    metalness: 0.9,
};

/// Fully rough dielectric, the untouched standard material.
impl Default for MaterialOverride {
    fn default() -> Self {
        Self {
            roughness: 1.0,
            metalness: 0.0,
        }
    }
}

impl MaterialOverride {
    pub fn for_mesh(name: &str) -> Option<Self> {
        (name == "glass").then_some(GLASS_OVERRIDE)
    }
}

/// Snippets that turn the base lit program into the homespace material.
pub fn homespace_fills() -> [(HookPoint, &'static str); 3] {
    [
        (HookPoint::PreMain, "out.normal_raw = model_normal;"),
        (
            HookPoint::Declarations,
            "fn wrap_ramp_nl(nl: f32, threshold: f32, smoothness: f32) -> f32 {\n\
             return smoothstep(threshold - smoothness * 0.5, threshold + smoothness * 0.5, nl);\n\
             }",
        ),
        (
            HookPoint::MapSample,
            "var sampled = textureSample(t_map, s_map, in.uv);\n\
             sampled = vec4<f32>(smoothstep(vec3<f32>(0.01), vec3<f32>(1.0), sampled.rgb), sampled.a);\n\
             let lambert = wrap_ramp_nl(max(0.0, dot(material.light_pos, normalize(in.normal_raw))), 0.1, 0.8);\n\
             sampled = vec4<f32>(sampled.rgb * lambert * 1.5, sampled.a);\n\
             diffuse_color = diffuse_color * sampled;",
        ),
    ]
}

/// Unpatched fills: plain map multiply.
pub fn default_fills() -> [(HookPoint, &'static str); 3] {
    [
        (HookPoint::PreMain, ""),
        (HookPoint::Declarations, ""),
        (
            HookPoint::MapSample,
            "diffuse_color = diffuse_color * textureSample(t_map, s_map, in.uv);",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: &str = "\
//@hook:declarations
fn vs() {
    //@hook:pre_main
    let x = 1;
}
fn fs() {
    //@hook:map_sample
}
";

    #[test]
    fn lists_declared_hooks_in_order() {
        assert_eq!(
            ShaderComposer::hooks(STAGE).unwrap(),
            vec![HookPoint::Declarations, HookPoint::PreMain, HookPoint::MapSample]
        );
    }

    #[test]
    fn fills_markers_with_indentation() {
        let out = ShaderComposer::compose(
            STAGE,
            &[
                (HookPoint::Declarations, "const A: f32 = 1.0;"),
                (HookPoint::PreMain, "a();\nb();"),
                (HookPoint::MapSample, ""),
            ],
        )
        .unwrap();
        assert!(out.starts_with("const A: f32 = 1.0;\nfn vs() {\n    a();\n    b();\n    let x = 1;"));
        assert!(!out.contains(MARKER));
    }

    #[test]
    fn unfilled_hook_is_an_error() {
        let err = ShaderComposer::compose(STAGE, &[(HookPoint::PreMain, "")]).unwrap_err();
        assert_eq!(err, EffectError::UnfilledHook("declarations".into()));
    }

    #[test]
    fn filling_an_undeclared_hook_is_an_error() {
        let src = "fn main() {\n//@hook:pre_main\n}\n";
        let err = ShaderComposer::compose(src, &[(HookPoint::PreMain, ""), (HookPoint::MapSample, "")])
            .unwrap_err();
        assert_eq!(err, EffectError::UnknownHook("map_sample".into()));
    }

    #[test]
    fn unknown_marker_and_duplicates_are_errors() {
        assert_eq!(
            ShaderComposer::hooks("//@hook:after_main\n").unwrap_err(),
            EffectError::UnknownHook("after_main".into())
        );
        assert_eq!(
            ShaderComposer::hooks("//@hook:pre_main\n//@hook:pre_main\n").unwrap_err(),
            EffectError::DuplicateHook("pre_main".into())
        );
        let src = "//@hook:pre_main\n";
        assert_eq!(
            ShaderComposer::compose(src, &[(HookPoint::PreMain, ""), (HookPoint::PreMain, "")]).unwrap_err(),
            EffectError::DuplicateHook("pre_main".into())
        );
    }

    #[test]
    fn text_resembling_a_hook_is_left_alone() {
        let src = "let s = \"void main() {\";\n";
        assert_eq!(ShaderComposer::compose(src, &[]).unwrap(), src);
    }

    #[test]
    fn wrap_ramp_window() {
        assert_eq!(wrap_ramp_nl(-0.3, 0.1, 0.8), 0.0);
        assert_eq!(wrap_ramp_nl(0.5, 0.1, 0.8), 1.0);
        assert!((wrap_ramp_nl(0.1, 0.1, 0.8) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn map_color_wraps_past_the_terminator() {
        let light = Vec3::new(0.0, 10.0, 0.0);
        let away = homespace_map_color(Vec4::ONE, light, -Vec3::Y);
        let floor = smoothstep(-0.3, 0.5, 0.0) * 1.5;
        assert!((away.x - floor).abs() < 1e-6);
        assert_eq!(away.w, 1.0);
        let facing = homespace_map_color(Vec4::ONE, light, Vec3::Y);
        assert!((facing.truncate() - Vec3::splat(1.5)).length() < 1e-6);
        assert!(away.x < facing.x);
    }

    #[test]
    fn glass_override_by_name() {
        assert_eq!(MaterialOverride::for_mesh("glass"), Some(GLASS_OVERRIDE));
        assert_eq!(MaterialOverride::for_mesh("wall"), None);
    }
}
