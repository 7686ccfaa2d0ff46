//! Decoding of image and glTF bytes into CPU-side texture and mesh data.

use glam::{Mat4, Vec3};
use procgen::TextureData;

use crate::error::{RenderError, Result};
use crate::mesh::MeshData;
use crate::vertex::Vertex;

/// One glTF primitive with its node's world transform baked out separately.
#[derive(Debug, Clone)]
pub struct GltfMesh {
    pub data: MeshData,
    pub transform: Mat4,
    pub base_color: Option<TextureData>,
}

/// Decode PNG or JPEG bytes to RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<TextureData> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    TextureData::from_rgba8(width, height, rgba.as_raw()).ok_or(RenderError::EmptyImage)
}

fn image_to_texture(data: &gltf::image::Data) -> Option<TextureData> {
    use gltf::image::Format;
    let bytes = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        other => {
            log::warn!("Unsupported glTF image format {:?}, skipping texture", other);
            return None;
        }
    };
    TextureData::from_rgba8(data.width, data.height, &bytes)
}

/// Load every mesh primitive reachable from the default scene.
pub fn load_gltf(bytes: &[u8]) -> Result<Vec<GltfMesh>> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    let mut out = Vec::new();
    if let Some(scene) = scene {
        for node in scene.nodes() {
            visit_node(&node, Mat4::IDENTITY, &buffers, &images, &mut out)?;
        }
    }
    log::info!("Loaded glTF with {} primitives", out.len());
    Ok(out)
}

fn visit_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    out: &mut Vec<GltfMesh>,
) -> Result<()> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let name = node
            .name()
            .or_else(|| mesh.name())
            .unwrap_or("mesh")
            .to_string();
        for primitive in mesh.primitives() {
            let data = read_primitive(&name, &primitive, buffers)?;
            let base_color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_texture()
                .and_then(|info| images.get(info.texture().source().index()))
                .and_then(image_to_texture);
            out.push(GltfMesh {
                data,
                transform,
                base_color,
            });
        }
    }
    for child in node.children() {
        visit_node(&child, transform, buffers, images, out)?;
    }
    Ok(())
}

fn read_primitive(name: &str, primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| RenderError::MissingAttribute {
            mesh: name.to_string(),
            attribute: "POSITION",
        })?
        .collect();
    let count = positions.len();
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(n) => n.collect(),
        None => vec![Vec3::Y.to_array(); count],
    };
    let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
        Some(t) => t.into_f32().collect(),
        None => vec![[0.0; 2]; count],
    };
    let colors: Vec<[f32; 4]> = match reader.read_colors(0) {
        Some(c) => c.into_rgba_f32().collect(),
        None => vec![[1.0; 4]; count],
    };
    let indices: Vec<u32> = match reader.read_indices() {
        Some(i) => i.into_u32().collect(),
        None => (0..count as u32).collect(),
    };

    let mut data = MeshData::new(name);
    data.vertices = (0..count)
        .map(|i| {
            Vertex::with_color(
                positions[i],
                normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uvs.get(i).copied().unwrap_or([0.0; 2]),
                colors.get(i).copied().unwrap_or([1.0; 4]),
            )
        })
        .collect();
    data.indices = indices;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "glass", "mesh": 0, "translation": [0.0, 5.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    #[test]
    fn loads_unindexed_triangle_with_node_transform() {
        let meshes = load_gltf(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.data.name, "glass");
        assert_eq!(mesh.data.vertices.len(), 3);
        assert_eq!(mesh.data.indices, vec![0, 1, 2]);
        assert_eq!(mesh.data.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.data.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.transform.w_axis.y, 5.0);
        assert!(mesh.base_color.is_none());
    }

    #[test]
    fn rejects_garbage_image() {
        assert!(decode_image(&[0, 1, 2, 3]).is_err());
    }

    #[test]
    fn decodes_png() {
        let mut png = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let data = decode_image(&png).unwrap();
        assert_eq!((data.width, data.height), (2, 3));
        assert_eq!(data.get_pixel(1, 2).g, 20);
    }
}
