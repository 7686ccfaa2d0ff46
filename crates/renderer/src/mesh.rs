//! Mesh data structures and primitive generation.

use crate::vertex::Vertex;
use wgpu::util::DeviceExt;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Mesh data before GPU upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }

    /// Square grid in the XY plane facing +Z, `segments` quads per side.
    /// UV (0,0) is the top-left corner.
    pub fn plane_grid(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let half = size / 2.0;
        let step = size / segments as f32;
        let row = segments + 1;

        let mut mesh = Self::new("plane");
        mesh.vertices.reserve((row * row) as usize);
        for iy in 0..=segments {
            let y = half - iy as f32 * step;
            for ix in 0..=segments {
                let x = ix as f32 * step - half;
                let uv = [ix as f32 / segments as f32, iy as f32 / segments as f32];
                mesh.vertices.push(Vertex::new([x, y, 0.0], [0.0, 0.0, 1.0], uv));
            }
        }

        mesh.indices.reserve((segments * segments * 6) as usize);
        for iy in 0..segments {
            for ix in 0..segments {
                let a = iy * row + ix;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        mesh
    }

    /// Billboard quad (XY plane, facing +Z). The fog program turns it toward the camera.
    pub fn billboard_quad(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::new("billboard");
        mesh.vertices = vec![
            Vertex::new([-half, -half, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            Vertex::new([half, -half, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([half, half, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([-half, half, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        mesh.indices = vec![0, 1, 2, 2, 3, 0];
        mesh
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Index of an uploaded mesh in a [`MeshLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Owns every uploaded mesh.
#[derive(Default)]
pub struct MeshLibrary {
    meshes: Vec<Mesh>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() as u32 - 1)
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_grid_counts_and_extent() {
        let mesh = MeshData::plane_grid(2500.0, 4);
        assert_eq!(mesh.vertices.len(), 25);
        assert_eq!(mesh.indices.len(), 4 * 4 * 6);
        assert_eq!(mesh.vertices[0].position, [-1250.0, 1250.0, 0.0]);
        assert_eq!(mesh.vertices[24].position, [1250.0, -1250.0, 0.0]);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn plane_grid_winds_toward_plus_z() {
        let mesh = MeshData::plane_grid(2.0, 1);
        let p = |i: u32| glam::Vec3::from(mesh.vertices[i as usize].position);
        let (a, b, c) = (p(mesh.indices[0]), p(mesh.indices[1]), p(mesh.indices[2]));
        let n = (b - a).cross(c - a);
        assert!(n.z > 0.0);
    }

    #[test]
    fn billboard_is_centered() {
        let mesh = MeshData::billboard_quad(100.0);
        let sum: glam::Vec3 = mesh.vertices.iter().map(|v| glam::Vec3::from(v.position)).sum();
        assert_eq!(sum, glam::Vec3::ZERO);
        assert_eq!(mesh.indices.len(), 6);
    }
}
