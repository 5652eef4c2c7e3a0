use super::{render::Renderer, scene::SceneMesh};

use cgmath::{InnerSpace, Vector3};
use wgpu::{util::DeviceExt, BindGroup, Buffer, RenderPass, RenderPipeline};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u32 {
        const DIRTY_NONE = 0b00000000;
        const DIRTY_VERTEX = 0b00000001;
        const DIRTY_MATERIAL = 0b00000010;
        const DIRTY_ALL = Self::DIRTY_VERTEX.bits() | Self::DIRTY_MATERIAL.bits();
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub point: [f32; 3],
    pub normal: [f32; 3],
    pub barycentric: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    pub(crate) fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Per-mesh shading state, including the clip planes the fragment stage
/// tests against.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: [f32; 4],
    pub edge_color: [f32; 4],
    pub edge_width: f32,
    pub clip_planes: [[f32; 4]; 6],
}

impl Material {
    pub fn new(color: [f32; 3]) -> Self {
        Self {
            color: [color[0], color[1], color[2], 1.0],
            edge_color: [0.0, 0.0, 0.0, 1.0],
            edge_width: 0.0,
            // a plane nothing can fail
            clip_planes: [[0.0, 0.0, 0.0, 1.0]; 6],
        }
    }

    fn uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: self.color,
            edge_color: self.edge_color,
            clip_planes: self.clip_planes,
            edge_width: self.edge_width,
            _pad: [0.0; 3],
        }
    }
}

// uniform buffers need 16 byte multiples on webgl
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    color: [f32; 4],
    edge_color: [f32; 4],
    clip_planes: [[f32; 4]; 6],
    edge_width: f32,
    _pad: [f32; 3],
}

pub(crate) struct MeshBuffers {
    vertex_buffer: Buffer,
    material_buffer: Buffer,
    material_bind_group: BindGroup,
}

/// GPU-side copy of one scene mesh.
pub(crate) struct ViewData {
    vertices: Vec<Vertex>,
    pub(crate) material: Material,
    pub(crate) visible: bool,
    pub(crate) dirty: DirtyFlags,
    pub(crate) buffers: Option<MeshBuffers>,
}

/// Unrolls indexed triangles into flat-shaded vertices carrying barycentric
/// coordinates for edge drawing.
fn unroll(mesh: &SceneMesh) -> Vec<Vertex> {
    mesh.triangles()
        .flat_map(|tri| {
            let verts = tri.map(|p| Vector3::new(p.x as f32, p.y as f32, p.z as f32));
            let normal = (verts[1] - verts[0]).cross(verts[2] - verts[0]);
            let normal = if normal.magnitude2() > 0.0 {
                normal.normalize()
            } else {
                Vector3::new(0.0, 1.0, 0.0)
            };
            [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ]
            .into_iter()
            .zip(verts)
            .map(move |(barycentric, point)| Vertex {
                point: point.into(),
                normal: normal.into(),
                barycentric,
            })
        })
        .collect()
}

impl ViewData {
    pub(crate) fn from_mesh(mesh: &SceneMesh, clip_planes: [[f32; 4]; 6]) -> Self {
        let mut material = Material::new(mesh.color);
        material.clip_planes = clip_planes;
        Self {
            vertices: unroll(mesh),
            material,
            visible: mesh.visible,
            dirty: DirtyFlags::DIRTY_ALL,
            buffers: None,
        }
    }

    #[inline]
    pub(crate) fn n_vertices(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_clip_planes(&mut self, clip_planes: [[f32; 4]; 6]) {
        self.material.clip_planes = clip_planes;
        self.dirty.insert(DirtyFlags::DIRTY_MATERIAL);
    }

    pub(crate) fn init_resources(
        &mut self,
        render: &Renderer,
        material_bind_group_layout: &wgpu::BindGroupLayout,
    ) {
        let vertex_buffer = render
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex_buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let material_buffer = render
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("material_buffer"),
                contents: bytemuck::cast_slice(&[self.material.uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let material_bind_group = render.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: material_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
            label: Some("material_bind_group"),
        });

        self.buffers = Some(MeshBuffers {
            vertex_buffer,
            material_buffer,
            material_bind_group,
        });
        self.dirty = DirtyFlags::DIRTY_NONE;
    }

    #[inline]
    pub(crate) fn update_vertex_buffer(&mut self, render: &Renderer) {
        if let Some(buffers) = self.buffers.as_ref() {
            render.queue.write_buffer(
                &buffers.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.vertices),
            );
        }
    }

    #[inline]
    pub(crate) fn update_material(&mut self, render: &Renderer) {
        if let Some(buffers) = self.buffers.as_ref() {
            render.queue.write_buffer(
                &buffers.material_buffer,
                0,
                bytemuck::cast_slice(&[self.material.uniform()]),
            );
        }
    }

    pub(crate) fn render(&self, render_pass: &mut RenderPass<'_>, pipeline: &RenderPipeline) {
        let Some(buffers) = self.buffers.as_ref() else {
            return;
        };
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(1, &buffers.material_bind_group, &[]);
        render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        render_pass.draw(0..self.n_vertices(), 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> SceneMesh {
        SceneMesh::new(
            "quad",
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2, 0, 2, 3],
            [0.2, 0.4, 0.6],
        )
    }

    #[test]
    fn material_uniform_is_padded_to_16_bytes() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 144);
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn triangles_are_unrolled_with_face_normals() {
        let data = ViewData::from_mesh(&quad(), [[0.0; 4]; 6]);
        assert_eq!(data.n_vertices(), 6);
        assert!(data.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(data.vertices[1].barycentric, [0.0, 1.0, 0.0]);
        assert_eq!(data.vertices[2].point, [1.0, 1.0, 0.0]);
        assert_eq!(data.material.color, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(data.dirty, DirtyFlags::DIRTY_ALL);
    }

    #[test]
    fn clip_updates_mark_the_material_dirty() {
        let mut data = ViewData::from_mesh(&quad(), [[0.0; 4]; 6]);
        data.dirty = DirtyFlags::DIRTY_NONE;
        let planes = [[0.0, 1.0, 0.0, 5.0]; 6];
        data.set_clip_planes(planes);
        assert!(data.dirty.contains(DirtyFlags::DIRTY_MATERIAL));
        assert!(!data.dirty.contains(DirtyFlags::DIRTY_VERTEX));
        assert_eq!(data.material.uniform().clip_planes, planes);
    }
}
