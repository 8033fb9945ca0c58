use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::{
    entity::{Camera, Lights},
    model::Model,
    renderer::{CameraExt, TransformExt},
};

#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as _,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct Uniforms {
    view_proj: Mat4,
    model: Mat4,
    normal_mat: Mat4,
    ambient: Vec4,
    light_position: Vec4,
    light_color: Vec4,
}

impl Uniforms {
    fn new(camera: &Camera, lights: &Lights, model: &Model) -> Self {
        let model_mat = model.transform.model_matrix();
        Self {
            view_proj: camera.proj_matrix() * camera.view_matrix(),
            model: model_mat,
            normal_mat: model_mat.inverse().transpose(),
            ambient: (lights.ambient.color * lights.ambient.intensity).extend(1.),
            light_position: lights.point.position.extend(1.),
            light_color: (lights.point.color * lights.point.intensity).extend(1.),
        }
    }
}

/// Concatenates every mesh into one vertex and one index list.
fn flatten(model: &Model) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(model.vertex_count());
    let mut indices = Vec::with_capacity(model.index_count());

    for mesh in &model.meshes {
        let base = vertices.len() as u32;
        vertices.extend(
            mesh.positions
                .iter()
                .zip(&mesh.normals)
                .zip(&mesh.colors)
                .map(|((p, n), c)| Vertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                    color: c.to_array(),
                }),
        );
        indices.extend(mesh.indices.iter().map(|i| base + i));
    }

    (vertices, indices)
}

pub struct ModelRenderer {
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
}

impl ModelRenderer {
    pub fn new(
        device: &wgpu::Device,
        model: &Model,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let (vertices, indices) = flatten(model);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: cast_slice(vertices.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Index Buffer"),
            contents: cast_slice(indices.as_slice()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniform Buffer"),
            size: size_of::<Uniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size_of::<Uniforms>() as _),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("model.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Model Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[color_format.into()],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            bind_group,
            render_pipeline,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, lights: &Lights, model: &Model) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytes_of(&Uniforms::new(camera, lights, model)),
        );
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{config::Settings, entity::Transform, model::Mesh, window::Size};

    fn triangle(name: &str, color: Vec3) -> Mesh {
        Mesh {
            name: name.to_owned(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            colors: vec![color; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn flatten_offsets_indices_per_mesh() {
        let model = Model::new(vec![triangle("a", Vec3::X), triangle("b", Vec3::Y)]);
        let (vertices, indices) = flatten(&model);

        assert_eq!(vertices.len(), 6);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(vertices[3].color, [0., 1., 0.]);
    }

    #[test]
    fn uniforms_scale_light_colors_by_intensity() {
        let settings = Settings::default();
        let camera = Camera::new(&settings.camera, Size::new(800, 600));
        let lights = Lights::new(&settings.lights);
        let mut model = Model::new(vec![triangle("a", Vec3::ONE)]);
        model.transform = Transform {
            scale: Vec3::splat(0.0014),
            ..Default::default()
        };

        let uniforms = Uniforms::new(&camera, &lights, &model);

        assert_eq!(uniforms.ambient, Vec4::new(2., 2., 2., 1.));
        assert_eq!(uniforms.light_color, Vec4::new(2., 2., 2., 1.));
        assert_eq!(uniforms.light_position, Vec4::new(0., 0., 0., 1.));
        assert!(uniforms
            .model
            .transform_point3(Vec3::X)
            .abs_diff_eq(Vec3::new(0.0014, 0., 0.), 1e-7));
    }

    #[test]
    fn uniforms_match_gpu_layout() {
        assert_eq!(size_of::<Uniforms>(), 240);
        assert_eq!(size_of::<Vertex>(), 36);
    }
}
