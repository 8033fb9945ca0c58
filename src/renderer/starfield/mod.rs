use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{const_vec3, vec2, Mat4, Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::{
    entity::Scene,
    renderer::{CameraExt, TransformExt},
    starfield::ParticleField,
    texture::SpriteImage,
    window::Size,
};

const QUAD_VERTICES: [Vec3; 4] = [
    const_vec3!([-0.5, -0.5, 0.]),
    const_vec3!([-0.5, 0.5, 0.]),
    const_vec3!([0.5, -0.5, 0.]),
    const_vec3!([0.5, 0.5, 0.]),
];
const QUAD_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct Uniforms {
    mv_mat: Mat4,
    p_mat: Mat4,
    particle_size: f32,
    size_attenuation: f32,
    viewport: Vec2,
}

/// With attenuation the sprite is sized in view space. Scaling by `tan(fov / 2)`
/// makes a sprite at depth `d` cover `point_size * (height / 2) / d` pixels.
fn particle_size(particle_field: &ParticleField, fov_degrees: f32) -> f32 {
    if particle_field.size_attenuation {
        particle_field.point_size * (fov_degrees.to_radians() * 0.5).tan()
    } else {
        particle_field.point_size
    }
}

impl Uniforms {
    fn new(scene: &Scene, viewport: Size) -> Self {
        let Scene {
            camera,
            particle_field,
            ..
        } = scene;

        Self {
            mv_mat: camera.view_matrix() * particle_field.transform.model_matrix(),
            p_mat: camera.proj_matrix(),
            particle_size: particle_size(particle_field, camera.fov),
            size_attenuation: if particle_field.size_attenuation { 1. } else { 0. },
            viewport: vec2(viewport.width as f32, viewport.height as f32),
        }
    }
}

fn instances(particle_field: &ParticleField) -> Vec<Vec4> {
    particle_field.points().map(|p| p.extend(1.)).collect()
}

pub struct StarfieldRenderer {
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    _instance_buffer: wgpu::Buffer,
    _sprite_texture: wgpu::Texture,
    instance_count: u32,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
}

impl StarfieldRenderer {
    pub fn update(&self, queue: &wgpu::Queue, scene: &Scene, viewport: Size) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytes_of(&Uniforms::new(scene, viewport)),
        );
    }

    pub fn draw<'rpass>(&'rpass self, rpass: &mut impl wgpu::util::RenderEncoder<'rpass>) {
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..(QUAD_INDICES.len() as _), 0, 0..self.instance_count);
    }
}

pub struct StarfieldRendererBuilder<'a> {
    particle_field: &'a ParticleField,
    sprite: &'a SpriteImage,
    color_format: Option<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
}

impl<'a> StarfieldRendererBuilder<'a> {
    pub fn new(particle_field: &'a ParticleField, sprite: &'a SpriteImage) -> Self {
        Self {
            particle_field,
            sprite,
            color_format: None,
            depth_format: None,
        }
    }

    pub fn color_target_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_format = Some(format);
        self
    }

    pub fn depth_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn build(self, device: &wgpu::Device, queue: &wgpu::Queue) -> StarfieldRenderer {
        let color_format = self.color_format.unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let depth_format = self
            .depth_format
            .unwrap_or(super::render_target::DEPTH_TEXTURE_FORMAT);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Vertex Buffer"),
            contents: bytes_of(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Index Buffer"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_data = instances(self.particle_field);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Starfield Instance Buffer"),
            contents: cast_slice(instance_data.as_slice()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let instance_count = instance_data.len() as u32;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Starfield Uniform Buffer"),
            size: size_of::<Uniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sprite_texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Star Sprite Texture"),
                size: wgpu::Extent3d {
                    width: self.sprite.width,
                    height: self.sprite.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
            },
            &self.sprite.rgba,
        );
        let sprite_view = sprite_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sprite_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Star Sprite Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Starfield Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<Vec4>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<Uniforms>() as _),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Starfield Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&sprite_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sprite_sampler),
                },
            ],
        });

        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("starfield.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Starfield Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: size_of::<Vec3>() as _,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                }],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            // Sprites are translucent: test against the model but do not occlude each other.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        StarfieldRenderer {
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            _instance_buffer: instance_buffer,
            _sprite_texture: sprite_texture,
            instance_count,
            bind_group,
            render_pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Settings,
        entity::{Camera, Lights},
    };

    fn scene(size_attenuation: bool) -> Scene {
        let mut settings = Settings::default();
        settings.star_field.size_attenuation = size_attenuation;
        Scene::new(
            Camera::new(&settings.camera, Size::new(800, 600)),
            Lights::new(&settings.lights),
            ParticleField::with_positions(&settings.star_field, vec![1., 2., 3., -4., -5., -6.]),
        )
    }

    #[test]
    fn uniforms_match_gpu_layout() {
        assert_eq!(size_of::<Uniforms>(), 144);
        assert_eq!(size_of::<Uniforms>() % 16, 0);
    }

    #[test]
    fn uniforms_carry_sprite_settings() {
        let uniforms = Uniforms::new(&scene(true), Size::new(800, 600));
        assert_eq!(uniforms.size_attenuation, 1.);
        assert_eq!(uniforms.viewport, vec2(800., 600.));

        let uniforms = Uniforms::new(&scene(false), Size::new(800, 600));
        assert_eq!(uniforms.size_attenuation, 0.);
        assert_eq!(uniforms.particle_size, 0.5);
    }

    #[test]
    fn attenuated_sprite_covers_size_times_half_height_over_depth_pixels() {
        let scene = scene(true);
        let viewport = Size::new(800, 600);
        let uniforms = Uniforms::new(&scene, viewport);

        // Sprite centred on the origin, three units in front of the camera.
        let center = scene.camera.view_matrix() * Vec4::W;
        let depth = -center.z;
        let half = Vec4::new(0., uniforms.particle_size * 0.5, 0., 0.);
        let top = uniforms.p_mat * (center + half);
        let bottom = uniforms.p_mat * (center - half);
        let ndc_height = top.y / top.w - bottom.y / bottom.w;
        let pixels = ndc_height * viewport.height as f32 * 0.5;

        let expected = 0.5 * (viewport.height as f32 * 0.5) / depth;
        assert!((depth - 3.).abs() < 1e-5);
        assert!((pixels - expected).abs() < 1e-3, "{} != {}", pixels, expected);
    }

    #[test]
    fn instances_are_homogeneous_points() {
        let instances = instances(&scene(true).particle_field);
        assert_eq!(
            instances,
            vec![Vec4::new(1., 2., 3., 1.), Vec4::new(-4., -5., -6., 1.)]
        );
    }
}
