use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    entity::Scene,
    frame_loop::FrameRenderer,
    model::Model,
    renderer::{
        model::ModelRenderer,
        render_target::RenderTarget,
        starfield::{StarfieldRenderer, StarfieldRendererBuilder},
    },
    texture::SpriteImage,
    window::Size,
};

pub struct Renderer {
    surface: wgpu::Surface,
    surface_format: wgpu::TextureFormat,
    surface_size: Size,
    device: wgpu::Device,
    queue: wgpu::Queue,
    depth: RenderTarget,
    starfield_renderer: StarfieldRenderer,
    model_renderer: Option<ModelRenderer>,
}

impl Renderer {
    pub async fn new(
        window: &winit::window::Window,
        size: Size,
        scene: &Scene,
        sprite: &SpriteImage,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No adapter found")?;
        info!("Using adapter: {:?}", adapter.get_info());

        let surface_format = surface
            .get_preferred_format(&adapter)
            .context("No preferred format found")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("No device found")?;

        Self::configure_surface(&surface, &device, surface_format, size);

        let depth = RenderTarget::depth(&device, size);

        let starfield_renderer = StarfieldRendererBuilder::new(&scene.particle_field, sprite)
            .color_target_format(surface_format)
            .depth_format(depth.format)
            .build(&device, &queue);

        let mut renderer = Self {
            surface,
            surface_format,
            surface_size: size,
            device,
            queue,
            depth,
            starfield_renderer,
            model_renderer: None,
        };
        if let Some(model) = scene.model.model() {
            renderer.upload_model(model);
        }
        Ok(renderer)
    }

    fn configure_surface(
        surface: &wgpu::Surface,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: Size,
    ) {
        surface.configure(
            device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.width.max(1),
                height: size.height.max(1),
                present_mode: wgpu::PresentMode::Fifo,
            },
        )
    }

    /// Resizes the drawable surface. The camera projection is left alone.
    pub fn resize(&mut self, size: Size) {
        if size.width == 0 || size.height == 0 || size == self.surface_size {
            return;
        }
        self.surface_size = size;
        Self::configure_surface(&self.surface, &self.device, self.surface_format, size);
        if self.depth.size != size {
            self.depth = RenderTarget::depth(&self.device, size);
        }
    }

    pub fn upload_model(&mut self, model: &Model) {
        info!(
            "Uploading model: {} vertices, {} indices",
            model.vertex_count(),
            model.index_count()
        );
        self.model_renderer = Some(ModelRenderer::new(
            &self.device,
            model,
            self.surface_format,
            self.depth.format,
        ));
    }
}

impl FrameRenderer for Renderer {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                warn!("Surface {:?}, reconfiguring", e);
                Self::configure_surface(
                    &self.surface,
                    &self.device,
                    self.surface_format,
                    self.surface_size,
                );
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring surface texture, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to get next surface texture"),
        };

        let model = scene.model.model();

        self.starfield_renderer
            .update(&self.queue, scene, self.surface_size);
        if let (Some(model_renderer), Some(model)) = (&self.model_renderer, model) {
            model_renderer.update(&self.queue, &scene.camera, &scene.lights, model);
        }

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Command Encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                }],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: false,
                    }),
                    stencil_ops: None,
                }),
            });
            if let (Some(model_renderer), Some(_)) = (&self.model_renderer, model) {
                model_renderer.draw(&mut rpass);
            }
            self.starfield_renderer.draw(&mut rpass);
        }

        self.queue.submit(Some(encoder.finish()));

        surface_texture.present();

        Ok(())
    }
}
