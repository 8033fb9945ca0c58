//! glTF model import.
//!
//! Meshes are flattened: node hierarchy transforms are baked into vertex
//! positions and normals, and the material base colour (optionally modulated
//! by its texture) is stored per vertex. The root [`Transform`] stays separate
//! so the scene can place and scale the model as a whole.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use glam::{Mat3, Mat4, Vec2, Vec3};
use log::{debug, info};

use crate::entity::Transform;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to import glTF: {0}")]
    Import(#[from] gltf::Error),

    #[error("Missing position data for mesh: {0}")]
    MissingPositions(String),

    #[error("glTF contains no renderable meshes")]
    Empty,

    #[error("glTF import panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub transform: Transform,
    pub meshes: Vec<Mesh>,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self {
            transform: Transform::default(),
            meshes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let (document, buffers, images) = gltf::import(path.as_ref())?;
        let model = Self::from_document(&document, &buffers, &images)?;
        info!(
            "Loaded model {}: {} meshes, {} vertices",
            path.as_ref().display(),
            model.meshes.len(),
            model.vertex_count()
        );
        Ok(model)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, ModelError> {
        let (document, buffers, images) = gltf::import_slice(data)?;
        Self::from_document(&document, &buffers, &images)
    }

    fn from_document(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> Result<Self, ModelError> {
        let mut meshes = Vec::new();

        let scenes: Vec<_> = match document.default_scene() {
            Some(scene) => vec![scene],
            None => document.scenes().collect(),
        };
        for scene in scenes {
            for node in scene.nodes() {
                process_node(&node, Mat4::IDENTITY, buffers, images, &mut meshes)?;
            }
        }

        if meshes.is_empty() {
            return Err(ModelError::Empty);
        }
        Ok(Self::new(meshes))
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }
}

fn process_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    meshes: &mut Vec<Mesh>,
) -> Result<(), ModelError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed").to_owned();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                debug!("Skipping non-triangle primitive in {}", name);
                continue;
            }
            meshes.push(read_primitive(&name, &primitive, world, buffers, images)?);
        }
    }

    for child in node.children() {
        process_node(&child, world, buffers, images, meshes)?;
    }

    Ok(())
}

fn read_primitive(
    name: &str,
    primitive: &gltf::Primitive,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<Mesh, ModelError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| ModelError::MissingPositions(name.to_owned()))?
        .map(|p| world.transform_point3(Vec3::from(p)))
        .collect();

    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(normals) => normals
            .map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero())
            .collect(),
        None => vec![Vec3::Y; positions.len()],
    };

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let pbr = primitive.material().pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let factor = Vec3::new(r, g, b);

    let texture = pbr.base_color_texture().and_then(|info| {
        let image = images.get(info.texture().source().index())?;
        let uvs = reader.read_tex_coords(info.tex_coord())?.into_f32();
        Some((image, uvs))
    });

    let colors = match texture {
        Some((image, uvs)) => uvs
            .map(|uv| factor * sample_image(image, Vec2::from(uv)).unwrap_or(Vec3::ONE))
            .collect(),
        None => vec![factor; positions.len()],
    };

    Ok(Mesh {
        name: name.to_owned(),
        positions,
        normals,
        colors,
        indices,
    })
}

/// Nearest-texel lookup with repeat wrapping. Returns `None` for pixel formats
/// other than 8-bit RGB and RGBA.
fn sample_image(image: &gltf::image::Data, uv: Vec2) -> Option<Vec3> {
    let channels = match image.format {
        gltf::image::Format::R8G8B8 => 3,
        gltf::image::Format::R8G8B8A8 => 4,
        _ => return None,
    };
    if image.width == 0 || image.height == 0 {
        return None;
    }

    let u = uv.x - uv.x.floor();
    let v = uv.y - uv.y.floor();
    let x = ((u * image.width as f32) as u32).min(image.width - 1);
    let y = ((v * image.height as f32) as u32).min(image.height - 1);
    let offset = ((y * image.width + x) * channels) as usize;

    let texel = image.pixels.get(offset..offset + 3)?;
    Some(Vec3::new(texel[0] as f32, texel[1] as f32, texel[2] as f32) / 255.)
}

/// Runs `import`, turning a panic into [`ModelError::Panicked`].
fn catch_import_panic(
    import: impl FnOnce() -> Result<Model, ModelError>,
) -> Result<Model, ModelError> {
    panic::catch_unwind(AssertUnwindSafe(import)).unwrap_or_else(|payload| {
        Err(ModelError::Panicked(panic_message(&*payload)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Imports models on a tokio blocking task.
pub struct ModelLoader {
    handle: tokio::runtime::Handle,
}

impl ModelLoader {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// `on_complete` runs exactly once, on a runtime thread.
    pub fn load<F>(&self, path: impl Into<PathBuf>, on_complete: F)
    where
        F: FnOnce(Result<Model, ModelError>) + Send + 'static,
    {
        let path = path.into();
        info!("Loading model from {}", path.display());
        self.handle.spawn_blocking(move || {
            on_complete(catch_import_panic(|| Model::from_path(&path)))
        });
    }
}
