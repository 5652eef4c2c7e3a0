//! Wavefront OBJ decoding for the model-loading collaborator.

use std::{collections::HashMap, io::BufReader};

use crate::{error::LoadError, render::scene::RawMesh};

/// Decodes an OBJ file and its optional MTL library into triangulated meshes,
/// one per object. Positions are taken as already being in the local frame.
pub fn parse_obj(obj: &[u8], mtl: Option<&[u8]>) -> Result<Vec<RawMesh>, LoadError> {
    let mut reader = BufReader::new(obj);
    let (models, materials) =
        tobj::load_obj_buf(&mut reader, &tobj::GPU_LOAD_OPTIONS, |_| match mtl {
            Some(bytes) => tobj::load_mtl_buf(&mut BufReader::new(bytes)),
            None => Ok((vec![], HashMap::new())),
        })?;

    let materials = materials.unwrap_or_else(|err| {
        leptos::logging::warn!("ignoring material library: {}", err);
        vec![]
    });

    let meshes: Vec<RawMesh> = models
        .into_iter()
        .filter(|model| !model.mesh.indices.is_empty())
        .map(|model| {
            let color = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .and_then(|material| material.diffuse)
                .map(|d| [d[0] as f32, d[1] as f32, d[2] as f32]);
            RawMesh {
                name: model.name,
                positions: model.mesh.positions,
                indices: model.mesh.indices,
                color,
            }
        })
        .collect();

    if meshes.is_empty() {
        return Err(LoadError::EmptyModel);
    }
    leptos::logging::log!("decoded {} meshes", meshes.len());
    Ok(meshes)
}
