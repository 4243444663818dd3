use std::{collections::HashMap, path::Path};

use glam::Mat4;
use gltf::mesh::{util::ReadIndices, Mode};

use crate::{make_names_unique, Face, ObjectTransform, Vertex, VertexGroup, VertexWeight, WeightedMesh};

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Gltf(#[from] gltf::Error),
    #[error("File contains no scene")]
    NoScene,
    #[error("Primitive {1} of mesh {0} has no positions")]
    MissingPositions(String, usize),
    #[error("Primitive {1} of mesh {0} uses unsupported mode {2:?}")]
    UnsupportedMode(String, usize, Mode),
    #[error("Primitive {1} of mesh {0} indexes past its {2} vertices")]
    InvalidIndex(String, usize, usize),
}

impl WeightedMesh {
    /// Load every mesh instance in the default scene of a glTF file.
    /// Repeated node names get a numbered suffix.
    pub fn from_gltf(path: impl AsRef<Path>) -> Result<Vec<Self>, ImportError> {
        let (doc, buffers, _) = gltf::import(path)?;

        let scene = doc
            .default_scene()
            .or_else(|| doc.scenes().next())
            .ok_or(ImportError::NoScene)?;

        let mut meshes = Vec::new();

        for node in scene.nodes() {
            visit_node(&node, Mat4::IDENTITY, &buffers, &mut meshes)?;
        }

        make_names_unique(&mut meshes);

        log::info!("Imported {} meshes", meshes.len());

        Ok(meshes)
    }
}

fn visit_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<WeightedMesh>,
) -> Result<(), ImportError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        meshes.push(read_mesh(node, &mesh, world, buffers)?);
    }

    for child in node.children() {
        visit_node(&child, world, buffers, meshes)?;
    }

    Ok(())
}

fn read_mesh(
    node: &gltf::Node,
    mesh: &gltf::Mesh,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
) -> Result<WeightedMesh, ImportError> {
    let name = node
        .name()
        .or(mesh.name())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Mesh.{}", mesh.index()));

    let mut out = WeightedMesh::new(name.clone());
    out.transform = ObjectTransform::from_matrix(world);

    // Groups named after skin joints, or by joint index when there is no skin
    let joint_names: Option<Vec<String>> = node.skin().map(|skin| {
        skin.joints()
            .map(|j| {
                j.name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| j.index().to_string())
            })
            .collect()
    });

    let mut material_slots = HashMap::new();
    let mut max_joint = None;

    for p in mesh.primitives() {
        if p.mode() != Mode::Triangles {
            return Err(ImportError::UnsupportedMode(name, p.index(), p.mode()));
        }

        let reader = p.reader(|buffer| Some(&buffers[buffer.index()]));

        let offset = out.verts.len();
        let positions = reader
            .read_positions()
            .ok_or_else(|| ImportError::MissingPositions(name.clone(), p.index()))?;
        out.verts.extend(positions.map(Vertex::new));
        let count = out.verts.len() - offset;

        let mut set = 0;
        while let (Some(joints), Some(weights)) = (reader.read_joints(set), reader.read_weights(set)) {
            for (i, (j, w)) in joints.into_u16().zip(weights.into_f32()).enumerate().take(count) {
                let vert = &mut out.verts[offset + i];
                for (&joint, &weight) in j.iter().zip(w.iter()) {
                    if weight > 0.0 {
                        max_joint = max_joint.max(Some(joint as u32));
                        vert.groups.push(VertexWeight {
                            group: joint as u32,
                            weight,
                        });
                    }
                }
            }
            set += 1;
        }

        let material = p.material();
        let next_slot = material_slots.len() as u32;
        let slot = *material_slots
            .entry(material.index())
            .or_insert_with(|| {
                out.materials.push(match (material.name(), material.index()) {
                    (Some(name), _) => name.to_owned(),
                    (None, Some(i)) => format!("Material.{i}"),
                    (None, None) => "Default".to_owned(),
                });
                next_slot
            });

        let indices: Vec<u32> = match reader.read_indices() {
            Some(ReadIndices::U8(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U16(iter)) => iter.map(|i| i as _).collect(),
            Some(ReadIndices::U32(iter)) => iter.collect(),
            None => (0..count as u32).collect(),
        };

        for tri in indices.chunks_exact(3) {
            if tri.iter().any(|&i| i as usize >= count) {
                return Err(ImportError::InvalidIndex(name, p.index(), count));
            }
            out.faces.push(Face::with_material(
                tri.iter().map(|&i| i + offset as u32).collect(),
                slot,
            ));
        }
    }

    let group_count = match (&joint_names, max_joint) {
        (Some(names), Some(max)) => names.len().max(max as usize + 1),
        (Some(names), None) => names.len(),
        (None, Some(max)) => max as usize + 1,
        (None, None) => 0,
    };

    out.groups = (0..group_count)
        .map(|i| {
            let name = joint_names
                .as_ref()
                .and_then(|names| names.get(i).cloned())
                .unwrap_or_else(|| i.to_string());
            VertexGroup::new(name)
        })
        .collect();

    log::debug!(
        "Read mesh {} with {} verts, {} faces, {} groups",
        out.name,
        out.vert_count(),
        out.face_count(),
        out.groups.len()
    );

    Ok(out)
}
