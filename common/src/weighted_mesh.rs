use std::collections::{BTreeMap, HashSet};

use bincode::{Decode, Encode};
use glam::{Mat4, Quat, Vec3, Vec3A, Vec4};

use crate::asset::Asset;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MeshError {
    #[error("Face {0} references missing vertex {1}")]
    InvalidFaceVertex(usize, u32),
    #[error("Face {0} has {1} corners, at least 3 are required")]
    DegenerateFace(usize, usize),
    #[error("Face {0} uses material slot {1}, but the mesh has {2} slots")]
    InvalidMaterial(usize, u32, usize),
    #[error("Vertex {0} references missing group {1}")]
    InvalidGroup(usize, u32),
    #[error("Transform is not finite or its rotation is not normalized: {0:?}")]
    InvalidTransform(ObjectTransform),
}

/// Membership of a vertex in one group.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct VertexWeight {
    pub group: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Encode, Decode)]
pub struct Vertex {
    /// Local space position
    pub pos: [f32; 3],
    pub groups: Vec<VertexWeight>,
}

impl Vertex {
    pub fn new(pos: [f32; 3]) -> Self {
        Self {
            pos,
            groups: Vec::new(),
        }
    }

    pub fn weight(&self, group: u32) -> Option<f32> {
        self.groups
            .iter()
            .find(|w| w.group == group)
            .map(|w| w.weight)
    }

    pub fn local_pos(&self) -> Vec3A {
        Vec3A::from_array(self.pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct VertexGroup {
    pub name: String,
}

impl VertexGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Polygon with any number of corners, wound in order.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Face {
    pub verts: Vec<u32>,
    pub material: u32,
}

impl Face {
    pub fn new(verts: Vec<u32>) -> Self {
        Self { verts, material: 0 }
    }

    pub fn with_material(verts: Vec<u32>, material: u32) -> Self {
        Self { verts, material }
    }
}

/// Location, rotation and scale of an object, composing its local to world matrix.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct ObjectTransform {
    pub location: [f32; 3],
    /// Quaternion, `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: Quat::IDENTITY.to_array(),
            scale: [1.0; 3],
        }
    }
}

impl ObjectTransform {
    pub fn from_matrix(matrix: Mat4) -> Self {
        let det = matrix.determinant();

        // Singular matrices (zero scale hides a node) have no rotation to recover
        if det == 0.0 || !det.is_finite() {
            return Self {
                location: matrix.w_axis.truncate().to_array(),
                rotation: Quat::IDENTITY.to_array(),
                scale: [
                    matrix.x_axis.truncate().length(),
                    matrix.y_axis.truncate().length(),
                    matrix.z_axis.truncate().length(),
                ],
            };
        }

        let (scale, rot, pos) = matrix.to_scale_rotation_translation();

        Self {
            location: pos.to_array(),
            rotation: rot.to_array(),
            scale: scale.to_array(),
        }
    }

    /// Rotation as a unit quaternion, identity when the stored value cannot be normalized
    pub fn get_rot(&self) -> Quat {
        Vec4::from_array(self.rotation)
            .try_normalize()
            .map_or(Quat::IDENTITY, Quat::from_vec4)
    }

    pub fn reset_rotation(&mut self) {
        self.rotation = Quat::IDENTITY.to_array();
    }

    pub fn is_valid(&self) -> bool {
        self.location.iter().chain(&self.scale).all(|v| v.is_finite())
            && Quat::from_array(self.rotation).is_normalized()
    }

    pub fn get_local_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            self.get_rot(),
            Vec3::from_array(self.location),
        )
    }
}

/// Custom value attached to an object.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Property {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A mesh object with named vertex groups, the unit everything in this workspace operates on.
#[derive(Debug, Clone, PartialEq, Default, Encode, Decode)]
pub struct WeightedMesh {
    pub name: String,
    pub transform: ObjectTransform,
    pub verts: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub groups: Vec<VertexGroup>,
    /// Material slot names, indexed by [`Face::material`]
    pub materials: Vec<String>,
    pub properties: BTreeMap<String, Property>,
}

impl Asset for WeightedMesh {}

impl WeightedMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.get_local_to_world()
    }

    pub fn vert_count(&self) -> usize {
        self.verts.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn add_group(&mut self, name: impl Into<String>) -> u32 {
        self.groups.push(VertexGroup::new(name));
        (self.groups.len() - 1) as u32
    }

    /// Set the weight of `vert` in `group`, replacing any previous membership.
    pub fn set_weight(&mut self, vert: usize, group: u32, weight: f32) {
        let groups = &mut self.verts[vert].groups;

        match groups.iter_mut().find(|w| w.group == group) {
            Some(w) => w.weight = weight,
            None => groups.push(VertexWeight { group, weight }),
        }
    }

    /// Number of vertices that reference `group`, regardless of weight
    pub fn group_member_count(&self, group: u32) -> usize {
        self.verts
            .iter()
            .filter(|v| v.groups.iter().any(|w| w.group == group))
            .count()
    }

    /// Reorder or drop groups. `remap[old]` is the new index of a kept group.
    /// Weights referencing dropped groups are removed.
    pub fn remap_groups(&mut self, groups: Vec<VertexGroup>, remap: &[Option<u32>]) {
        self.groups = groups;

        for v in &mut self.verts {
            v.groups.retain_mut(|w| {
                match remap.get(w.group as usize).copied().flatten() {
                    Some(g) => {
                        w.group = g;
                        true
                    }
                    None => false,
                }
            });
        }
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if !self.transform.is_valid() {
            return Err(MeshError::InvalidTransform(self.transform));
        }

        for (i, face) in self.faces.iter().enumerate() {
            if face.verts.len() < 3 {
                return Err(MeshError::DegenerateFace(i, face.verts.len()));
            }
            if let Some(&v) = face.verts.iter().find(|&&v| v as usize >= self.verts.len()) {
                return Err(MeshError::InvalidFaceVertex(i, v));
            }
            if !self.materials.is_empty() && face.material as usize >= self.materials.len() {
                return Err(MeshError::InvalidMaterial(
                    i,
                    face.material,
                    self.materials.len(),
                ));
            }
        }

        for (i, vert) in self.verts.iter().enumerate() {
            if let Some(w) = vert
                .groups
                .iter()
                .find(|w| w.group as usize >= self.groups.len())
            {
                return Err(MeshError::InvalidGroup(i, w.group));
            }
        }

        Ok(())
    }
}

/// Give repeated names a `.001`, `.002`, ... suffix, skipping names already in use.
/// The first mesh with a name keeps it.
pub fn make_names_unique(meshes: &mut [WeightedMesh]) {
    let mut taken: HashSet<String> = meshes.iter().map(|m| m.name.clone()).collect();
    let mut seen = HashSet::new();

    for mesh in meshes.iter_mut() {
        if seen.insert(mesh.name.clone()) {
            continue;
        }

        let mut i = 1;
        let name = loop {
            let candidate = format!("{}.{i:03}", mesh.name);
            if !taken.contains(&candidate) {
                break candidate;
            }
            i += 1;
        };

        log::debug!("Renamed duplicate {} to {name}", mesh.name);

        taken.insert(name.clone());
        seen.insert(name.clone());
        mesh.name = name;
    }
}
