use common::{make_names_unique, Face, WeightedMesh};

/// Rules turning a material name into an object name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameCleanup {
    /// Removed wherever they appear
    pub strip_tokens: Vec<String>,
}

impl Default for NameCleanup {
    fn default() -> Self {
        Self {
            strip_tokens: vec!["mat_".to_owned(), "Diffuse".to_owned()],
        }
    }
}

impl NameCleanup {
    pub fn apply(&self, name: &str) -> String {
        let mut name = name.to_owned();
        for token in self.strip_tokens.iter().filter(|t| !t.is_empty()) {
            name = name.replace(token.as_str(), "");
        }
        name.trim().to_owned()
    }
}

/// Split a mesh into one mesh per material slot in use, named after the material.
/// Parts whose cleaned names collide get a numbered suffix.
pub fn separate_by_material(mesh: &WeightedMesh, cleanup: &NameCleanup) -> Vec<WeightedMesh> {
    let slot_count = mesh
        .faces
        .iter()
        .map(|f| f.material as usize + 1)
        .max()
        .unwrap_or(0);

    let mut parts = Vec::new();

    for slot in 0..slot_count {
        let faces: Vec<&Face> = mesh
            .faces
            .iter()
            .filter(|f| f.material as usize == slot)
            .collect();

        if faces.is_empty() {
            continue;
        }

        let mut remap = vec![None; mesh.verts.len()];
        for &v in faces.iter().flat_map(|f| f.verts.iter()) {
            if let Some(r) = remap.get_mut(v as usize) {
                *r = Some(0);
            }
        }

        let mut part = WeightedMesh::new(String::new());

        for (old, new) in remap.iter_mut().enumerate() {
            if new.is_some() {
                *new = Some(part.verts.len() as u32);
                part.verts.push(mesh.verts[old].clone());
            }
        }

        part.faces = faces
            .iter()
            .filter_map(|f| {
                let verts = f
                    .verts
                    .iter()
                    .map(|&v| remap.get(v as usize).copied().flatten())
                    .collect::<Option<Vec<_>>>()?;
                Some(Face::new(verts))
            })
            .collect();

        let material = mesh.materials.get(slot).cloned();
        let cleaned = material
            .as_deref()
            .map(|m| cleanup.apply(m))
            .unwrap_or_default();

        part.name = if cleaned.is_empty() {
            format!("{}.{slot}", mesh.name)
        } else {
            cleaned
        };
        part.materials = material.into_iter().collect();
        part.groups = mesh.groups.clone();
        part.transform = mesh.transform;
        part.properties = mesh.properties.clone();

        log::info!(
            "Separated {} with {} faces from {}",
            part.name,
            part.face_count(),
            mesh.name
        );

        parts.push(part);
    }

    make_names_unique(&mut parts);

    parts
}
