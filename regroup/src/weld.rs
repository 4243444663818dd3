use common::{Face, VertexWeight, WeightedMesh};
use kdtree::{distance::squared_euclidean, KdTree};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WeldError {
    #[error("Merge distance {0} must be finite and not negative")]
    InvalidDistance(f32),
    #[error("Vertex {0} has a non finite position")]
    NonFinite(usize),
}

/// Counts from one [`merge_by_distance`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WeldReport {
    /// Vertices folded into an earlier vertex
    pub merged: usize,
    /// Faces left with fewer than three corners
    pub collapsed_faces: usize,
    /// Vertices no face uses any more
    pub loose: usize,
}

/// Fold every vertex into the first earlier vertex within `distance` of it, then delete
/// collapsed faces and vertices no face uses.
///
/// The kept vertex stays where it is. Its weights become the mean of the weights of
/// every vertex folded into it.
pub fn merge_by_distance(mesh: &mut WeightedMesh, distance: f32) -> Result<WeldReport, WeldError> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(WeldError::InvalidDistance(distance));
    }

    let mut tree = KdTree::new(3);
    for (i, v) in mesh.verts.iter().enumerate() {
        // Dimensions always match, so the only failure is a bad coordinate
        tree.add(v.pos, i).map_err(|_| WeldError::NonFinite(i))?;
    }

    let radius = distance * distance;
    let mut root: Vec<Option<u32>> = vec![None; mesh.verts.len()];

    for i in 0..mesh.verts.len() {
        if root[i].is_some() {
            continue;
        }
        root[i] = Some(i as u32);

        let near = tree
            .within(&mesh.verts[i].pos, radius, &squared_euclidean)
            .map_err(|_| WeldError::NonFinite(i))?;

        for (_, &j) in near {
            if root[j].is_none() {
                root[j] = Some(i as u32);
            }
        }
    }

    let mut report = WeldReport {
        merged: root
            .iter()
            .enumerate()
            .filter(|&(i, r)| *r != Some(i as u32))
            .count(),
        ..Default::default()
    };

    average_weights(mesh, &root);

    let face_count = mesh.faces.len();
    mesh.faces = mesh
        .faces
        .iter()
        .filter_map(|f| {
            let mut verts: Vec<u32> = Vec::with_capacity(f.verts.len());
            for &v in &f.verts {
                let v = root.get(v as usize).copied().flatten()?;
                if verts.last() != Some(&v) {
                    verts.push(v);
                }
            }
            if verts.len() > 1 && verts.first() == verts.last() {
                verts.pop();
            }

            let mut unique = verts.clone();
            unique.sort_unstable();
            unique.dedup();

            (unique.len() >= 3 && unique.len() == verts.len())
                .then(|| Face::with_material(verts, f.material))
        })
        .collect();
    report.collapsed_faces = face_count - mesh.faces.len();

    report.loose = delete_loose(mesh) - report.merged;

    log::info!(
        "Welded {}: {} merged, {} faces collapsed, {} loose removed",
        mesh.name,
        report.merged,
        report.collapsed_faces,
        report.loose
    );

    Ok(report)
}

fn average_weights(mesh: &mut WeightedMesh, root: &[Option<u32>]) {
    let mut members = vec![0u32; mesh.verts.len()];
    let mut sums: Vec<Vec<VertexWeight>> = vec![Vec::new(); mesh.verts.len()];

    for (i, v) in mesh.verts.iter().enumerate() {
        let Some(r) = root[i] else { continue };
        let r = r as usize;
        members[r] += 1;

        for w in &v.groups {
            match sums[r].iter_mut().find(|s| s.group == w.group) {
                Some(s) => s.weight += w.weight,
                None => sums[r].push(*w),
            }
        }
    }

    for (i, (v, mut sum)) in mesh.verts.iter_mut().zip(sums).enumerate() {
        if members[i] > 1 {
            for w in &mut sum {
                w.weight /= members[i] as f32;
            }
            v.groups = sum;
        }
    }
}

/// Drop vertices no face references, returning how many went.
fn delete_loose(mesh: &mut WeightedMesh) -> usize {
    let mut remap = vec![None; mesh.verts.len()];
    for &v in mesh.faces.iter().flat_map(|f| f.verts.iter()) {
        remap[v as usize] = Some(0);
    }

    let before = mesh.verts.len();
    let mut verts = Vec::new();
    for (old, new) in remap.iter_mut().enumerate() {
        if new.is_some() {
            *new = Some(verts.len() as u32);
            verts.push(mesh.verts[old].clone());
        }
    }
    mesh.verts = verts;

    for f in &mut mesh.faces {
        for v in &mut f.verts {
            // Every face corner was marked above
            *v = remap[*v as usize].unwrap_or(*v);
        }
    }

    before - mesh.verts.len()
}

#[cfg(test)]
mod tests {
    use common::Vertex;

    use super::*;

    /// Two triangles on a shared edge, split so the edge is duplicated
    fn split_quad() -> WeightedMesh {
        let mut mesh = WeightedMesh::new("Split");
        mesh.verts = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0001],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]
        .into_iter()
        .map(Vertex::new)
        .collect();
        mesh.faces = vec![
            Face::new(vec![0, 1, 2]),
            Face::with_material(vec![3, 4, 5], 1),
        ];
        let a = mesh.add_group("A");
        let b = mesh.add_group("B");
        mesh.set_weight(1, a, 1.0);
        mesh.set_weight(3, b, 0.5);
        mesh
    }

    #[test]
    fn test_merge_split_edge() {
        let mut mesh = split_quad();

        let report = merge_by_distance(&mut mesh, 0.001).unwrap();

        assert_eq!(
            report,
            WeldReport {
                merged: 2,
                collapsed_faces: 0,
                loose: 0
            }
        );
        assert_eq!(mesh.vert_count(), 4);
        assert_eq!(mesh.faces[0], Face::new(vec![0, 1, 2]));
        assert_eq!(mesh.faces[1], Face::with_material(vec![1, 3, 2], 1));

        assert_eq!(mesh.verts[1].pos, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.verts[1].weight(0), Some(0.5));
        assert_eq!(mesh.verts[1].weight(1), Some(0.25));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_merge_outside_distance() {
        let mut mesh = split_quad();

        let report = merge_by_distance(&mut mesh, 0.00001).unwrap();

        assert_eq!(report.merged, 1);
        assert_eq!(mesh.vert_count(), 5);
        assert_eq!(mesh.verts[1].weight(0), Some(1.0));
    }

    #[test]
    fn test_collapsed_face_and_loose() {
        let mut mesh = split_quad();
        mesh.verts.push(Vertex::new([5.0, 5.0, 5.0]));
        mesh.verts[2].pos = [1.0, 0.0, 0.0];

        let report = merge_by_distance(&mut mesh, 0.001).unwrap();

        assert_eq!(report.merged, 2);
        assert_eq!(report.collapsed_faces, 1);
        // The origin and the stray vertex
        assert_eq!(report.loose, 2);
        assert_eq!(mesh.vert_count(), 3);
        assert_eq!(mesh.faces, vec![Face::with_material(vec![0, 1, 2], 1)]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_merge_invalid() {
        let mut mesh = split_quad();
        assert_eq!(
            merge_by_distance(&mut mesh, -1.0),
            Err(WeldError::InvalidDistance(-1.0))
        );

        mesh.verts[4].pos[0] = f32::NAN;
        assert_eq!(
            merge_by_distance(&mut mesh, 0.001),
            Err(WeldError::NonFinite(4))
        );
    }
}
