use common::WeightedMesh;
use glam::Vec3A;

/// Area weighted centre of a vertex group, `None` when the group carries no weighted area.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCentroid {
    pub name: String,
    pub centroid: Option<Vec3A>,
}

/// Area of a polygon from the length of its Newell normal. Exact for planar polygons.
pub fn polygon_area(points: &[Vec3A]) -> f32 {
    let mut normal = Vec3A::ZERO;

    for (i, &a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        normal += a.cross(b);
    }

    normal.length() / 2.0
}

/// Area of every face shared evenly between its corners, summed per vertex.
pub fn vertex_influence_area(mesh: &WeightedMesh) -> Vec<f32> {
    let mut area = vec![0.0; mesh.verts.len()];
    let mut corners = Vec::new();

    for face in &mesh.faces {
        corners.clear();
        corners.extend(
            face.verts
                .iter()
                .filter_map(|&v| mesh.verts.get(v as usize))
                .map(|v| v.local_pos()),
        );

        // Skip faces with missing vertices instead of guessing at their area
        if corners.len() != face.verts.len() || corners.is_empty() {
            continue;
        }

        let per_vert = polygon_area(&corners) / corners.len() as f32;

        for &v in &face.verts {
            area[v as usize] += per_vert;
        }
    }

    area
}

/// World space centroid of every group, in group order.
pub fn group_centroids(mesh: &WeightedMesh) -> Vec<GroupCentroid> {
    let area = vertex_influence_area(mesh);
    let world = mesh.world_matrix();

    let mut sums = vec![(Vec3A::ZERO, 0.0f32); mesh.groups.len()];

    for (vert, a) in mesh.verts.iter().zip(&area) {
        let pos = world.transform_point3a(vert.local_pos());

        for w in &vert.groups {
            if let Some((position_sum, total)) = sums.get_mut(w.group as usize) {
                let weighted_area = a * w.weight;
                *position_sum += weighted_area * pos;
                *total += weighted_area;
            }
        }
    }

    mesh.groups
        .iter()
        .zip(sums)
        .map(|(group, (position_sum, total))| {
            let centroid = if total > 0.0 {
                let c = position_sum / total;
                log::debug!("Centroid for {}: {}", group.name, c);
                Some(c)
            } else {
                log::debug!("No weighted centroid for {}", group.name);
                None
            };

            GroupCentroid {
                name: group.name.clone(),
                centroid,
            }
        })
        .collect()
}
