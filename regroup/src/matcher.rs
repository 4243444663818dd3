//! Renames the vertex groups of one mesh after the geometrically closest groups of another.
//!
//! Matching happens in two steps: [`plan_matches`] only reads both meshes, and
//! [`MatchPlan::apply`] writes every name at once through [`GroupNames`].

use common::WeightedMesh;
use glam::Vec3A;

use crate::centroid::{group_centroids, GroupCentroid};

/// Name given to target groups without a match.
pub const DEFAULT_PLACEHOLDER: &str = "unknown";

/// Anything whose vertex groups can be renamed by index.
pub trait GroupNames {
    fn group_count(&self) -> usize;
    fn rename_group(&mut self, index: usize, name: &str);
}

impl GroupNames for WeightedMesh {
    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn rename_group(&mut self, index: usize, name: &str) {
        if let Some(group) = self.groups.get_mut(index) {
            group.name.clear();
            group.name.push_str(name);
        }
    }
}

/// Source group whose centroid is nearest to `target`. Ties go to the first group.
pub fn find_nearest_group(source: &[GroupCentroid], target: Vec3A) -> Option<&str> {
    let mut best = None;
    let mut best_distance = f32::INFINITY;

    for group in source {
        let Some(centroid) = group.centroid else {
            continue;
        };

        let distance = centroid.distance(target);

        if distance < best_distance {
            best_distance = distance;
            best = Some(group.name.as_str());
        }
    }

    best
}

/// New names for every group of a target mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPlan {
    pub placeholder: String,
    /// Indexed by target group, `None` for groups left as the placeholder
    pub matches: Vec<Option<String>>,
}

impl MatchPlan {
    pub fn name_for(&self, group: usize) -> &str {
        self.matches
            .get(group)
            .and_then(|m| m.as_deref())
            .unwrap_or(&self.placeholder)
    }

    pub fn matched_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_some()).count()
    }

    /// Rename every group of `target`. Groups beyond the plan receive the placeholder.
    pub fn apply<T: GroupNames + ?Sized>(&self, target: &mut T) {
        for i in 0..target.group_count() {
            let name = self.name_for(i);
            target.rename_group(i, name);

            if self.matches.get(i).is_some_and(|m| m.is_some()) {
                log::info!("Target group {i} renamed to {name}");
            }
        }
    }
}

pub fn plan_matches(source: &WeightedMesh, target: &WeightedMesh, placeholder: &str) -> MatchPlan {
    let source_centroids = group_centroids(source);
    let target_centroids = group_centroids(target);

    let matches = target_centroids
        .iter()
        .map(|group| {
            group
                .centroid
                .and_then(|c| find_nearest_group(&source_centroids, c))
                .map(str::to_owned)
        })
        .collect();

    MatchPlan {
        placeholder: placeholder.to_owned(),
        matches,
    }
}

/// Rename every group of `target` after its nearest group in `source`, or
/// [`DEFAULT_PLACEHOLDER`] when it has none. The previous target names are lost.
pub fn match_vertex_groups(source: &WeightedMesh, target: &mut WeightedMesh) -> MatchPlan {
    let plan = plan_matches(source, target, DEFAULT_PLACEHOLDER);
    plan.apply(target);
    plan
}

#[cfg(test)]
mod tests {
    use common::{Face, Vertex};

    use super::*;

    /// Add a triangle centred on `center` weighted to `group`.
    fn add_blob(mesh: &mut WeightedMesh, center: Vec3A, group: &str, weight: f32) {
        let g = match mesh.group_index(group) {
            Some(g) => g as u32,
            None => mesh.add_group(group),
        };
        let first = mesh.verts.len() as u32;

        for offset in [
            Vec3A::new(1.0, 0.0, 0.0),
            Vec3A::new(-0.5, 0.5, 0.0),
            Vec3A::new(-0.5, -0.5, 0.0),
        ] {
            mesh.verts.push(Vertex::new((center + offset).to_array()));
            let v = mesh.verts.len() - 1;
            mesh.set_weight(v, g, weight);
        }

        mesh.faces
            .push(Face::new(vec![first, first + 1, first + 2]));
    }

    fn head_and_body() -> WeightedMesh {
        let mut source = WeightedMesh::new("Source");
        add_blob(&mut source, Vec3A::Z, "Head", 1.0);
        add_blob(&mut source, -Vec3A::Z, "Body", 1.0);
        source
    }

    fn centroid(name: &str, c: Option<Vec3A>) -> GroupCentroid {
        GroupCentroid {
            name: name.to_owned(),
            centroid: c,
        }
    }

    #[test]
    fn test_nearest_group() {
        let source = [
            centroid("Head", Some(Vec3A::Z)),
            centroid("Body", Some(-Vec3A::Z)),
        ];

        assert_eq!(find_nearest_group(&source, Vec3A::Z * 0.9), Some("Head"));
        assert_eq!(find_nearest_group(&source, -Vec3A::Z * 0.2), Some("Body"));
    }

    #[test]
    fn test_nearest_group_tie_takes_first() {
        let source = [
            centroid("Left", Some(-Vec3A::X)),
            centroid("Right", Some(Vec3A::X)),
        ];
        assert_eq!(find_nearest_group(&source, Vec3A::ZERO), Some("Left"));

        let source = [
            centroid("Right", Some(Vec3A::X)),
            centroid("Left", Some(-Vec3A::X)),
        ];
        assert_eq!(find_nearest_group(&source, Vec3A::ZERO), Some("Right"));
    }

    #[test]
    fn test_nearest_group_skips_undefined() {
        let source = [centroid("Empty", None), centroid("Far", Some(Vec3A::X * 100.0))];
        assert_eq!(find_nearest_group(&source, Vec3A::ZERO), Some("Far"));

        assert_eq!(find_nearest_group(&[centroid("Empty", None)], Vec3A::ZERO), None);
        assert_eq!(find_nearest_group(&[], Vec3A::ZERO), None);
    }

    #[test]
    fn test_head_matched() {
        let source = head_and_body();
        let mut target = WeightedMesh::new("Target");
        add_blob(&mut target, Vec3A::Z * 0.9, "7", 1.0);

        let plan = match_vertex_groups(&source, &mut target);

        assert_eq!(target.groups[0].name, "Head");
        assert_eq!(plan.matched_count(), 1);
    }

    #[test]
    fn test_duplicate_target_names() {
        let source = head_and_body();
        let mut target = WeightedMesh::new("Target");
        add_blob(&mut target, Vec3A::Z * 0.9, "a", 1.0);
        add_blob(&mut target, -Vec3A::Z * 0.9, "b", 1.0);
        for group in &mut target.groups {
            group.name = "x".to_owned();
        }

        let plan = match_vertex_groups(&source, &mut target);

        let names: Vec<_> = target.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Head", "Body"]);
        assert_eq!(plan.matched_count(), 2);
    }

    #[test]
    fn test_zero_weight_stays_unknown() {
        let source = head_and_body();
        let mut target = WeightedMesh::new("Target");
        add_blob(&mut target, Vec3A::Z, "3", 0.0);
        add_blob(&mut target, -Vec3A::Z, "4", 1.0);
        target.add_group("5");

        match_vertex_groups(&source, &mut target);

        let names: Vec<_> = target.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["unknown", "Body", "unknown"]);
    }

    #[test]
    fn test_empty_source_leaves_placeholders() {
        let mut target = head_and_body();

        let plan = match_vertex_groups(&WeightedMesh::new("Empty"), &mut target);

        assert_eq!(plan.matched_count(), 0);
        assert!(target.groups.iter().all(|g| g.name == DEFAULT_PLACEHOLDER));
    }

    #[test]
    fn test_rerun_on_unchanged_meshes() {
        let source = head_and_body();
        let mut target = WeightedMesh::new("Target");
        add_blob(&mut target, Vec3A::Z * 1.1, "a", 1.0);
        add_blob(&mut target, -Vec3A::Z * 0.8, "b", 0.5);

        match_vertex_groups(&source, &mut target);
        let first = target.clone();
        match_vertex_groups(&source, &mut target);

        assert_eq!(first, target);
    }

    #[test]
    fn test_plan_does_not_touch_target() {
        let source = head_and_body();
        let mut target = WeightedMesh::new("Target");
        add_blob(&mut target, Vec3A::Z, "a", 1.0);
        let before = target.clone();

        let plan = plan_matches(&source, &target, "missing");

        assert_eq!(before, target);
        assert_eq!(plan.name_for(0), "Head");
        assert_eq!(plan.name_for(1), "missing");
    }

    struct Names(Vec<String>);

    impl GroupNames for Names {
        fn group_count(&self) -> usize {
            self.0.len()
        }

        fn rename_group(&mut self, index: usize, name: &str) {
            self.0[index] = name.to_owned();
        }
    }

    #[test]
    fn test_apply_to_other_targets() {
        let plan = MatchPlan {
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            matches: vec![Some("Head".to_owned()), None],
        };
        let mut names = Names(vec!["0".to_owned(), "1".to_owned(), "2".to_owned()]);

        plan.apply(&mut names);

        assert_eq!(names.0, ["Head", "unknown", "unknown"]);
    }
}
