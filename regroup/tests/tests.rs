#![cfg(test)]
use common::{Face, Vertex, WeightedMesh};
use glam::Vec3A;
use regroup::{
    groups::{fill_groups, merge_groups, remove_unused_groups, MergeMode},
    match_vertex_groups, matcher::DEFAULT_PLACEHOLDER,
    separate::{separate_by_material, NameCleanup},
};

const SKINNED_TRIANGLE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../common/tests/data/skinned_triangle.gltf"
);

/// Add a triangle centred on `center`, fully weighted to `group`, using material `material`.
fn add_blob(mesh: &mut WeightedMesh, center: Vec3A, group: &str, material: u32) {
    let g = match mesh.group_index(group) {
        Some(g) => g as u32,
        None => mesh.add_group(group),
    };
    let first = mesh.verts.len() as u32;

    for offset in [
        Vec3A::new(0.1, 0.0, 0.0),
        Vec3A::new(-0.05, 0.05, 0.0),
        Vec3A::new(-0.05, -0.05, 0.0),
    ] {
        mesh.verts.push(Vertex::new((center + offset).to_array()));
        let v = mesh.verts.len() - 1;
        mesh.set_weight(v, g, 1.0);
    }

    mesh.faces.push(Face::with_material(
        vec![first, first + 1, first + 2],
        material,
    ));
}

fn names(mesh: &WeightedMesh) -> Vec<&str> {
    mesh.groups.iter().map(|g| g.name.as_str()).collect()
}

#[test]
fn test_remap_imported_mesh() {
    let mut target = WeightedMesh::from_gltf(SKINNED_TRIANGLE).unwrap().remove(0);
    // Weighted centroids are (0, 1/3, 1) and (2/3, 1/3, 1) in world space
    target.groups[0].name = "0".to_owned();
    target.groups[1].name = "1".to_owned();

    let mut source = WeightedMesh::new("Source");
    add_blob(&mut source, Vec3A::new(0.7, 0.3, 1.0), "Shoulder", 0);
    add_blob(&mut source, Vec3A::new(0.0, 0.3, 1.0), "Neck", 0);
    add_blob(&mut source, Vec3A::new(0.0, 0.0, -5.0), "Foot", 0);

    let plan = match_vertex_groups(&source, &mut target);

    assert_eq!(plan.matched_count(), 2);
    assert_eq!(names(&target), ["Neck", "Shoulder"]);
}

#[test]
fn test_remap_after_cleanup() {
    // A dump split into suffixed duplicates, with a gap in the numbering
    let mut target = WeightedMesh::new("Dump");
    add_blob(&mut target, Vec3A::new(0.0, 0.0, 1.6), "0", 0);
    add_blob(&mut target, Vec3A::new(0.0, 0.1, 1.6), "0.001", 0);
    add_blob(&mut target, Vec3A::new(0.0, 0.0, 1.0), "2", 0);

    let names_to_merge = MergeMode::BaseNames
        .resolve(std::slice::from_ref(&target))
        .unwrap();
    assert_eq!(merge_groups(&mut target, &names_to_merge), 2);
    assert_eq!(names(&target), ["0", "2"]);

    assert_eq!(fill_groups(&mut target, 0), 1);
    assert_eq!(names(&target), ["0", "1", "2"]);

    let mut source = WeightedMesh::new("Source");
    add_blob(&mut source, Vec3A::new(0.0, 0.0, 1.7), "Head", 0);
    add_blob(&mut source, Vec3A::new(0.0, 0.0, 1.1), "Spine", 0);

    match_vertex_groups(&source, &mut target);

    // "1" was only filled in, so has no weights to place it
    assert_eq!(names(&target), ["Head", DEFAULT_PLACEHOLDER, "Spine"]);

    assert_eq!(remove_unused_groups(&mut target), 1);
    assert_eq!(names(&target), ["Head", "Spine"]);
    assert!(target.validate().is_ok());
}

#[test]
fn test_every_name_from_source_or_placeholder() {
    let mut source = WeightedMesh::new("Source");
    for i in 0..5 {
        add_blob(&mut source, Vec3A::new(i as f32, 0.0, 0.0), &format!("Bone{i}"), 0);
    }
    source.add_group("Unweighted");

    let mut target = WeightedMesh::new("Target");
    for i in 0..8 {
        add_blob(
            &mut target,
            Vec3A::new(i as f32 * 0.7, 0.3, -0.2),
            &i.to_string(),
            0,
        );
    }
    target.add_group("Empty");

    match_vertex_groups(&source, &mut target);

    for group in &target.groups {
        assert!(
            group.name == DEFAULT_PLACEHOLDER
                || (group.name.starts_with("Bone") && source.group_index(&group.name).is_some()),
            "{}",
            group.name
        );
    }
    assert_eq!(target.groups.last().unwrap().name, DEFAULT_PLACEHOLDER);
}

#[test]
fn test_separate_then_remap_each_part() {
    let mut source = WeightedMesh::new("Source");
    add_blob(&mut source, Vec3A::new(0.0, 0.0, 1.7), "Head", 0);
    add_blob(&mut source, Vec3A::new(0.0, 0.0, 0.2), "Foot", 0);

    let mut dump = WeightedMesh::new("Dump");
    dump.materials = vec!["mat_FaceDiffuse".to_owned(), "mat_BodyDiffuse".to_owned()];
    add_blob(&mut dump, Vec3A::new(0.0, 0.0, 1.65), "10", 0);
    add_blob(&mut dump, Vec3A::new(0.0, 0.0, 0.25), "11", 1);

    let mut parts = separate_by_material(&dump, &NameCleanup::default());
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name, "Face");
    assert_eq!(parts[1].name, "Body");

    for part in &mut parts {
        match_vertex_groups(&source, part);
    }

    // Each part keeps every group, but only its own carries weights
    assert_eq!(names(&parts[0]), ["Head", DEFAULT_PLACEHOLDER]);
    assert_eq!(names(&parts[1]), [DEFAULT_PLACEHOLDER, "Foot"]);
}
