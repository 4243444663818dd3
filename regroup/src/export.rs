use common::WeightedMesh;
use obj::{Group, IndexTuple, ObjData, Object, SimplePolygon};

/// World space positions and faces of `mesh`, one OBJ group per material slot.
pub fn to_obj(mesh: &WeightedMesh) -> ObjData {
    let world = mesh.world_matrix();

    let mut obj = ObjData::default();

    obj.position = mesh
        .verts
        .iter()
        .map(|v| world.transform_point3a(v.local_pos()).to_array())
        .collect();

    let mut object = Object::new(mesh.name.clone());

    let slot_count = mesh
        .faces
        .iter()
        .map(|f| f.material as usize + 1)
        .max()
        .unwrap_or(0);

    for slot in 0..slot_count {
        let name = mesh
            .materials
            .get(slot)
            .cloned()
            .unwrap_or_else(|| format!("Material.{slot}"));

        let mut group = Group::new(name);

        for face in mesh.faces.iter().filter(|f| f.material as usize == slot) {
            group.polys.push(SimplePolygon(
                face.verts
                    .iter()
                    .map(|&v| IndexTuple(v as _, None, None))
                    .collect(),
            ));
        }

        if !group.polys.is_empty() {
            object.groups.push(group);
        }
    }

    obj.objects.push(object);

    obj
}
