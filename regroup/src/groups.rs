//! Bulk edits of vertex groups: merging duplicates, filling numbered gaps, pruning and sorting.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashSet},
};

use common::{VertexGroup, WeightedMesh};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GroupError {
    #[error("No vertex group names to merge")]
    NoGroupNames,
    #[error("Invalid group range {0}..={1}")]
    InvalidRange(u32, u32),
}

/// Name with a trailing `.suffix` removed, so `"12.001"` and `"12"` share the base `"12"`.
pub fn base_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(base, _)| base)
}

/// Which base names [`merge_groups`] should collapse.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeMode {
    Names(Vec<String>),
    /// Inclusive range of numbered groups
    Range { first: u32, last: u32 },
    /// Every base name found on the meshes
    BaseNames,
}

impl MergeMode {
    /// Parse a comma separated list of names
    pub fn from_list(list: &str) -> Self {
        MergeMode::Names(
            list.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn resolve(&self, meshes: &[WeightedMesh]) -> Result<Vec<String>, GroupError> {
        let names = match self {
            MergeMode::Names(names) => names.clone(),
            MergeMode::Range { first, last } => {
                if first > last {
                    return Err(GroupError::InvalidRange(*first, *last));
                }
                (*first..=*last).map(|i| i.to_string()).collect()
            }
            MergeMode::BaseNames => meshes
                .iter()
                .flat_map(|m| m.groups.iter())
                .map(|g| base_name(&g.name).to_owned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        if names.is_empty() {
            Err(GroupError::NoGroupNames)
        } else {
            Ok(names)
        }
    }
}

/// For each name, sum all groups sharing that base name into one group called `name`.
/// Returns the number of names that had groups to merge.
pub fn merge_groups(mesh: &mut WeightedMesh, names: &[String]) -> usize {
    let mut merged = 0;

    for name in names {
        let relevant: Vec<bool> = mesh
            .groups
            .iter()
            .map(|g| base_name(&g.name) == name)
            .collect();

        if !relevant.contains(&true) {
            continue;
        }

        let combined: Vec<f32> = mesh
            .verts
            .iter()
            .map(|v| {
                v.groups
                    .iter()
                    .filter(|w| relevant.get(w.group as usize).copied().unwrap_or(false))
                    .map(|w| w.weight)
                    .sum()
            })
            .collect();

        let mut groups = Vec::with_capacity(mesh.groups.len());
        let mut remap = vec![None; mesh.groups.len()];

        for (i, group) in mesh.groups.iter().enumerate() {
            if !relevant[i] {
                remap[i] = Some(groups.len() as u32);
                groups.push(group.clone());
            }
        }

        let target = groups.len() as u32;
        groups.push(VertexGroup::new(name.clone()));
        mesh.remap_groups(groups, &remap);

        for (v, weight) in combined.into_iter().enumerate() {
            if weight > 0.0 {
                mesh.set_weight(v, target, weight.min(1.0));
            }
        }

        log::debug!(
            "Merged {} groups into {name} on {}",
            relevant.iter().filter(|&&r| r).count(),
            mesh.name
        );
        merged += 1;
    }

    sort_groups(mesh);

    merged
}

/// Largest group number [`fill_groups`] will fill up to.
pub const MAX_GROUP_NUMBER: u32 = 4095;

/// Add an empty group for every number in `0..=largest` that has no group yet, where
/// `largest` grows to the biggest numbered group present. Numbers are capped at
/// [`MAX_GROUP_NUMBER`]. Returns the number of groups added.
pub fn fill_groups(mesh: &mut WeightedMesh, largest: u32) -> usize {
    let mut largest = if largest > MAX_GROUP_NUMBER {
        log::warn!("Filling only up to group {MAX_GROUP_NUMBER}, not {largest}");
        MAX_GROUP_NUMBER
    } else {
        largest
    };

    for group in &mesh.groups {
        match base_name(&group.name).parse::<u32>() {
            Ok(n) if n <= MAX_GROUP_NUMBER => largest = largest.max(n),
            Ok(_) => log::warn!(
                "Vertex group '{}' is past {MAX_GROUP_NUMBER}, not filled up to",
                group.name
            ),
            Err(_) => log::warn!("Vertex group '{}' is not numbered, skipped", group.name),
        }
    }

    let present: HashSet<String> = mesh
        .groups
        .iter()
        .map(|g| base_name(&g.name).to_owned())
        .collect();

    let mut added = 0;
    for i in 0..=largest {
        let name = i.to_string();
        if !present.contains(&name) {
            mesh.add_group(name);
            added += 1;
        }
    }

    sort_groups(mesh);

    added
}

/// Remove groups no vertex has a positive weight in. Returns the number removed.
pub fn remove_unused_groups(mesh: &mut WeightedMesh) -> usize {
    let mut used = vec![false; mesh.groups.len()];

    for w in mesh.verts.iter().flat_map(|v| v.groups.iter()) {
        if w.weight > 0.0 {
            if let Some(u) = used.get_mut(w.group as usize) {
                *u = true;
            }
        }
    }

    let mut groups = Vec::new();
    let remap: Vec<_> = mesh
        .groups
        .iter()
        .zip(&used)
        .map(|(group, &used)| {
            used.then(|| {
                groups.push(group.clone());
                groups.len() as u32 - 1
            })
        })
        .collect();

    let removed = mesh.groups.len() - groups.len();
    mesh.remap_groups(groups, &remap);

    removed
}

pub fn remove_all_groups(mesh: &mut WeightedMesh) -> usize {
    let removed = mesh.groups.len();

    mesh.groups.clear();
    for v in &mut mesh.verts {
        v.groups.clear();
    }

    removed
}

/// Case insensitive comparison where runs of digits compare by value, so `"2" < "10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let da = take_digits(&mut a);
                let db = take_digits(&mut b);
                let (da, db) = (da.trim_start_matches('0'), db.trim_start_matches('0'));

                match da.len().cmp(&db.len()).then_with(|| da.cmp(db)) {
                    Ordering::Equal => {}
                    o => return o,
                }
            }
            (Some(x), Some(y)) => {
                a.next();
                b.next();

                match x.to_lowercase().cmp(y.to_lowercase()) {
                    Ordering::Equal => {}
                    o => return o,
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

/// Stable sort of groups by [`natural_cmp`].
pub fn sort_groups(mesh: &mut WeightedMesh) {
    let mut order: Vec<usize> = (0..mesh.groups.len()).collect();
    order.sort_by(|&a, &b| natural_cmp(&mesh.groups[a].name, &mesh.groups[b].name));

    let mut remap = vec![None; order.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = Some(new as u32);
    }

    let groups = order.iter().map(|&i| mesh.groups[i].clone()).collect();
    mesh.remap_groups(groups, &remap);
}
