use std::collections::{BTreeMap, HashMap};

use common::{Property, WeightedMesh};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransferError {
    #[error("Property {0} has an unsupported {1} value")]
    UnsupportedProperty(String, &'static str),
}

/// Name with a trailing `-part` and then a `.suffix` removed, used to pair objects.
pub fn name_prefix(name: &str) -> &str {
    let name = name.rsplit_once('-').map_or(name, |(prefix, _)| prefix);
    name.rsplit_once('.').map_or(name, |(prefix, _)| prefix)
}

/// Replace the custom properties and transform of `target` with those of `base`.
pub fn transfer_properties(base: &WeightedMesh, target: &mut WeightedMesh) {
    target.properties = base.properties.clone();
    target.transform = base.transform;

    let t = &target.transform;
    log::info!(
        "Transferred properties from '{}' to '{}': location {:?}, rotation {:?}, scale {:?}",
        base.name,
        target.name,
        t.location,
        t.rotation,
        t.scale
    );
}

/// Pair objects by [`name_prefix`] and transfer onto every paired target.
/// Returns the number of targets updated.
pub fn transfer_between_collections(base: &[WeightedMesh], targets: &mut [WeightedMesh]) -> usize {
    let by_prefix: HashMap<&str, &WeightedMesh> =
        base.iter().map(|b| (name_prefix(&b.name), b)).collect();

    let mut transferred = 0;

    for target in targets.iter_mut() {
        if let Some(base) = by_prefix.get(name_prefix(&target.name)) {
            transfer_properties(base, target);
            transferred += 1;
        } else {
            log::debug!("No base object for '{}'", target.name);
        }
    }

    transferred
}

/// Read custom properties from a flat TOML table.
pub fn properties_from_toml(table: &toml::Table) -> Result<BTreeMap<String, Property>, TransferError> {
    table
        .iter()
        .map(|(key, value)| {
            let property = match value {
                toml::Value::Boolean(b) => Property::Bool(*b),
                toml::Value::Integer(i) => Property::Int(*i),
                toml::Value::Float(f) => Property::Float(*f),
                toml::Value::String(s) => Property::Str(s.clone()),
                other => {
                    return Err(TransferError::UnsupportedProperty(
                        key.clone(),
                        other.type_str(),
                    ))
                }
            };
            Ok((key.clone(), property))
        })
        .collect()
}
