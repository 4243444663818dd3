pub mod asset;
pub mod gltf_import;
mod weighted_mesh;

pub use asset::{Asset, AssetError, ASSET_EXTENSION};
pub use gltf_import::ImportError;
pub use weighted_mesh::{
    make_names_unique, Face, MeshError, ObjectTransform, Property, Vertex, VertexGroup, VertexWeight, WeightedMesh,
};
