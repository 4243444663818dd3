pub mod centroid;
pub mod config;
pub mod export;
pub mod groups;
pub mod matcher;
pub mod separate;
pub mod transfer;
pub mod weld;

pub use centroid::{group_centroids, vertex_influence_area, GroupCentroid};
pub use matcher::{find_nearest_group, match_vertex_groups, plan_matches, GroupNames, MatchPlan};
