pub mod endpoint_snapper;
pub mod similarity;
pub mod snapping_options;
