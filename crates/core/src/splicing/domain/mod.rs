pub mod filter_graph;
pub mod splice_options;
pub mod splice_plan;
