pub mod cost_model;
pub mod engine;
pub mod loop_data;
pub mod reduction;
pub mod region;
pub mod rem_transform;
pub mod shape;
pub mod temp_graph;
pub mod vectorizer;
