pub mod analysis_cell;
pub mod local_store;
