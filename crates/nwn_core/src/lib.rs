pub mod core_api;
pub mod creature;
pub mod feats;
pub mod reader;
pub mod rules;
