pub mod errors;
pub mod models;
pub mod sequence;
pub mod settings;
