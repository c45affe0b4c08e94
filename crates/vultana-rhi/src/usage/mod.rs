pub mod translation;
pub mod usage;
