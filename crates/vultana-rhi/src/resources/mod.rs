pub mod arena;
pub mod buffer;
pub mod image;
pub mod sampler;
pub mod stage_buffer;
