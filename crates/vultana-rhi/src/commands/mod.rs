pub mod barrier;
pub mod command_buffer;
pub mod encoder;
pub mod fence;
