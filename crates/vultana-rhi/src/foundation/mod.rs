pub mod ash_device;
pub mod context;
pub mod debug_logger;
pub mod debug_type;
pub mod device;
pub mod error;
pub mod mem_allocator;
