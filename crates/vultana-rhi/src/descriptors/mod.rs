pub mod descriptor_binding;
pub mod resolve_info;
