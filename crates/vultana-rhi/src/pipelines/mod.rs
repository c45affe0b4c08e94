pub mod pass_desc;
pub mod render_pass;
pub mod shader;
