pub mod virtual_frame;
