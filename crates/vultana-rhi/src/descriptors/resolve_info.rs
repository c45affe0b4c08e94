use std::collections::HashMap;

use crate::resources::arena::{BufferHandle, ImageHandle};

/// 名称到资源的映射，由外部（通常是 render graph）在每帧填充
///
/// 同一种资源中名称不能重复；buffer 与 image 的名称空间相互独立。
#[derive(Debug, Default, Clone)]
pub struct ResolveInfo {
    buffers: HashMap<String, Vec<BufferHandle>>,
    images: HashMap<String, Vec<ImageHandle>>,
}

impl ResolveInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_buffer(&mut self, name: impl Into<String>, buffer: BufferHandle) -> &mut Self {
        self.resolve_buffers(name, &[buffer])
    }

    pub fn resolve_buffers(&mut self, name: impl Into<String>, buffers: &[BufferHandle]) -> &mut Self {
        let name = name.into();
        assert!(!self.buffers.contains_key(&name), "buffer {name} is resolved twice");
        self.buffers.insert(name, buffers.to_vec());
        self
    }

    pub fn resolve_image(&mut self, name: impl Into<String>, image: ImageHandle) -> &mut Self {
        self.resolve_images(name, &[image])
    }

    pub fn resolve_images(&mut self, name: impl Into<String>, images: &[ImageHandle]) -> &mut Self {
        let name = name.into();
        assert!(!self.images.contains_key(&name), "image {name} is resolved twice");
        self.images.insert(name, images.to_vec());
        self
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
        self.images.clear();
    }
}

// getters
impl ResolveInfo {
    #[inline]
    pub fn buffers(&self, name: &str) -> Option<&[BufferHandle]> {
        self.buffers.get(name).map(Vec::as_slice)
    }

    #[inline]
    pub fn images(&self, name: &str) -> Option<&[ImageHandle]> {
        self.images.get(name).map(Vec::as_slice)
    }
}
