use slotmap::{SlotMap, new_key_type};

use crate::resources::{buffer::RhiBuffer, image::RhiImage, sampler::RhiSampler};

new_key_type! {
    pub struct BufferHandle;
    pub struct ImageHandle;
    pub struct SamplerHandle;
}

/// 资源的持有者
///
/// descriptor binding 等只保存 handle，资源的生命周期由 arena 决定。
/// 创建时插入一个空 sampler，用于表示"不带 sampler 的 image"。
pub struct ResourceArena {
    buffers: SlotMap<BufferHandle, RhiBuffer>,
    images: SlotMap<ImageHandle, RhiImage>,
    samplers: SlotMap<SamplerHandle, RhiSampler>,

    empty_sampler: SamplerHandle,
}

impl Default for ResourceArena {
    fn default() -> Self {
        Self::new()
    }
}

// new & init
impl ResourceArena {
    pub fn new() -> Self {
        let mut samplers = SlotMap::with_key();
        let empty_sampler = samplers.insert(RhiSampler::empty());
        Self {
            buffers: SlotMap::with_key(),
            images: SlotMap::with_key(),
            samplers,
            empty_sampler,
        }
    }
}

// getters
impl ResourceArena {
    #[inline]
    pub fn empty_sampler(&self) -> SamplerHandle {
        self.empty_sampler
    }

    #[inline]
    pub fn buffer(&self, handle: BufferHandle) -> Option<&RhiBuffer> {
        self.buffers.get(handle)
    }

    #[inline]
    pub fn buffer_mut(&mut self, handle: BufferHandle) -> Option<&mut RhiBuffer> {
        self.buffers.get_mut(handle)
    }

    #[inline]
    pub fn image(&self, handle: ImageHandle) -> Option<&RhiImage> {
        self.images.get(handle)
    }

    #[inline]
    pub fn image_mut(&mut self, handle: ImageHandle) -> Option<&mut RhiImage> {
        self.images.get_mut(handle)
    }

    #[inline]
    pub fn sampler(&self, handle: SamplerHandle) -> Option<&RhiSampler> {
        self.samplers.get(handle)
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

// tools
impl ResourceArena {
    #[inline]
    pub fn insert_buffer(&mut self, buffer: RhiBuffer) -> BufferHandle {
        self.buffers.insert(buffer)
    }

    #[inline]
    pub fn insert_image(&mut self, image: RhiImage) -> ImageHandle {
        self.images.insert(image)
    }

    #[inline]
    pub fn insert_sampler(&mut self, sampler: RhiSampler) -> SamplerHandle {
        self.samplers.insert(sampler)
    }

    /// 返回被移出的资源，调用者 drop 它即释放 GPU 资源
    #[inline]
    pub fn remove_buffer(&mut self, handle: BufferHandle) -> Option<RhiBuffer> {
        self.buffers.remove(handle)
    }

    #[inline]
    pub fn remove_image(&mut self, handle: ImageHandle) -> Option<RhiImage> {
        self.images.remove(handle)
    }

    pub fn remove_sampler(&mut self, handle: SamplerHandle) -> Option<RhiSampler> {
        assert_ne!(handle, self.empty_sampler, "the empty sampler can not be removed");
        self.samplers.remove(handle)
    }
}
