use ash::vk;

use crate::usage::{
    translation::{BufferUsageState, ImageUsageState},
    usage::{BufferUsage, ImageUsage},
};

/// 便捷创建 image memory barrier 的结构体
///
/// stage、access 与 layout 都由用途通过转换表得到
#[derive(Clone, Copy)]
pub struct RhiImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl Default for RhiImageBarrier {
    fn default() -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_array_layer: 0,
                    layer_count: 1,
                    base_mip_level: 0,
                    level_count: 1,
                },
                ..Default::default()
            },
        }
    }
}

impl RhiImageBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'static> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn image(mut self, image: vk::Image) -> Self {
        self.inner.image = image;
        self
    }

    /// builder
    ///
    /// 同时设置 src/dst 的 stage、access 以及 layout
    #[inline]
    pub fn usage_transfer(mut self, old_usage: ImageUsage, new_usage: ImageUsage) -> Self {
        let src = ImageUsageState::from(old_usage);
        let dst = ImageUsageState::from(new_usage);
        self.inner.src_stage_mask = src.stage;
        self.inner.src_access_mask = src.access;
        self.inner.old_layout = src.layout;
        self.inner.dst_stage_mask = dst.stage;
        self.inner.dst_access_mask = dst.access;
        self.inner.new_layout = dst.layout;
        self
    }

    /// builder
    #[inline]
    pub fn subresource_range(mut self, range: vk::ImageSubresourceRange) -> Self {
        self.inner.subresource_range = range;
        self
    }
}

#[derive(Clone, Copy)]
pub struct RhiBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl Default for RhiBufferBarrier {
    fn default() -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                size: vk::WHOLE_SIZE,
                ..Default::default()
            },
        }
    }
}

impl RhiBufferBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'static> {
        &self.inner
    }

    #[inline]
    pub fn usage_transfer(mut self, old_usage: BufferUsage, new_usage: BufferUsage) -> Self {
        let src = BufferUsageState::from(old_usage);
        let dst = BufferUsageState::from(new_usage);
        self.inner.src_stage_mask = src.stage;
        self.inner.src_access_mask = src.access;
        self.inner.dst_stage_mask = dst.stage;
        self.inner.dst_access_mask = dst.access;
        self
    }

    #[inline]
    pub fn buffer(mut self, buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        self.inner.buffer = buffer;
        self.inner.offset = offset;
        self.inner.size = size;
        self
    }
}
