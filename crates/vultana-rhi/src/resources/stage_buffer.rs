use ash::vk;

use crate::{
    foundation::{context::RenderDeviceContext, debug_type::DebugType, error::RhiResult, mem_allocator::MemoryUsage},
    resources::buffer::RhiBuffer,
    usage::usage::BufferUsageFlags,
};

/// stage buffer 中的一段区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageAllocation {
    pub size: vk::DeviceSize,
    pub offset: vk::DeviceSize,
}

/// 线性分配的上传 buffer
///
/// 每个 virtual frame 一个，offset 单调增长，直到 frame 的 fence 完成后 [`RhiStageBuffer::reset`]。
pub struct RhiStageBuffer {
    inner: RhiBuffer,
    current_offset: vk::DeviceSize,
}

// new & init
impl RhiStageBuffer {
    pub fn new(ctx: &RenderDeviceContext, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> RhiResult<Self> {
        let mut inner =
            RhiBuffer::new(ctx, size, BufferUsageFlags::TRANSFER_SOURCE, MemoryUsage::CpuToGpu, debug_name);
        if inner.is_valid() {
            inner.map_memory()?;
        }
        Ok(Self {
            inner,
            current_offset: 0,
        })
    }
}

// getters
impl RhiStageBuffer {
    #[inline]
    pub fn buffer(&self) -> &RhiBuffer {
        &self.inner
    }

    #[inline]
    pub fn current_offset(&self) -> vk::DeviceSize {
        self.current_offset
    }

    #[inline]
    pub fn capacity(&self) -> vk::DeviceSize {
        self.inner.size()
    }
}

// tools
impl RhiStageBuffer {
    /// 将 data 追加到 buffer 尾部，返回写入的位置
    pub fn submit(&mut self, data: &[u8]) -> RhiResult<StageAllocation> {
        let allocation = StageAllocation {
            size: data.len() as vk::DeviceSize,
            offset: self.current_offset,
        };
        assert!(
            allocation.offset + allocation.size <= self.capacity(),
            "stage buffer {} overflow: {} + {} > {}",
            self.inner.debug_name(),
            allocation.offset,
            allocation.size,
            self.capacity()
        );

        self.inner.copy_data(data, allocation.offset)?;
        self.current_offset += allocation.size;
        Ok(allocation)
    }

    #[inline]
    pub fn submit_slice<T: bytemuck::Pod>(&mut self, data: &[T]) -> RhiResult<StageAllocation> {
        self.submit(bytemuck::cast_slice(data))
    }

    /// 之前提交的数据所在的 frame 已经执行完毕
    #[inline]
    pub fn reset(&mut self) {
        self.current_offset = 0;
    }

    /// flush 已经写入的区域
    pub fn flush(&self) -> RhiResult<()> {
        if self.current_offset == 0 {
            return Ok(());
        }
        self.inner.flush(self.current_offset, 0)
    }
}

impl DebugType for RhiStageBuffer {
    fn debug_type_name() -> &'static str {
        "RhiStageBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.inner.handle()
    }
}
