use std::ptr;

use ash::vk::{self, Handle};

use crate::{
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{LogCategory, LogSeverity},
        debug_type::DebugType,
        error::RhiResult,
        mem_allocator::{AllocationHandle, MemoryUsage},
    },
    usage::usage::BufferUsageFlags,
};

/// GPU buffer，独占自己的内存分配
///
/// 分配失败时 handle 为 null、size 为 0，调用者通过 [`RhiBuffer::is_valid`] 检查。
/// 通过 [`RhiBuffer::take`] 转移所有权后，原对象成为空 buffer，drop 时什么也不做。
pub struct RhiBuffer {
    ctx: RenderDeviceContext,

    handle: vk::Buffer,
    allocation: AllocationHandle,
    memory_usage: MemoryUsage,

    size: vk::DeviceSize,
    map_ptr: Option<*mut u8>,

    debug_name: String,
}

impl DebugType for RhiBuffer {
    fn debug_type_name() -> &'static str {
        "RhiBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for RhiBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

// new & init
impl RhiBuffer {
    pub fn new(
        ctx: &RenderDeviceContext,
        size: vk::DeviceSize,
        usage: BufferUsageFlags,
        memory_usage: MemoryUsage,
        debug_name: impl AsRef<str>,
    ) -> Self {
        let mut buffer = Self::empty(ctx);
        buffer.init(size, usage, memory_usage, debug_name);
        buffer
    }

    /// 没有任何 GPU 资源的 buffer
    pub fn empty(ctx: &RenderDeviceContext) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: vk::Buffer::null(),
            allocation: AllocationHandle::default(),
            memory_usage: MemoryUsage::GpuOnly,
            size: 0,
            map_ptr: None,
            debug_name: String::new(),
        }
    }

    /// 重新创建 buffer，之前持有的资源会先被销毁
    pub fn init(
        &mut self,
        size: vk::DeviceSize,
        usage: BufferUsageFlags,
        memory_usage: MemoryUsage,
        debug_name: impl AsRef<str>,
    ) {
        self.destroy();

        let buffer_ci = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_native())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        self.debug_name = debug_name.as_ref().to_string();
        self.memory_usage = memory_usage;
        match self.ctx.allocator().allocate_buffer(&buffer_ci, memory_usage) {
            Ok((handle, allocation)) => {
                self.handle = handle;
                self.allocation = allocation;
                self.size = size;
                self.ctx.set_debug_name(self, &self.debug_name);
            }
            Err(e) => {
                self.ctx.log(
                    LogSeverity::Error,
                    LogCategory::Memory,
                    format_args!("failed to allocate buffer {}({} bytes): {:?}", self.debug_name, size, e),
                );
            }
        }
    }

    /// 转移所有权，self 变为空 buffer
    pub fn take(&mut self) -> Self {
        let mut taken = Self::empty(&self.ctx);
        std::mem::swap(self, &mut taken);
        taken
    }

    /// 释放 GPU 资源，可以重复调用
    pub fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }

        self.unmap_memory();
        self.ctx.allocator().deallocate_buffer(self.handle, self.allocation);

        self.handle = vk::Buffer::null();
        self.allocation = AllocationHandle::default();
        self.size = 0;
    }
}

// getters
impl RhiBuffer {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn allocation(&self) -> AllocationHandle {
        self.allocation
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory_usage
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.map_ptr.is_some()
    }

    #[inline]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
}

// tools
impl RhiBuffer {
    /// 已经 map 过时直接返回之前的指针
    pub fn map_memory(&mut self) -> RhiResult<*mut u8> {
        if let Some(ptr) = self.map_ptr {
            return Ok(ptr);
        }
        let ptr = self.ctx.allocator().map_memory(self.allocation)?;
        self.map_ptr = Some(ptr);
        Ok(ptr)
    }

    pub fn unmap_memory(&mut self) {
        if self.map_ptr.take().is_some() {
            self.ctx.allocator().unmap_memory(self.allocation);
        }
    }

    #[inline]
    pub fn flush(&self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<()> {
        self.ctx.allocator().flush_memory(self.allocation, size, offset)?;
        Ok(())
    }

    #[inline]
    pub fn flush_all(&self) -> RhiResult<()> {
        self.flush(self.size, 0)
    }

    /// 将 data 写入 `[offset, offset + data.len())`
    ///
    /// 没有 map 时会临时 map，写入后 flush 并 unmap；已经 map 时直接写入。
    pub fn copy_data(&mut self, data: &[u8], offset: vk::DeviceSize) -> RhiResult<()> {
        let size = data.len() as vk::DeviceSize;
        assert!(
            offset + size <= self.size,
            "copy out of range in buffer {}: offset {} + size {} > {}",
            self.debug_name,
            offset,
            size,
            self.size
        );

        if let Some(ptr) = self.map_ptr {
            unsafe { ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len()) };
            return Ok(());
        }

        let ptr = self.map_memory()?;
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len()) };
        let flushed = self.flush(size, offset);
        self.unmap_memory();
        flushed
    }

    /// 在 [`RhiBuffer::copy_data`] 的基础上，持久 map 的 buffer 也会 flush
    pub fn copy_data_with_flush(&mut self, data: &[u8], offset: vk::DeviceSize) -> RhiResult<()> {
        let persistent = self.is_mapped();
        self.copy_data(data, offset)?;
        if persistent {
            self.flush(data.len() as vk::DeviceSize, offset)?;
        }
        Ok(())
    }

    /// 以 Pod 数组的形式写入
    #[inline]
    pub fn copy_slice<T: bytemuck::Pod>(&mut self, data: &[T], offset: vk::DeviceSize) -> RhiResult<()> {
        self.copy_data_with_flush(bytemuck::cast_slice(data), offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_context;

    #[test]
    fn test_copy_data_with_flush_visible_after_map() {
        let (ctx, _device, allocator, _logger) = mock_context();
        let mut buffer =
            RhiBuffer::new(&ctx, 128, BufferUsageFlags::UNIFORM_BUFFER, MemoryUsage::CpuToGpu, "uniform");

        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        buffer.copy_data_with_flush(&data, 16).unwrap();
        assert!(!buffer.is_mapped());

        let ptr = buffer.map_memory().unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(ptr.add(16), data.len()) };
        assert_eq!(bytes, &data);

        // 临时 map 时 copy_data 内部已经 flush 过
        assert_eq!(allocator.flushes.borrow().as_slice(), &[(buffer.allocation(), 8, 16)]);
    }

    #[test]
    fn test_persistent_mapped_copy() {
        let (ctx, _device, allocator, _logger) = mock_context();
        let mut buffer = RhiBuffer::new(&ctx, 64, BufferUsageFlags::TRANSFER_SOURCE, MemoryUsage::CpuToGpu, "persistent");

        let first = buffer.map_memory().unwrap();
        let second = buffer.map_memory().unwrap();
        assert_eq!(first, second);
        assert_eq!(allocator.map_calls.get(), 1);

        buffer.copy_data(&[9u8; 4], 0).unwrap();
        assert!(allocator.flushes.borrow().is_empty());

        buffer.copy_data_with_flush(&[7u8; 4], 4).unwrap();
        assert_eq!(allocator.flushes.borrow().len(), 1);
        assert_eq!(&allocator.read(buffer.allocation())[..8], &[9, 9, 9, 9, 7, 7, 7, 7]);
    }

    #[test]
    #[should_panic(expected = "copy out of range")]
    fn test_copy_overflow_asserts() {
        let (ctx, _device, _allocator, _logger) = mock_context();
        let mut buffer = RhiBuffer::new(&ctx, 16, BufferUsageFlags::TRANSFER_SOURCE, MemoryUsage::CpuToGpu, "small");
        let _ = buffer.copy_data(&[0u8; 8], 12);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let (ctx, _device, allocator, _logger) = mock_context();
        let mut source = RhiBuffer::new(&ctx, 32, BufferUsageFlags::VERTEX_BUFFER, MemoryUsage::GpuOnly, "vertex");

        let moved = source.take();
        assert!(!source.is_valid());
        assert_eq!(source.size(), 0);
        assert!(moved.is_valid());
        assert_eq!(moved.size(), 32);

        drop(source);
        assert_eq!(allocator.deallocations.get(), 0);
        drop(moved);
        assert_eq!(allocator.deallocations.get(), 1);
        assert_eq!(allocator.live_count(), 0);
    }

    #[test]
    fn test_destroy_unmaps_and_is_repeatable() {
        let (ctx, _device, allocator, _logger) = mock_context();
        let mut buffer = RhiBuffer::new(&ctx, 32, BufferUsageFlags::TRANSFER_SOURCE, MemoryUsage::CpuOnly, "mapped");
        buffer.map_memory().unwrap();

        buffer.destroy();
        buffer.destroy();
        assert_eq!(allocator.unmap_calls.get(), 1);
        assert_eq!(allocator.deallocations.get(), 1);
    }

    #[test]
    fn test_reinit_releases_previous() {
        let (ctx, _device, allocator, _logger) = mock_context();
        let mut buffer = RhiBuffer::new(&ctx, 32, BufferUsageFlags::STORAGE_BUFFER, MemoryUsage::GpuOnly, "first");
        buffer.init(64, BufferUsageFlags::STORAGE_BUFFER, MemoryUsage::GpuOnly, "second");
        assert_eq!(allocator.deallocations.get(), 1);
        assert_eq!(allocator.live_count(), 1);
        assert_eq!(buffer.size(), 64);
    }

    #[test]
    fn test_allocation_failure_yields_null_buffer() {
        let (ctx, _device, allocator, logger) = mock_context();
        allocator.fail_next.set(true);
        let buffer = RhiBuffer::new(&ctx, 1 << 20, BufferUsageFlags::STORAGE_BUFFER, MemoryUsage::GpuOnly, "oom");
        assert!(!buffer.is_valid());
        assert_eq!(buffer.size(), 0);
        assert_eq!(logger.count(LogSeverity::Error), 1);
    }
}
