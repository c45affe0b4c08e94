//! GPU 内存分配
//!
//! [`GpuAllocator`] 是内存分配的能力接口，[`VmaAllocator`] 基于 vk-mem 实现。
//! 分配结果通过 [`AllocationHandle`] 引用，真正的 `vk_mem::Allocation` 由 allocator 自己保存。

use std::cell::RefCell;

use ash::{prelude::VkResult, vk};
use slotmap::SlotMap;
use vk_mem::Alloc;

slotmap::new_key_type! {
    /// 一次内存分配的句柄，null 表示分配失败或已经释放
    pub struct AllocationHandle;
}

/// 内存的放置策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryUsage {
    GpuOnly,
    CpuOnly,
    CpuToGpu,
    GpuToCpu,
    CpuCopy,
    GpuLazilyAllocated,
}

impl MemoryUsage {
    /// CPU 是否可以 map 这类内存
    #[inline]
    pub fn is_host_visible(self) -> bool {
        !matches!(self, MemoryUsage::GpuOnly | MemoryUsage::GpuLazilyAllocated)
    }

    /// VMA 3 中旧的 usage 已废弃，这里换成 Auto* 加 host access 标记
    fn to_vma(self) -> vk_mem::AllocationCreateInfo {
        let (usage, flags) = match self {
            MemoryUsage::GpuOnly => (vk_mem::MemoryUsage::AutoPreferDevice, vk_mem::AllocationCreateFlags::empty()),
            MemoryUsage::CpuOnly => (
                vk_mem::MemoryUsage::AutoPreferHost,
                vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
            ),
            MemoryUsage::CpuToGpu => {
                (vk_mem::MemoryUsage::Auto, vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE)
            }
            MemoryUsage::GpuToCpu => (vk_mem::MemoryUsage::Auto, vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM),
            MemoryUsage::CpuCopy => {
                (vk_mem::MemoryUsage::AutoPreferHost, vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM)
            }
            MemoryUsage::GpuLazilyAllocated => {
                (vk_mem::MemoryUsage::GpuLazy, vk_mem::AllocationCreateFlags::empty())
            }
        };
        vk_mem::AllocationCreateInfo {
            usage,
            flags,
            ..Default::default()
        }
    }
}

/// 内存分配能力
///
/// 本层不做重试，分配失败直接返回错误，由资源层转换为 null 句柄
pub trait GpuAllocator {
    fn allocate_buffer(
        &self,
        create_info: &vk::BufferCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Buffer, AllocationHandle)>;

    fn allocate_image(
        &self,
        create_info: &vk::ImageCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Image, AllocationHandle)>;

    fn deallocate_buffer(&self, buffer: vk::Buffer, allocation: AllocationHandle);

    fn deallocate_image(&self, image: vk::Image, allocation: AllocationHandle);

    /// 对 GPU-only 的内存调用会返回 `ERROR_MEMORY_MAP_FAILED`
    fn map_memory(&self, allocation: AllocationHandle) -> VkResult<*mut u8>;

    fn unmap_memory(&self, allocation: AllocationHandle);

    /// 对 coherent 内存是 no-op，任何时候调用都是安全的
    fn flush_memory(&self, allocation: AllocationHandle, size: vk::DeviceSize, offset: vk::DeviceSize)
    -> VkResult<()>;
}

struct VmaAllocationEntry {
    allocation: vk_mem::Allocation,
    usage: MemoryUsage,
}

pub struct VmaAllocator {
    vma: vk_mem::Allocator,
    allocations: RefCell<SlotMap<AllocationHandle, VmaAllocationEntry>>,
}

impl VmaAllocator {
    pub fn new(instance: &ash::Instance, device: &ash::Device, physical_device: vk::PhysicalDevice) -> VkResult<Self> {
        let vma_create_info = vk_mem::AllocatorCreateInfo::new(instance, device, physical_device);
        let vma = unsafe { vk_mem::Allocator::new(vma_create_info)? };
        Ok(Self {
            vma,
            allocations: RefCell::new(SlotMap::with_key()),
        })
    }

    /// 当前仍然存活的分配数量
    pub fn live_allocation_count(&self) -> usize {
        self.allocations.borrow().len()
    }
}

impl GpuAllocator for VmaAllocator {
    fn allocate_buffer(
        &self,
        create_info: &vk::BufferCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Buffer, AllocationHandle)> {
        let (buffer, allocation) = unsafe { self.vma.create_buffer(create_info, &usage.to_vma())? };
        let handle = self.allocations.borrow_mut().insert(VmaAllocationEntry { allocation, usage });
        Ok((buffer, handle))
    }

    fn allocate_image(
        &self,
        create_info: &vk::ImageCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Image, AllocationHandle)> {
        let (image, allocation) = unsafe { self.vma.create_image(create_info, &usage.to_vma())? };
        let handle = self.allocations.borrow_mut().insert(VmaAllocationEntry { allocation, usage });
        Ok((image, handle))
    }

    fn deallocate_buffer(&self, buffer: vk::Buffer, allocation: AllocationHandle) {
        let Some(mut entry) = self.allocations.borrow_mut().remove(allocation) else {
            log::warn!("deallocate buffer {:?} with stale allocation handle", buffer);
            return;
        };
        unsafe { self.vma.destroy_buffer(buffer, &mut entry.allocation) };
    }

    fn deallocate_image(&self, image: vk::Image, allocation: AllocationHandle) {
        let Some(mut entry) = self.allocations.borrow_mut().remove(allocation) else {
            log::warn!("deallocate image {:?} with stale allocation handle", image);
            return;
        };
        unsafe { self.vma.destroy_image(image, &mut entry.allocation) };
    }

    fn map_memory(&self, allocation: AllocationHandle) -> VkResult<*mut u8> {
        let mut allocations = self.allocations.borrow_mut();
        let entry = allocations.get_mut(allocation).ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        if !entry.usage.is_host_visible() {
            return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        unsafe { self.vma.map_memory(&mut entry.allocation) }
    }

    fn unmap_memory(&self, allocation: AllocationHandle) {
        let mut allocations = self.allocations.borrow_mut();
        if let Some(entry) = allocations.get_mut(allocation) {
            unsafe { self.vma.unmap_memory(&mut entry.allocation) };
        }
    }

    fn flush_memory(
        &self,
        allocation: AllocationHandle,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> VkResult<()> {
        let allocations = self.allocations.borrow();
        let entry = allocations.get(allocation).ok_or(vk::Result::ERROR_UNKNOWN)?;
        self.vma.flush_allocation(&entry.allocation, offset, size)
    }
}

impl Drop for VmaAllocator {
    fn drop(&mut self) {
        let leaked = self.allocations.get_mut().len();
        if leaked > 0 {
            log::warn!("VmaAllocator dropped with {} live allocations", leaked);
        }
    }
}
