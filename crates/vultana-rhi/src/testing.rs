//! 单元测试使用的设备与内存 mock
//!
//! [`MockDevice`] 记录所有录制的命令、提交和 descriptor 写入，fence 的完成由测试控制；
//! [`MockAllocator`] 用 host 内存模拟 GPU 内存。

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use ash::{
    prelude::VkResult,
    vk::{self, Handle},
};
use slotmap::SlotMap;

use crate::{
    commands::encoder::CommandEncoder,
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{DebugLogger, LogCategory, LogSeverity},
        device::GpuDevice,
        mem_allocator::{AllocationHandle, GpuAllocator, MemoryUsage},
    },
};

pub(crate) fn init_test_log() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
}

/// 创建使用 mock 的上下文，同时返回 mock 本身以便检查
pub(crate) fn mock_context() -> (RenderDeviceContext, Rc<MockDevice>, Rc<MockAllocator>, Rc<CapturingLogger>) {
    init_test_log();
    let device = Rc::new(MockDevice::default());
    let allocator = Rc::new(MockAllocator::default());
    let logger = Rc::new(CapturingLogger::default());
    let ctx = RenderDeviceContext::with_logger(device.clone(), allocator.clone(), logger.clone());
    (ctx, device, allocator, logger)
}

// ============ logger ============

#[derive(Default)]
pub(crate) struct CapturingLogger {
    pub entries: RefCell<Vec<(LogSeverity, LogCategory, String)>>,
}

impl CapturingLogger {
    pub fn count(&self, severity: LogSeverity) -> usize {
        self.entries.borrow().iter().filter(|(s, _, _)| *s == severity).count()
    }
}

impl DebugLogger for CapturingLogger {
    fn log(&self, severity: LogSeverity, category: LogCategory, message: fmt::Arguments<'_>) {
        log::debug!(target: category.target(), "[{:?}] {}", severity, message);
        self.entries.borrow_mut().push((severity, category, message.to_string()));
    }
}

// ============ allocator ============

pub(crate) struct MockAllocation {
    pub memory: Box<[u8]>,
    pub usage: MemoryUsage,
    pub mapped: bool,
}

#[derive(Default)]
pub(crate) struct MockAllocator {
    pub allocations: RefCell<SlotMap<AllocationHandle, MockAllocation>>,
    pub map_calls: Cell<usize>,
    pub unmap_calls: Cell<usize>,
    pub flushes: RefCell<Vec<(AllocationHandle, vk::DeviceSize, vk::DeviceSize)>>,
    pub deallocations: Cell<usize>,
    /// 下一次分配返回 OOM
    pub fail_next: Cell<bool>,
    next_handle: Cell<u64>,
}

impl MockAllocator {
    fn next_raw(&self) -> u64 {
        let raw = self.next_handle.get() + 0x1000;
        self.next_handle.set(self.next_handle.get() + 1);
        raw
    }

    fn allocate(&self, size: usize, usage: MemoryUsage) -> VkResult<AllocationHandle> {
        if self.fail_next.replace(false) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        Ok(self.allocations.borrow_mut().insert(MockAllocation {
            memory: vec![0u8; size].into_boxed_slice(),
            usage,
            mapped: false,
        }))
    }

    pub fn live_count(&self) -> usize {
        self.allocations.borrow().len()
    }

    pub fn read(&self, allocation: AllocationHandle) -> Vec<u8> {
        self.allocations.borrow()[allocation].memory.to_vec()
    }
}

impl GpuAllocator for MockAllocator {
    fn allocate_buffer(
        &self,
        create_info: &vk::BufferCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Buffer, AllocationHandle)> {
        let allocation = self.allocate(create_info.size as usize, usage)?;
        Ok((vk::Buffer::from_raw(self.next_raw()), allocation))
    }

    fn allocate_image(
        &self,
        _create_info: &vk::ImageCreateInfo<'_>,
        usage: MemoryUsage,
    ) -> VkResult<(vk::Image, AllocationHandle)> {
        let allocation = self.allocate(0, usage)?;
        Ok((vk::Image::from_raw(self.next_raw()), allocation))
    }

    fn deallocate_buffer(&self, _buffer: vk::Buffer, allocation: AllocationHandle) {
        let removed = self.allocations.borrow_mut().remove(allocation);
        assert!(removed.is_some(), "double free of {allocation:?}");
        self.deallocations.set(self.deallocations.get() + 1);
    }

    fn deallocate_image(&self, _image: vk::Image, allocation: AllocationHandle) {
        let removed = self.allocations.borrow_mut().remove(allocation);
        assert!(removed.is_some(), "double free of {allocation:?}");
        self.deallocations.set(self.deallocations.get() + 1);
    }

    fn map_memory(&self, allocation: AllocationHandle) -> VkResult<*mut u8> {
        let mut allocations = self.allocations.borrow_mut();
        let entry = allocations.get_mut(allocation).ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        if !entry.usage.is_host_visible() {
            return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        self.map_calls.set(self.map_calls.get() + 1);
        entry.mapped = true;
        Ok(entry.memory.as_mut_ptr())
    }

    fn unmap_memory(&self, allocation: AllocationHandle) {
        self.unmap_calls.set(self.unmap_calls.get() + 1);
        if let Some(entry) = self.allocations.borrow_mut().get_mut(allocation) {
            entry.mapped = false;
        }
    }

    fn flush_memory(
        &self,
        allocation: AllocationHandle,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> VkResult<()> {
        self.flushes.borrow_mut().push((allocation, size, offset));
        Ok(())
    }
}

// ============ device ============

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageBarrierRecord {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
    pub range: vk::ImageSubresourceRange,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BufferBarrierRecord {
    pub buffer: vk::Buffer,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

#[derive(Debug, Clone)]
pub(crate) enum RecordedCommand {
    Begin(vk::CommandBufferUsageFlags),
    End,
    BeginRenderPass { render_pass: vk::RenderPass, clear_value_count: u32 },
    EndRenderPass,
    BindPipeline(vk::PipelineBindPoint, vk::Pipeline),
    BindDescriptorSets(vk::PipelineBindPoint, Vec<vk::DescriptorSet>),
    BindVertexBuffers { first_binding: u32, buffers: Vec<vk::Buffer>, offsets: Vec<vk::DeviceSize> },
    BindIndexBuffer(vk::Buffer, vk::IndexType),
    Draw { vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32 },
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32 },
    Dispatch(glam::UVec3),
    SetViewport(vk::Viewport),
    SetScissor(vk::Rect2D),
    PushConstants { stages: vk::ShaderStageFlags, data: Vec<u8> },
    CopyBuffer(vk::Buffer, vk::Buffer, vk::BufferCopy),
    CopyImage(vk::Image, vk::Image, vk::ImageCopy),
    CopyBufferToImage(vk::Buffer, vk::Image, vk::BufferImageCopy),
    CopyImageToBuffer(vk::Image, vk::Buffer, vk::BufferImageCopy),
    BlitImage { src: vk::Image, dst: vk::Image, region: vk::ImageBlit, filter: vk::Filter },
    Barrier { buffers: Vec<BufferBarrierRecord>, images: Vec<ImageBarrierRecord> },
    BeginLabel(String, glam::Vec4),
    EndLabel,
}

#[derive(Debug, Clone)]
pub(crate) struct DescriptorWriteRecord {
    pub dst_set: vk::DescriptorSet,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub buffers: Vec<vk::DescriptorBufferInfo>,
    pub images: Vec<vk::DescriptorImageInfo>,
}

/// fence wait 时 fence 尚未完成的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FenceBehavior {
    /// 模拟 GPU 在等待期间执行完毕
    #[default]
    CompleteOnWait,
    /// 模拟 GPU 卡死，wait 超时
    Hang,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FenceWait {
    pub fence: vk::Fence,
    /// 开始等待时 fence 是否已经 signaled，false 表示 CPU 被阻塞
    pub was_signaled: bool,
}

#[derive(Default)]
pub(crate) struct MockDevice {
    pub commands: RefCell<Vec<(vk::CommandBuffer, RecordedCommand)>>,
    pub descriptor_writes: RefCell<Vec<DescriptorWriteRecord>>,
    pub submissions: RefCell<Vec<(vk::CommandBuffer, vk::Fence)>>,
    /// raw fence -> signaled
    pub fences: RefCell<HashMap<u64, bool>>,
    pub fence_waits: RefCell<Vec<FenceWait>>,
    pub fence_behavior: Cell<FenceBehavior>,
    /// 下一次 submit 返回的错误
    pub fail_next_submit: Cell<Option<vk::Result>>,
    /// 下一次 end_command_buffer 返回的错误
    pub fail_next_end: Cell<Option<vk::Result>>,
    pub live_image_views: Cell<usize>,
    pub live_samplers: Cell<usize>,
    pub freed_command_buffers: Cell<usize>,
    pub debug_names: RefCell<Vec<(vk::ObjectType, u64, String)>>,
    next_handle: Cell<u64>,
}

impl MockDevice {
    fn next_raw(&self) -> u64 {
        let raw = self.next_handle.get() + 0x10_0000;
        self.next_handle.set(self.next_handle.get() + 1);
        raw
    }

    fn record(&self, command_buffer: vk::CommandBuffer, command: RecordedCommand) {
        self.commands.borrow_mut().push((command_buffer, command));
    }

    pub fn recorded(&self) -> Vec<RecordedCommand> {
        self.commands.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn clear_recorded(&self) {
        self.commands.borrow_mut().clear();
    }

    pub fn blits(&self) -> Vec<vk::ImageBlit> {
        self.recorded()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::BlitImage { region, .. } => Some(region),
                _ => None,
            })
            .collect()
    }

    pub fn image_barriers(&self) -> Vec<Vec<ImageBarrierRecord>> {
        self.recorded()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::Barrier { images, .. } => Some(images),
                _ => None,
            })
            .collect()
    }

    pub fn is_fence_signaled(&self, fence: vk::Fence) -> bool {
        self.fences.borrow().get(&fence.as_raw()).copied().unwrap_or(false)
    }

    /// 模拟 GPU 执行完所有已提交的工作
    pub fn complete_all(&self) {
        let submitted = self.submissions.borrow().iter().map(|(_, f)| f.as_raw()).collect::<Vec<_>>();
        let mut fences = self.fences.borrow_mut();
        for raw in submitted {
            fences.insert(raw, true);
        }
    }
}

impl GpuDevice for MockDevice {
    fn create_image_view(&self, _create_info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        self.live_image_views.set(self.live_image_views.get() + 1);
        Ok(vk::ImageView::from_raw(self.next_raw()))
    }

    fn destroy_image_view(&self, _view: vk::ImageView) {
        self.live_image_views.set(self.live_image_views.get() - 1);
    }

    fn create_sampler(&self, _create_info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        self.live_samplers.set(self.live_samplers.get() + 1);
        Ok(vk::Sampler::from_raw(self.next_raw()))
    }

    fn destroy_sampler(&self, _sampler: vk::Sampler) {
        self.live_samplers.set(self.live_samplers.get() - 1);
    }

    fn allocate_command_buffer(&self) -> VkResult<vk::CommandBuffer> {
        Ok(vk::CommandBuffer::from_raw(self.next_raw()))
    }

    fn free_command_buffer(&self, _command_buffer: vk::CommandBuffer) {
        self.freed_command_buffers.set(self.freed_command_buffers.get() + 1);
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let fence = vk::Fence::from_raw(self.next_raw());
        self.fences.borrow_mut().insert(fence.as_raw(), signaled);
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.fences.borrow_mut().remove(&fence.as_raw());
    }

    fn wait_fence(&self, fence: vk::Fence, _timeout_ns: u64) -> VkResult<()> {
        let was_signaled = self.is_fence_signaled(fence);
        self.fence_waits.borrow_mut().push(FenceWait { fence, was_signaled });
        if was_signaled {
            return Ok(());
        }
        match self.fence_behavior.get() {
            FenceBehavior::CompleteOnWait => {
                self.fences.borrow_mut().insert(fence.as_raw(), true);
                Ok(())
            }
            FenceBehavior::Hang => Err(vk::Result::TIMEOUT),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        self.fences.borrow_mut().insert(fence.as_raw(), false);
        Ok(())
    }

    fn fence_signaled(&self, fence: vk::Fence) -> VkResult<bool> {
        Ok(self.is_fence_signaled(fence))
    }

    fn submit(&self, command_buffer: vk::CommandBuffer, fence: vk::Fence) -> VkResult<()> {
        if let Some(error) = self.fail_next_submit.take() {
            return Err(error);
        }
        self.submissions.borrow_mut().push((command_buffer, fence));
        Ok(())
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        let mut records = self.descriptor_writes.borrow_mut();
        for write in writes {
            let count = write.descriptor_count as usize;
            // SAFETY: 指针来自调用者在本次调用期间保持存活的数组
            let buffers = if write.p_buffer_info.is_null() {
                vec![]
            } else {
                unsafe { std::slice::from_raw_parts(write.p_buffer_info, count).to_vec() }
            };
            let images = if write.p_image_info.is_null() {
                vec![]
            } else {
                unsafe { std::slice::from_raw_parts(write.p_image_info, count).to_vec() }
            };
            records.push(DescriptorWriteRecord {
                dst_set: write.dst_set,
                binding: write.dst_binding,
                descriptor_type: write.descriptor_type,
                count: write.descriptor_count,
                buffers,
                images,
            });
        }
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.complete_all();
        Ok(())
    }

    fn set_debug_name(&self, object_type: vk::ObjectType, raw_handle: u64, name: &str) {
        self.debug_names.borrow_mut().push((object_type, raw_handle, name.to_string()));
    }
}

impl CommandEncoder for MockDevice {
    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        self.record(command_buffer, RecordedCommand::Begin(flags));
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        if let Some(error) = self.fail_next_end.take() {
            return Err(error);
        }
        self.record(command_buffer, RecordedCommand::End);
        Ok(())
    }

    fn cmd_begin_render_pass(&self, command_buffer: vk::CommandBuffer, begin_info: &vk::RenderPassBeginInfo<'_>) {
        self.record(
            command_buffer,
            RecordedCommand::BeginRenderPass {
                render_pass: begin_info.render_pass,
                clear_value_count: begin_info.clear_value_count,
            },
        );
    }

    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        self.record(command_buffer, RecordedCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    ) {
        self.record(command_buffer, RecordedCommand::BindPipeline(bind_point, pipeline));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        _layout: vk::PipelineLayout,
        _first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        self.record(command_buffer, RecordedCommand::BindDescriptorSets(bind_point, descriptor_sets.to_vec()));
    }

    fn cmd_bind_vertex_buffers(
        &self,
        command_buffer: vk::CommandBuffer,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        self.record(
            command_buffer,
            RecordedCommand::BindVertexBuffers {
                first_binding,
                buffers: buffers.to_vec(),
                offsets: offsets.to_vec(),
            },
        );
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        _offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        self.record(command_buffer, RecordedCommand::BindIndexBuffer(buffer, index_type));
    }

    fn cmd_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(
            command_buffer,
            RecordedCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            },
        );
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: vk::CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(
            command_buffer,
            RecordedCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
            },
        );
    }

    fn cmd_dispatch(&self, command_buffer: vk::CommandBuffer, group_cnt: glam::UVec3) {
        self.record(command_buffer, RecordedCommand::Dispatch(group_cnt));
    }

    fn cmd_set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: &vk::Viewport) {
        self.record(command_buffer, RecordedCommand::SetViewport(*viewport));
    }

    fn cmd_set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D) {
        self.record(command_buffer, RecordedCommand::SetScissor(*scissor));
    }

    fn cmd_push_constants(
        &self,
        command_buffer: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        _offset: u32,
        data: &[u8],
    ) {
        self.record(
            command_buffer,
            RecordedCommand::PushConstants {
                stages,
                data: data.to_vec(),
            },
        );
    }

    fn cmd_copy_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        region: &vk::BufferCopy,
    ) {
        self.record(command_buffer, RecordedCommand::CopyBuffer(src, dst, *region));
    }

    fn cmd_copy_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        _src_layout: vk::ImageLayout,
        dst: vk::Image,
        _dst_layout: vk::ImageLayout,
        region: &vk::ImageCopy,
    ) {
        self.record(command_buffer, RecordedCommand::CopyImage(src, dst, *region));
    }

    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        _dst_layout: vk::ImageLayout,
        region: &vk::BufferImageCopy,
    ) {
        self.record(command_buffer, RecordedCommand::CopyBufferToImage(src, dst, *region));
    }

    fn cmd_copy_image_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        _src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        region: &vk::BufferImageCopy,
    ) {
        self.record(command_buffer, RecordedCommand::CopyImageToBuffer(src, dst, *region));
    }

    fn cmd_blit_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        _src_layout: vk::ImageLayout,
        dst: vk::Image,
        _dst_layout: vk::ImageLayout,
        region: &vk::ImageBlit,
        filter: vk::Filter,
    ) {
        self.record(
            command_buffer,
            RecordedCommand::BlitImage {
                src,
                dst,
                region: *region,
                filter,
            },
        );
    }

    fn cmd_pipeline_barrier2(
        &self,
        command_buffer: vk::CommandBuffer,
        _dependency_flags: vk::DependencyFlags,
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
    ) {
        let buffers = buffer_barriers
            .iter()
            .map(|b| BufferBarrierRecord {
                buffer: b.buffer,
                src_access: b.src_access_mask,
                dst_access: b.dst_access_mask,
                offset: b.offset,
                size: b.size,
            })
            .collect();
        let images = image_barriers
            .iter()
            .map(|b| ImageBarrierRecord {
                image: b.image,
                old_layout: b.old_layout,
                new_layout: b.new_layout,
                src_stage: b.src_stage_mask,
                src_access: b.src_access_mask,
                dst_stage: b.dst_stage_mask,
                dst_access: b.dst_access_mask,
                range: b.subresource_range,
            })
            .collect();
        self.record(command_buffer, RecordedCommand::Barrier { buffers, images });
    }

    fn cmd_begin_label(&self, command_buffer: vk::CommandBuffer, label_name: &str, label_color: glam::Vec4) {
        self.record(command_buffer, RecordedCommand::BeginLabel(label_name.to_string(), label_color));
    }

    fn cmd_end_label(&self, command_buffer: vk::CommandBuffer) {
        self.record(command_buffer, RecordedCommand::EndLabel);
    }
}
