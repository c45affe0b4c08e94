use std::ffi::CString;

use ash::{prelude::VkResult, vk};

use crate::{commands::encoder::CommandEncoder, foundation::device::GpuDevice};

/// debug utils 使用的名字，内部的 nul 替换为空格
fn debug_cstring(name: &str) -> CString {
    CString::new(name.replace('\0', " ")).unwrap_or_default()
}

/// 基于 ash 的 [`GpuDevice`] 实现
///
/// device 与 queue 由启动流程创建并传入，这里只负责一个 command pool 的生命周期。
/// 所有命令通过 synchronization2 录制 barrier。
pub struct AshDevice {
    device: ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    /// 调试工具扩展 API，没有启用 `VK_EXT_debug_utils` 时为 None
    debug_utils: Option<ash::ext::debug_utils::Device>,
}

// 构造与销毁
impl AshDevice {
    pub fn new(
        device: ash::Device,
        queue: vk::Queue,
        queue_family_index: u32,
        debug_utils: Option<ash::ext::debug_utils::Device>,
    ) -> VkResult<Self> {
        let pool_ci = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { device.create_command_pool(&pool_ci, None)? };
        log::info!("AshDevice created command pool for queue family {}", queue_family_index);

        Ok(Self {
            device,
            queue,
            command_pool,
            debug_utils,
        })
    }
}

impl Drop for AshDevice {
    fn drop(&mut self) {
        unsafe {
            // command buffer 可能还在执行
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

// getters
impl AshDevice {
    #[inline]
    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }
}

impl GpuDevice for AshDevice {
    fn create_image_view(&self, create_info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        unsafe { self.device.create_image_view(create_info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_sampler(&self, create_info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        unsafe { self.device.create_sampler(create_info, None) }
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) }
    }

    fn allocate_command_buffer(&self) -> VkResult<vk::CommandBuffer> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffers = unsafe { self.device.allocate_command_buffers(&info)? };
        command_buffers.into_iter().next().ok_or(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
    }

    fn free_command_buffer(&self, command_buffer: vk::CommandBuffer) {
        unsafe { self.device.free_command_buffers(self.command_pool, std::slice::from_ref(&command_buffer)) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let fence_flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        unsafe { self.device.create_fence(&vk::FenceCreateInfo::default().flags(fence_flags), None) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(std::slice::from_ref(&fence), true, timeout_ns) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.reset_fences(std::slice::from_ref(&fence)) }
    }

    fn fence_signaled(&self, fence: vk::Fence) -> VkResult<bool> {
        unsafe { self.device.get_fence_status(fence) }
    }

    fn submit(&self, command_buffer: vk::CommandBuffer, fence: vk::Fence) -> VkResult<()> {
        let cmd_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
        let submit_info = vk::SubmitInfo2::default().command_buffer_infos(&cmd_infos);
        unsafe { self.device.queue_submit2(self.queue, std::slice::from_ref(&submit_info), fence) }
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        unsafe { self.device.update_descriptor_sets(writes, &[]) }
    }

    fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn set_debug_name(&self, object_type: vk::ObjectType, raw_handle: u64, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let name = debug_cstring(name);
        let name_info = vk::DebugUtilsObjectNameInfoEXT {
            object_type,
            object_handle: raw_handle,
            p_object_name: name.as_ptr(),
            ..Default::default()
        };
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&name_info) } {
            log::warn!("failed to set debug name {:?}: {:?}", name, e);
        }
    }
}

impl CommandEncoder for AshDevice {
    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        unsafe {
            self.device.begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default().flags(flags))
        }
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(command_buffer) }
    }

    fn cmd_begin_render_pass(&self, command_buffer: vk::CommandBuffer, begin_info: &vk::RenderPassBeginInfo<'_>) {
        unsafe { self.device.cmd_begin_render_pass(command_buffer, begin_info, vk::SubpassContents::INLINE) }
    }

    fn cmd_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(command_buffer) }
    }

    fn cmd_bind_pipeline(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    ) {
        unsafe { self.device.cmd_bind_pipeline(command_buffer, bind_point, pipeline) }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: vk::CommandBuffer,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(command_buffer, bind_point, layout, first_set, descriptor_sets, &[])
        }
    }

    fn cmd_bind_vertex_buffers(
        &self,
        command_buffer: vk::CommandBuffer,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe { self.device.cmd_bind_vertex_buffers(command_buffer, first_binding, buffers, offsets) }
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe { self.device.cmd_bind_index_buffer(command_buffer, buffer, offset, index_type) }
    }

    fn cmd_draw(
        &self,
        command_buffer: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe { self.device.cmd_draw(command_buffer, vertex_count, instance_count, first_vertex, first_instance) }
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: vk::CommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }

    fn cmd_dispatch(&self, command_buffer: vk::CommandBuffer, group_cnt: glam::UVec3) {
        unsafe { self.device.cmd_dispatch(command_buffer, group_cnt.x, group_cnt.y, group_cnt.z) }
    }

    fn cmd_set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: &vk::Viewport) {
        unsafe { self.device.cmd_set_viewport(command_buffer, 0, std::slice::from_ref(viewport)) }
    }

    fn cmd_set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D) {
        unsafe { self.device.cmd_set_scissor(command_buffer, 0, std::slice::from_ref(scissor)) }
    }

    fn cmd_push_constants(
        &self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        unsafe { self.device.cmd_push_constants(command_buffer, layout, stages, offset, data) }
    }

    fn cmd_copy_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        region: &vk::BufferCopy,
    ) {
        unsafe { self.device.cmd_copy_buffer(command_buffer, src, dst, std::slice::from_ref(region)) }
    }

    fn cmd_copy_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: &vk::ImageCopy,
    ) {
        unsafe {
            self.device.cmd_copy_image(command_buffer, src, src_layout, dst, dst_layout, std::slice::from_ref(region))
        }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: &vk::BufferImageCopy,
    ) {
        unsafe {
            self.device.cmd_copy_buffer_to_image(command_buffer, src, dst, dst_layout, std::slice::from_ref(region))
        }
    }

    fn cmd_copy_image_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        region: &vk::BufferImageCopy,
    ) {
        unsafe {
            self.device.cmd_copy_image_to_buffer(command_buffer, src, src_layout, dst, std::slice::from_ref(region))
        }
    }

    fn cmd_blit_image(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: &vk::ImageBlit,
        filter: vk::Filter,
    ) {
        unsafe {
            self.device.cmd_blit_image(
                command_buffer,
                src,
                src_layout,
                dst,
                dst_layout,
                std::slice::from_ref(region),
                filter,
            )
        }
    }

    fn cmd_pipeline_barrier2(
        &self,
        command_buffer: vk::CommandBuffer,
        dependency_flags: vk::DependencyFlags,
        buffer_barriers: &[vk::BufferMemoryBarrier2<'_>],
        image_barriers: &[vk::ImageMemoryBarrier2<'_>],
    ) {
        let dependency_info = vk::DependencyInfo::default()
            .dependency_flags(dependency_flags)
            .buffer_memory_barriers(buffer_barriers)
            .image_memory_barriers(image_barriers);
        unsafe { self.device.cmd_pipeline_barrier2(command_buffer, &dependency_info) }
    }

    fn cmd_begin_label(&self, command_buffer: vk::CommandBuffer, label_name: &str, label_color: glam::Vec4) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let name = debug_cstring(label_name);
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(
                command_buffer,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }

    fn cmd_end_label(&self, command_buffer: vk::CommandBuffer) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.cmd_end_debug_utils_label(command_buffer) }
        }
    }
}
