use std::cell::Cell;

use ash::vk::{self, Handle};
use itertools::Itertools;

use crate::{
    basic::{
        color::LabelColor,
        types::{BlitFilter, Rect2D, Viewport},
    },
    commands::barrier::{RhiBufferBarrier, RhiImageBarrier},
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{LogCategory, LogSeverity},
        debug_type::DebugType,
        device::GpuDevice,
        error::RhiResult,
    },
    pipelines::render_pass::NativeRenderPass,
    resources::{buffer::RhiBuffer, image::RhiImage},
    usage::{
        translation::{bind_point_to_shader_stages, blit_filter_to_native},
        usage::{BufferUsage, ImageUsage},
    },
};

/// push constant 的大小上限
pub const MAX_PUSH_CONSTANT_SIZE: usize = 128;

/// copy 命令中 image 的一方
///
/// `usage` 是 image 当前所处的用途，由调用者维护
#[derive(Clone, Copy)]
pub struct ImageInfo<'a> {
    pub image: &'a RhiImage,
    pub usage: ImageUsage,
    pub mip_level: u32,
    pub layer: u32,
}

impl<'a> ImageInfo<'a> {
    #[inline]
    pub fn new(image: &'a RhiImage, usage: ImageUsage) -> Self {
        Self {
            image,
            usage,
            mip_level: 0,
            layer: 0,
        }
    }

    /// builder
    #[inline]
    pub fn mip_level(mut self, mip_level: u32) -> Self {
        self.mip_level = mip_level;
        self
    }

    /// builder
    #[inline]
    pub fn layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

#[derive(Clone, Copy)]
pub struct BufferInfo<'a> {
    pub buffer: &'a RhiBuffer,
    pub offset: vk::DeviceSize,
}

impl<'a> BufferInfo<'a> {
    #[inline]
    pub fn new(buffer: &'a RhiBuffer) -> Self {
        Self { buffer, offset: 0 }
    }

    /// builder
    #[inline]
    pub fn offset(mut self, offset: vk::DeviceSize) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Initial,
    Recording,
    InPass,
    Executable,
}

/// 命令缓冲封装
///
/// 录制 draw/dispatch/copy/blit 命令，并根据调用者给出的新旧用途插入 barrier。
/// 资源当前的用途不在这里缓存，完全由参数决定。
///
/// # 使用示例
/// ```ignore
/// let cmd = RhiCommandBuffer::new(&ctx, "upload")?;
/// cmd.begin()?;
/// cmd.copy_buffer_to_image(BufferInfo::new(&stage), ImageInfo::new(&texture, ImageUsage::Unknown));
/// cmd.generate_mip_levels(&texture, ImageUsage::TransferDestination, BlitFilter::Linear);
/// cmd.end()?;
/// ```
pub struct RhiCommandBuffer {
    ctx: RenderDeviceContext,
    handle: vk::CommandBuffer,
    state: Cell<RecorderState>,

    debug_name: String,
}

impl DebugType for RhiCommandBuffer {
    fn debug_type_name() -> &'static str {
        "RhiCommandBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for RhiCommandBuffer {
    fn drop(&mut self) {
        self.ctx.device().free_command_buffer(self.handle);
    }
}

// new & init
impl RhiCommandBuffer {
    pub fn new(ctx: &RenderDeviceContext, debug_name: impl AsRef<str>) -> RhiResult<Self> {
        let handle = ctx.device().allocate_command_buffer()?;
        let cmd = Self {
            ctx: ctx.clone(),
            handle,
            state: Cell::new(RecorderState::Initial),
            debug_name: debug_name.as_ref().to_string(),
        };
        ctx.set_debug_name(&cmd, &cmd.debug_name);
        Ok(cmd)
    }
}

// getters
impl RhiCommandBuffer {
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    #[inline]
    pub fn state(&self) -> RecorderState {
        self.state.get()
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        matches!(self.state.get(), RecorderState::Recording | RecorderState::InPass)
    }

    #[inline]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    #[inline]
    fn device(&self) -> &dyn GpuDevice {
        self.ctx.device()
    }
}

// Basic 命令
impl RhiCommandBuffer {
    /// 开始录制 command，自动设置 debug label
    pub fn begin(&self) -> RhiResult<()> {
        assert!(
            !self.is_recording(),
            "command buffer {} is already recording",
            self.debug_name
        );
        if let Err(e) = self.device().begin_command_buffer(self.handle, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
        {
            self.ctx.log(
                LogSeverity::Error,
                LogCategory::Command,
                format_args!("failed to begin command buffer {}: {e}", self.debug_name),
            );
            return Err(e.into());
        }
        self.state.set(RecorderState::Recording);
        self.begin_label(&self.debug_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command，结束 debug label
    ///
    /// 失败时回到 `Initial`，需要重新 begin
    pub fn end(&self) -> RhiResult<()> {
        assert_eq!(
            self.state.get(),
            RecorderState::Recording,
            "command buffer {} ended while not recording or inside a pass",
            self.debug_name
        );
        self.end_label();
        if let Err(e) = self.device().end_command_buffer(self.handle) {
            self.state.set(RecorderState::Initial);
            self.ctx.log(
                LogSeverity::Error,
                LogCategory::Command,
                format_args!("failed to end command buffer {}: {e}", self.debug_name),
            );
            return Err(e.into());
        }
        self.state.set(RecorderState::Executable);
        Ok(())
    }

    /// 没有 render pass handle 时不会开启 render pass，pipeline 与 descriptor set 存在时才绑定
    pub fn begin_pass(&self, pass: &NativeRenderPass) {
        assert_eq!(self.state.get(), RecorderState::Recording, "begin_pass outside of recording");
        if !pass.name.is_empty() {
            self.begin_label(&pass.name, LabelColor::COLOR_PASS);
        }
        if pass.has_render_pass() {
            self.device().cmd_begin_render_pass(self.handle, &pass.begin_info());
        }
        if !pass.pipeline.is_null() {
            self.device().cmd_bind_pipeline(self.handle, pass.bind_point, pass.pipeline);
        }
        if !pass.descriptor_set.is_null() {
            self.device().cmd_bind_descriptor_sets(
                self.handle,
                pass.bind_point,
                pass.pipeline_layout,
                0,
                std::slice::from_ref(&pass.descriptor_set),
            );
        }
        self.state.set(RecorderState::InPass);
    }

    pub fn end_pass(&self, pass: &NativeRenderPass) {
        assert_eq!(self.state.get(), RecorderState::InPass, "end_pass without begin_pass");
        if pass.has_render_pass() {
            self.device().cmd_end_render_pass(self.handle);
        }
        if !pass.name.is_empty() {
            self.end_label();
        }
        self.state.set(RecorderState::Recording);
    }
}

// debug label
impl RhiCommandBuffer {
    #[inline]
    pub fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        self.device().cmd_begin_label(self.handle, label_name, label_color);
    }

    #[inline]
    pub fn end_label(&self) {
        self.device().cmd_end_label(self.handle);
    }
}

// 绘制与状态
impl RhiCommandBuffer {
    /// - command type: action
    /// - supported queue types: graphics
    #[inline]
    pub fn draw(&self, vertex_count: u32, instance_count: u32) {
        self.draw_full(vertex_count, instance_count, 0, 0);
    }

    /// - command type: action
    /// - supported queue types: graphics
    #[inline]
    pub fn draw_full(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.device().cmd_draw(self.handle, vertex_count, instance_count, first_vertex, first_instance);
    }

    /// - command type: action
    /// - supported queue types: graphics
    #[inline]
    pub fn draw_indexed(&self, index_count: u32, instance_count: u32) {
        self.draw_indexed_full(index_count, instance_count, 0, 0, 0);
    }

    /// - command type: action
    /// - supported queue types: graphics
    #[inline]
    pub fn draw_indexed_full(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.device().cmd_draw_indexed(
            self.handle,
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    /// - command type: action
    /// - supported queue types: compute
    #[inline]
    pub fn dispatch(&self, group_cnt: glam::UVec3) {
        self.device().cmd_dispatch(self.handle, group_cnt);
    }

    /// 从 binding 0 开始依次绑定，offset 均为 0
    ///
    /// - command type: state
    /// - supported queue types: graphics
    pub fn bind_vertex_buffers(&self, buffers: &[&RhiBuffer]) {
        let handles = buffers.iter().map(|b| b.handle()).collect_vec();
        let offsets = vec![0; handles.len()];
        self.device().cmd_bind_vertex_buffers(self.handle, 0, &handles, &offsets);
    }

    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn bind_index_buffer_u32(&self, index_buffer: &RhiBuffer) {
        self.device().cmd_bind_index_buffer(self.handle, index_buffer.handle(), 0, vk::IndexType::UINT32);
    }

    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn bind_index_buffer_u16(&self, index_buffer: &RhiBuffer) {
        self.device().cmd_bind_index_buffer(self.handle, index_buffer.handle(), 0, vk::IndexType::UINT16);
    }

    /// Y 轴翻转：原点移到 `offset_y + height`，高度取负，使坐标系原点位于左上角
    ///
    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn set_viewport(&self, viewport: &Viewport) {
        self.device().cmd_set_viewport(self.handle, &viewport.to_native_flipped());
    }

    /// - command type: state
    /// - supported queue types: graphics
    #[inline]
    pub fn set_scissor(&self, scissor: &Rect2D) {
        self.device().cmd_set_scissor(self.handle, &scissor.to_native());
    }

    /// viewport 与 scissor 都覆盖整个 image
    pub fn set_render_area(&self, image: &RhiImage) {
        let (width, height) = (image.width(), image.height());
        self.set_viewport(&Viewport::new(0.0, 0.0, width as f32, height as f32, 0.0, 1.0));
        self.set_scissor(&Rect2D::new(0, 0, width, height));
    }

    /// stage 为 pass 的 bind point 下所有可能的 shader stage
    ///
    /// - command type: state
    /// - supported queue types: graphics, compute
    pub fn push_constants(&self, pass: &NativeRenderPass, data: &[u8]) {
        assert!(
            data.len() <= MAX_PUSH_CONSTANT_SIZE,
            "push constants of {} bytes exceed the {} bytes limit",
            data.len(),
            MAX_PUSH_CONSTANT_SIZE
        );
        let mut push_constants = [0u8; MAX_PUSH_CONSTANT_SIZE];
        push_constants[..data.len()].copy_from_slice(data);

        self.device().cmd_push_constants(
            self.handle,
            pass.pipeline_layout,
            bind_point_to_shader_stages(pass.bind_point),
            0,
            &push_constants[..data.len()],
        );
    }

    #[inline]
    pub fn push_constants_pod<T: bytemuck::Pod>(&self, pass: &NativeRenderPass, constants: &T) {
        self.push_constants(pass, bytemuck::bytes_of(constants));
    }
}

// 数据传输类型
impl RhiCommandBuffer {
    /// - command type: action
    /// - supported queue types: transfer, graphics, compute
    pub fn copy_buffer(&self, src: BufferInfo, dst: BufferInfo, size: vk::DeviceSize) {
        assert!(src.offset + size <= src.buffer.size(), "copy_buffer reads past the end of {}", src.buffer.debug_name());
        assert!(dst.offset + size <= dst.buffer.size(), "copy_buffer writes past the end of {}", dst.buffer.debug_name());

        let region = vk::BufferCopy {
            src_offset: src.offset,
            dst_offset: dst.offset,
            size,
        };
        self.device().cmd_copy_buffer(self.handle, src.buffer.handle(), dst.buffer.handle(), &region);
    }

    /// 拷贝的范围为 dst 对应 mip 的大小
    ///
    /// - command type: action
    /// - supported queue types: transfer, graphics, compute
    pub fn copy_image(&self, src: ImageInfo, dst: ImageInfo) {
        self.transition_to_transfer(src.image, src.usage, dst.image, dst.usage);

        let region = vk::ImageCopy {
            src_subresource: src.image.subresource_layers(src.mip_level, src.layer),
            src_offset: vk::Offset3D::default(),
            dst_subresource: dst.image.subresource_layers(dst.mip_level, dst.layer),
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D {
                width: dst.image.mip_level_width(dst.mip_level),
                height: dst.image.mip_level_height(dst.mip_level),
                depth: 1,
            },
        };
        self.device().cmd_copy_image(
            self.handle,
            src.image.handle(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.image.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &region,
        );
    }

    /// - command type: action
    /// - supported queue types: transfer, graphics, compute
    pub fn copy_buffer_to_image(&self, src: BufferInfo, dst: ImageInfo) {
        assert!(
            src.offset < src.buffer.size(),
            "copy_buffer_to_image reads past the end of {}",
            src.buffer.debug_name()
        );
        if dst.usage != ImageUsage::TransferDestination {
            self.image_memory_barrier(&[RhiImageBarrier::new()
                .image(dst.image.handle())
                .usage_transfer(dst.usage, ImageUsage::TransferDestination)
                .subresource_range(dst.image.subresource_range())]);
        }

        let region = Self::buffer_image_copy(src.offset, &dst);
        self.device().cmd_copy_buffer_to_image(
            self.handle,
            src.buffer.handle(),
            dst.image.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &region,
        );
    }

    /// - command type: action
    /// - supported queue types: transfer, graphics, compute
    pub fn copy_image_to_buffer(&self, src: ImageInfo, dst: BufferInfo) {
        assert!(
            dst.offset < dst.buffer.size(),
            "copy_image_to_buffer writes past the end of {}",
            dst.buffer.debug_name()
        );
        if src.usage != ImageUsage::TransferSource {
            self.image_memory_barrier(&[RhiImageBarrier::new()
                .image(src.image.handle())
                .usage_transfer(src.usage, ImageUsage::TransferSource)
                .subresource_range(src.image.subresource_range())]);
        }

        let region = Self::buffer_image_copy(dst.offset, &src);
        self.device().cmd_copy_image_to_buffer(
            self.handle,
            src.image.handle(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.buffer.handle(),
            &region,
        );
    }

    /// 源与目标都使用整个 image 的大小
    ///
    /// - command type: action
    /// - supported queue types: graphics
    pub fn blit_image(
        &self,
        src: &RhiImage,
        src_usage: ImageUsage,
        dst: &RhiImage,
        dst_usage: ImageUsage,
        filter: BlitFilter,
    ) {
        self.transition_to_transfer(src, src_usage, dst, dst_usage);

        let region = vk::ImageBlit {
            src_subresource: src.subresource_layers(0, 0),
            src_offsets: [vk::Offset3D::default(), Self::extent_offset(src.width(), src.height())],
            dst_subresource: dst.subresource_layers(0, 0),
            dst_offsets: [vk::Offset3D::default(), Self::extent_offset(dst.width(), dst.height())],
        };
        self.device().cmd_blit_image(
            self.handle,
            src.handle(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst.handle(),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &region,
            blit_filter_to_native(filter),
        );
    }

    /// 逐级 blit 生成 mip 链
    ///
    /// 结束后所有 mip 都处于 transfer destination 用途。mip 少于 2 级时什么也不做。
    ///
    /// - command type: action
    /// - supported queue types: graphics
    pub fn generate_mip_levels(&self, image: &RhiImage, initial_usage: ImageUsage, filter: BlitFilter) {
        let mip_level_count = image.mip_level_count();
        if mip_level_count < 2 {
            return;
        }

        self.begin_label(&format!("generate mips of {}", image.debug_name()), LabelColor::COLOR_TRANSFER);

        let layer_count = image.layer_count();
        let layers = |mip_level: u32| vk::ImageSubresourceLayers {
            mip_level,
            layer_count,
            ..image.subresource_layers(mip_level, 0)
        };

        let mut src_usage = initial_usage;
        let mut dst_width = image.width();
        let mut dst_height = image.height();
        for src_level in 0..mip_level_count - 1 {
            let (src_width, src_height) = (dst_width, dst_height);
            dst_width = (src_width / 2).max(1);
            dst_height = (src_height / 2).max(1);

            self.image_memory_barrier(&[
                RhiImageBarrier::new()
                    .image(image.handle())
                    .usage_transfer(src_usage, ImageUsage::TransferSource)
                    .subresource_range(image.mip_range(src_level, 1)),
                RhiImageBarrier::new()
                    .image(image.handle())
                    .usage_transfer(ImageUsage::Unknown, ImageUsage::TransferDestination)
                    .subresource_range(image.mip_range(src_level + 1, 1)),
            ]);
            // 下一级的源就是这一级刚写入的 mip
            src_usage = ImageUsage::TransferDestination;

            let region = vk::ImageBlit {
                src_subresource: layers(src_level),
                src_offsets: [vk::Offset3D::default(), Self::extent_offset(src_width, src_height)],
                dst_subresource: layers(src_level + 1),
                dst_offsets: [vk::Offset3D::default(), Self::extent_offset(dst_width, dst_height)],
            };
            self.device().cmd_blit_image(
                self.handle,
                image.handle(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &region,
                blit_filter_to_native(filter),
            );
        }

        // 除最后一级外都还是 transfer source，统一到 transfer destination
        self.image_memory_barrier(&[RhiImageBarrier::new()
            .image(image.handle())
            .usage_transfer(ImageUsage::TransferSource, ImageUsage::TransferDestination)
            .subresource_range(image.mip_range(0, mip_level_count - 1))]);
        self.end_label();
    }

    fn buffer_image_copy(buffer_offset: vk::DeviceSize, image: &ImageInfo) -> vk::BufferImageCopy {
        vk::BufferImageCopy {
            buffer_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: image.image.subresource_layers(image.mip_level, image.layer),
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: image.image.mip_level_width(image.mip_level),
                height: image.image.mip_level_height(image.mip_level),
                depth: 1,
            },
        }
    }

    #[inline]
    fn extent_offset(width: u32, height: u32) -> vk::Offset3D {
        vk::Offset3D {
            x: width as i32,
            y: height as i32,
            z: 1,
        }
    }

    /// src 转到 transfer source，dst 转到 transfer destination，已经处于目标用途的跳过
    fn transition_to_transfer(&self, src: &RhiImage, src_usage: ImageUsage, dst: &RhiImage, dst_usage: ImageUsage) {
        let mut barriers = Vec::with_capacity(2);
        if src_usage != ImageUsage::TransferSource {
            barriers.push(
                RhiImageBarrier::new()
                    .image(src.handle())
                    .usage_transfer(src_usage, ImageUsage::TransferSource)
                    .subresource_range(src.subresource_range()),
            );
        }
        if dst_usage != ImageUsage::TransferDestination {
            barriers.push(
                RhiImageBarrier::new()
                    .image(dst.handle())
                    .usage_transfer(dst_usage, ImageUsage::TransferDestination)
                    .subresource_range(dst.subresource_range()),
            );
        }
        if !barriers.is_empty() {
            self.image_memory_barrier(&barriers);
        }
    }
}

// 同步命令
impl RhiCommandBuffer {
    /// - command type: synchronization
    /// - supported queue types: transfer, graphics, compute
    pub fn image_memory_barrier(&self, barriers: &[RhiImageBarrier]) {
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        self.device().cmd_pipeline_barrier2(self.handle, vk::DependencyFlags::empty(), &[], &barriers);
    }

    /// - command type: synchronization
    /// - supported queue types: transfer, graphics, compute
    pub fn buffer_memory_barrier(&self, barriers: &[RhiBufferBarrier]) {
        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        self.device().cmd_pipeline_barrier2(self.handle, vk::DependencyFlags::empty(), &barriers, &[]);
    }

    /// 整个 image 从 old_usage 转到 new_usage
    pub fn transfer_layout(&self, image: &RhiImage, old_usage: ImageUsage, new_usage: ImageUsage) {
        self.transfer_layouts(std::slice::from_ref(&image), old_usage, new_usage);
    }

    /// 同一种转换应用到多个 image，每个 image 使用自己的 subresource range
    pub fn transfer_layouts(&self, images: &[&RhiImage], old_usage: ImageUsage, new_usage: ImageUsage) {
        let barriers = images
            .iter()
            .map(|image| {
                RhiImageBarrier::new()
                    .image(image.handle())
                    .usage_transfer(old_usage, new_usage)
                    .subresource_range(image.subresource_range())
            })
            .collect_vec();
        self.image_memory_barrier(&barriers);
    }

    pub fn transfer_buffer_usage(&self, buffer: &RhiBuffer, old_usage: BufferUsage, new_usage: BufferUsage) {
        self.buffer_memory_barrier(&[RhiBufferBarrier::new()
            .usage_transfer(old_usage, new_usage)
            .buffer(buffer.handle(), 0, buffer.size())]);
    }
}
