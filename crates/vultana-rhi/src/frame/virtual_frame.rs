use ash::vk;

use crate::{
    commands::{command_buffer::RhiCommandBuffer, fence::RhiFence},
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{LogCategory, LogSeverity},
        error::RhiResult,
    },
    resources::stage_buffer::RhiStageBuffer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualFrameSettings {
    /// 同时在 GPU 上执行的帧数，也是 CPU 最多领先 GPU 的帧数
    pub frame_count: usize,
    pub stage_buffer_size: vk::DeviceSize,
    /// 等待 fence 的超时时间，超时视为 device lost
    pub fence_timeout_ns: u64,
}

impl Default for VirtualFrameSettings {
    fn default() -> Self {
        Self {
            frame_count: 3,
            stage_buffer_size: 64 * 1024 * 1024,
            fence_timeout_ns: u64::MAX,
        }
    }
}

/// 一帧独占的资源：command buffer、staging buffer 以及帧结束时 signal 的 fence
pub struct VirtualFrame {
    pub command_buffer: RhiCommandBuffer,
    pub stage_buffer: RhiStageBuffer,
    pub fence: RhiFence,

    /// 已经提交且还没有观察到 fence 完成
    in_flight: bool,
}

impl VirtualFrame {
    fn new(ctx: &RenderDeviceContext, stage_buffer_size: vk::DeviceSize, index: usize) -> RhiResult<Self> {
        Ok(Self {
            command_buffer: RhiCommandBuffer::new(ctx, format!("frame-{index}"))?,
            stage_buffer: RhiStageBuffer::new(ctx, stage_buffer_size, format!("frame-{index}-stage"))?,
            fence: RhiFence::new(ctx, true, &format!("frame-{index}-fence"))?,
            in_flight: false,
        })
    }
}

/// N 个 [`VirtualFrame`] 组成的环
///
/// `start_frame` 等待下一个 slot 上一次提交的工作完成后切换过去；
/// `end_frame` reset fence 并提交 command buffer，完成时 signal slot 的 fence。
///
/// 每次提交之后 slot 的 staging 只在第一次等到 fence 时 reset 一次，
/// 因此通过 `next_frame_mut` 提前写入的数据在 `start_frame` 之后仍然保留。
pub struct VirtualFrameProvider {
    ctx: RenderDeviceContext,
    settings: VirtualFrameSettings,

    frames: Vec<VirtualFrame>,
    current_index: usize,
    /// 是否调用过 start_frame
    started: bool,
    frame_running: bool,
    present_image_index: u32,
}

// new & init
impl VirtualFrameProvider {
    pub fn new(ctx: &RenderDeviceContext, settings: VirtualFrameSettings) -> RhiResult<Self> {
        assert!(settings.frame_count > 0, "virtual frame count must be positive");

        let frames = (0..settings.frame_count)
            .map(|index| VirtualFrame::new(ctx, settings.stage_buffer_size, index))
            .collect::<RhiResult<Vec<_>>>()?;

        ctx.log(
            LogSeverity::Info,
            LogCategory::Frame,
            format_args!(
                "created {} virtual frames with {} bytes of staging each",
                settings.frame_count, settings.stage_buffer_size
            ),
        );

        Ok(Self {
            ctx: ctx.clone(),
            settings,
            frames,
            current_index: 0,
            started: false,
            frame_running: false,
            present_image_index: 0,
        })
    }

    /// 等待所有 frame 执行完毕后释放
    pub fn destroy(&mut self) -> RhiResult<()> {
        for frame in self.frames.iter().filter(|frame| frame.in_flight) {
            frame.fence.wait(self.settings.fence_timeout_ns)?;
        }
        self.frames.clear();
        self.started = false;
        self.frame_running = false;
        Ok(())
    }
}

// getters
impl VirtualFrameProvider {
    #[inline]
    pub fn settings(&self) -> &VirtualFrameSettings {
        &self.settings
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn is_frame_running(&self) -> bool {
        self.frame_running
    }

    #[inline]
    pub fn present_image_index(&self) -> u32 {
        self.present_image_index
    }

    /// acquire swapchain image 之后由调用方设置
    #[inline]
    pub fn set_present_image_index(&mut self, index: u32) {
        self.present_image_index = index;
    }

    pub fn current_frame(&self) -> &VirtualFrame {
        assert!(self.started, "current_frame is called before start_frame");
        &self.frames[self.current_index]
    }

    pub fn current_frame_mut(&mut self) -> &mut VirtualFrame {
        assert!(self.started, "current_frame is called before start_frame");
        &mut self.frames[self.current_index]
    }

    #[inline]
    fn next_index(&self) -> usize {
        (self.current_index + 1) % self.frames.len()
    }

    /// 环中的下一帧，只读访问不等待 GPU
    pub fn next_frame(&self) -> &VirtualFrame {
        &self.frames[self.next_index()]
    }

    /// 环中的下一帧，用于提前准备数据
    ///
    /// 会先等待这一帧上一次的提交完成并清空它的 staging，写入的数据保留到该帧提交
    pub fn next_frame_mut(&mut self) -> RhiResult<&mut VirtualFrame> {
        let index = self.next_index();
        self.prepare_frame(index)?;
        Ok(&mut self.frames[index])
    }
}

// phase call
impl VirtualFrame {
    fn submit(&mut self, ctx: &RenderDeviceContext) -> RhiResult<()> {
        self.stage_buffer.flush()?;
        self.command_buffer.end()?;
        self.fence.reset()?;
        ctx.device().submit(self.command_buffer.handle(), self.fence.handle())?;
        Ok(())
    }
}

impl VirtualFrameProvider {
    /// 切换到下一帧，等待该帧上一次的提交执行完成后开始录制
    ///
    /// fence 等待超时返回 [`RhiError::FenceTimeout`](crate::foundation::error::RhiError::FenceTimeout)，
    /// 此时当前帧不变，可以再次调用
    pub fn start_frame(&mut self) -> RhiResult<()> {
        assert!(!self.frame_running, "start_frame is called twice without end_frame");
        assert!(!self.frames.is_empty(), "virtual frame provider is destroyed");

        let index = if self.started { self.next_index() } else { 0 };
        self.prepare_frame(index)?;

        self.current_index = index;
        self.started = true;
        self.frames[index].command_buffer.begin()?;

        self.frame_running = true;
        Ok(())
    }

    /// 结束录制并提交，提交的工作完成后 signal 当前帧的 fence
    ///
    /// 提交失败时这一帧的 staging 被丢弃，下一次使用该 slot 不需要等待
    pub fn end_frame(&mut self) -> RhiResult<()> {
        assert!(self.frame_running, "end_frame is called without start_frame");
        self.frame_running = false;

        let index = self.current_index;
        let frame = &mut self.frames[index];
        if let Err(e) = frame.submit(&self.ctx) {
            frame.stage_buffer.reset();
            self.ctx.log(
                LogSeverity::Error,
                LogCategory::Frame,
                format_args!("failed to submit virtual frame {index}: {e}"),
            );
            return Err(e);
        }
        frame.in_flight = true;
        Ok(())
    }

    /// 等待 slot 上一次的提交完成，并清空它的 staging
    ///
    /// 同一次提交只处理一次，已经等到的 slot 直接返回
    fn prepare_frame(&mut self, index: usize) -> RhiResult<()> {
        let timeout_ns = self.settings.fence_timeout_ns;
        let frame = &mut self.frames[index];
        if !frame.in_flight {
            return Ok(());
        }
        if let Err(e) = frame.fence.wait(timeout_ns) {
            self.ctx.log(
                LogSeverity::Error,
                LogCategory::Frame,
                format_args!("failed to wait virtual frame {index}: {e}"),
            );
            return Err(e);
        }
        frame.stage_buffer.reset();
        frame.in_flight = false;
        Ok(())
    }
}
