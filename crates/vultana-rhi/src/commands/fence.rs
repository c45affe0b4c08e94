use ash::vk;

use crate::foundation::{
    context::RenderDeviceContext,
    debug_type::DebugType,
    error::{RhiError, RhiResult},
};

/// CPU 等待 GPU 完成一次提交的 fence，drop 时销毁
pub struct RhiFence {
    ctx: RenderDeviceContext,
    fence: vk::Fence,
}

impl DebugType for RhiFence {
    fn debug_type_name() -> &'static str {
        "RhiFence"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.fence
    }
}

impl Drop for RhiFence {
    fn drop(&mut self) {
        self.ctx.device().destroy_fence(self.fence);
    }
}

/// 创建与销毁
impl RhiFence {
    /// # param
    /// * signaled - 是否创建时就 signaled
    pub fn new(ctx: &RenderDeviceContext, signaled: bool, debug_name: &str) -> RhiResult<Self> {
        let fence = ctx.device().create_fence(signaled)?;
        let fence = Self {
            ctx: ctx.clone(),
            fence,
        };
        ctx.set_debug_name(&fence, debug_name);
        Ok(fence)
    }
}

/// getters
impl RhiFence {
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

/// tools
impl RhiFence {
    /// 阻塞等待 fence，超时返回 [`RhiError::FenceTimeout`]
    pub fn wait(&self, timeout_ns: u64) -> RhiResult<()> {
        self.ctx.device().wait_fence(self.fence, timeout_ns).map_err(|e| RhiError::from_fence_wait(e, timeout_ns))
    }

    #[inline]
    pub fn reset(&self) -> RhiResult<()> {
        self.ctx.device().reset_fence(self.fence)?;
        Ok(())
    }

    #[inline]
    pub fn is_signaled(&self) -> RhiResult<bool> {
        Ok(self.ctx.device().fence_signaled(self.fence)?)
    }
}
