use ash::vk;

/// RHI 层可以向上传递的错误
///
/// 越界拷贝、重复 resolve 之类的调用方错误直接 panic，不走这里
#[derive(Debug, thiserror::Error)]
pub enum RhiError {
    #[error("vulkan call failed: {0}")]
    Vk(#[from] vk::Result),

    #[error("fence wait exceeded {timeout_ns} ns, treating the device as lost")]
    FenceTimeout { timeout_ns: u64 },

    #[error("device lost")]
    DeviceLost,
}

pub type RhiResult<T> = Result<T, RhiError>;

impl RhiError {
    /// 将 fence wait 的失败结果归类
    pub fn from_fence_wait(result: vk::Result, timeout_ns: u64) -> Self {
        match result {
            vk::Result::TIMEOUT => Self::FenceTimeout { timeout_ns },
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            other => Self::Vk(other),
        }
    }
}
