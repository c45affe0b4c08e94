use std::{fmt, rc::Rc};

use crate::foundation::{
    debug_logger::{DebugLogger, LogCategory, LogForwarder, LogSeverity},
    debug_type::{DebugType, raw_handle},
    device::GpuDevice,
    mem_allocator::GpuAllocator,
};

/// 渲染设备上下文
///
/// 持有 device、allocator 与日志能力，显式传给每一个需要 GPU 的组件。
/// clone 只是增加引用计数，各组件各自保存一份。
#[derive(Clone)]
pub struct RenderDeviceContext {
    device: Rc<dyn GpuDevice>,
    allocator: Rc<dyn GpuAllocator>,
    logger: Rc<dyn DebugLogger>,
}

// new & init
impl RenderDeviceContext {
    /// 日志默认转发给 `log`
    pub fn new(device: Rc<dyn GpuDevice>, allocator: Rc<dyn GpuAllocator>) -> Self {
        Self::with_logger(device, allocator, Rc::new(LogForwarder))
    }

    pub fn with_logger(
        device: Rc<dyn GpuDevice>,
        allocator: Rc<dyn GpuAllocator>,
        logger: Rc<dyn DebugLogger>,
    ) -> Self {
        Self {
            device,
            allocator,
            logger,
        }
    }
}

// getters
impl RenderDeviceContext {
    #[inline]
    pub fn device(&self) -> &dyn GpuDevice {
        self.device.as_ref()
    }

    #[inline]
    pub fn allocator(&self) -> &dyn GpuAllocator {
        self.allocator.as_ref()
    }

    #[inline]
    pub fn logger(&self) -> &dyn DebugLogger {
        self.logger.as_ref()
    }
}

// tools
impl RenderDeviceContext {
    #[inline]
    pub fn log(&self, severity: LogSeverity, category: LogCategory, message: fmt::Arguments<'_>) {
        self.logger.log(severity, category, message);
    }

    /// debug name 的格式为 `Type::name`
    pub fn set_debug_name<T: DebugType>(&self, object: &T, name: impl AsRef<str>) {
        let debug_name = format!("{}::{}", T::debug_type_name(), name.as_ref());
        let (object_type, raw) = raw_handle(object.vk_handle());
        self.device.set_debug_name(object_type, raw, &debug_name);
    }
}
