use std::fmt;

/// 日志来源，作为 `log` 的 target 使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Memory,
    Resource,
    Command,
    Descriptor,
    Frame,
}

impl LogCategory {
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Memory => "vultana::memory",
            LogCategory::Resource => "vultana::resource",
            LogCategory::Command => "vultana::command",
            LogCategory::Descriptor => "vultana::descriptor",
            LogCategory::Frame => "vultana::frame",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

/// 日志能力，由 [`RenderDeviceContext`](crate::foundation::context::RenderDeviceContext) 注入到各个组件
pub trait DebugLogger {
    fn log(&self, severity: LogSeverity, category: LogCategory, message: fmt::Arguments<'_>);
}

/// 默认实现：转发给 `log` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogForwarder;

impl DebugLogger for LogForwarder {
    fn log(&self, severity: LogSeverity, category: LogCategory, message: fmt::Arguments<'_>) {
        let target = category.target();
        match severity {
            LogSeverity::Info => log::info!(target: target, "{}", message),
            LogSeverity::Warning => log::warn!(target: target, "{}", message),
            LogSeverity::Error => log::error!(target: target, "{}", message),
        }
    }
}
