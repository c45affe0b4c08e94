//! Vultana 的 Vulkan RHI 核心
//!
//! 提供资源用途追踪与 barrier 的自动生成、按名字解析的 descriptor 绑定，以及多帧并行的 virtual frame。
//! 设备、内存分配器与日志通过 [`RenderDeviceContext`](foundation::context::RenderDeviceContext) 显式传入各个组件。

pub mod basic;
pub mod commands;
pub mod descriptors;
pub mod foundation;
pub mod frame;
pub mod pipelines;
pub mod resources;
pub mod usage;

#[cfg(test)]
mod testing;
