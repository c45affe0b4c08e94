use ash::{prelude::VkResult, vk};

use crate::commands::encoder::CommandEncoder;

/// 逻辑设备提供的能力
///
/// device、queue 以及 command pool 的创建属于启动流程，不在这里；
/// 这里只有 RHI 核心需要的对象创建、提交和同步。
pub trait GpuDevice: CommandEncoder {
    fn create_image_view(&self, create_info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_sampler(&self, create_info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler>;

    fn destroy_sampler(&self, sampler: vk::Sampler);

    /// 从设备的 command pool 中分配一个 primary command buffer
    fn allocate_command_buffer(&self) -> VkResult<vk::CommandBuffer>;

    fn free_command_buffer(&self, command_buffer: vk::CommandBuffer);

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;

    fn destroy_fence(&self, fence: vk::Fence);

    /// 超时返回 `Err(vk::Result::TIMEOUT)`
    fn wait_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()>;

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;

    fn fence_signaled(&self, fence: vk::Fence) -> VkResult<bool>;

    /// 提交到图形队列，执行完成后 signal `fence`
    fn submit(&self, command_buffer: vk::CommandBuffer, fence: vk::Fence) -> VkResult<()>;

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]);

    fn wait_idle(&self) -> VkResult<()>;

    /// 没有启用 debug utils 时什么也不做
    fn set_debug_name(&self, _object_type: vk::ObjectType, _raw_handle: u64, _name: &str) {}
}
