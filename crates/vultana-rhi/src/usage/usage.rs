//! buffer / image 的用途
//!
//! 创建资源时使用 `*UsageFlags` 声明能力集合；
//! barrier 使用单个 `*Usage` 表示资源当前所处的用途，该状态由调用者维护，资源本身不记录。

use ash::vk;

bitflags::bitflags! {
    /// buffer 创建时声明的用途集合，位值与 `VkBufferUsageFlags` 相同
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags: u32 {
        const TRANSFER_SOURCE = vk::BufferUsageFlags::TRANSFER_SRC.as_raw();
        const TRANSFER_DESTINATION = vk::BufferUsageFlags::TRANSFER_DST.as_raw();
        const UNIFORM_TEXEL_BUFFER = vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER.as_raw();
        const STORAGE_TEXEL_BUFFER = vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER.as_raw();
        const UNIFORM_BUFFER = vk::BufferUsageFlags::UNIFORM_BUFFER.as_raw();
        const STORAGE_BUFFER = vk::BufferUsageFlags::STORAGE_BUFFER.as_raw();
        const INDEX_BUFFER = vk::BufferUsageFlags::INDEX_BUFFER.as_raw();
        const VERTEX_BUFFER = vk::BufferUsageFlags::VERTEX_BUFFER.as_raw();
        const INDIRECT_BUFFER = vk::BufferUsageFlags::INDIRECT_BUFFER.as_raw();
        const SHADER_DEVICE_ADDRESS = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS.as_raw();
        const TRANSFORM_FEEDBACK_BUFFER = vk::BufferUsageFlags::TRANSFORM_FEEDBACK_BUFFER_EXT.as_raw();
        const TRANSFORM_FEEDBACK_COUNTER_BUFFER = vk::BufferUsageFlags::TRANSFORM_FEEDBACK_COUNTER_BUFFER_EXT.as_raw();
        const CONDITIONAL_RENDERING = vk::BufferUsageFlags::CONDITIONAL_RENDERING_EXT.as_raw();
        const ACCELERATION_STRUCTURE_BUILD_INPUT_READONLY =
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR.as_raw();
        const ACCELERATION_STRUCTURE_STORAGE = vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR.as_raw();
        const SHADER_BINDING_TABLE = vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR.as_raw();
    }
}

impl BufferUsageFlags {
    #[inline]
    pub fn to_native(self) -> vk::BufferUsageFlags {
        vk::BufferUsageFlags::from_raw(self.bits())
    }
}

bitflags::bitflags! {
    /// image 创建时声明的用途集合，位值与 `VkImageUsageFlags` 相同
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsageFlags: u32 {
        const TRANSFER_SOURCE = vk::ImageUsageFlags::TRANSFER_SRC.as_raw();
        const TRANSFER_DESTINATION = vk::ImageUsageFlags::TRANSFER_DST.as_raw();
        const SHADER_READ = vk::ImageUsageFlags::SAMPLED.as_raw();
        const STORAGE = vk::ImageUsageFlags::STORAGE.as_raw();
        const COLOR_ATTACHMENT = vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw();
        const DEPTH_STENCIL_ATTACHMENT = vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT.as_raw();
        const INPUT_ATTACHMENT = vk::ImageUsageFlags::INPUT_ATTACHMENT.as_raw();
        const FRAGMENT_SHADING_RATE_ATTACHMENT = vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR.as_raw();
    }
}

impl ImageUsageFlags {
    #[inline]
    pub fn to_native(self) -> vk::ImageUsageFlags {
        vk::ImageUsageFlags::from_raw(self.bits())
    }
}

/// buffer 当前所处的单一用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    Unknown,
    TransferSource,
    TransferDestination,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    IndexBuffer,
    VertexBuffer,
    IndirectBuffer,
    ShaderDeviceAddress,
    TransformFeedbackBuffer,
    TransformFeedbackCounterBuffer,
    ConditionalRendering,
    AccelerationStructureBuildInputReadOnly,
    AccelerationStructureStorage,
    ShaderBindingTable,
}

impl From<BufferUsage> for BufferUsageFlags {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Unknown => BufferUsageFlags::empty(),
            BufferUsage::TransferSource => BufferUsageFlags::TRANSFER_SOURCE,
            BufferUsage::TransferDestination => BufferUsageFlags::TRANSFER_DESTINATION,
            BufferUsage::UniformTexelBuffer => BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
            BufferUsage::StorageTexelBuffer => BufferUsageFlags::STORAGE_TEXEL_BUFFER,
            BufferUsage::UniformBuffer => BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::StorageBuffer => BufferUsageFlags::STORAGE_BUFFER,
            BufferUsage::IndexBuffer => BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::VertexBuffer => BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::IndirectBuffer => BufferUsageFlags::INDIRECT_BUFFER,
            BufferUsage::ShaderDeviceAddress => BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            BufferUsage::TransformFeedbackBuffer => BufferUsageFlags::TRANSFORM_FEEDBACK_BUFFER,
            BufferUsage::TransformFeedbackCounterBuffer => BufferUsageFlags::TRANSFORM_FEEDBACK_COUNTER_BUFFER,
            BufferUsage::ConditionalRendering => BufferUsageFlags::CONDITIONAL_RENDERING,
            BufferUsage::AccelerationStructureBuildInputReadOnly => {
                BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READONLY
            }
            BufferUsage::AccelerationStructureStorage => BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE,
            BufferUsage::ShaderBindingTable => BufferUsageFlags::SHADER_BINDING_TABLE,
        }
    }
}

/// image 当前所处的单一用途，决定 layout、access 和 stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageUsage {
    #[default]
    Unknown,
    TransferSource,
    TransferDestination,
    ShaderRead,
    Storage,
    ColorAttachment,
    DepthStencilAttachment,
    InputAttachment,
    FragmentShadingRateAttachment,
}

impl From<ImageUsage> for ImageUsageFlags {
    fn from(usage: ImageUsage) -> Self {
        match usage {
            ImageUsage::Unknown => ImageUsageFlags::empty(),
            ImageUsage::TransferSource => ImageUsageFlags::TRANSFER_SOURCE,
            ImageUsage::TransferDestination => ImageUsageFlags::TRANSFER_DESTINATION,
            ImageUsage::ShaderRead => ImageUsageFlags::SHADER_READ,
            ImageUsage::Storage => ImageUsageFlags::STORAGE,
            ImageUsage::ColorAttachment => ImageUsageFlags::COLOR_ATTACHMENT,
            ImageUsage::DepthStencilAttachment => ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            ImageUsage::InputAttachment => ImageUsageFlags::INPUT_ATTACHMENT,
            ImageUsage::FragmentShadingRateAttachment => ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT,
        }
    }
}
