//! 用途 -> 原生同步参数 的转换表
//!
//! 所有 barrier 的 stage/access/layout 都只从这里取值，新增用途时每个维度只需要改一处。

use ash::vk;

use crate::{
    basic::{
        format::{Format, UniformType},
        types::{AttachmentState, BlitFilter, VertexRate},
    },
    usage::usage::{BufferUsage, ImageUsage},
};

/// 可能访问 descriptor 资源的 shader stage 集合，用途无法确定具体 stage 时使用
const ANY_SHADER_STAGE: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::from_raw(
    vk::PipelineStageFlags2::VERTEX_SHADER.as_raw()
        | vk::PipelineStageFlags2::FRAGMENT_SHADER.as_raw()
        | vk::PipelineStageFlags2::COMPUTE_SHADER.as_raw(),
);

const SHADER_READ_WRITE: vk::AccessFlags2 =
    vk::AccessFlags2::from_raw(vk::AccessFlags2::SHADER_READ.as_raw() | vk::AccessFlags2::SHADER_WRITE.as_raw());

/// image 处于某种用途时的 stage、access 与 layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageUsageState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

impl From<ImageUsage> for ImageUsageState {
    fn from(usage: ImageUsage) -> Self {
        Self {
            stage: image_usage_to_stage(usage),
            access: image_usage_to_access(usage),
            layout: image_usage_to_layout(usage),
        }
    }
}

/// buffer 处于某种用途时的 stage 与 access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferUsageState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

impl From<BufferUsage> for BufferUsageState {
    fn from(usage: BufferUsage) -> Self {
        Self {
            stage: buffer_usage_to_stage(usage),
            access: buffer_usage_to_access(usage),
        }
    }
}

// buffer 用途
pub fn buffer_usage_to_stage(usage: BufferUsage) -> vk::PipelineStageFlags2 {
    match usage {
        BufferUsage::Unknown => vk::PipelineStageFlags2::TOP_OF_PIPE,
        BufferUsage::TransferSource | BufferUsage::TransferDestination => vk::PipelineStageFlags2::TRANSFER,
        BufferUsage::UniformTexelBuffer
        | BufferUsage::StorageTexelBuffer
        | BufferUsage::UniformBuffer
        | BufferUsage::StorageBuffer
        | BufferUsage::ShaderDeviceAddress => ANY_SHADER_STAGE,
        BufferUsage::IndexBuffer | BufferUsage::VertexBuffer => vk::PipelineStageFlags2::VERTEX_INPUT,
        BufferUsage::IndirectBuffer => vk::PipelineStageFlags2::DRAW_INDIRECT,
        BufferUsage::TransformFeedbackBuffer | BufferUsage::TransformFeedbackCounterBuffer => {
            vk::PipelineStageFlags2::TRANSFORM_FEEDBACK_EXT
        }
        BufferUsage::ConditionalRendering => vk::PipelineStageFlags2::CONDITIONAL_RENDERING_EXT,
        BufferUsage::AccelerationStructureBuildInputReadOnly | BufferUsage::AccelerationStructureStorage => {
            vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR
        }
        BufferUsage::ShaderBindingTable => vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    }
}

pub fn buffer_usage_to_access(usage: BufferUsage) -> vk::AccessFlags2 {
    match usage {
        BufferUsage::Unknown => vk::AccessFlags2::NONE,
        BufferUsage::TransferSource => vk::AccessFlags2::TRANSFER_READ,
        BufferUsage::TransferDestination => vk::AccessFlags2::TRANSFER_WRITE,
        BufferUsage::UniformTexelBuffer => vk::AccessFlags2::SHADER_READ,
        BufferUsage::StorageTexelBuffer => SHADER_READ_WRITE,
        BufferUsage::UniformBuffer => vk::AccessFlags2::UNIFORM_READ,
        BufferUsage::StorageBuffer => SHADER_READ_WRITE,
        BufferUsage::IndexBuffer => vk::AccessFlags2::INDEX_READ,
        BufferUsage::VertexBuffer => vk::AccessFlags2::VERTEX_ATTRIBUTE_READ,
        BufferUsage::IndirectBuffer => vk::AccessFlags2::INDIRECT_COMMAND_READ,
        BufferUsage::ShaderDeviceAddress => vk::AccessFlags2::SHADER_READ,
        BufferUsage::TransformFeedbackBuffer => vk::AccessFlags2::TRANSFORM_FEEDBACK_WRITE_EXT,
        BufferUsage::TransformFeedbackCounterBuffer => vk::AccessFlags2::TRANSFORM_FEEDBACK_COUNTER_WRITE_EXT,
        BufferUsage::ConditionalRendering => vk::AccessFlags2::CONDITIONAL_RENDERING_READ_EXT,
        BufferUsage::AccelerationStructureBuildInputReadOnly => vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
        BufferUsage::AccelerationStructureStorage => vk::AccessFlags2::from_raw(
            vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR.as_raw()
                | vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR.as_raw(),
        ),
        BufferUsage::ShaderBindingTable => vk::AccessFlags2::SHADER_READ,
    }
}

/// 该用途下 GPU 是否会写入 buffer
pub fn has_buffer_write_dependency(usage: BufferUsage) -> bool {
    matches!(
        usage,
        BufferUsage::TransferDestination
            | BufferUsage::UniformTexelBuffer
            | BufferUsage::StorageTexelBuffer
            | BufferUsage::StorageBuffer
            | BufferUsage::TransformFeedbackBuffer
            | BufferUsage::TransformFeedbackCounterBuffer
            | BufferUsage::AccelerationStructureStorage
    )
}

// image 用途
pub fn image_usage_to_layout(usage: ImageUsage) -> vk::ImageLayout {
    match usage {
        ImageUsage::Unknown => vk::ImageLayout::UNDEFINED,
        ImageUsage::TransferSource => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageUsage::TransferDestination => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageUsage::ShaderRead => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageUsage::Storage => vk::ImageLayout::GENERAL,
        ImageUsage::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageUsage::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        // color 和 depth 的 input attachment 都适用
        ImageUsage::InputAttachment => vk::ImageLayout::READ_ONLY_OPTIMAL,
        ImageUsage::FragmentShadingRateAttachment => vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR,
    }
}

pub fn image_usage_to_access(usage: ImageUsage) -> vk::AccessFlags2 {
    match usage {
        ImageUsage::Unknown => vk::AccessFlags2::NONE,
        ImageUsage::TransferSource => vk::AccessFlags2::TRANSFER_READ,
        ImageUsage::TransferDestination => vk::AccessFlags2::TRANSFER_WRITE,
        ImageUsage::ShaderRead => vk::AccessFlags2::SHADER_READ,
        ImageUsage::Storage => SHADER_READ_WRITE,
        ImageUsage::ColorAttachment => vk::AccessFlags2::from_raw(
            vk::AccessFlags2::COLOR_ATTACHMENT_READ.as_raw() | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw(),
        ),
        ImageUsage::DepthStencilAttachment => vk::AccessFlags2::from_raw(
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
        ImageUsage::InputAttachment => vk::AccessFlags2::INPUT_ATTACHMENT_READ,
        ImageUsage::FragmentShadingRateAttachment => vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR,
    }
}

pub fn image_usage_to_stage(usage: ImageUsage) -> vk::PipelineStageFlags2 {
    match usage {
        ImageUsage::Unknown => vk::PipelineStageFlags2::TOP_OF_PIPE,
        ImageUsage::TransferSource | ImageUsage::TransferDestination => vk::PipelineStageFlags2::TRANSFER,
        ImageUsage::ShaderRead | ImageUsage::Storage => ANY_SHADER_STAGE,
        ImageUsage::ColorAttachment => vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        ImageUsage::DepthStencilAttachment => vk::PipelineStageFlags2::from_raw(
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
        ),
        ImageUsage::InputAttachment => vk::PipelineStageFlags2::FRAGMENT_SHADER,
        ImageUsage::FragmentShadingRateAttachment => vk::PipelineStageFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
    }
}

/// 该用途下 GPU 是否会写入 image
pub fn has_image_write_dependency(usage: ImageUsage) -> bool {
    matches!(
        usage,
        ImageUsage::TransferDestination
            | ImageUsage::Storage
            | ImageUsage::ColorAttachment
            | ImageUsage::DepthStencilAttachment
            | ImageUsage::FragmentShadingRateAttachment
    )
}

pub fn image_format_to_aspect(format: Format) -> vk::ImageAspectFlags {
    match format {
        Format::D16Unorm | Format::X8D24UnormPack32 | Format::D32Sfloat => vk::ImageAspectFlags::DEPTH,
        Format::D16UnormS8Uint | Format::D24UnormS8Uint | Format::D32SfloatS8Uint => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        Format::S8Uint => vk::ImageAspectFlags::STENCIL,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

// uniform 类型
/// image 类的 uniform 返回 `Unknown`
pub fn uniform_type_to_buffer_usage(uniform_type: UniformType) -> BufferUsage {
    match uniform_type {
        UniformType::UniformTexelBuffer => BufferUsage::UniformTexelBuffer,
        UniformType::StorageTexelBuffer => BufferUsage::StorageTexelBuffer,
        UniformType::UniformBuffer | UniformType::UniformBufferDynamic | UniformType::InlineUniformBlock => {
            BufferUsage::UniformBuffer
        }
        UniformType::StorageBuffer | UniformType::StorageBufferDynamic => BufferUsage::StorageBuffer,
        UniformType::AccelerationStructure => BufferUsage::AccelerationStructureStorage,
        UniformType::Sampler
        | UniformType::CombinedImageSampler
        | UniformType::SampledImage
        | UniformType::StorageImage
        | UniformType::InputAttachment => BufferUsage::Unknown,
    }
}

/// buffer 类的 uniform 返回 `Unknown`
pub fn uniform_type_to_image_usage(uniform_type: UniformType) -> ImageUsage {
    match uniform_type {
        UniformType::CombinedImageSampler | UniformType::SampledImage => ImageUsage::ShaderRead,
        UniformType::StorageImage => ImageUsage::Storage,
        UniformType::InputAttachment => ImageUsage::InputAttachment,
        _ => ImageUsage::Unknown,
    }
}

// attachment
pub fn attachment_state_to_load_op(state: AttachmentState) -> vk::AttachmentLoadOp {
    match state {
        AttachmentState::DiscardColor | AttachmentState::DiscardDepthStencil => vk::AttachmentLoadOp::DONT_CARE,
        AttachmentState::LoadColor | AttachmentState::LoadDepthStencil => vk::AttachmentLoadOp::LOAD,
        AttachmentState::ClearColor | AttachmentState::ClearDepthStencil => vk::AttachmentLoadOp::CLEAR,
    }
}

pub fn attachment_state_to_image_usage(state: AttachmentState) -> ImageUsage {
    match state {
        AttachmentState::DiscardColor | AttachmentState::LoadColor | AttachmentState::ClearColor => {
            ImageUsage::ColorAttachment
        }
        AttachmentState::DiscardDepthStencil
        | AttachmentState::LoadDepthStencil
        | AttachmentState::ClearDepthStencil => ImageUsage::DepthStencilAttachment,
    }
}

// 其他
pub fn blit_filter_to_native(filter: BlitFilter) -> vk::Filter {
    match filter {
        BlitFilter::Nearest => vk::Filter::NEAREST,
        BlitFilter::Linear => vk::Filter::LINEAR,
        BlitFilter::Cubic => vk::Filter::CUBIC_EXT,
    }
}

pub fn vertex_rate_to_native(rate: VertexRate) -> vk::VertexInputRate {
    match rate {
        VertexRate::PerVertex => vk::VertexInputRate::VERTEX,
        VertexRate::PerInstance => vk::VertexInputRate::INSTANCE,
    }
}

/// push constant 等需要知道 pipeline 中所有可能的 shader stage
pub fn bind_point_to_shader_stages(bind_point: vk::PipelineBindPoint) -> vk::ShaderStageFlags {
    match bind_point {
        vk::PipelineBindPoint::GRAPHICS => vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        vk::PipelineBindPoint::COMPUTE => vk::ShaderStageFlags::COMPUTE,
        vk::PipelineBindPoint::RAY_TRACING_KHR => {
            vk::ShaderStageFlags::RAYGEN_KHR
                | vk::ShaderStageFlags::MISS_KHR
                | vk::ShaderStageFlags::CLOSEST_HIT_KHR
                | vk::ShaderStageFlags::ANY_HIT_KHR
                | vk::ShaderStageFlags::INTERSECTION_KHR
                | vk::ShaderStageFlags::CALLABLE_KHR
        }
        other => panic!("unsupported pipeline bind point: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_usages() {
        let src = ImageUsageState::from(ImageUsage::TransferSource);
        assert_eq!(src.layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(src.access, vk::AccessFlags2::TRANSFER_READ);
        assert_eq!(src.stage, vk::PipelineStageFlags2::TRANSFER);

        let dst = ImageUsageState::from(ImageUsage::TransferDestination);
        assert_eq!(dst.layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(dst.access, vk::AccessFlags2::TRANSFER_WRITE);
    }

    #[test]
    fn test_unknown_usage_is_undefined() {
        let state = ImageUsageState::from(ImageUsage::Unknown);
        assert_eq!(state.layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(state.access, vk::AccessFlags2::NONE);
        assert_eq!(BufferUsageState::from(BufferUsage::Unknown).access, vk::AccessFlags2::NONE);
    }

    #[test]
    fn test_shader_resources_cover_every_shader_stage() {
        for stage in [
            buffer_usage_to_stage(BufferUsage::UniformBuffer),
            buffer_usage_to_stage(BufferUsage::UniformTexelBuffer),
            buffer_usage_to_stage(BufferUsage::StorageBuffer),
            buffer_usage_to_stage(BufferUsage::ShaderDeviceAddress),
            image_usage_to_stage(ImageUsage::ShaderRead),
            image_usage_to_stage(ImageUsage::Storage),
        ] {
            assert!(stage.contains(vk::PipelineStageFlags2::VERTEX_SHADER));
            assert!(stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER));
            assert!(stage.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
        }
    }

    #[test]
    fn test_write_dependency_matches_access() {
        let images = [
            ImageUsage::Unknown,
            ImageUsage::TransferSource,
            ImageUsage::TransferDestination,
            ImageUsage::ShaderRead,
            ImageUsage::Storage,
            ImageUsage::ColorAttachment,
            ImageUsage::DepthStencilAttachment,
            ImageUsage::InputAttachment,
        ];
        let write_bits = vk::AccessFlags2::TRANSFER_WRITE
            | vk::AccessFlags2::SHADER_WRITE
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE;
        for usage in images {
            assert_eq!(
                has_image_write_dependency(usage),
                image_usage_to_access(usage).intersects(write_bits),
                "{usage:?}"
            );
        }
    }

    #[test]
    fn test_uniform_type_routing() {
        assert_eq!(uniform_type_to_buffer_usage(UniformType::UniformBufferDynamic), BufferUsage::UniformBuffer);
        assert_eq!(uniform_type_to_buffer_usage(UniformType::StorageImage), BufferUsage::Unknown);
        assert_eq!(uniform_type_to_image_usage(UniformType::StorageImage), ImageUsage::Storage);
        assert_eq!(uniform_type_to_image_usage(UniformType::CombinedImageSampler), ImageUsage::ShaderRead);
        assert_eq!(uniform_type_to_image_usage(UniformType::UniformBuffer), ImageUsage::Unknown);

        // buffer 类型判断和 buffer usage 的映射双向一致，acceleration structure 除外
        for &uniform_type in UniformType::ALL {
            if uniform_type == UniformType::AccelerationStructure {
                continue;
            }
            assert_eq!(
                uniform_type.is_buffer_type(),
                uniform_type_to_buffer_usage(uniform_type) != BufferUsage::Unknown,
                "{uniform_type:?}"
            );
        }
        assert!(!UniformType::AccelerationStructure.is_buffer_type());
        assert_eq!(
            uniform_type_to_buffer_usage(UniformType::AccelerationStructure),
            BufferUsage::AccelerationStructureStorage
        );
    }

    #[test]
    fn test_attachment_state() {
        assert_eq!(attachment_state_to_load_op(AttachmentState::ClearColor), vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment_state_to_load_op(AttachmentState::LoadDepthStencil), vk::AttachmentLoadOp::LOAD);
        assert_eq!(
            attachment_state_to_load_op(AttachmentState::DiscardDepthStencil),
            vk::AttachmentLoadOp::DONT_CARE
        );
        assert_eq!(
            attachment_state_to_image_usage(AttachmentState::ClearDepthStencil),
            ImageUsage::DepthStencilAttachment
        );
        assert_eq!(attachment_state_to_image_usage(AttachmentState::DiscardColor), ImageUsage::ColorAttachment);
    }

    #[test]
    fn test_image_aspect() {
        assert_eq!(image_format_to_aspect(Format::R8G8B8A8Unorm), vk::ImageAspectFlags::COLOR);
        assert_eq!(image_format_to_aspect(Format::D32Sfloat), vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            image_format_to_aspect(Format::D24UnormS8Uint),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn test_bind_point_stages() {
        assert_eq!(bind_point_to_shader_stages(vk::PipelineBindPoint::COMPUTE), vk::ShaderStageFlags::COMPUTE);
        assert!(bind_point_to_shader_stages(vk::PipelineBindPoint::GRAPHICS).contains(vk::ShaderStageFlags::FRAGMENT));
    }
}
