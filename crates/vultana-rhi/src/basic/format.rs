//! 与 Vulkan 原生枚举一一对应的格式、shader stage、descriptor 类型
//!
//! 每个枚举值都能与原生值双向转换，`from_native(x.to_native()) == Some(x)` 对所有值成立。

use ash::vk;

/// 生成与原生枚举一一对应的 Rust 枚举
///
/// 同时生成 `ALL`（按原生表顺序的所有值）、`to_native`、`from_native`
macro_rules! native_mirror_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident => $native:ty {
            $($variant:ident => $value:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            #[inline]
            pub fn to_native(self) -> $native {
                match self {
                    $($name::$variant => $value,)*
                }
            }

            /// 不在表中的原生值返回 None
            pub fn from_native(native: $native) -> Option<Self> {
                $(
                    if native == $value {
                        return Some($name::$variant);
                    }
                )*
                None
            }
        }
    };
}

native_mirror_enum! {
    /// 纹理格式，顺序与 `VkFormat` 的 0..=130 保持一致
    pub enum Format => vk::Format {
        Undefined => vk::Format::UNDEFINED,
        R4G4UnormPack8 => vk::Format::R4G4_UNORM_PACK8,
        R4G4B4A4UnormPack16 => vk::Format::R4G4B4A4_UNORM_PACK16,
        B4G4R4A4UnormPack16 => vk::Format::B4G4R4A4_UNORM_PACK16,
        R5G6B5UnormPack16 => vk::Format::R5G6B5_UNORM_PACK16,
        B5G6R5UnormPack16 => vk::Format::B5G6R5_UNORM_PACK16,
        R5G5B5A1UnormPack16 => vk::Format::R5G5B5A1_UNORM_PACK16,
        B5G5R5A1UnormPack16 => vk::Format::B5G5R5A1_UNORM_PACK16,
        A1R5G5B5UnormPack16 => vk::Format::A1R5G5B5_UNORM_PACK16,
        R8Unorm => vk::Format::R8_UNORM,
        R8Snorm => vk::Format::R8_SNORM,
        R8Uscaled => vk::Format::R8_USCALED,
        R8Sscaled => vk::Format::R8_SSCALED,
        R8Uint => vk::Format::R8_UINT,
        R8Sint => vk::Format::R8_SINT,
        R8Srgb => vk::Format::R8_SRGB,
        R8G8Unorm => vk::Format::R8G8_UNORM,
        R8G8Snorm => vk::Format::R8G8_SNORM,
        R8G8Uscaled => vk::Format::R8G8_USCALED,
        R8G8Sscaled => vk::Format::R8G8_SSCALED,
        R8G8Uint => vk::Format::R8G8_UINT,
        R8G8Sint => vk::Format::R8G8_SINT,
        R8G8Srgb => vk::Format::R8G8_SRGB,
        R8G8B8Unorm => vk::Format::R8G8B8_UNORM,
        R8G8B8Snorm => vk::Format::R8G8B8_SNORM,
        R8G8B8Uscaled => vk::Format::R8G8B8_USCALED,
        R8G8B8Sscaled => vk::Format::R8G8B8_SSCALED,
        R8G8B8Uint => vk::Format::R8G8B8_UINT,
        R8G8B8Sint => vk::Format::R8G8B8_SINT,
        R8G8B8Srgb => vk::Format::R8G8B8_SRGB,
        B8G8R8Unorm => vk::Format::B8G8R8_UNORM,
        B8G8R8Snorm => vk::Format::B8G8R8_SNORM,
        B8G8R8Uscaled => vk::Format::B8G8R8_USCALED,
        B8G8R8Sscaled => vk::Format::B8G8R8_SSCALED,
        B8G8R8Uint => vk::Format::B8G8R8_UINT,
        B8G8R8Sint => vk::Format::B8G8R8_SINT,
        B8G8R8Srgb => vk::Format::B8G8R8_SRGB,
        R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        R8G8B8A8Snorm => vk::Format::R8G8B8A8_SNORM,
        R8G8B8A8Uscaled => vk::Format::R8G8B8A8_USCALED,
        R8G8B8A8Sscaled => vk::Format::R8G8B8A8_SSCALED,
        R8G8B8A8Uint => vk::Format::R8G8B8A8_UINT,
        R8G8B8A8Sint => vk::Format::R8G8B8A8_SINT,
        R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        B8G8R8A8Snorm => vk::Format::B8G8R8A8_SNORM,
        B8G8R8A8Uscaled => vk::Format::B8G8R8A8_USCALED,
        B8G8R8A8Sscaled => vk::Format::B8G8R8A8_SSCALED,
        B8G8R8A8Uint => vk::Format::B8G8R8A8_UINT,
        B8G8R8A8Sint => vk::Format::B8G8R8A8_SINT,
        B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        A8B8G8R8UnormPack32 => vk::Format::A8B8G8R8_UNORM_PACK32,
        A8B8G8R8SnormPack32 => vk::Format::A8B8G8R8_SNORM_PACK32,
        A8B8G8R8UscaledPack32 => vk::Format::A8B8G8R8_USCALED_PACK32,
        A8B8G8R8SscaledPack32 => vk::Format::A8B8G8R8_SSCALED_PACK32,
        A8B8G8R8UintPack32 => vk::Format::A8B8G8R8_UINT_PACK32,
        A8B8G8R8SintPack32 => vk::Format::A8B8G8R8_SINT_PACK32,
        A8B8G8R8SrgbPack32 => vk::Format::A8B8G8R8_SRGB_PACK32,
        A2R10G10B10UnormPack32 => vk::Format::A2R10G10B10_UNORM_PACK32,
        A2R10G10B10SnormPack32 => vk::Format::A2R10G10B10_SNORM_PACK32,
        A2R10G10B10UscaledPack32 => vk::Format::A2R10G10B10_USCALED_PACK32,
        A2R10G10B10SscaledPack32 => vk::Format::A2R10G10B10_SSCALED_PACK32,
        A2R10G10B10UintPack32 => vk::Format::A2R10G10B10_UINT_PACK32,
        A2R10G10B10SintPack32 => vk::Format::A2R10G10B10_SINT_PACK32,
        A2B10G10R10UnormPack32 => vk::Format::A2B10G10R10_UNORM_PACK32,
        A2B10G10R10SnormPack32 => vk::Format::A2B10G10R10_SNORM_PACK32,
        A2B10G10R10UscaledPack32 => vk::Format::A2B10G10R10_USCALED_PACK32,
        A2B10G10R10SscaledPack32 => vk::Format::A2B10G10R10_SSCALED_PACK32,
        A2B10G10R10UintPack32 => vk::Format::A2B10G10R10_UINT_PACK32,
        A2B10G10R10SintPack32 => vk::Format::A2B10G10R10_SINT_PACK32,
        R16Unorm => vk::Format::R16_UNORM,
        R16Snorm => vk::Format::R16_SNORM,
        R16Uscaled => vk::Format::R16_USCALED,
        R16Sscaled => vk::Format::R16_SSCALED,
        R16Uint => vk::Format::R16_UINT,
        R16Sint => vk::Format::R16_SINT,
        R16Sfloat => vk::Format::R16_SFLOAT,
        R16G16Unorm => vk::Format::R16G16_UNORM,
        R16G16Snorm => vk::Format::R16G16_SNORM,
        R16G16Uscaled => vk::Format::R16G16_USCALED,
        R16G16Sscaled => vk::Format::R16G16_SSCALED,
        R16G16Uint => vk::Format::R16G16_UINT,
        R16G16Sint => vk::Format::R16G16_SINT,
        R16G16Sfloat => vk::Format::R16G16_SFLOAT,
        R16G16B16Unorm => vk::Format::R16G16B16_UNORM,
        R16G16B16Snorm => vk::Format::R16G16B16_SNORM,
        R16G16B16Uscaled => vk::Format::R16G16B16_USCALED,
        R16G16B16Sscaled => vk::Format::R16G16B16_SSCALED,
        R16G16B16Uint => vk::Format::R16G16B16_UINT,
        R16G16B16Sint => vk::Format::R16G16B16_SINT,
        R16G16B16Sfloat => vk::Format::R16G16B16_SFLOAT,
        R16G16B16A16Unorm => vk::Format::R16G16B16A16_UNORM,
        R16G16B16A16Snorm => vk::Format::R16G16B16A16_SNORM,
        R16G16B16A16Uscaled => vk::Format::R16G16B16A16_USCALED,
        R16G16B16A16Sscaled => vk::Format::R16G16B16A16_SSCALED,
        R16G16B16A16Uint => vk::Format::R16G16B16A16_UINT,
        R16G16B16A16Sint => vk::Format::R16G16B16A16_SINT,
        R16G16B16A16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        R32Uint => vk::Format::R32_UINT,
        R32Sint => vk::Format::R32_SINT,
        R32Sfloat => vk::Format::R32_SFLOAT,
        R32G32Uint => vk::Format::R32G32_UINT,
        R32G32Sint => vk::Format::R32G32_SINT,
        R32G32Sfloat => vk::Format::R32G32_SFLOAT,
        R32G32B32Uint => vk::Format::R32G32B32_UINT,
        R32G32B32Sint => vk::Format::R32G32B32_SINT,
        R32G32B32Sfloat => vk::Format::R32G32B32_SFLOAT,
        R32G32B32A32Uint => vk::Format::R32G32B32A32_UINT,
        R32G32B32A32Sint => vk::Format::R32G32B32A32_SINT,
        R32G32B32A32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
        R64Uint => vk::Format::R64_UINT,
        R64Sint => vk::Format::R64_SINT,
        R64Sfloat => vk::Format::R64_SFLOAT,
        R64G64Uint => vk::Format::R64G64_UINT,
        R64G64Sint => vk::Format::R64G64_SINT,
        R64G64Sfloat => vk::Format::R64G64_SFLOAT,
        R64G64B64Uint => vk::Format::R64G64B64_UINT,
        R64G64B64Sint => vk::Format::R64G64B64_SINT,
        R64G64B64Sfloat => vk::Format::R64G64B64_SFLOAT,
        R64G64B64A64Uint => vk::Format::R64G64B64A64_UINT,
        R64G64B64A64Sint => vk::Format::R64G64B64A64_SINT,
        R64G64B64A64Sfloat => vk::Format::R64G64B64A64_SFLOAT,
        B10G11R11UfloatPack32 => vk::Format::B10G11R11_UFLOAT_PACK32,
        E5B9G9R9UfloatPack32 => vk::Format::E5B9G9R9_UFLOAT_PACK32,
        D16Unorm => vk::Format::D16_UNORM,
        X8D24UnormPack32 => vk::Format::X8_D24_UNORM_PACK32,
        D32Sfloat => vk::Format::D32_SFLOAT,
        S8Uint => vk::Format::S8_UINT,
        D16UnormS8Uint => vk::Format::D16_UNORM_S8_UINT,
        D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        D32SfloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::Undefined
    }
}

impl Format {
    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Format::D16Unorm
                | Format::X8D24UnormPack32
                | Format::D32Sfloat
                | Format::D16UnormS8Uint
                | Format::D24UnormS8Uint
                | Format::D32SfloatS8Uint
        )
    }

    #[inline]
    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            Format::S8Uint | Format::D16UnormS8Uint | Format::D24UnormS8Uint | Format::D32SfloatS8Uint
        )
    }
}

native_mirror_enum! {
    pub enum ShaderType => vk::ShaderStageFlags {
        Vertex => vk::ShaderStageFlags::VERTEX,
        TessControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        TessEvaluation => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        Geometry => vk::ShaderStageFlags::GEOMETRY,
        Fragment => vk::ShaderStageFlags::FRAGMENT,
        Compute => vk::ShaderStageFlags::COMPUTE,
        RayGen => vk::ShaderStageFlags::RAYGEN_KHR,
        Intersect => vk::ShaderStageFlags::INTERSECTION_KHR,
        AnyHit => vk::ShaderStageFlags::ANY_HIT_KHR,
        ClosestHit => vk::ShaderStageFlags::CLOSEST_HIT_KHR,
        Miss => vk::ShaderStageFlags::MISS_KHR,
        Callable => vk::ShaderStageFlags::CALLABLE_KHR,
        Task => vk::ShaderStageFlags::TASK_NV,
        Mesh => vk::ShaderStageFlags::MESH_NV,
    }
}

native_mirror_enum! {
    /// shader 中 uniform 的类型，对应 `VkDescriptorType`
    pub enum UniformType => vk::DescriptorType {
        Sampler => vk::DescriptorType::SAMPLER,
        CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        UniformTexelBuffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        StorageTexelBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        UniformBufferDynamic => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        StorageBufferDynamic => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
        InlineUniformBlock => vk::DescriptorType::INLINE_UNIFORM_BLOCK,
        AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

impl UniformType {
    /// 写入 descriptor 时走 buffer info 还是 image info
    #[inline]
    pub fn is_buffer_type(self) -> bool {
        matches!(
            self,
            UniformType::UniformTexelBuffer
                | UniformType::StorageTexelBuffer
                | UniformType::UniformBuffer
                | UniformType::StorageBuffer
                | UniformType::UniformBufferDynamic
                | UniformType::StorageBufferDynamic
                | UniformType::InlineUniformBlock
        )
    }
}
