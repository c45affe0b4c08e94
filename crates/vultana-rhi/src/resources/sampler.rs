use ash::vk::{self, Handle};

use crate::foundation::{context::RenderDeviceContext, debug_type::DebugType, error::RhiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerAddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

impl SamplerFilter {
    #[inline]
    pub fn to_native(self) -> vk::Filter {
        match self {
            SamplerFilter::Nearest => vk::Filter::NEAREST,
            SamplerFilter::Linear => vk::Filter::LINEAR,
        }
    }

    #[inline]
    pub fn to_native_mipmap_mode(self) -> vk::SamplerMipmapMode {
        match self {
            SamplerFilter::Nearest => vk::SamplerMipmapMode::NEAREST,
            SamplerFilter::Linear => vk::SamplerMipmapMode::LINEAR,
        }
    }
}

impl SamplerAddressMode {
    #[inline]
    pub fn to_native(self) -> vk::SamplerAddressMode {
        match self {
            SamplerAddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
            SamplerAddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            SamplerAddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            SamplerAddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

/// 默认配置：linear，repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RhiSamplerDesc {
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub mip_filter: SamplerFilter,
    /// u v w 使用同一种
    pub address_mode: SamplerAddressMode,
}

impl RhiSamplerDesc {
    pub fn new(
        min_filter: SamplerFilter,
        mag_filter: SamplerFilter,
        address_mode: SamplerAddressMode,
        mip_filter: SamplerFilter,
    ) -> Self {
        Self {
            min_filter,
            mag_filter,
            mip_filter,
            address_mode,
        }
    }

    fn to_native(self) -> vk::SamplerCreateInfo<'static> {
        let address_mode = self.address_mode.to_native();
        vk::SamplerCreateInfo::default()
            .mag_filter(self.mag_filter.to_native())
            .min_filter(self.min_filter.to_native())
            .mipmap_mode(self.mip_filter.to_native_mipmap_mode())
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
    }
}

/// null handle 的 sampler 表示"不带 sampler 的 image"，见 [`RhiSampler::empty`]
pub struct RhiSampler {
    ctx: Option<RenderDeviceContext>,
    handle: vk::Sampler,
    desc: RhiSamplerDesc,
}

impl DebugType for RhiSampler {
    fn debug_type_name() -> &'static str {
        "RhiSampler"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for RhiSampler {
    fn drop(&mut self) {
        if let Some(ctx) = &self.ctx {
            if !self.handle.is_null() {
                ctx.device().destroy_sampler(self.handle);
            }
        }
    }
}

impl RhiSampler {
    pub fn new(ctx: &RenderDeviceContext, desc: RhiSamplerDesc, debug_name: impl AsRef<str>) -> RhiResult<Self> {
        let handle = ctx.device().create_sampler(&desc.to_native())?;
        let sampler = Self {
            ctx: Some(ctx.clone()),
            handle,
            desc,
        };
        ctx.set_debug_name(&sampler, debug_name);
        Ok(sampler)
    }

    /// 空 sampler，descriptor 写入时对应 null sampler
    pub fn empty() -> Self {
        Self {
            ctx: None,
            handle: vk::Sampler::null(),
            desc: RhiSamplerDesc::default(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.handle
    }

    #[inline]
    pub fn desc(&self) -> &RhiSamplerDesc {
        &self.desc
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handle.is_null()
    }
}
