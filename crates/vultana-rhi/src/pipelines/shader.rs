use std::ffi::CStr;

use ash::vk;

use crate::usage::translation::bind_point_to_shader_stages;

/// shader 的入口函数名
const ENTRY_POINT: &CStr = c"main";

/// 一个 pass 使用的 shader 组合
///
/// shader module 由启动流程编译和创建，这里只描述组合方式，不持有其生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhiShader {
    Graphics {
        vertex: vk::ShaderModule,
        fragment: vk::ShaderModule,
    },
    Compute {
        module: vk::ShaderModule,
    },
}

impl RhiShader {
    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        match self {
            RhiShader::Graphics { .. } => vk::PipelineBindPoint::GRAPHICS,
            RhiShader::Compute { .. } => vk::PipelineBindPoint::COMPUTE,
        }
    }

    #[inline]
    pub fn shader_stages(&self) -> vk::ShaderStageFlags {
        bind_point_to_shader_stages(self.bind_point())
    }

    /// 创建 pipeline 时使用的 stage 信息
    pub fn stage_create_infos(&self) -> Vec<vk::PipelineShaderStageCreateInfo<'static>> {
        let stage = |stage: vk::ShaderStageFlags, module: vk::ShaderModule| {
            vk::PipelineShaderStageCreateInfo::default().stage(stage).module(module).name(ENTRY_POINT)
        };
        match *self {
            RhiShader::Graphics { vertex, fragment } => vec![
                stage(vk::ShaderStageFlags::VERTEX, vertex),
                stage(vk::ShaderStageFlags::FRAGMENT, fragment),
            ],
            RhiShader::Compute { module } => vec![stage(vk::ShaderStageFlags::COMPUTE, module)],
        }
    }
}
