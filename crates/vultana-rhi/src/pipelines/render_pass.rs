use ash::vk::{self, Handle};

/// 录制一个 pass 所需的原生对象
///
/// `render_pass` 为 null 时（例如纯 compute pass）不会开启 render pass，
/// `pipeline` 与 `descriptor_set` 为 null 时不会绑定。
#[derive(Clone, Default)]
pub struct NativeRenderPass {
    /// 非空时作为 pass 的 debug label
    pub name: String,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub bind_point: vk::PipelineBindPoint,
    pub descriptor_set: vk::DescriptorSet,
    pub render_area: vk::Rect2D,
    pub clear_values: Vec<vk::ClearValue>,
}

impl NativeRenderPass {
    /// 不带 render pass 的 compute pass
    pub fn compute(pipeline: vk::Pipeline, pipeline_layout: vk::PipelineLayout, descriptor_set: vk::DescriptorSet) -> Self {
        Self {
            pipeline,
            pipeline_layout,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            descriptor_set,
            ..Default::default()
        }
    }

    #[inline]
    pub fn has_render_pass(&self) -> bool {
        !self.render_pass.is_null()
    }

    pub(crate) fn begin_info(&self) -> vk::RenderPassBeginInfo<'_> {
        vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffer)
            .render_area(self.render_area)
            .clear_values(&self.clear_values)
    }
}
