use ash::vk;
use itertools::Itertools;

use crate::{
    basic::{
        format::Format,
        types::{AttachmentState, ClearColor, ClearDepthStencil, VertexRate},
    },
    descriptors::descriptor_binding::DescriptorBinding,
    foundation::context::RenderDeviceContext,
    pipelines::shader::RhiShader,
    resources::{arena::ResourceArena, image::ImageOptions},
    usage::{
        translation::{attachment_state_to_image_usage, attachment_state_to_load_op, vertex_rate_to_native},
        usage::{BufferUsage, ImageUsage},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub rate: VertexRate,
    /// 这个 binding 占用的 vertex attribute 数量
    pub binding_range: u32,
}

impl VertexBinding {
    /// 剩余的所有 attribute
    pub const RANGE_ALL: u32 = u32::MAX;

    pub fn new(rate: VertexRate, binding_range: u32) -> Self {
        Self { rate, binding_range }
    }

    pub fn to_native(&self, binding: u32, stride: u32) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(binding)
            .stride(stride)
            .input_rate(vertex_rate_to_native(self.rate))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDependency {
    pub name: String,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDependency {
    pub name: String,
    pub usage: ImageUsage,
}

/// pass 内部创建的 attachment
///
/// width 与 height 为 0 时跟随输出大小
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDeclaration {
    pub name: String,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub options: ImageOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputAttachment {
    pub name: String,
    pub color_clear: ClearColor,
    pub depth_stencil_clear: ClearDepthStencil,
    pub on_load: AttachmentState,
    /// None 表示所有 layer
    pub layer: Option<u32>,
}

impl OutputAttachment {
    #[inline]
    pub fn load_op(&self) -> vk::AttachmentLoadOp {
        attachment_state_to_load_op(self.on_load)
    }

    /// 进入 pass 时 attachment 所处的 usage
    #[inline]
    pub fn initial_usage(&self) -> ImageUsage {
        attachment_state_to_image_usage(self.on_load)
    }

    pub fn clear_value(&self) -> vk::ClearValue {
        match self.initial_usage() {
            ImageUsage::DepthStencilAttachment => self.depth_stencil_clear.into(),
            _ => self.color_clear.into(),
        }
    }
}

/// 一个 pass 的声明：使用的 shader、vertex 输入、descriptor 以及读写的资源
///
/// 调度 pass 的一方根据这些声明创建 attachment，插入 barrier，并在录制前 resolve descriptor
pub struct PassDesc {
    pub shader: Option<RhiShader>,
    pub vertex_bindings: Vec<VertexBinding>,
    pub desc_bindings: DescriptorBinding,

    buffer_dependencies: Vec<BufferDependency>,
    image_dependencies: Vec<ImageDependency>,
    attachment_declarations: Vec<AttachmentDeclaration>,
    output_attachments: Vec<OutputAttachment>,
}

// new & init
impl PassDesc {
    pub fn new(ctx: &RenderDeviceContext, arena: &ResourceArena) -> Self {
        Self {
            shader: None,
            vertex_bindings: vec![],
            desc_bindings: DescriptorBinding::new(ctx, arena),
            buffer_dependencies: vec![],
            image_dependencies: vec![],
            attachment_declarations: vec![],
            output_attachments: vec![],
        }
    }

    /// builder
    pub fn with_shader(mut self, shader: RhiShader) -> Self {
        self.shader = Some(shader);
        self
    }
}

// 声明
impl PassDesc {
    pub fn add_buffer_dependency(&mut self, name: impl Into<String>, usage: BufferUsage) -> &mut Self {
        self.buffer_dependencies.push(BufferDependency {
            name: name.into(),
            usage,
        });
        self
    }

    pub fn add_image_dependency(&mut self, name: impl Into<String>, usage: ImageUsage) -> &mut Self {
        self.image_dependencies.push(ImageDependency {
            name: name.into(),
            usage,
        });
        self
    }

    pub fn declare_attachment(&mut self, name: impl Into<String>, format: Format) -> &mut Self {
        self.declare_attachment_sized(name, format, 0, 0, ImageOptions::empty())
    }

    pub fn declare_attachment_sized(
        &mut self,
        name: impl Into<String>,
        format: Format,
        width: u32,
        height: u32,
        options: ImageOptions,
    ) -> &mut Self {
        self.attachment_declarations.push(AttachmentDeclaration {
            name: name.into(),
            format,
            width,
            height,
            options,
        });
        self
    }

    pub fn add_output_color(&mut self, name: impl Into<String>, clear: ClearColor, layer: Option<u32>) -> &mut Self {
        self.output_attachments.push(OutputAttachment {
            name: name.into(),
            color_clear: clear,
            depth_stencil_clear: ClearDepthStencil::default(),
            on_load: AttachmentState::ClearColor,
            layer,
        });
        self
    }

    pub fn add_output_depth_stencil(
        &mut self,
        name: impl Into<String>,
        clear: ClearDepthStencil,
        layer: Option<u32>,
    ) -> &mut Self {
        self.output_attachments.push(OutputAttachment {
            name: name.into(),
            color_clear: ClearColor::default(),
            depth_stencil_clear: clear,
            on_load: AttachmentState::ClearDepthStencil,
            layer,
        });
        self
    }

    /// 不清除的 attachment，load 或 discard
    pub fn add_output_attachment(
        &mut self,
        name: impl Into<String>,
        on_load: AttachmentState,
        layer: Option<u32>,
    ) -> &mut Self {
        self.output_attachments.push(OutputAttachment {
            name: name.into(),
            color_clear: ClearColor::default(),
            depth_stencil_clear: ClearDepthStencil::default(),
            on_load,
            layer,
        });
        self
    }
}

// getters
impl PassDesc {
    #[inline]
    pub fn buffer_dependencies(&self) -> &[BufferDependency] {
        &self.buffer_dependencies
    }

    #[inline]
    pub fn image_dependencies(&self) -> &[ImageDependency] {
        &self.image_dependencies
    }

    #[inline]
    pub fn attachment_declarations(&self) -> &[AttachmentDeclaration] {
        &self.attachment_declarations
    }

    #[inline]
    pub fn output_attachments(&self) -> &[OutputAttachment] {
        &self.output_attachments
    }
}

// tools
impl PassDesc {
    /// 与 output attachment 顺序一致的 clear value
    pub fn native_clear_values(&self) -> Vec<vk::ClearValue> {
        self.output_attachments.iter().map(OutputAttachment::clear_value).collect_vec()
    }

    /// 显式声明的 buffer 依赖，加上 descriptor 中绑定的 buffer
    pub fn collect_buffer_dependencies(&self) -> Vec<BufferDependency> {
        let bound = self.desc_bindings.bound_buffers().map(|(name, usage)| BufferDependency {
            name: name.to_string(),
            usage,
        });
        self.buffer_dependencies.iter().cloned().chain(bound).collect_vec()
    }

    pub fn collect_image_dependencies(&self) -> Vec<ImageDependency> {
        let bound = self.desc_bindings.bound_images().map(|(name, usage)| ImageDependency {
            name: name.to_string(),
            usage,
        });
        self.image_dependencies.iter().cloned().chain(bound).collect_vec()
    }
}
