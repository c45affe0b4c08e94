use ash::vk;

/// 左上角为原点的 viewport，录制时会翻转 Y 轴
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(offset_x: f32, offset_y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
            min_depth,
            max_depth,
        }
    }

    /// 原点移到底部，高度取负，使得 shader 中依旧是左上角原点
    pub fn to_native_flipped(&self) -> vk::Viewport {
        vk::Viewport {
            x: self.offset_x,
            y: self.offset_y + self.height,
            width: self.width,
            height: -self.height,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect2D {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn new(offset_x: i32, offset_y: i32, width: u32, height: u32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    pub fn to_native(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D {
                x: self.offset_x,
                y: self.offset_y,
            },
            extent: vk::Extent2D {
                width: self.width,
                height: self.height,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for ClearColor {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

impl From<ClearColor> for vk::ClearValue {
    fn from(color: ClearColor) -> Self {
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [color.r, color.g, color.b, color.a],
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearDepthStencil {
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearDepthStencil {
    fn default() -> Self {
        Self { depth: 1.0, stencil: 0 }
    }
}

impl From<ClearDepthStencil> for vk::ClearValue {
    fn from(value: ClearDepthStencil) -> Self {
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: value.depth,
                stencil: value.stencil,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlitFilter {
    Nearest,
    #[default]
    Linear,
    Cubic,
}

/// render pass 开始时 attachment 的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    DiscardColor,
    DiscardDepthStencil,
    LoadColor,
    LoadDepthStencil,
    ClearColor,
    ClearDepthStencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexRate {
    #[default]
    PerVertex,
    PerInstance,
}
