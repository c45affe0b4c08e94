use ash::vk::{self, Handle};

use crate::{
    basic::format::Format,
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{LogCategory, LogSeverity},
        debug_type::DebugType,
        mem_allocator::{AllocationHandle, MemoryUsage},
    },
    usage::{translation::image_format_to_aspect, usage::ImageUsageFlags},
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageOptions: u32 {
        const MIPMAPS = 1 << 0;
        const CUBEMAP = 1 << 1;
    }
}

/// image view 的种类，每种 view 在创建 image 时一并创建
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageViewKind {
    #[default]
    Native,
    DepthOnly,
    StencilOnly,
}

impl ImageViewKind {
    const ALL: [ImageViewKind; 3] = [ImageViewKind::Native, ImageViewKind::DepthOnly, ImageViewKind::StencilOnly];

    /// format 不包含对应 aspect 时返回 None，此时该种 view 为 null
    fn aspect(self, format: Format) -> Option<vk::ImageAspectFlags> {
        match self {
            ImageViewKind::Native => Some(image_format_to_aspect(format)),
            ImageViewKind::DepthOnly => format.is_depth().then_some(vk::ImageAspectFlags::DEPTH),
            ImageViewKind::StencilOnly => format.has_stencil().then_some(vk::ImageAspectFlags::STENCIL),
        }
    }
}

/// 按 [`ImageViewKind`] 索引的一组 view
#[derive(Debug, Clone, Copy, Default)]
struct ImageViews([vk::ImageView; 3]);

impl ImageViews {
    #[inline]
    fn get(&self, kind: ImageViewKind) -> vk::ImageView {
        self.0[kind as usize]
    }

    fn destroy(&mut self, ctx: &RenderDeviceContext) {
        for view in self.0.iter_mut().filter(|v| !v.is_null()) {
            ctx.device().destroy_image_view(*view);
            *view = vk::ImageView::null();
        }
    }
}

/// image 的内存来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSource {
    Allocated(AllocationHandle),
    /// 由外部持有，例如 swapchain image，只销毁 view
    External,
}

pub fn calculate_mip_level_count(options: ImageOptions, width: u32, height: u32) -> u32 {
    if options.contains(ImageOptions::MIPMAPS) {
        // floor(log2(max)) + 1
        let max = width.max(height).max(1);
        u32::BITS - max.leading_zeros()
    } else {
        1
    }
}

pub fn calculate_layer_count(options: ImageOptions) -> u32 {
    if options.contains(ImageOptions::CUBEMAP) { 6 } else { 1 }
}

pub struct RhiImage {
    ctx: RenderDeviceContext,

    handle: vk::Image,
    source: ImageSource,

    views: ImageViews,
    /// 仅 cubemap 有，每个 layer 一组
    layer_views: Vec<ImageViews>,

    width: u32,
    height: u32,
    mip_level_count: u32,
    layer_count: u32,
    format: Format,

    debug_name: String,
}

impl DebugType for RhiImage {
    fn debug_type_name() -> &'static str {
        "RhiImage"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for RhiImage {
    fn drop(&mut self) {
        self.destroy();
    }
}

// new & init
impl RhiImage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &RenderDeviceContext,
        width: u32,
        height: u32,
        format: Format,
        usage: ImageUsageFlags,
        memory_usage: MemoryUsage,
        options: ImageOptions,
        debug_name: impl AsRef<str>,
    ) -> Self {
        let mut image = Self::empty(ctx);
        image.init(width, height, format, usage, memory_usage, options, debug_name);
        image
    }

    pub fn empty(ctx: &RenderDeviceContext) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: vk::Image::null(),
            source: ImageSource::External,
            views: ImageViews::default(),
            layer_views: Vec::new(),
            width: 0,
            height: 0,
            mip_level_count: 1,
            layer_count: 1,
            format: Format::Undefined,
            debug_name: String::new(),
        }
    }

    /// 包装一个外部创建的 image，只创建 view，不负责其内存
    pub fn new_external(
        ctx: &RenderDeviceContext,
        image: vk::Image,
        width: u32,
        height: u32,
        format: Format,
        debug_name: impl AsRef<str>,
    ) -> Self {
        let mut external = Self::empty(ctx);
        external.handle = image;
        external.width = width;
        external.height = height;
        external.format = format;
        external.debug_name = debug_name.as_ref().to_string();
        external.init_views();
        external
    }

    /// 重新创建 image，之前持有的资源会先被销毁
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        width: u32,
        height: u32,
        format: Format,
        usage: ImageUsageFlags,
        memory_usage: MemoryUsage,
        options: ImageOptions,
        debug_name: impl AsRef<str>,
    ) {
        self.destroy();

        self.width = width;
        self.height = height;
        self.format = format;
        self.mip_level_count = calculate_mip_level_count(options, width, height);
        self.layer_count = calculate_layer_count(options);
        self.debug_name = debug_name.as_ref().to_string();

        let mut usage = usage;
        if self.mip_level_count > 1 {
            // mip 链通过 blit 生成
            usage |= ImageUsageFlags::TRANSFER_SOURCE | ImageUsageFlags::TRANSFER_DESTINATION;
        }
        let create_flags = if options.contains(ImageOptions::CUBEMAP) {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };

        let image_ci = vk::ImageCreateInfo::default()
            .flags(create_flags)
            .image_type(vk::ImageType::TYPE_2D)
            .format(format.to_native())
            .extent(vk::Extent3D { width, height, depth: 1 })
            .mip_levels(self.mip_level_count)
            .array_layers(self.layer_count)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage.to_native())
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        match self.ctx.allocator().allocate_image(&image_ci, memory_usage) {
            Ok((handle, allocation)) => {
                self.handle = handle;
                self.source = ImageSource::Allocated(allocation);
                self.ctx.set_debug_name(self, &self.debug_name);
                self.init_views();
            }
            Err(e) => {
                self.ctx.log(
                    LogSeverity::Error,
                    LogCategory::Memory,
                    format_args!("failed to allocate image {}({}x{}): {:?}", self.debug_name, width, height, e),
                );
                self.width = 0;
                self.height = 0;
            }
        }
    }

    fn init_views(&mut self) {
        self.views = self.create_views(self.view_type(), 0, self.layer_count);
        if self.layer_count > 1 {
            self.layer_views =
                (0..self.layer_count).map(|layer| self.create_views(vk::ImageViewType::TYPE_2D, layer, 1)).collect();
        }
    }

    fn create_views(&self, view_type: vk::ImageViewType, base_layer: u32, layer_count: u32) -> ImageViews {
        let mut views = ImageViews::default();
        for kind in ImageViewKind::ALL {
            let Some(aspect_mask) = kind.aspect(self.format) else {
                continue;
            };
            let view_ci = vk::ImageViewCreateInfo::default()
                .image(self.handle)
                .view_type(view_type)
                .format(self.format.to_native())
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: self.mip_level_count,
                    base_array_layer: base_layer,
                    layer_count,
                });
            match self.ctx.device().create_image_view(&view_ci) {
                Ok(view) => views.0[kind as usize] = view,
                Err(e) => self.ctx.log(
                    LogSeverity::Error,
                    LogCategory::Resource,
                    format_args!("failed to create {:?} view for image {}: {:?}", kind, self.debug_name, e),
                ),
            }
        }
        views
    }

    /// 释放 view 与内存，可以重复调用
    pub fn destroy(&mut self) {
        self.views.destroy(&self.ctx);
        for views in &mut self.layer_views {
            views.destroy(&self.ctx);
        }
        self.layer_views.clear();

        if let ImageSource::Allocated(allocation) = self.source {
            if !self.handle.is_null() {
                self.ctx.allocator().deallocate_image(self.handle, allocation);
            }
        }
        self.handle = vk::Image::null();
        self.source = ImageSource::External;
    }
}

// getters
impl RhiImage {
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.source == ImageSource::External
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    #[inline]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    #[inline]
    pub fn native_view(&self, kind: ImageViewKind) -> vk::ImageView {
        self.views.get(kind)
    }

    /// 单个 layer 的 view，仅 cubemap 可用
    pub fn native_view_layer(&self, kind: ImageViewKind, layer: u32) -> vk::ImageView {
        assert!(
            (layer as usize) < self.layer_views.len(),
            "layer {} out of range for image {} with {} layer views",
            layer,
            self.debug_name,
            self.layer_views.len()
        );
        self.layer_views[layer as usize].get(kind)
    }
}

// tools
impl RhiImage {
    #[inline]
    pub fn mip_level_width(&self, mip_level: u32) -> u32 {
        self.width.checked_shr(mip_level).unwrap_or(0).max(1)
    }

    #[inline]
    pub fn mip_level_height(&self, mip_level: u32) -> u32 {
        self.height.checked_shr(mip_level).unwrap_or(0).max(1)
    }

    /// 只有一个 layer 时为 2D，否则为 cube
    #[inline]
    pub fn view_type(&self) -> vk::ImageViewType {
        if self.layer_count == 1 { vk::ImageViewType::TYPE_2D } else { vk::ImageViewType::CUBE }
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        image_format_to_aspect(self.format)
    }

    /// 覆盖所有 mip 与 layer
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect(),
            base_mip_level: 0,
            level_count: self.mip_level_count,
            base_array_layer: 0,
            layer_count: self.layer_count,
        }
    }

    /// 所有 layer 中 `[base_mip_level, base_mip_level + level_count)` 的 mip
    pub fn mip_range(&self, base_mip_level: u32, level_count: u32) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            base_mip_level,
            level_count,
            ..self.subresource_range()
        }
    }

    pub fn subresource_layers(&self, mip_level: u32, layer: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.aspect(),
            mip_level,
            base_array_layer: layer,
            layer_count: 1,
        }
    }
}
