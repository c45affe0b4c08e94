use ash::vk;
use itertools::Itertools;

use crate::{
    basic::format::UniformType,
    descriptors::resolve_info::ResolveInfo,
    foundation::{
        context::RenderDeviceContext,
        debug_logger::{LogCategory, LogSeverity},
    },
    resources::{
        arena::{BufferHandle, ImageHandle, ResourceArena, SamplerHandle},
        image::ImageViewKind,
    },
    usage::{
        translation::{image_usage_to_layout, uniform_type_to_buffer_usage, uniform_type_to_image_usage},
        usage::{BufferUsage, ImageUsage},
    },
};

/// descriptor set 的更新策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveOptions {
    /// 每次 write 都更新
    #[default]
    ResolveEachFrame,
    /// 下一次 write 更新，之后变为 `AlreadyResolved`
    ResolveOnce,
    /// write 不做任何事
    AlreadyResolved,
}

/// 一次 descriptor 写入：`binding` 使用 info 数组中 `[first_index, first_index + count)` 这一段
///
/// buffer 类的 uniform 指向 buffer info 数组，其余指向 image info 数组。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWriteInfo {
    pub uniform_type: UniformType,
    pub binding: u32,
    pub first_index: usize,
    pub count: u32,
}

#[derive(Debug, Clone)]
struct BufferToResolve {
    name: String,
    binding: u32,
    uniform_type: UniformType,
    usage: BufferUsage,
}

#[derive(Debug, Clone)]
struct ImageToResolve {
    name: String,
    binding: u32,
    uniform_type: UniformType,
    usage: ImageUsage,
    view: ImageViewKind,
    sampler: SamplerHandle,
}

#[derive(Debug, Clone)]
struct SamplerToResolve {
    sampler: SamplerHandle,
    binding: u32,
    uniform_type: UniformType,
}

#[derive(Debug, Clone, Copy)]
struct BufferWriteInfo {
    buffer: BufferHandle,
}

/// `image` 为 None 表示只有 sampler
#[derive(Debug, Clone, Copy)]
struct ImageWriteInfo {
    image: Option<ImageHandle>,
    usage: ImageUsage,
    view: ImageViewKind,
    sampler: SamplerHandle,
}

/// 记录 shader 中每个 binding 需要的资源名称，每帧根据 [`ResolveInfo`] 找到实际资源并写入 descriptor set
///
/// 不带 sampler 的 image 使用 arena 中的空 sampler。
pub struct DescriptorBinding {
    ctx: RenderDeviceContext,
    empty_sampler: SamplerHandle,
    options: ResolveOptions,

    buffers_to_resolve: Vec<BufferToResolve>,
    images_to_resolve: Vec<ImageToResolve>,
    samplers_to_resolve: Vec<SamplerToResolve>,

    desc_writes: Vec<DescriptorWriteInfo>,
    buffer_write_infos: Vec<BufferWriteInfo>,
    image_write_infos: Vec<ImageWriteInfo>,
}

// new & init
impl DescriptorBinding {
    pub fn new(ctx: &RenderDeviceContext, arena: &ResourceArena) -> Self {
        Self {
            ctx: ctx.clone(),
            empty_sampler: arena.empty_sampler(),
            options: ResolveOptions::default(),
            buffers_to_resolve: vec![],
            images_to_resolve: vec![],
            samplers_to_resolve: vec![],
            desc_writes: vec![],
            buffer_write_infos: vec![],
            image_write_infos: vec![],
        }
    }
}

// 声明
impl DescriptorBinding {
    /// 按 uniform 类型声明一个 buffer 或 image
    ///
    /// image 类的 uniform 使用 native view，不带 sampler。acceleration structure 不能通过这里绑定
    pub fn bind(&mut self, binding: u32, name: impl Into<String>, uniform_type: UniformType) -> &mut Self {
        let name: String = name.into();
        assert!(
            uniform_type != UniformType::AccelerationStructure,
            "acceleration structure {name} at binding {binding} can not be bound by name"
        );
        let usage = uniform_type_to_buffer_usage(uniform_type);
        if usage == BufferUsage::Unknown {
            return self.bind_with_view(binding, name, uniform_type, ImageViewKind::Native);
        }

        self.buffers_to_resolve.push(BufferToResolve {
            name,
            binding,
            uniform_type,
            usage,
        });
        self
    }

    pub fn bind_with_view(
        &mut self,
        binding: u32,
        name: impl Into<String>,
        uniform_type: UniformType,
        view: ImageViewKind,
    ) -> &mut Self {
        let sampler = self.empty_sampler;
        self.bind_with_sampler_view(binding, name, sampler, uniform_type, view)
    }

    pub fn bind_with_sampler(
        &mut self,
        binding: u32,
        name: impl Into<String>,
        sampler: SamplerHandle,
        uniform_type: UniformType,
    ) -> &mut Self {
        self.bind_with_sampler_view(binding, name, sampler, uniform_type, ImageViewKind::Native)
    }

    pub fn bind_with_sampler_view(
        &mut self,
        binding: u32,
        name: impl Into<String>,
        sampler: SamplerHandle,
        uniform_type: UniformType,
        view: ImageViewKind,
    ) -> &mut Self {
        let name: String = name.into();
        assert!(
            uniform_type_to_buffer_usage(uniform_type) == BufferUsage::Unknown,
            "{uniform_type:?} is not an image uniform, binding {binding} of {name}"
        );
        self.images_to_resolve.push(ImageToResolve {
            name,
            binding,
            uniform_type,
            usage: uniform_type_to_image_usage(uniform_type),
            view,
            sampler,
        });
        self
    }

    /// 单独的 sampler，不需要 resolve
    pub fn bind_sampler(&mut self, binding: u32, sampler: SamplerHandle, uniform_type: UniformType) -> &mut Self {
        self.samplers_to_resolve.push(SamplerToResolve {
            sampler,
            binding,
            uniform_type,
        });
        self
    }

    #[inline]
    pub fn set_options(&mut self, options: ResolveOptions) {
        self.options = options;
    }
}

// getters
impl DescriptorBinding {
    #[inline]
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// 上一次 resolve 得到的写入列表
    #[inline]
    pub fn desc_writes(&self) -> &[DescriptorWriteInfo] {
        &self.desc_writes
    }

    /// 声明的 buffer 名称与用途，用于推导 pass 的依赖
    pub fn bound_buffers(&self) -> impl Iterator<Item = (&str, BufferUsage)> {
        self.buffers_to_resolve.iter().map(|b| (b.name.as_str(), b.usage))
    }

    pub fn bound_images(&self) -> impl Iterator<Item = (&str, ImageUsage)> {
        self.images_to_resolve.iter().map(|i| (i.name.as_str(), i.usage))
    }
}

// tools
impl DescriptorBinding {
    /// 找到每个名称对应的资源，为每个 binding 分配连续的一段 info
    ///
    /// 顺序固定为 image、buffer、sampler。名称找不到时 panic
    pub fn resolve(&mut self, resolve_info: &ResolveInfo) {
        self.desc_writes.clear();
        self.buffer_write_infos.clear();
        self.image_write_infos.clear();

        for image in &self.images_to_resolve {
            let handles = resolve_info
                .images(&image.name)
                .unwrap_or_else(|| panic!("can not find image {} for binding {}", image.name, image.binding));

            let first_index = self.image_write_infos.len();
            self.image_write_infos.extend(handles.iter().map(|&handle| ImageWriteInfo {
                image: Some(handle),
                usage: image.usage,
                view: image.view,
                sampler: image.sampler,
            }));
            self.desc_writes.push(DescriptorWriteInfo {
                uniform_type: image.uniform_type,
                binding: image.binding,
                first_index,
                count: handles.len() as u32,
            });
        }

        for buffer in &self.buffers_to_resolve {
            let handles = resolve_info
                .buffers(&buffer.name)
                .unwrap_or_else(|| panic!("can not find buffer {} for binding {}", buffer.name, buffer.binding));

            let first_index = self.buffer_write_infos.len();
            self.buffer_write_infos.extend(handles.iter().map(|&buffer| BufferWriteInfo { buffer }));
            self.desc_writes.push(DescriptorWriteInfo {
                uniform_type: buffer.uniform_type,
                binding: buffer.binding,
                first_index,
                count: handles.len() as u32,
            });
        }

        for sampler in &self.samplers_to_resolve {
            let first_index = self.image_write_infos.len();
            self.image_write_infos.push(ImageWriteInfo {
                image: None,
                usage: ImageUsage::Unknown,
                view: ImageViewKind::Native,
                sampler: sampler.sampler,
            });
            self.desc_writes.push(DescriptorWriteInfo {
                uniform_type: sampler.uniform_type,
                binding: sampler.binding,
                first_index,
                count: 1,
            });
        }
    }

    /// 将 resolve 的结果写入 `set`，受 [`ResolveOptions`] 控制
    ///
    /// arena 中找不到 resolve 时的资源会 panic
    pub fn write(&mut self, arena: &ResourceArena, set: vk::DescriptorSet) {
        match self.options {
            ResolveOptions::AlreadyResolved => return,
            ResolveOptions::ResolveOnce => self.options = ResolveOptions::AlreadyResolved,
            ResolveOptions::ResolveEachFrame => (),
        }

        let buffer_infos = self
            .buffer_write_infos
            .iter()
            .map(|info| {
                let buffer = arena.buffer(info.buffer).unwrap_or_else(|| panic!("stale buffer handle in descriptor"));
                vk::DescriptorBufferInfo::default().buffer(buffer.handle()).offset(0).range(buffer.size())
            })
            .collect_vec();

        let image_infos = self
            .image_write_infos
            .iter()
            .map(|info| {
                let sampler =
                    arena.sampler(info.sampler).unwrap_or_else(|| panic!("stale sampler handle in descriptor"));
                let view = match info.image {
                    Some(handle) => arena
                        .image(handle)
                        .unwrap_or_else(|| panic!("stale image handle in descriptor"))
                        .native_view(info.view),
                    None => vk::ImageView::null(),
                };
                vk::DescriptorImageInfo::default()
                    .sampler(sampler.handle())
                    .image_view(view)
                    .image_layout(image_usage_to_layout(info.usage))
            })
            .collect_vec();

        let writes = self
            .desc_writes
            .iter()
            .filter(|write| write.count > 0)
            .map(|write| {
                let range = write.first_index..write.first_index + write.count as usize;
                let native = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(write.binding)
                    .dst_array_element(0)
                    .descriptor_type(write.uniform_type.to_native());
                if write.uniform_type.is_buffer_type() {
                    native.buffer_info(&buffer_infos[range])
                } else {
                    native.image_info(&image_infos[range])
                }
            })
            .collect_vec();

        if writes.is_empty() {
            self.ctx.log(
                LogSeverity::Warning,
                LogCategory::Descriptor,
                format_args!("descriptor set {:?} has nothing to write", set),
            );
            return;
        }
        self.ctx.device().update_descriptor_sets(&writes);
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;
    use crate::{
        basic::format::Format,
        foundation::mem_allocator::MemoryUsage,
        resources::{
            buffer::RhiBuffer,
            image::{ImageOptions, RhiImage},
            sampler::{RhiSampler, RhiSamplerDesc},
        },
        testing::mock_context,
        usage::usage::{BufferUsageFlags, ImageUsageFlags},
    };

    fn make_image(ctx: &RenderDeviceContext, name: &str) -> RhiImage {
        RhiImage::new(
            ctx,
            64,
            64,
            Format::R8G8B8A8Unorm,
            ImageUsageFlags::SHADER_READ | ImageUsageFlags::STORAGE,
            MemoryUsage::GpuOnly,
            ImageOptions::empty(),
            name,
        )
    }

    fn make_buffer(ctx: &RenderDeviceContext, size: u64, name: &str) -> RhiBuffer {
        RhiBuffer::new(ctx, size, BufferUsageFlags::UNIFORM_BUFFER, MemoryUsage::CpuToGpu, name)
    }

    #[test]
    fn test_resolve_allocates_disjoint_spans() {
        let (ctx, device, _allocator, _logger) = mock_context();
        let mut arena = ResourceArena::new();

        let albedo = arena.insert_image(make_image(&ctx, "albedo"));
        let shadows = (0..3).map(|i| arena.insert_image(make_image(&ctx, &format!("shadow-{i}")))).collect_vec();
        let camera = arena.insert_buffer(make_buffer(&ctx, 256, "camera"));
        let lights = (0..2).map(|i| arena.insert_buffer(make_buffer(&ctx, 64, &format!("light-{i}")))).collect_vec();
        let sampler = arena.insert_sampler(RhiSampler::new(&ctx, RhiSamplerDesc::default(), "linear").unwrap());

        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding
            .bind(0, "camera", UniformType::UniformBuffer)
            .bind_with_sampler(1, "albedo", sampler, UniformType::CombinedImageSampler)
            .bind(2, "lights", UniformType::StorageBuffer)
            .bind(3, "shadows", UniformType::SampledImage)
            .bind_sampler(4, sampler, UniformType::Sampler);

        let mut info = ResolveInfo::new();
        info.resolve_buffer("camera", camera)
            .resolve_buffers("lights", &lights)
            .resolve_image("albedo", albedo)
            .resolve_images("shadows", &shadows);
        binding.resolve(&info);

        let writes = binding.desc_writes();
        assert_eq!(writes.len(), 5);
        // image、buffer、sampler 的顺序
        assert_eq!(writes[0].binding, 1);
        assert_eq!((writes[0].first_index, writes[0].count), (0, 1));
        assert_eq!(writes[1].binding, 3);
        assert_eq!((writes[1].first_index, writes[1].count), (1, 3));
        assert_eq!(writes[2].binding, 0);
        assert_eq!((writes[2].first_index, writes[2].count), (0, 1));
        assert_eq!(writes[3].binding, 2);
        assert_eq!((writes[3].first_index, writes[3].count), (1, 2));
        assert_eq!(writes[4].binding, 4);
        assert_eq!((writes[4].first_index, writes[4].count), (4, 1));

        let set = vk::DescriptorSet::from_raw(0x51);
        binding.write(&arena, set);

        let records = device.descriptor_writes.borrow();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.dst_set == set));

        let lights_record = records.iter().find(|r| r.binding == 2).unwrap();
        assert_eq!(lights_record.descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(lights_record.count, 2);
        assert_eq!(lights_record.buffers[1].buffer, arena.buffer(lights[1]).unwrap().handle());
        assert_eq!(lights_record.buffers[1].range, 64);
        assert!(lights_record.images.is_empty());

        let shadow_record = records.iter().find(|r| r.binding == 3).unwrap();
        assert_eq!(shadow_record.count, 3);
        assert_eq!(shadow_record.images[2].image_view, arena.image(shadows[2]).unwrap().native_view(ImageViewKind::Native));
        assert!(shadow_record.images[2].sampler.is_null());
        assert_eq!(shadow_record.images[2].image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    #[test]
    fn test_combined_and_sampler_only_image_infos() {
        let (ctx, device, _allocator, _logger) = mock_context();
        let mut arena = ResourceArena::new();
        let albedo = arena.insert_image(make_image(&ctx, "albedo"));
        let sampler = arena.insert_sampler(RhiSampler::new(&ctx, RhiSamplerDesc::default(), "linear").unwrap());
        let sampler_native = arena.sampler(sampler).unwrap().handle();

        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding
            .bind_with_sampler(0, "albedo", sampler, UniformType::CombinedImageSampler)
            .bind_sampler(1, sampler, UniformType::Sampler);
        let mut info = ResolveInfo::new();
        info.resolve_image("albedo", albedo);
        binding.resolve(&info);
        binding.write(&arena, vk::DescriptorSet::from_raw(1));

        let records = device.descriptor_writes.borrow();
        let combined = &records[0].images[0];
        assert_eq!(combined.sampler, sampler_native);
        assert_eq!(combined.image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(!combined.image_view.is_null());

        let sampler_only = &records[1].images[0];
        assert_eq!(records[1].descriptor_type, vk::DescriptorType::SAMPLER);
        assert_eq!(sampler_only.sampler, sampler_native);
        assert!(sampler_only.image_view.is_null());
        assert_eq!(sampler_only.image_layout, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn test_storage_image_layout() {
        let (ctx, device, _allocator, _logger) = mock_context();
        let mut arena = ResourceArena::new();
        let target = arena.insert_image(make_image(&ctx, "target"));

        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding.bind(0, "target", UniformType::StorageImage);
        assert_eq!(binding.bound_images().collect_vec(), vec![("target", ImageUsage::Storage)]);

        let mut info = ResolveInfo::new();
        info.resolve_image("target", target);
        binding.resolve(&info);
        binding.write(&arena, vk::DescriptorSet::from_raw(1));
        assert_eq!(device.descriptor_writes.borrow()[0].images[0].image_layout, vk::ImageLayout::GENERAL);
    }

    #[test]
    fn test_resolve_options() {
        let (ctx, device, _allocator, _logger) = mock_context();
        let mut arena = ResourceArena::new();
        let camera = arena.insert_buffer(make_buffer(&ctx, 128, "camera"));
        let mut info = ResolveInfo::new();
        info.resolve_buffer("camera", camera);
        let set = vk::DescriptorSet::from_raw(7);

        let mut each_frame = DescriptorBinding::new(&ctx, &arena);
        each_frame.bind(0, "camera", UniformType::UniformBuffer);
        each_frame.resolve(&info);
        each_frame.write(&arena, set);
        each_frame.write(&arena, set);
        assert_eq!(device.descriptor_writes.borrow().len(), 2);

        let mut once = DescriptorBinding::new(&ctx, &arena);
        once.bind(0, "camera", UniformType::UniformBuffer);
        once.set_options(ResolveOptions::ResolveOnce);
        once.resolve(&info);
        once.write(&arena, set);
        assert_eq!(once.options(), ResolveOptions::AlreadyResolved);
        once.write(&arena, set);
        assert_eq!(device.descriptor_writes.borrow().len(), 3);

        let mut resolved = DescriptorBinding::new(&ctx, &arena);
        resolved.bind(0, "camera", UniformType::UniformBuffer);
        resolved.set_options(ResolveOptions::AlreadyResolved);
        resolved.resolve(&info);
        resolved.write(&arena, set);
        assert_eq!(device.descriptor_writes.borrow().len(), 3);
    }

    #[test]
    fn test_resolve_again_replaces_previous_result() {
        let (ctx, _device, _allocator, _logger) = mock_context();
        let mut arena = ResourceArena::new();
        let a = arena.insert_buffer(make_buffer(&ctx, 16, "a"));
        let b = arena.insert_buffer(make_buffer(&ctx, 16, "b"));

        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding.bind(0, "objects", UniformType::StorageBuffer);

        let mut info = ResolveInfo::new();
        info.resolve_buffers("objects", &[a, b]);
        binding.resolve(&info);
        binding.resolve(&info);
        assert_eq!(binding.desc_writes().len(), 1);
        assert_eq!(binding.desc_writes()[0].count, 2);
        assert_eq!(binding.desc_writes()[0].first_index, 0);
    }

    #[test]
    #[should_panic(expected = "can not find buffer camera")]
    fn test_missing_name_panics() {
        let (ctx, _device, _allocator, _logger) = mock_context();
        let arena = ResourceArena::new();
        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding.bind(0, "camera", UniformType::UniformBuffer);
        binding.resolve(&ResolveInfo::new());
    }

    #[test]
    #[should_panic(expected = "can not be bound by name")]
    fn test_acceleration_structure_bind_rejected() {
        let (ctx, _device, _allocator, _logger) = mock_context();
        let arena = ResourceArena::new();
        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding.bind(0, "tlas", UniformType::AccelerationStructure);
    }

    #[test]
    #[should_panic(expected = "is not an image uniform")]
    fn test_buffer_type_with_view_rejected() {
        let (ctx, _device, _allocator, _logger) = mock_context();
        let arena = ResourceArena::new();
        let mut binding = DescriptorBinding::new(&ctx, &arena);
        binding.bind_with_view(0, "lights", UniformType::StorageBuffer, ImageViewKind::Native);
    }
}
