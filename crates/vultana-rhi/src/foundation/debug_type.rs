use ash::vk;

/// 可以设置 debug name 的 RHI 对象
pub trait DebugType {
    fn debug_type_name() -> &'static str;

    fn vk_handle(&self) -> impl vk::Handle;
}

/// 取出 handle 的类型与原始值，用于跨越 trait object 边界
#[inline]
pub(crate) fn raw_handle<H: vk::Handle>(handle: H) -> (vk::ObjectType, u64) {
    (H::TYPE, handle.as_raw())
}
