/// 应用层查询（Query）
///
/// 表达只读意图，不改变领域状态。
/// - 与 [`Command`](crate::command::Command) 相对，`Query` 应避免副作用；
/// - `Output` 通常是序列化友好的 DTO 或其集合。
pub trait Query: Send + Sync + 'static {
    /// 查询的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 查询结果
    type Output: Clone + Send + Sync + 'static;

    /// 结果缓存键；返回 `None` 时缓存装饰器直接放行。
    /// 只需在本请求类型内唯一，缓存装饰器会加上 `NAME` 前缀
    fn cache_key(&self) -> Option<String> {
        None
    }
}
