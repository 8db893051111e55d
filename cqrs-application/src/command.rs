/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，通常会修改领域状态。
/// - 以具体类型作为身份，由唯一处理器执行；
/// - `Output` 为命令结果（如新建实体的 ID），无结果时使用 `()`；
/// - 建议保持语义化的“动宾结构”命名，如 `CreateProduct`、`CancelOrder`。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志、审计与错误信息。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 命令结果
    type Output: Clone + Send + Sync + 'static;

    /// 结果缓存键；返回 `None` 时缓存装饰器直接放行。
    /// 只需在本请求类型内唯一，缓存装饰器会加上 `NAME` 前缀
    fn cache_key(&self) -> Option<String> {
        None
    }
}
