use chrono::{DateTime, Utc};
use std::fmt;

/// 领域事件：已经发生的业务事实
///
/// - 以具体类型作为身份，分发时按 `TypeId` 精确匹配处理器；
/// - 可被零个或多个处理器消费（扇出），与命令/查询的“唯一处理器”不同；
/// - 载荷通常是受影响的实体或其 ID，保持不可变。
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// 事件的稳定类型名（形如 `catalog.product_created`），用于日志与审计
    const EVENT_TYPE: &'static str;

    /// 事件发生时间
    fn event_date_time(&self) -> DateTime<Utc>;
}
