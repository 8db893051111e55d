//! 领域事件（Domain Event）与业务语境
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`），以及随一次调用传播的
//! 业务语境 `BusinessContext`（关联追踪、因果链、执行者）。

mod business_context;
mod domain_event_trait;

pub use business_context::BusinessContext;
pub use domain_event_trait::DomainEvent;
