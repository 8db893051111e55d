use crate::{context::AppContext, error::AppError, marker::Markers};
use async_trait::async_trait;
use cqrs_domain::domain_event::DomainEvent;

/// 领域事件处理器
///
/// 同一事件可注册多个处理器；处理器之间应相互独立，不依赖执行顺序。
#[async_trait]
pub trait EventHandler<E>: Send + Sync
where
    E: DomainEvent,
{
    fn markers() -> Markers
    where
        Self: Sized,
    {
        Markers::new()
    }

    async fn handle(&self, ctx: &AppContext, event: E) -> Result<(), AppError>;
}
