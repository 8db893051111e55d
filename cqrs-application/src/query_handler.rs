use crate::{context::AppContext, error::AppError, marker::Markers, query::Query};
use async_trait::async_trait;

#[async_trait]
pub trait QueryHandler<Q>: Send + Sync
where
    Q: Query,
{
    /// 处理器声明的标记（按书写顺序，第一个为最外层装饰）
    fn markers() -> Markers
    where
        Self: Sized,
    {
        Markers::new()
    }

    async fn handle(&self, ctx: &AppContext, q: Q) -> Result<Q::Output, AppError>;
}
