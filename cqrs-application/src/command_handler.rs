use crate::{command::Command, context::AppContext, error::AppError, marker::Markers};
use async_trait::async_trait;

#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    /// 处理器声明的标记（按书写顺序，第一个为最外层装饰）
    fn markers() -> Markers
    where
        Self: Sized,
    {
        Markers::new()
    }

    async fn handle(&self, ctx: &AppContext, cmd: C) -> Result<C::Output, AppError>;
}
