//! 类型擦除的处理管线
//!
//! 装饰器需要包裹任意请求类型的处理器，因此管线内部以 `Box<dyn Any + Send>` 传递请求、
//! 以 `Arc<dyn Any + Send + Sync>` 传递结果；类型在最内层（业务处理器适配器）与
//! 分发器出口处还原。每个请求都附带 [`RequestInfo`]，供装饰器读取名称与缓存键。
//!
use crate::{
    command::Command, command_handler::CommandHandler, context::AppContext, error::AppError,
    event_handler::EventHandler, query::Query, query_handler::QueryHandler,
};
use async_trait::async_trait;
use cqrs_domain::domain_event::DomainEvent;
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

pub type BoxPayload = Box<dyn Any + Send>;

pub type SharedOutput = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Command,
    Query,
    Event,
}

/// 请求的只读描述
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub kind: RequestKind,
    /// 请求的稳定名称（`Command::NAME` / `Query::NAME` / `DomainEvent::EVENT_TYPE`）
    pub name: &'static str,
    /// 业务处理器类型名
    pub handler: &'static str,
    pub cache_key: Option<String>,
}

/// 管线中流转的请求
pub struct RequestEnvelope {
    info: RequestInfo,
    payload: BoxPayload,
}

impl RequestEnvelope {
    pub fn new(info: RequestInfo, payload: BoxPayload) -> Self {
        Self { info, payload }
    }

    pub fn info(&self) -> &RequestInfo {
        &self.info
    }

    /// 还原请求载荷
    pub fn into_payload<T: 'static>(self) -> Result<T, AppError> {
        let found = self.info.name;
        self.payload
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| AppError::TypeMismatch {
                expected: type_name::<T>(),
                found,
            })
    }
}

/// 处理能力：业务处理器适配器与所有装饰器都以此形状相互包裹
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError>;
}

/// 还原管线输出；唯一持有者时直接取出，否则克隆
pub(crate) fn downcast_output<R>(out: SharedOutput) -> Result<R, AppError>
where
    R: Clone + Send + Sync + 'static,
{
    let typed = out.downcast::<R>().map_err(|_| AppError::TypeMismatch {
        expected: type_name::<R>(),
        found: "unknown",
    })?;
    Ok(Arc::try_unwrap(typed).unwrap_or_else(|shared| (*shared).clone()))
}

pub(crate) struct CommandAdapter<C, H> {
    handler: Arc<H>,
    _request: PhantomData<fn(C)>,
}

impl<C, H> CommandAdapter<C, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<C, H> RequestHandler for CommandAdapter<C, H>
where
    C: Command,
    H: CommandHandler<C> + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        // 取消信号在业务处理器启动前生效，避免产生部分副作用
        ctx.ensure_not_cancelled(C::NAME)?;
        let cmd = request.into_payload::<C>()?;
        let out = self.handler.handle(ctx, cmd).await?;
        Ok(Arc::new(out) as SharedOutput)
    }
}

pub(crate) struct QueryAdapter<Q, H> {
    handler: Arc<H>,
    _request: PhantomData<fn(Q)>,
}

impl<Q, H> QueryAdapter<Q, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<Q, H> RequestHandler for QueryAdapter<Q, H>
where
    Q: Query,
    H: QueryHandler<Q> + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        ctx.ensure_not_cancelled(Q::NAME)?;
        let q = request.into_payload::<Q>()?;
        let out = self.handler.handle(ctx, q).await?;
        Ok(Arc::new(out) as SharedOutput)
    }
}

pub(crate) struct EventAdapter<E, H> {
    handler: Arc<H>,
    _event: PhantomData<fn(E)>,
}

impl<E, H> EventAdapter<E, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<E, H> RequestHandler for EventAdapter<E, H>
where
    E: DomainEvent,
    H: EventHandler<E> + 'static,
{
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        ctx.ensure_not_cancelled(E::EVENT_TYPE)?;
        let event = request.into_payload::<E>()?;
        self.handler.handle(ctx, event).await?;
        Ok(Arc::new(()) as SharedOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_envelope() {
        let info = RequestInfo {
            kind: RequestKind::Query,
            name: "Get",
            handler: "GetHandler",
            cache_key: None,
        };
        let envelope = RequestEnvelope::new(info.clone(), Box::new(7_u32));
        assert_eq!(envelope.into_payload::<u32>().unwrap(), 7);

        let envelope = RequestEnvelope::new(info, Box::new(7_u32));
        let err = envelope.into_payload::<String>().unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { found: "Get", .. }));
    }

    #[test]
    fn shared_output_is_cloned_when_still_referenced() {
        let out: SharedOutput = Arc::new(vec![1, 2, 3]);
        let cached = out.clone();

        let value: Vec<i32> = downcast_output(out).unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(cached.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));

        let wrong = downcast_output::<String>(cached);
        assert!(matches!(wrong, Err(AppError::TypeMismatch { .. })));
    }
}
