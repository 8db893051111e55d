//! 分发器（Dispatcher）
//!
//! 对外的唯一入口：
//! - 命令/查询：解析唯一处理器，经处理器工厂组装处理链后执行，返回处理器结果；
//! - 领域事件：按注册顺序依次交给每个处理器（各自的处理链），
//!   首个失败即中止并原样返回；没有处理器时静默成功。
//!
//! 每次执行都使用新的服务作用域，分发器自身注册在作用域内，
//! 处理器工厂可解析 [`Dispatcher`] 以发起嵌套分发。
//!
//! ```rust
//! use cqrs_application::{
//!     command::Command, command_handler::CommandHandler, context::AppContext,
//!     dispatcher::Dispatcher, error::AppError, registry::HandlerRegistry,
//! };
//!
//! struct Ping;
//! impl Command for Ping {
//!     const NAME: &'static str = "Ping";
//!     type Output = &'static str;
//! }
//!
//! struct PingHandler;
//! #[async_trait::async_trait]
//! impl CommandHandler<Ping> for PingHandler {
//!     async fn handle(&self, _ctx: &AppContext, _cmd: Ping) -> Result<&'static str, AppError> {
//!         Ok("pong")
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut registry = HandlerRegistry::new();
//! registry.register_command::<Ping, _>(PingHandler)?;
//!
//! let dispatcher = Dispatcher::builder().registry(registry).build()?;
//! let reply = dispatcher.dispatch_command(&AppContext::default(), Ping).await?;
//! assert_eq!(reply, "pong");
//! # Ok::<(), AppError>(())
//! # }).unwrap();
//! ```
use crate::{
    command::Command,
    context::AppContext,
    decorator::DecoratorMap,
    error::AppError,
    factory::HandlerFactory,
    pipeline::{RequestEnvelope, RequestInfo, SharedOutput, downcast_output},
    query::Query,
    registry::{HandlerDescriptor, HandlerRegistry},
    services::{ServiceProvider, ServiceScope},
};
use bon::bon;
use cqrs_domain::domain_event::DomainEvent;
use std::sync::Arc;

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    registry: HandlerRegistry,
    factory: HandlerFactory,
    services: Arc<ServiceProvider>,
}

#[bon]
impl Dispatcher {
    /// 装配分发器，并为每个已注册处理器试组装一次处理链；
    /// 依赖缺失等配置错误在此返回
    #[builder]
    pub fn new(
        registry: HandlerRegistry,
        #[builder(default = DecoratorMap::with_defaults())] decorators: DecoratorMap,
        #[builder(default)] services: ServiceProvider,
    ) -> Result<Self, AppError> {
        let dispatcher = Self {
            inner: Arc::new(DispatcherInner {
                registry,
                factory: HandlerFactory::new(decorators),
                services: Arc::new(services),
            }),
        };
        dispatcher.validate()?;
        Ok(dispatcher)
    }
}

impl Dispatcher {
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.inner.services
    }

    /// 执行命令，返回处理器结果
    pub async fn dispatch_command<C: Command>(
        &self,
        ctx: &AppContext,
        cmd: C,
    ) -> Result<C::Output, AppError> {
        let descriptor = self.inner.registry.resolve_command::<C>()?;
        let info = RequestInfo {
            kind: descriptor.kind(),
            name: C::NAME,
            handler: descriptor.handler_name(),
            cache_key: cmd.cache_key(),
        };

        let out = self
            .execute(descriptor, ctx, RequestEnvelope::new(info, Box::new(cmd)))
            .await?;
        downcast_output(out)
    }

    /// 执行查询，返回处理器结果
    pub async fn dispatch_query<Q: Query>(
        &self,
        ctx: &AppContext,
        query: Q,
    ) -> Result<Q::Output, AppError> {
        let descriptor = self.inner.registry.resolve_query::<Q>()?;
        let info = RequestInfo {
            kind: descriptor.kind(),
            name: Q::NAME,
            handler: descriptor.handler_name(),
            cache_key: query.cache_key(),
        };

        let out = self
            .execute(descriptor, ctx, RequestEnvelope::new(info, Box::new(query)))
            .await?;
        downcast_output(out)
    }

    /// 发布领域事件：按注册顺序逐个执行，首个失败即返回
    pub async fn dispatch_event<E: DomainEvent>(
        &self,
        ctx: &AppContext,
        event: E,
    ) -> Result<(), AppError> {
        for descriptor in self.inner.registry.event_handlers::<E>() {
            let info = RequestInfo {
                kind: descriptor.kind(),
                name: E::EVENT_TYPE,
                handler: descriptor.handler_name(),
                cache_key: None,
            };
            self.execute(
                descriptor,
                ctx,
                RequestEnvelope::new(info, Box::new(event.clone())),
            )
            .await?;
        }
        Ok(())
    }

    /// 依次发布多个事件，首个失败即返回
    pub async fn dispatch_events<E, I>(&self, ctx: &AppContext, events: I) -> Result<(), AppError>
    where
        E: DomainEvent,
        I: IntoIterator<Item = E> + Send,
        I::IntoIter: Send,
    {
        for event in events {
            self.dispatch_event(ctx, event).await?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        descriptor: &HandlerDescriptor,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        let scope = self.create_scope();
        let chain = self.inner.factory.build_chain(descriptor, &scope)?;
        chain.handle(ctx, request).await
    }

    fn create_scope(&self) -> ServiceScope {
        let scope = self.inner.services.create_scope();
        scope.insert(Arc::new(self.clone()));
        scope
    }

    fn validate(&self) -> Result<(), AppError> {
        for descriptor in self.inner.registry.descriptors() {
            let scope = self.create_scope();
            self.inner.factory.build_chain(descriptor, &scope)?;
        }
        Ok(())
    }
}
