//! 处理器注册表（Handler Registry）
//!
//! 启动时通过显式注册调用构建，之后只读：
//! - 命令/查询：每个 (请求类型, 结果类型) 至多一个处理器，重复注册在注册时即失败；
//! - 领域事件：同一事件可注册多个处理器，按注册顺序保存。
//!
//! 处理器可以注册为共享实例，也可以注册为工厂（每次解析时从作用域构造）。
//!
use crate::{
    command::Command,
    command_handler::CommandHandler,
    error::AppError,
    event_handler::EventHandler,
    marker::Markers,
    pipeline::{CommandAdapter, EventAdapter, QueryAdapter, RequestHandler, RequestKind},
    query::Query,
    query_handler::QueryHandler,
    services::ServiceScope,
};
use cqrs_domain::domain_event::DomainEvent;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type HandlerProvider =
    Arc<dyn Fn(&ServiceScope) -> Result<Arc<dyn RequestHandler>, AppError> + Send + Sync>;

type PairKey = (TypeId, TypeId);

/// (请求类型, 结果类型) → 处理器类型 的描述
#[derive(Clone)]
pub struct HandlerDescriptor {
    kind: RequestKind,
    request_name: &'static str,
    result_name: &'static str,
    handler_name: &'static str,
    handler_type: TypeId,
    markers: Markers,
    provider: HandlerProvider,
}

impl HandlerDescriptor {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn request_name(&self) -> &'static str {
        self.request_name
    }

    pub fn result_name(&self) -> &'static str {
        self.result_name
    }

    /// 业务处理器的类型名
    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// 构造最内层的业务处理器
    pub(crate) fn business_handler(
        &self,
        scope: &ServiceScope,
    ) -> Result<Arc<dyn RequestHandler>, AppError> {
        (self.provider)(scope)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("kind", &self.kind)
            .field("request", &self.request_name)
            .field("result", &self.result_name)
            .field("handler", &self.handler_name)
            .field("markers", &self.markers)
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerRegistry {
    commands: HashMap<PairKey, HandlerDescriptor>,
    queries: HashMap<PairKey, HandlerDescriptor>,
    events: HashMap<TypeId, Vec<HandlerDescriptor>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器（共享实例）
    pub fn register_command<C, H>(&mut self, handler: H) -> Result<&mut Self, AppError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler = Arc::new(handler);
        self.register_command_factory::<C, H, _>(move |_| Ok(handler.clone()))
    }

    /// 注册命令处理器工厂：每次解析时从作用域构造
    pub fn register_command_factory<C, H, F>(&mut self, factory: F) -> Result<&mut Self, AppError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
        F: Fn(&ServiceScope) -> Result<Arc<H>, AppError> + Send + Sync + 'static,
    {
        let key = (TypeId::of::<C>(), TypeId::of::<C::Output>());
        if let Some(existing) = self.commands.get(&key) {
            return Err(AppError::AlreadyRegisteredCommand {
                command: C::NAME,
                existing: existing.handler_name,
            });
        }

        let descriptor = HandlerDescriptor {
            kind: RequestKind::Command,
            request_name: C::NAME,
            result_name: type_name::<C::Output>(),
            handler_name: type_name::<H>(),
            handler_type: TypeId::of::<H>(),
            markers: <H as CommandHandler<C>>::markers(),
            provider: Arc::new(move |scope: &ServiceScope| -> Result<_, AppError> {
                let handler = factory(scope)?;
                Ok(Arc::new(CommandAdapter::<C, H>::new(handler)) as Arc<dyn RequestHandler>)
            }),
        };
        self.commands.insert(key, descriptor);
        Ok(self)
    }

    /// 注册查询处理器（共享实例）
    pub fn register_query<Q, H>(&mut self, handler: H) -> Result<&mut Self, AppError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler = Arc::new(handler);
        self.register_query_factory::<Q, H, _>(move |_| Ok(handler.clone()))
    }

    /// 注册查询处理器工厂：每次解析时从作用域构造
    pub fn register_query_factory<Q, H, F>(&mut self, factory: F) -> Result<&mut Self, AppError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
        F: Fn(&ServiceScope) -> Result<Arc<H>, AppError> + Send + Sync + 'static,
    {
        let key = (TypeId::of::<Q>(), TypeId::of::<Q::Output>());
        if let Some(existing) = self.queries.get(&key) {
            return Err(AppError::AlreadyRegisteredQuery {
                query: Q::NAME,
                result: type_name::<Q::Output>(),
                existing: existing.handler_name,
            });
        }

        let descriptor = HandlerDescriptor {
            kind: RequestKind::Query,
            request_name: Q::NAME,
            result_name: type_name::<Q::Output>(),
            handler_name: type_name::<H>(),
            handler_type: TypeId::of::<H>(),
            markers: <H as QueryHandler<Q>>::markers(),
            provider: Arc::new(move |scope: &ServiceScope| -> Result<_, AppError> {
                let handler = factory(scope)?;
                Ok(Arc::new(QueryAdapter::<Q, H>::new(handler)) as Arc<dyn RequestHandler>)
            }),
        };
        self.queries.insert(key, descriptor);
        Ok(self)
    }

    /// 注册领域事件处理器（共享实例）
    pub fn register_event_handler<E, H>(&mut self, handler: H) -> Result<&mut Self, AppError>
    where
        E: DomainEvent,
        H: EventHandler<E> + 'static,
    {
        let handler = Arc::new(handler);
        self.register_event_handler_factory::<E, H, _>(move |_| Ok(handler.clone()))
    }

    /// 注册领域事件处理器工厂；同一处理器类型对同一事件只能注册一次
    pub fn register_event_handler_factory<E, H, F>(
        &mut self,
        factory: F,
    ) -> Result<&mut Self, AppError>
    where
        E: DomainEvent,
        H: EventHandler<E> + 'static,
        F: Fn(&ServiceScope) -> Result<Arc<H>, AppError> + Send + Sync + 'static,
    {
        let handlers = self.events.entry(TypeId::of::<E>()).or_default();
        if handlers.iter().any(|d| d.handler_type == TypeId::of::<H>()) {
            return Err(AppError::AlreadyRegisteredEventHandler {
                event: E::EVENT_TYPE,
                handler: type_name::<H>(),
            });
        }

        handlers.push(HandlerDescriptor {
            kind: RequestKind::Event,
            request_name: E::EVENT_TYPE,
            result_name: type_name::<()>(),
            handler_name: type_name::<H>(),
            handler_type: TypeId::of::<H>(),
            markers: <H as EventHandler<E>>::markers(),
            provider: Arc::new(move |scope: &ServiceScope| -> Result<_, AppError> {
                let handler = factory(scope)?;
                Ok(Arc::new(EventAdapter::<E, H>::new(handler)) as Arc<dyn RequestHandler>)
            }),
        });
        Ok(self)
    }

    /// 按命令的具体类型与结果类型解析处理器
    pub fn resolve_command<C: Command>(&self) -> Result<&HandlerDescriptor, AppError> {
        self.commands
            .get(&(TypeId::of::<C>(), TypeId::of::<C::Output>()))
            .ok_or(AppError::HandlerNotFound {
                request: C::NAME,
                result: type_name::<C::Output>(),
            })
    }

    /// 按查询的具体类型与结果类型解析处理器
    pub fn resolve_query<Q: Query>(&self) -> Result<&HandlerDescriptor, AppError> {
        self.queries
            .get(&(TypeId::of::<Q>(), TypeId::of::<Q::Output>()))
            .ok_or(AppError::HandlerNotFound {
                request: Q::NAME,
                result: type_name::<Q::Output>(),
            })
    }

    /// 事件的全部处理器（按注册顺序）；没有处理器时为空
    pub fn event_handlers<E: DomainEvent>(&self) -> &[HandlerDescriptor] {
        self.events
            .get(&TypeId::of::<E>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 已注册的命令名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        sorted_names(self.commands.values())
    }

    /// 已注册的查询名列表（只读视图）
    pub fn registered_queries(&self) -> Vec<&'static str> {
        sorted_names(self.queries.values())
    }

    /// 事件处理器类型名（按注册顺序）
    pub fn event_handlers_for<E: DomainEvent>(&self) -> Vec<&'static str> {
        self.event_handlers::<E>()
            .iter()
            .map(HandlerDescriptor::handler_name)
            .collect()
    }

    /// 全部描述（命令、查询、事件处理器），用于装配期校验
    pub fn descriptors(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.commands
            .values()
            .chain(self.queries.values())
            .chain(self.events.values().flatten())
    }
}

fn sorted_names<'a>(descriptors: impl Iterator<Item = &'a HandlerDescriptor>) -> Vec<&'static str> {
    let mut names: Vec<_> = descriptors.map(|d| d.request_name).collect();
    names.sort_unstable();
    names
}
