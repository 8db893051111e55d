//! 装饰器映射（Decorator Map）
//!
//! 标记类型 → 装饰器构造函数。每个标记类型至多映射一个装饰器，
//! 重复映射在装配时报 `AmbiguousDecorator`。装饰器在构造时通过
//! [`DecoratorArgs::resolve`] 从当前作用域解析依赖，缺失即为配置错误。
//!
use crate::{
    decorators::{
        audit::{AuditDecorator, Audited},
        caching::{Cached, CachingDecorator},
        transaction::{TransactionDecorator, Transactional},
    },
    error::AppError,
    marker::{Marker, MarkerEntry},
    pipeline::RequestHandler,
    registry::HandlerDescriptor,
    services::ServiceScope,
};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

type DecorateFn = Arc<
    dyn Fn(
            &MarkerEntry,
            Arc<dyn RequestHandler>,
            &ServiceScope,
            &HandlerDescriptor,
        ) -> Result<Arc<dyn RequestHandler>, AppError>
        + Send
        + Sync,
>;

/// 构造装饰器时可用的输入
pub struct DecoratorArgs<'a, M> {
    /// 标记实例（携带配置）
    pub marker: Arc<M>,
    /// 被包裹的内层处理器
    pub inner: Arc<dyn RequestHandler>,
    scope: &'a ServiceScope,
    descriptor: &'a HandlerDescriptor,
    component: &'static str,
}

impl<M> DecoratorArgs<'_, M> {
    /// 解析必需依赖；缺失时返回 `UnresolvedDependency`
    pub fn resolve<T>(&self) -> Result<Arc<T>, AppError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.scope
            .resolve::<T>()
            .ok_or(AppError::UnresolvedDependency {
                dependency: type_name::<T>(),
                component: self.component,
                handler: self.descriptor.handler_name(),
            })
    }

    /// 解析可选依赖
    pub fn try_resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.scope.resolve::<T>()
    }

    pub fn descriptor(&self) -> &HandlerDescriptor {
        self.descriptor
    }
}

#[derive(Clone, Default)]
pub struct DecoratorMap {
    entries: HashMap<TypeId, (&'static str, DecorateFn)>,
}

impl DecoratorMap {
    /// 空映射：所有标记都被忽略
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置映射：`Audited`、`Transactional`、`Cached`
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        map.insert::<Audited, _, _>(|args| AuditDecorator::from_args(&args));
        map.insert::<Transactional, _, _>(|args| TransactionDecorator::from_args(&args));
        map.insert::<Cached, _, _>(|args| CachingDecorator::from_args(&args));
        map
    }

    /// 映射标记到装饰器；同一标记重复映射时报 `AmbiguousDecorator`
    pub fn register<M, D, F>(&mut self, factory: F) -> Result<&mut Self, AppError>
    where
        M: Marker,
        D: RequestHandler + 'static,
        F: Fn(DecoratorArgs<'_, M>) -> Result<D, AppError> + Send + Sync + 'static,
    {
        if self.contains::<M>() {
            return Err(AppError::AmbiguousDecorator {
                marker: type_name::<M>(),
            });
        }
        self.insert(factory);
        Ok(self)
    }

    /// 移除一个映射（用于替换内置装饰器）
    pub fn remove<M: Marker>(&mut self) -> &mut Self {
        self.entries.remove(&TypeId::of::<M>());
        self
    }

    pub fn contains<M: Marker>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<M>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 已映射的标记类型名（只读视图）
    pub fn mapped(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }

    /// 用标记对应的装饰器包裹 `inner`；未映射的标记返回 `None`
    pub(crate) fn decorate(
        &self,
        marker: &MarkerEntry,
        inner: Arc<dyn RequestHandler>,
        scope: &ServiceScope,
        descriptor: &HandlerDescriptor,
    ) -> Option<Result<Arc<dyn RequestHandler>, AppError>> {
        self.entries
            .get(&marker.type_id())
            .map(|(_, decorate)| decorate(marker, inner, scope, descriptor))
    }

    fn insert<M, D, F>(&mut self, factory: F)
    where
        M: Marker,
        D: RequestHandler + 'static,
        F: Fn(DecoratorArgs<'_, M>) -> Result<D, AppError> + Send + Sync + 'static,
    {
        let decorate: DecorateFn = Arc::new(
            move |entry: &MarkerEntry,
                  inner: Arc<dyn RequestHandler>,
                  scope: &ServiceScope,
                  descriptor: &HandlerDescriptor|
                  -> Result<Arc<dyn RequestHandler>, AppError> {
                let marker = entry.downcast::<M>().ok_or(AppError::TypeMismatch {
                    expected: type_name::<M>(),
                    found: entry.name(),
                })?;
                let decorator = factory(DecoratorArgs {
                    marker,
                    inner,
                    scope,
                    descriptor,
                    component: type_name::<D>(),
                })?;
                Ok(Arc::new(decorator) as Arc<dyn RequestHandler>)
            },
        );
        self.entries
            .insert(TypeId::of::<M>(), (type_name::<M>(), decorate));
    }
}
