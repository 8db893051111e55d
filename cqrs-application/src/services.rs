//! 服务容器（Service Container）
//!
//! - [`ServiceProvider`]：进程级注册表，启动时写入，之后只读；
//!   支持单例实例与“每个作用域一份”的作用域工厂；
//! - [`ServiceScope`]：一次分发独占的作用域，缓存作用域实例（如工作单元），
//!   不在并发分发之间共享。
//!
//! 解析键为 `TypeId`，支持 trait 对象（如 `resolve::<dyn UnitOfWork>()`）。
//!
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

// 实际保存的是 `Arc<T>`，以便支持 `T: ?Sized`
type Instance = Arc<dyn Any + Send + Sync>;

type ScopedFactory = Arc<dyn Fn(&ServiceScope) -> Instance + Send + Sync>;

#[derive(Clone, Default)]
pub struct ServiceProvider {
    singletons: HashMap<TypeId, (&'static str, Instance)>,
    scoped: HashMap<TypeId, (&'static str, ScopedFactory)>,
}

impl ServiceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册单例（可为 trait 对象）
    pub fn add_singleton<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance: Instance = Arc::new(value);
        self.singletons
            .insert(TypeId::of::<T>(), (type_name::<T>(), instance));
        self
    }

    /// 注册具体值作为单例
    pub fn add_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.add_singleton(Arc::new(value))
    }

    /// 注册作用域工厂：每个作用域首次解析时构造一次
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Arc<T> + Send + Sync + 'static,
    {
        let factory: ScopedFactory = Arc::new(move |scope: &ServiceScope| -> Instance {
            let instance: Instance = Arc::new(factory(scope));
            instance
        });
        self.scoped
            .insert(TypeId::of::<T>(), (type_name::<T>(), factory));
        self
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let key = TypeId::of::<T>();
        self.singletons.contains_key(&key) || self.scoped.contains_key(&key)
    }

    /// 已注册的服务类型名（只读视图）
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .singletons
            .values()
            .map(|(name, _)| *name)
            .chain(self.scoped.values().map(|(name, _)| *name))
            .collect();
        names.sort_unstable();
        names
    }

    /// 创建一次分发使用的作用域
    pub fn create_scope(self: &Arc<Self>) -> ServiceScope {
        ServiceScope {
            root: self.clone(),
            local: DashMap::new(),
        }
    }
}

/// 一次分发的服务作用域
pub struct ServiceScope {
    root: Arc<ServiceProvider>,
    local: DashMap<TypeId, Instance>,
}

impl ServiceScope {
    /// 解析服务：作用域内实例 → 作用域工厂 → 单例；均未注册时返回 `None`
    pub fn resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();

        if let Some(found) = self.local.get(&key).map(|e| e.value().clone()) {
            return unwrap_instance::<T>(&found);
        }

        if let Some((_, factory)) = self.root.scoped.get(&key) {
            // 工厂可能递归解析其它服务，构造期间不持有 DashMap 的条目锁
            let created = factory(self);
            let stored = self.local.entry(key).or_insert(created).value().clone();
            return unwrap_instance::<T>(&stored);
        }

        self.root
            .singletons
            .get(&key)
            .and_then(|(_, instance)| unwrap_instance::<T>(instance))
    }

    /// 仅在本作用域内可见的实例（如分发器自身）
    pub fn insert<T>(&self, value: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance: Instance = Arc::new(value);
        self.local.insert(TypeId::of::<T>(), instance);
    }
}

fn unwrap_instance<T>(instance: &Instance) -> Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<T>>().cloned()
}
