use async_trait::async_trait;
use cqrs_application::{
    command::Command,
    command_handler::CommandHandler,
    context::AppContext,
    decorators::{
        AuditOutcome, AuditRecord, AuditSink, Audited, CacheConfig, Cached, InMemoryResponseCache,
        InMemoryUnitOfWork, IsolationLevel, ResponseCache, Transactional, UnitOfWork,
        UnitOfWorkStep, cache_prefix,
    },
    dispatcher::Dispatcher,
    error::AppError,
    event_handler::EventHandler,
    marker::Markers,
    query::Query,
    query_handler::QueryHandler,
    registry::HandlerRegistry,
    services::ServiceProvider,
};
use cqrs_domain::chrono::Utc;
use cqrs_macros::{command, domain_event, query};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[query(output = String, cacheable)]
struct Greeting {
    name: String,
}

#[query(output = usize)]
struct Uncached;

struct CountingGreeter {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QueryHandler<Greeting> for CountingGreeter {
    fn markers() -> Markers {
        Markers::new().with(Cached::new())
    }

    async fn handle(&self, _ctx: &AppContext, q: Greeting) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("hello {}", q.name))
    }
}

#[async_trait]
impl QueryHandler<Uncached> for CountingGreeter {
    fn markers() -> Markers {
        Markers::new().with(Cached::new())
    }

    async fn handle(&self, _ctx: &AppContext, _q: Uncached) -> Result<usize, AppError> {
        Ok(self.calls.fetch_add(1, Ordering::SeqCst))
    }
}

fn greeting(name: &str) -> Greeting {
    Greeting { name: name.into() }
}

#[tokio::test]
async fn cached_queries_hit_the_cache_by_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(InMemoryResponseCache::new(CacheConfig::default()));

    let mut registry = HandlerRegistry::new();
    registry
        .register_query::<Greeting, _>(CountingGreeter {
            calls: calls.clone(),
        })
        .unwrap()
        .register_query::<Uncached, _>(CountingGreeter {
            calls: calls.clone(),
        })
        .unwrap();
    let mut services = ServiceProvider::new();
    services.add_singleton::<dyn ResponseCache>(cache.clone());

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()
        .unwrap();
    let ctx = AppContext::default();

    let a = dispatcher.dispatch_query(&ctx, greeting("ann")).await.unwrap();
    let b = dispatcher.dispatch_query(&ctx, greeting("ann")).await.unwrap();
    let c = dispatcher.dispatch_query(&ctx, greeting("bob")).await.unwrap();

    assert_eq!((a.as_str(), b.as_str()), ("hello ann", "hello ann"));
    assert_eq!(c, "hello bob");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);

    // 没有缓存键的请求直接透传
    let first = dispatcher.dispatch_query(&ctx, Uncached).await.unwrap();
    let second = dispatcher.dispatch_query(&ctx, Uncached).await.unwrap();
    assert_eq!(second, first + 1);

    assert_eq!(cache.invalidate("Greeting:").await, 2);
    dispatcher.dispatch_query(&ctx, greeting("ann")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

struct ProductName {
    id: u32,
}

impl Query for ProductName {
    const NAME: &'static str = "ProductName";
    type Output = String;

    fn cache_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

struct CategoryName {
    id: u32,
}

impl Query for CategoryName {
    const NAME: &'static str = "CategoryName";
    type Output = String;

    fn cache_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

struct Names;

#[async_trait]
impl QueryHandler<ProductName> for Names {
    fn markers() -> Markers {
        Markers::new().with(Cached::new())
    }

    async fn handle(&self, _ctx: &AppContext, q: ProductName) -> Result<String, AppError> {
        Ok(format!("product-{}", q.id))
    }
}

#[async_trait]
impl QueryHandler<CategoryName> for Names {
    fn markers() -> Markers {
        Markers::new().with(Cached::new())
    }

    async fn handle(&self, _ctx: &AppContext, q: CategoryName) -> Result<String, AppError> {
        Ok(format!("category-{}", q.id))
    }
}

#[tokio::test]
async fn equal_cache_keys_of_different_queries_do_not_collide() {
    let cache = Arc::new(InMemoryResponseCache::new(CacheConfig::default()));
    let mut registry = HandlerRegistry::new();
    registry
        .register_query::<ProductName, _>(Names)
        .unwrap()
        .register_query::<CategoryName, _>(Names)
        .unwrap();
    let mut services = ServiceProvider::new();
    services.add_singleton::<dyn ResponseCache>(cache.clone());

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()
        .unwrap();
    let ctx = AppContext::default();

    let product = dispatcher
        .dispatch_query(&ctx, ProductName { id: 1 })
        .await
        .unwrap();
    let category = dispatcher
        .dispatch_query(&ctx, CategoryName { id: 1 })
        .await
        .unwrap();

    assert_eq!(product, "product-1");
    assert_eq!(category, "category-1");
    assert_eq!(cache.len(), 2);

    assert_eq!(cache.invalidate(&cache_prefix(ProductName::NAME)).await, 1);
    assert_eq!(
        dispatcher
            .dispatch_query(&ctx, CategoryName { id: 1 })
            .await
            .unwrap(),
        "category-1"
    );
}

#[command(output = u32)]
struct Withdraw {
    amount: u32,
}

struct WithdrawHandler;

#[async_trait]
impl CommandHandler<Withdraw> for WithdrawHandler {
    fn markers() -> Markers {
        Markers::new()
            .with(Audited::action("withdraw"))
            .with(Transactional::with_isolation(IsolationLevel::RepeatableRead))
    }

    async fn handle(&self, _ctx: &AppContext, cmd: Withdraw) -> Result<u32, AppError> {
        if cmd.amount > 100 {
            return Err(AppError::Validation("insufficient funds".into()));
        }
        Ok(100 - cmd.amount)
    }
}

#[derive(Default)]
struct CollectingSink(Mutex<Vec<AuditRecord>>);

#[async_trait]
impl AuditSink for CollectingSink {
    async fn record(&self, record: AuditRecord) {
        self.0.lock().unwrap().push(record);
    }
}

#[tokio::test]
async fn transactional_commands_commit_or_roll_back_and_are_audited() {
    let uow = Arc::new(InMemoryUnitOfWork::new());
    let sink = Arc::new(CollectingSink::default());

    let mut registry = HandlerRegistry::new();
    registry
        .register_command::<Withdraw, _>(WithdrawHandler)
        .unwrap();
    let mut services = ServiceProvider::new();
    services
        .add_singleton::<dyn UnitOfWork>(uow.clone())
        .add_singleton::<dyn AuditSink>(sink.clone());

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()
        .unwrap();
    let ctx = AppContext::default();

    let left = dispatcher
        .dispatch_command(&ctx, Withdraw { amount: 30 })
        .await
        .unwrap();
    assert_eq!(left, 70);

    let err = dispatcher
        .dispatch_command(&ctx, Withdraw { amount: 300 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(
        uow.journal(),
        vec![
            UnitOfWorkStep::Begin(IsolationLevel::RepeatableRead),
            UnitOfWorkStep::Commit,
            UnitOfWorkStep::Begin(IsolationLevel::RepeatableRead),
            UnitOfWorkStep::Rollback,
        ]
    );

    let records = sink.0.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].request, "Withdraw");
    assert_eq!(records[0].action.as_deref(), Some("withdraw"));
    assert_eq!(records[0].outcome, AuditOutcome::Succeeded);
    assert_eq!(
        records[1].outcome,
        AuditOutcome::Failed("validation: insufficient funds".into())
    );
}

#[tokio::test]
async fn scoped_unit_of_work_is_fresh_per_dispatch() {
    let created = Arc::new(Mutex::new(Vec::<Arc<InMemoryUnitOfWork>>::new()));

    let mut registry = HandlerRegistry::new();
    registry
        .register_command::<Withdraw, _>(WithdrawHandler)
        .unwrap();
    let mut services = ServiceProvider::new();
    {
        let created = created.clone();
        services.add_scoped::<dyn UnitOfWork, _>(move |_| {
            let uow = Arc::new(InMemoryUnitOfWork::new());
            created.lock().unwrap().push(uow.clone());
            uow as Arc<dyn UnitOfWork>
        });
    }

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()
        .unwrap();
    let ctx = AppContext::default();
    dispatcher
        .dispatch_command(&ctx, Withdraw { amount: 1 })
        .await
        .unwrap();
    dispatcher
        .dispatch_command(&ctx, Withdraw { amount: 2 })
        .await
        .unwrap();

    let created = created.lock().unwrap();
    // 装配校验一次 + 每次分发一次
    assert_eq!(created.len(), 3);
    assert!(created[0].journal().is_empty());
    assert_eq!(created[1].journal().len(), 2);
    assert_eq!(created[2].journal().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatches_never_share_a_unit_of_work() {
    const N: u32 = 16;
    let created = Arc::new(Mutex::new(Vec::<Arc<InMemoryUnitOfWork>>::new()));

    let mut registry = HandlerRegistry::new();
    registry
        .register_command::<Withdraw, _>(WithdrawHandler)
        .unwrap();
    let mut services = ServiceProvider::new();
    {
        let created = created.clone();
        services.add_scoped::<dyn UnitOfWork, _>(move |_| {
            let uow = Arc::new(InMemoryUnitOfWork::new());
            created.lock().unwrap().push(uow.clone());
            uow as Arc<dyn UnitOfWork>
        });
    }

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()
        .unwrap();

    let tasks: Vec<_> = (1..=N)
        .map(|amount| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .dispatch_command(&AppContext::default(), Withdraw { amount })
                    .await
            })
        })
        .collect();
    let mut left = Vec::new();
    for task in tasks {
        left.push(task.await.unwrap().unwrap());
    }
    left.sort_unstable();
    assert_eq!(left, (100 - N..100).collect::<Vec<_>>());

    let created = created.lock().unwrap();
    // 装配校验一次 + 每次分发一次
    assert_eq!(created.len(), N as usize + 1);
    for uow in created.iter().skip(1) {
        assert_eq!(
            uow.journal(),
            vec![
                UnitOfWorkStep::Begin(IsolationLevel::RepeatableRead),
                UnitOfWorkStep::Commit,
            ]
        );
    }
}

#[domain_event(event_type = "account.opened")]
struct AccountOpened {
    owner: String,
}

#[command(output = String)]
struct OpenAccount {
    owner: String,
}

/// 通过作用域中的分发器发布事件
struct OpenAccountHandler {
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl CommandHandler<OpenAccount> for OpenAccountHandler {
    async fn handle(&self, ctx: &AppContext, cmd: OpenAccount) -> Result<String, AppError> {
        let child = ctx.caused_by(OpenAccount::NAME);
        self.dispatcher
            .dispatch_event(
                &child,
                AccountOpened {
                    event_date_time: Utc::now(),
                    owner: cmd.owner.clone(),
                },
            )
            .await?;
        Ok(cmd.owner)
    }
}

struct Welcome {
    seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

#[async_trait]
impl EventHandler<AccountOpened> for Welcome {
    async fn handle(&self, ctx: &AppContext, event: AccountOpened) -> Result<(), AppError> {
        self.seen.lock().unwrap().push((
            event.owner,
            ctx.biz.causation_id().map(str::to_owned),
        ));
        Ok(())
    }
}

#[tokio::test]
async fn handlers_can_dispatch_through_the_scoped_dispatcher() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry
        .register_command_factory::<OpenAccount, OpenAccountHandler, _>(|scope| {
            let dispatcher = scope.resolve::<Dispatcher>().ok_or(AppError::Infra(
                "dispatcher missing from scope".into(),
            ))?;
            Ok(Arc::new(OpenAccountHandler { dispatcher }))
        })
        .unwrap()
        .register_event_handler::<AccountOpened, _>(Welcome { seen: seen.clone() })
        .unwrap();

    let dispatcher = Dispatcher::builder().registry(registry).build().unwrap();
    let owner = dispatcher
        .dispatch_command(
            &AppContext::default(),
            OpenAccount {
                owner: "ann".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(owner, "ann");
    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![("ann".to_string(), Some("OpenAccount".to_string()))]
    );
}
