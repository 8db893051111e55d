mod catalog;

use catalog::{
    AddProduct, AddProductHandler, BrowseCatalog, BrowseCatalogHandler, CountInStock,
    CountInStockHandler, MarkSoldOut, MarkSoldOutHandler, NewArrivalNotifier, ProductAdded,
    ProductRepository, SearchIndexer,
};
use cqrs_application::{
    context::AppContext,
    decorators::{
        AuditConfig, CacheConfig, InMemoryResponseCache, InMemoryUnitOfWork, ResponseCache,
        UnitOfWork,
    },
    dispatcher::Dispatcher,
    error::AppError,
    registry::HandlerRegistry,
    services::ServiceProvider,
};
use cqrs_domain::domain_event::BusinessContext;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

/// 演示配置（JSON），缺省字段使用默认值
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoConfig {
    cache: CacheConfig,
    audit: AuditConfig,
}

impl DemoConfig {
    /// 读取 `CQRS_DEMO_CONFIG` 指向的文件；未设置时使用默认配置
    fn load() -> anyhow::Result<Self> {
        match std::env::var("CQRS_DEMO_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = DemoConfig::load()?;
    tracing::info!(?config, "configuration loaded");

    let products = Arc::new(ProductRepository::new());
    let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryResponseCache::new(config.cache));
    let indexer = Arc::new(SearchIndexer::default());

    let mut services = ServiceProvider::new();
    services
        .add_singleton(cache.clone())
        .add_instance(config.audit)
        .add_scoped::<dyn UnitOfWork, _>(|_| {
            Arc::new(InMemoryUnitOfWork::new()) as Arc<dyn UnitOfWork>
        });

    let mut registry = HandlerRegistry::new();
    {
        let products = products.clone();
        let cache = cache.clone();
        let ids = Arc::new(AtomicU32::new(1));
        registry.register_command_factory::<AddProduct, AddProductHandler, _>(move |scope| {
            let dispatcher = scope.resolve::<Dispatcher>().ok_or(AppError::Infra(
                "dispatcher is not available in scope".into(),
            ))?;
            Ok(Arc::new(AddProductHandler {
                products: products.clone(),
                ids: ids.clone(),
                cache: cache.clone(),
                dispatcher,
            }))
        })?;
    }
    registry
        .register_command::<MarkSoldOut, _>(MarkSoldOutHandler {
            products: products.clone(),
            cache: cache.clone(),
        })?
        .register_query::<BrowseCatalog, _>(BrowseCatalogHandler {
            products: products.clone(),
        })?
        .register_query::<CountInStock, _>(CountInStockHandler {
            products: products.clone(),
        })?
        .register_event_handler::<ProductAdded, _>(NewArrivalNotifier)?;
    {
        let indexer = indexer.clone();
        registry.register_event_handler_factory::<ProductAdded, SearchIndexer, _>(move |_| {
            Ok(indexer.clone())
        })?;
    }

    println!("commands: {:?}", registry.registered_commands());
    println!("queries: {:?}", registry.registered_queries());
    println!(
        "ProductAdded handlers: {:?}",
        registry.event_handlers_for::<ProductAdded>()
    );

    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .services(services)
        .build()?;

    let ctx = AppContext::new(
        BusinessContext::builder()
            .correlation_id("demo-session".into())
            .actor_type("user".into())
            .actor_id("u-42".into())
            .build(),
    );

    // 上架商品
    for (name, category, price_cents) in [
        ("Green Tea", "tea", 1200),
        ("Black Tea", "tea", 900),
        ("Oolong", "tea", 1500),
        ("Espresso Beans", "coffee", 2400),
        ("Drip Bag", "coffee", 600),
    ] {
        let id = dispatcher
            .dispatch_command(
                &ctx,
                AddProduct {
                    name: name.into(),
                    category: category.into(),
                    price_cents,
                },
            )
            .await?;
        println!("added: #{id} {name}");
    }
    println!("indexed: {:?}", indexer.indexed());

    // 参数校验失败：事务回滚，错误原样返回
    let rejected = dispatcher
        .dispatch_command(
            &ctx,
            AddProduct {
                name: " ".into(),
                category: "tea".into(),
                price_cents: 100,
            },
        )
        .await;
    println!("rejected: {rejected:?}");

    // 分页浏览（第二次命中缓存）
    let browse = || BrowseCatalog {
        category: Some("tea".into()),
        max_price_cents: Some(1500),
        page: 0,
        size: 2,
    };
    let first = dispatcher.dispatch_query(&ctx, browse()).await?;
    let again = dispatcher.dispatch_query(&ctx, browse()).await?;
    println!(
        "tea page 0: total={}, items={:?}",
        first.total,
        first.items.iter().map(|p| &p.name).collect::<Vec<_>>()
    );
    println!("served from cache: {}", first == again);

    let sold_out = dispatcher
        .dispatch_command(
            &ctx,
            MarkSoldOut {
                category: "coffee".into(),
            },
        )
        .await?;
    let in_stock = dispatcher.dispatch_query(&ctx, CountInStock).await?;
    println!("sold out: {sold_out}, in stock: {in_stock}");

    // 非法分页在执行前被拒绝
    let invalid = dispatcher
        .dispatch_query(
            &ctx,
            BrowseCatalog {
                category: None,
                max_price_cents: None,
                page: 0,
                size: 0,
            },
        )
        .await;
    println!("invalid page: {invalid:?}");

    Ok(())
}
