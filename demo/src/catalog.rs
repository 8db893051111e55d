use async_trait::async_trait;
use cqrs_application::{
    command::Command,
    command_handler::CommandHandler,
    context::AppContext,
    decorators::{Audited, Cached, ResponseCache, Transactional, cache_prefix},
    dispatcher::Dispatcher,
    error::AppError,
    event_handler::EventHandler,
    marker::Markers,
    query::Query,
    query_handler::QueryHandler,
};
use cqrs_domain::chrono::Utc;
use cqrs_domain::criteria::Criteria;
use cqrs_domain::repository::{InMemoryRepository, Paged, ReadRepository};
use cqrs_domain::specification::Specification;
use cqrs_macros::{command, domain_event, query};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub price_cents: u64,
    pub in_stock: bool,
}

pub struct InCategory(pub String);

impl Criteria<Product> for InCategory {
    fn is_satisfied_by(&self, candidate: &Product) -> bool {
        candidate.category == self.0
    }
}

pub struct PriceAtMost(pub u64);

impl Criteria<Product> for PriceAtMost {
    fn is_satisfied_by(&self, candidate: &Product) -> bool {
        candidate.price_cents <= self.0
    }
}

pub struct InStock;

impl Criteria<Product> for InStock {
    fn is_satisfied_by(&self, candidate: &Product) -> bool {
        candidate.in_stock
    }
}

#[command(output = u32)]
pub struct AddProduct {
    pub name: String,
    pub category: String,
    pub price_cents: u64,
}

#[command(output = usize)]
pub struct MarkSoldOut {
    pub category: String,
}

#[query(output = Paged<Product>, cacheable)]
pub struct BrowseCatalog {
    pub category: Option<String>,
    pub max_price_cents: Option<u64>,
    pub page: i64,
    pub size: i64,
}

#[query(output = usize)]
pub struct CountInStock;

#[domain_event(event_type = "catalog.product_added")]
pub struct ProductAdded {
    pub product_id: u32,
    pub name: String,
    pub category: String,
}

pub type ProductRepository = InMemoryRepository<Product>;

pub struct AddProductHandler {
    pub products: Arc<ProductRepository>,
    pub ids: Arc<AtomicU32>,
    pub cache: Arc<dyn ResponseCache>,
    pub dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl CommandHandler<AddProduct> for AddProductHandler {
    fn markers() -> Markers {
        Markers::new()
            .with(Audited::action("catalog.add"))
            .with(Transactional::new())
    }

    async fn handle(&self, ctx: &AppContext, cmd: AddProduct) -> Result<u32, AppError> {
        if cmd.name.trim().is_empty() {
            return Err(AppError::Validation("product name must not be empty".into()));
        }
        if cmd.price_cents == 0 {
            return Err(AppError::Validation("price must be positive".into()));
        }

        let id = self.ids.fetch_add(1, Ordering::SeqCst);
        self.products
            .add(Product {
                id,
                name: cmd.name.clone(),
                category: cmd.category.clone(),
                price_cents: cmd.price_cents,
                in_stock: true,
            })
            .await;
        self.cache.invalidate(&cache_prefix(BrowseCatalog::NAME)).await;

        self.dispatcher
            .dispatch_event(
                &ctx.caused_by(AddProduct::NAME),
                ProductAdded {
                    event_date_time: Utc::now(),
                    product_id: id,
                    name: cmd.name,
                    category: cmd.category,
                },
            )
            .await?;
        Ok(id)
    }
}

pub struct MarkSoldOutHandler {
    pub products: Arc<ProductRepository>,
    pub cache: Arc<dyn ResponseCache>,
}

#[async_trait]
impl CommandHandler<MarkSoldOut> for MarkSoldOutHandler {
    fn markers() -> Markers {
        Markers::new().with(Audited::action("catalog.sold_out"))
    }

    async fn handle(&self, _ctx: &AppContext, cmd: MarkSoldOut) -> Result<usize, AppError> {
        let affected = self
            .products
            .update_where(InCategory(cmd.category), |p| p.in_stock = false)
            .await;
        self.cache.invalidate(&cache_prefix(BrowseCatalog::NAME)).await;
        Ok(affected)
    }
}

pub struct BrowseCatalogHandler {
    pub products: Arc<ProductRepository>,
}

impl BrowseCatalogHandler {
    fn specification(q: &BrowseCatalog) -> Specification<Product> {
        let mut spec = Specification::<Product>::new().filter(InStock);
        if let Some(category) = &q.category {
            spec = spec.filter(InCategory(category.clone()));
        }
        if let Some(max) = q.max_price_cents {
            spec = spec.filter(PriceAtMost(max));
        }
        spec.include("category")
            .order_by(|p: &Product| p.price_cents)
            .then_by(|p: &Product| p.name.clone())
            .as_read_only()
            .page(q.page, q.size)
    }
}

#[async_trait]
impl QueryHandler<BrowseCatalog> for BrowseCatalogHandler {
    fn markers() -> Markers {
        Markers::new().with(Audited::new()).with(Cached::new())
    }

    async fn handle(
        &self,
        _ctx: &AppContext,
        q: BrowseCatalog,
    ) -> Result<Paged<Product>, AppError> {
        Ok(self.products.page(&Self::specification(&q)).await?)
    }
}

pub struct CountInStockHandler {
    pub products: Arc<ProductRepository>,
}

#[async_trait]
impl QueryHandler<CountInStock> for CountInStockHandler {
    async fn handle(&self, _ctx: &AppContext, _q: CountInStock) -> Result<usize, AppError> {
        let spec = Specification::<Product>::new().filter(InStock);
        Ok(self.products.count(&spec).await?)
    }
}

/// 新品通知
pub struct NewArrivalNotifier;

#[async_trait]
impl EventHandler<ProductAdded> for NewArrivalNotifier {
    fn markers() -> Markers {
        Markers::new().with(Audited::action("notify.new_arrival"))
    }

    async fn handle(&self, ctx: &AppContext, event: ProductAdded) -> Result<(), AppError> {
        tracing::info!(
            product_id = event.product_id,
            name = %event.name,
            causation_id = ctx.biz.causation_id().unwrap_or("-"),
            "new arrival announced"
        );
        Ok(())
    }
}

/// 维护按类目的搜索索引
#[derive(Default)]
pub struct SearchIndexer {
    entries: Mutex<Vec<(String, u32)>>,
}

impl SearchIndexer {
    pub fn indexed(&self) -> Vec<(String, u32)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventHandler<ProductAdded> for SearchIndexer {
    async fn handle(&self, _ctx: &AppContext, event: ProductAdded) -> Result<(), AppError> {
        self.entries
            .lock()
            .map(|mut entries| entries.push((event.category, event.product_id)))
            .map_err(|_| AppError::Infra("search index poisoned".into()))
    }
}
