//! 基于规约的只读仓储
//!
//! 处理器通过 [`ReadRepository`] 以 [`Specification`] 描述查询；
//! [`InMemoryRepository`] 以内存快照 + [`InMemoryQuery`] 提供参考实现，适用于测试与演示。
//!
use crate::criteria::Criteria;
use crate::error::DomainResult;
use crate::specification::{InMemoryQuery, Specification, SpecificationEvaluator};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 分页结果：`total` 为忽略分页窗口后的总数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub skip: usize,
    pub take: Option<usize>,
}

#[async_trait]
pub trait ReadRepository<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    async fn list(&self, spec: &Specification<T>) -> DomainResult<Vec<T>>;

    async fn count(&self, spec: &Specification<T>) -> DomainResult<usize>;

    async fn first(&self, spec: &Specification<T>) -> DomainResult<Option<T>>;

    async fn page(&self, spec: &Specification<T>) -> DomainResult<Paged<T>> {
        let window = spec.validate()?;
        let total = self.count(spec).await?;
        let items = self.list(spec).await?;
        Ok(Paged {
            items,
            total,
            skip: window.map(|(skip, _)| skip).unwrap_or(0),
            take: window.map(|(_, take)| take),
        })
    }
}

/// 内存仓储
pub struct InMemoryRepository<T> {
    items: RwLock<Arc<Vec<T>>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<T> InMemoryRepository<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: RwLock::new(Arc::new(items.into_iter().collect())),
        }
    }

    pub async fn add(&self, item: T) {
        let mut guard = self.items.write().await;
        Arc::make_mut(&mut guard).push(item);
    }

    /// 对满足条件的元素执行修改，返回受影响数量
    pub async fn update_where<C, F>(&self, criteria: C, mut apply: F) -> usize
    where
        C: Criteria<T>,
        F: FnMut(&mut T),
    {
        let mut guard = self.items.write().await;
        let mut affected = 0;
        for item in Arc::make_mut(&mut guard).iter_mut() {
            if criteria.is_satisfied_by(item) {
                apply(item);
                affected += 1;
            }
        }
        affected
    }

    /// 删除满足条件的元素，返回删除数量
    pub async fn remove_where<C>(&self, criteria: C) -> usize
    where
        C: Criteria<T>,
    {
        let mut guard = self.items.write().await;
        let items = Arc::make_mut(&mut guard);
        let before = items.len();
        items.retain(|item| !criteria.is_satisfied_by(item));
        before - items.len()
    }

    /// 当前内容的快照；后续写入不影响已取得的快照
    pub async fn snapshot(&self) -> InMemoryQuery<T> {
        InMemoryQuery::from_shared(self.items.read().await.clone())
    }
}

#[async_trait]
impl<T> ReadRepository<T> for InMemoryRepository<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn list(&self, spec: &Specification<T>) -> DomainResult<Vec<T>> {
        let source = self.snapshot().await;
        Ok(SpecificationEvaluator::apply(source, spec)?.to_vec())
    }

    async fn count(&self, spec: &Specification<T>) -> DomainResult<usize> {
        let source = self.snapshot().await;
        Ok(SpecificationEvaluator::apply_for_count(source, spec)?.count())
    }

    async fn first(&self, spec: &Specification<T>) -> DomainResult<Option<T>> {
        let source = self.snapshot().await;
        Ok(SpecificationEvaluator::apply(source, spec)?.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        active: bool,
    }

    fn repo() -> InMemoryRepository<Item> {
        InMemoryRepository::with_items((1..=12).map(|id| Item {
            id,
            active: id % 3 != 0,
        }))
    }

    #[tokio::test]
    async fn page_reports_total_independent_of_window() {
        let repo = repo();
        let spec = Specification::<Item>::new()
            .filter_by(|i| i.active)
            .order_by_descending(|i| i.id)
            .page(1, 3);

        let page = repo.page(&spec).await.unwrap();

        assert_eq!(page.total, 8);
        assert_eq!(page.skip, 3);
        assert_eq!(page.take, Some(3));
        let ids: Vec<_> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![7, 5, 4]);
    }

    #[tokio::test]
    async fn writes_do_not_leak_into_taken_snapshots() {
        let repo = repo();
        let snapshot = repo.snapshot().await;

        repo.add(Item { id: 99, active: true }).await;
        let removed = repo.remove_where(|i: &Item| !i.active).await;

        assert_eq!(removed, 4);
        assert_eq!(snapshot.count(), 12);
        assert_eq!(repo.count(&Specification::new()).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn update_where_touches_matching_items_only() {
        let repo = repo();
        let affected = repo
            .update_where(|i: &Item| i.id <= 2, |i| i.active = false)
            .await;
        assert_eq!(affected, 2);

        let spec = Specification::<Item>::new().filter_by(|i| !i.active);
        assert_eq!(repo.count(&spec).await.unwrap(), 6);
        let first = repo.first(&spec.order_by(|i| i.id)).await.unwrap();
        assert_eq!(first.map(|i| i.id), Some(1));
    }

    #[tokio::test]
    async fn invalid_page_is_rejected() {
        let repo = repo();
        let spec = Specification::<Item>::new().paginate(0, -2);
        assert!(repo.page(&spec).await.is_err());
        assert!(repo.list(&spec).await.is_err());
    }
}
