//! 规约（Specification）
//!
//! 以纯数据描述一次查询：过滤条件、预加载路径、排序、分页窗口与跟踪模式，
//! 由 [`SpecificationEvaluator`] 统一应用到任意实现 [`Queryable`] 的集合抽象上。
//!
//! ```
//! use cqrs_domain::specification::{InMemoryQuery, Specification};
//!
//! let spec = Specification::<i32>::new()
//!     .filter_by(|x| *x > 10)
//!     .order_by(|x| *x)
//!     .paginate(10, 5);
//!
//! let page = spec.apply_to(InMemoryQuery::new(1..=30)).unwrap().to_vec();
//! assert_eq!(page, vec![21, 22, 23, 24, 25]);
//! ```

mod evaluator;
mod in_memory;

pub use evaluator::{Queryable, SpecificationEvaluator};
pub use in_memory::InMemoryQuery;

use crate::criteria::{AndCriteria, Criteria};
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// 跟踪模式：是否由持久化层跟踪实体变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingMode {
    #[default]
    Tracked,
    ReadOnly,
}

/// 排序表达式：一个主排序键与若干次级排序键
pub struct OrderBy<T> {
    keys: Vec<(Comparator<T>, SortDirection)>,
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<T> OrderBy<T> {
    fn primary(compare: Comparator<T>, direction: SortDirection) -> Self {
        Self {
            keys: vec![(compare, direction)],
        }
    }

    /// 主排序方向
    pub fn direction(&self) -> SortDirection {
        self.keys
            .first()
            .map(|(_, d)| *d)
            .unwrap_or_default()
    }

    /// 次级排序键数量
    pub fn secondary_len(&self) -> usize {
        self.keys.len().saturating_sub(1)
    }

    /// 依次比较各排序键，前一键相等时才比较下一键
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for (compare, direction) in &self.keys {
            let ord = match direction {
                SortDirection::Ascending => compare(a, b),
                SortDirection::Descending => compare(b, a),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl<T> fmt::Debug for OrderBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBy")
            .field("direction", &self.direction())
            .field("secondary", &self.secondary_len())
            .finish()
    }
}

/// 分页窗口
///
/// 使用有符号整数保存调用方的原始输入，校验在求值前进行：`skip >= 0`、`take > 0`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub skip: i64,
    pub take: i64,
}

impl Paging {
    /// 校验并转换为 `(skip, take)`
    pub fn window(&self) -> DomainResult<(usize, usize)> {
        if self.skip < 0 {
            return Err(DomainError::invalid_specification(format!(
                "skip must be >= 0, got {}",
                self.skip
            )));
        }
        if self.take <= 0 {
            return Err(DomainError::invalid_specification(format!(
                "take must be > 0, got {}",
                self.take
            )));
        }
        let skip = usize::try_from(self.skip)
            .map_err(|_| DomainError::invalid_specification("skip out of range"))?;
        let take = usize::try_from(self.take)
            .map_err(|_| DomainError::invalid_specification("take out of range"))?;
        Ok((skip, take))
    }
}

/// 查询规约：过滤 + 预加载 + 排序 + 分页 + 跟踪
pub struct Specification<T> {
    criteria: Option<Arc<dyn Criteria<T>>>,
    includes: Vec<String>,
    order: Option<OrderBy<T>>,
    paging: Option<Paging>,
    tracking: TrackingMode,
}

impl<T> Default for Specification<T> {
    fn default() -> Self {
        Self {
            criteria: None,
            includes: Vec::new(),
            order: None,
            paging: None,
            tracking: TrackingMode::default(),
        }
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            order: self.order.clone(),
            paging: self.paging,
            tracking: self.tracking,
        }
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("filtered", &self.criteria.is_some())
            .field("includes", &self.includes)
            .field("order", &self.order)
            .field("paging", &self.paging)
            .field("tracking", &self.tracking)
            .finish()
    }
}

impl<T: 'static> Specification<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置过滤条件；重复调用时与已有条件做 AND 组合
    pub fn filter<C>(mut self, criteria: C) -> Self
    where
        C: Criteria<T> + 'static,
    {
        let combined: Arc<dyn Criteria<T>> = match self.criteria.take() {
            Some(existing) => Arc::new(AndCriteria::new(existing, Arc::new(criteria))),
            None => Arc::new(criteria),
        };
        self.criteria = Some(combined);
        self
    }

    /// 以闭包设置过滤条件（便于类型推断）
    pub fn filter_by<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter(predicate)
    }

    /// 追加预加载路径，按声明顺序应用
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// 设置主排序（升序）；会替换已有的排序表达式
    pub fn order_by<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.with_primary_order(key, SortDirection::Ascending)
    }

    /// 设置主排序（降序）；会替换已有的排序表达式
    pub fn order_by_descending<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.with_primary_order(key, SortDirection::Descending)
    }

    /// 追加次级排序（升序）；尚无主排序时作为主排序
    pub fn then_by<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.with_secondary_order(key, SortDirection::Ascending)
    }

    /// 追加次级排序（降序）；尚无主排序时作为主排序
    pub fn then_by_descending<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.with_secondary_order(key, SortDirection::Descending)
    }

    /// 设置分页窗口（跳过 `skip` 条，取 `take` 条）
    pub fn paginate(mut self, skip: i64, take: i64) -> Self {
        self.paging = Some(Paging { skip, take });
        self
    }

    /// 按页码（从 0 开始）与页大小设置分页窗口
    pub fn page(self, index: i64, size: i64) -> Self {
        self.paginate(index.saturating_mul(size), size)
    }

    /// 只读查询（不跟踪）
    pub fn as_read_only(self) -> Self {
        self.tracking(TrackingMode::ReadOnly)
    }

    pub fn tracking(mut self, mode: TrackingMode) -> Self {
        self.tracking = mode;
        self
    }

    /// 应用到集合抽象（等价于 [`SpecificationEvaluator::apply`]）
    pub fn apply_to<Q>(&self, source: Q) -> DomainResult<Q>
    where
        Q: Queryable<Item = T>,
    {
        SpecificationEvaluator::apply(source, self)
    }

    fn with_primary_order<K, F>(mut self, key: F, direction: SortDirection) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.order = Some(OrderBy::primary(comparator(key), direction));
        self
    }

    fn with_secondary_order<K, F>(mut self, key: F, direction: SortDirection) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        match self.order.as_mut() {
            Some(order) => order.keys.push((comparator(key), direction)),
            None => self.order = Some(OrderBy::primary(comparator(key), direction)),
        }
        self
    }
}

impl<T> Specification<T> {
    pub fn criteria(&self) -> Option<&Arc<dyn Criteria<T>>> {
        self.criteria.as_ref()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn order(&self) -> Option<&OrderBy<T>> {
        self.order.as_ref()
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.tracking
    }

    /// 校验调用方契约；分页窗口非法时返回 `InvalidSpecification`
    pub fn validate(&self) -> DomainResult<Option<(usize, usize)>> {
        self.paging.map(|p| p.window()).transpose()
    }

    /// 单项判断：仅使用过滤条件（无条件时恒为真）
    pub fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.criteria
            .as_ref()
            .is_none_or(|c| c.is_satisfied_by(candidate))
    }
}

fn comparator<T, K, F>(key: F) -> Comparator<T>
where
    K: Ord,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    Arc::new(move |a: &T, b: &T| key(a).cmp(&key(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Product {
        name: &'static str,
        price: u32,
    }

    fn products() -> Vec<Product> {
        vec![
            Product { name: "b", price: 20 },
            Product { name: "a", price: 20 },
            Product { name: "c", price: 10 },
        ]
    }

    #[test]
    fn negative_skip_is_rejected() {
        let spec = Specification::<i32>::new().paginate(-1, 5);
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpecification { .. }));
    }

    #[test]
    fn zero_take_is_rejected() {
        let spec = Specification::<i32>::new().paginate(0, 0);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn page_translates_to_skip_take() {
        let spec = Specification::<i32>::new().page(2, 10);
        assert_eq!(spec.paging(), Some(Paging { skip: 20, take: 10 }));
        assert_eq!(spec.validate().unwrap(), Some((20, 10)));
    }

    #[test]
    fn repeated_filters_are_combined() {
        let spec = Specification::<i32>::new()
            .filter_by(|x| *x > 1)
            .filter_by(|x| *x < 5);
        assert!(spec.is_satisfied_by(&3));
        assert!(!spec.is_satisfied_by(&7));
        assert!(!spec.is_satisfied_by(&0));
    }

    #[test]
    fn secondary_order_breaks_ties() {
        let spec = Specification::<Product>::new()
            .order_by_descending(|p| p.price)
            .then_by(|p| p.name);
        let order = spec.order().unwrap();

        let mut items = products();
        items.sort_by(|a, b| order.compare(a, b));

        let names: Vec<_> = items.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(order.direction(), SortDirection::Descending);
        assert_eq!(order.secondary_len(), 1);
    }

    #[test]
    fn order_by_replaces_previous_primary() {
        let spec = Specification::<Product>::new()
            .order_by(|p| p.price)
            .then_by(|p| p.name)
            .order_by(|p| p.name);
        let order = spec.order().unwrap();
        assert_eq!(order.secondary_len(), 0);
    }
}
