use super::{OrderBy, Specification, TrackingMode};
use crate::criteria::Criteria;
use crate::error::DomainResult;
use std::sync::Arc;

/// 可组合的集合抽象（由持久化层提供）
///
/// 每个操作只记录/组合查询，不执行 I/O；物化由实现方在求值器之外完成。
pub trait Queryable: Sized {
    type Item;

    fn filter(self, criteria: Arc<dyn Criteria<Self::Item>>) -> Self;

    fn include(self, path: &str) -> Self;

    fn order_by(self, order: OrderBy<Self::Item>) -> Self;

    fn tracking(self, mode: TrackingMode) -> Self;

    fn skip(self, count: usize) -> Self;

    fn take(self, count: usize) -> Self;
}

/// 规约求值器
///
/// 组合顺序固定：过滤 → 预加载 → 排序 → 跟踪模式 → 分页。
/// 分页放在过滤与排序之后以保证分页稳定；预加载与跟踪在物化之前生效。
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    /// 按规约组合查询；分页参数非法时在触碰集合之前返回错误
    pub fn apply<Q: Queryable>(source: Q, spec: &Specification<Q::Item>) -> DomainResult<Q> {
        let window = spec.validate()?;

        let mut query = Self::filtered(source, spec);

        if let Some(order) = spec.order() {
            query = query.order_by(order.clone());
        }

        query = query.tracking(spec.tracking_mode());

        if let Some((skip, take)) = window {
            query = query.skip(skip).take(take);
        }

        Ok(query)
    }

    /// 计数查询：仅应用过滤与预加载，忽略排序与分页，使总数与分页窗口无关
    pub fn apply_for_count<Q: Queryable>(
        source: Q,
        spec: &Specification<Q::Item>,
    ) -> DomainResult<Q> {
        spec.validate()?;
        Ok(Self::filtered(source, spec))
    }

    fn filtered<Q: Queryable>(source: Q, spec: &Specification<Q::Item>) -> Q {
        let mut query = source;

        if let Some(criteria) = spec.criteria() {
            query = query.filter(criteria.clone());
        }

        for path in spec.includes() {
            query = query.include(path);
        }

        query
    }
}
