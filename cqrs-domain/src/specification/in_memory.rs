use super::{OrderBy, Queryable, TrackingMode};
use crate::criteria::Criteria;
use std::sync::Arc;

enum Step<T> {
    Filter(Arc<dyn Criteria<T>>),
    Include(String),
    Order(OrderBy<T>),
    Tracking(TrackingMode),
    Skip(usize),
    Take(usize),
}

impl<T> Step<T> {
    fn describe(&self) -> String {
        match self {
            Step::Filter(_) => "filter".to_string(),
            Step::Include(path) => format!("include:{path}"),
            Step::Order(order) => format!("order:{:?}", order.direction()),
            Step::Tracking(mode) => format!("tracking:{mode:?}"),
            Step::Skip(n) => format!("skip:{n}"),
            Step::Take(n) => format!("take:{n}"),
        }
    }
}

/// 基于内存快照的 [`Queryable`] 实现
///
/// 组合阶段只记录步骤，调用 [`to_vec`](Self::to_vec)/[`count`](Self::count) 时才按记录顺序物化。
/// 预加载与跟踪在内存集合上无实际效果，仅被记录以便观察。
pub struct InMemoryQuery<T> {
    source: Arc<Vec<T>>,
    steps: Vec<Step<T>>,
}

impl<T> std::fmt::Debug for InMemoryQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQuery")
            .field("steps", &self.steps.iter().map(Step::describe).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T> InMemoryQuery<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self::from_shared(Arc::new(items.into_iter().collect()))
    }

    /// 共享已有快照，避免复制源数据
    pub fn from_shared(source: Arc<Vec<T>>) -> Self {
        Self {
            source,
            steps: Vec::new(),
        }
    }

    /// 已记录的组合步骤（按应用顺序）
    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(Step::describe).collect()
    }

    /// 已声明的预加载路径
    pub fn includes(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Include(path) => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 生效的跟踪模式（未声明时为默认值）
    pub fn tracking_mode(&self) -> TrackingMode {
        self.steps
            .iter()
            .rev()
            .find_map(|s| match s {
                Step::Tracking(mode) => Some(*mode),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// 物化后的元素数量
    pub fn count(&self) -> usize {
        self.materialize().len()
    }

    fn materialize(&self) -> Vec<&T> {
        let mut items: Vec<&T> = self.source.iter().collect();
        for step in &self.steps {
            match step {
                Step::Filter(criteria) => items.retain(|item| criteria.is_satisfied_by(item)),
                Step::Order(order) => items.sort_by(|a, b| order.compare(a, b)),
                Step::Skip(n) => {
                    let n = (*n).min(items.len());
                    items.drain(..n);
                }
                Step::Take(n) => items.truncate(*n),
                Step::Include(_) | Step::Tracking(_) => {}
            }
        }
        items
    }

    fn push(mut self, step: Step<T>) -> Self {
        self.steps.push(step);
        self
    }
}

impl<T: Clone> InMemoryQuery<T> {
    /// 按记录的步骤物化结果
    pub fn to_vec(&self) -> Vec<T> {
        self.materialize().into_iter().cloned().collect()
    }

    pub fn first(&self) -> Option<T> {
        self.materialize().into_iter().next().cloned()
    }
}

impl<T> Queryable for InMemoryQuery<T> {
    type Item = T;

    fn filter(self, criteria: Arc<dyn Criteria<T>>) -> Self {
        self.push(Step::Filter(criteria))
    }

    fn include(self, path: &str) -> Self {
        self.push(Step::Include(path.to_string()))
    }

    fn order_by(self, order: OrderBy<T>) -> Self {
        self.push(Step::Order(order))
    }

    fn tracking(self, mode: TrackingMode) -> Self {
        self.push(Step::Tracking(mode))
    }

    fn skip(self, count: usize) -> Self {
        self.push(Step::Skip(count))
    }

    fn take(self, count: usize) -> Self {
        self.push(Step::Take(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::Specification;

    #[test]
    fn ordering_is_stable_for_equal_keys() {
        let spec = Specification::<(u8, char)>::new().order_by(|(k, _)| *k);
        let query = spec
            .apply_to(InMemoryQuery::new(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]))
            .unwrap();
        assert_eq!(query.to_vec(), vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn skip_past_end_yields_empty_page() {
        let spec = Specification::<i32>::new().paginate(50, 5);
        let query = spec.apply_to(InMemoryQuery::new(1..=10)).unwrap();
        assert!(query.to_vec().is_empty());
        assert_eq!(query.first(), None);
    }

    #[test]
    fn includes_and_tracking_are_observable() {
        let spec = Specification::<i32>::new()
            .include("category")
            .as_read_only();
        let query = spec.apply_to(InMemoryQuery::new(1..=3)).unwrap();
        assert_eq!(query.includes(), vec!["category"]);
        assert_eq!(query.tracking_mode(), TrackingMode::ReadOnly);
    }
}
