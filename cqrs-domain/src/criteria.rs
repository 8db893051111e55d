//! 筛选条件（Criteria）
//!
//! 封装可复用、可组合的业务判断，作为 [`Specification`](crate::specification::Specification)
//! 的过滤谓词。闭包 `Fn(&T) -> bool` 自动实现该 trait。
//!
use std::sync::Arc;

/// 规约过滤条件的核心 trait
pub trait Criteria<T>: Send + Sync {
    /// 检查候选对象是否满足条件
    fn is_satisfied_by(&self, candidate: &T) -> bool;

    /// 与另一个条件进行 AND 组合
    fn and<C>(self, other: C) -> AndCriteria<T>
    where
        Self: Sized + 'static,
        C: Criteria<T> + 'static,
    {
        AndCriteria::new(Arc::new(self), Arc::new(other))
    }

    /// 与另一个条件进行 OR 组合
    fn or<C>(self, other: C) -> OrCriteria<T>
    where
        Self: Sized + 'static,
        C: Criteria<T> + 'static,
    {
        OrCriteria::new(Arc::new(self), Arc::new(other))
    }

    /// 对条件取反
    fn not(self) -> NotCriteria<T>
    where
        Self: Sized + 'static,
    {
        NotCriteria::new(Arc::new(self))
    }
}

impl<T, F> Criteria<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self(candidate)
    }
}

/// AND 组合条件
pub struct AndCriteria<T> {
    left: Arc<dyn Criteria<T>>,
    right: Arc<dyn Criteria<T>>,
}

impl<T> AndCriteria<T> {
    pub fn new(left: Arc<dyn Criteria<T>>, right: Arc<dyn Criteria<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Criteria<T> for AndCriteria<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) && self.right.is_satisfied_by(candidate)
    }
}

/// OR 组合条件
pub struct OrCriteria<T> {
    left: Arc<dyn Criteria<T>>,
    right: Arc<dyn Criteria<T>>,
}

impl<T> OrCriteria<T> {
    pub fn new(left: Arc<dyn Criteria<T>>, right: Arc<dyn Criteria<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Criteria<T> for OrCriteria<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) || self.right.is_satisfied_by(candidate)
    }
}

/// NOT 条件
pub struct NotCriteria<T> {
    inner: Arc<dyn Criteria<T>>,
}

impl<T> NotCriteria<T> {
    pub fn new(inner: Arc<dyn Criteria<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Criteria<T> for NotCriteria<T> {
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.inner.is_satisfied_by(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTrue;
    impl Criteria<i32> for AlwaysTrue {
        fn is_satisfied_by(&self, _: &i32) -> bool {
            true
        }
    }

    struct AlwaysFalse;
    impl Criteria<i32> for AlwaysFalse {
        fn is_satisfied_by(&self, _: &i32) -> bool {
            false
        }
    }

    #[test]
    fn and_requires_both() {
        assert!(AlwaysTrue.and(AlwaysTrue).is_satisfied_by(&42));
        assert!(!AlwaysTrue.and(AlwaysFalse).is_satisfied_by(&42));
    }

    #[test]
    fn or_requires_either() {
        assert!(AlwaysFalse.or(AlwaysTrue).is_satisfied_by(&42));
        assert!(!AlwaysFalse.or(AlwaysFalse).is_satisfied_by(&42));
    }

    #[test]
    fn closures_compose_with_structs() {
        let even = |x: &i32| x % 2 == 0;
        let big = |x: &i32| *x > 10;

        let spec = even.and(big).or(AlwaysFalse.not().and(|x: &i32| *x == 3));

        assert!(spec.is_satisfied_by(&12));
        assert!(spec.is_satisfied_by(&3));
        assert!(!spec.is_satisfied_by(&8));
        assert!(!spec.is_satisfied_by(&11));
    }
}
