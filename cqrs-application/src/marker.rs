//! 声明式标记（Marker）
//!
//! 标记只携带配置数据、不含行为；处理器通过 `markers()` 按书写顺序声明，
//! 由 [`DecoratorMap`](crate::decorator::DecoratorMap) 映射到对应的装饰器。
//!
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// 标记类型需要满足的能力边界
pub trait Marker: fmt::Debug + Send + Sync + 'static {}

/// 单个已声明的标记
#[derive(Clone)]
pub struct MarkerEntry {
    type_id: TypeId,
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    debug: String,
}

impl MarkerEntry {
    fn new<M: Marker>(marker: M) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: type_name::<M>(),
            debug: format!("{marker:?}"),
            value: Arc::new(marker),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 还原为具体标记类型
    pub fn downcast<M: Marker>(&self) -> Option<Arc<M>> {
        self.value.clone().downcast::<M>().ok()
    }
}

impl fmt::Debug for MarkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug)
    }
}

/// 有序标记列表（声明顺序 = 从外到内）
#[derive(Clone, Debug, Default)]
pub struct Markers {
    entries: Vec<MarkerEntry>,
}

impl Markers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个标记（位于已声明标记之内）
    pub fn with<M: Marker>(mut self, marker: M) -> Self {
        self.entries.push(MarkerEntry::new(marker));
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarkerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(MarkerEntry::name).collect()
    }

    pub fn get<M: Marker>(&self) -> Option<Arc<M>> {
        self.entries.iter().find_map(MarkerEntry::downcast::<M>)
    }
}

impl<'a> IntoIterator for &'a Markers {
    type Item = &'a MarkerEntry;
    type IntoIter = std::slice::Iter<'a, MarkerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
