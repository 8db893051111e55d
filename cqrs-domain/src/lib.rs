//! CQRS 领域层基础库（cqrs-domain）
//!
//! 提供命令/查询分发核心所依赖的领域构件：
//! - 领域事件（`domain_event`）与随调用传播的业务语境
//! - 可组合的筛选条件（`criteria`）
//! - 查询规约与求值器（`specification`）：过滤 → 预加载 → 排序 → 跟踪 → 分页
//! - 基于规约的只读仓储（`repository`）及其内存实现
//!
//! 本 crate 不依赖具体存储，持久化层只需为自身的查询构建器实现 `Queryable`。
//!
pub mod criteria;
pub mod domain_event;
pub mod error;
pub mod repository;
pub mod specification;

// 供过程宏生成代码引用，调用方无需直接依赖 chrono
pub use chrono;
