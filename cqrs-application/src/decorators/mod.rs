//! 内置装饰器：审计、事务、缓存
//!
pub mod audit;
pub mod caching;
pub mod transaction;

pub use audit::{
    AuditConfig, AuditDecorator, AuditOutcome, AuditRecord, AuditSink, Audited, TracingAuditSink,
};
pub use caching::{
    CacheConfig, Cached, CachingDecorator, InMemoryResponseCache, ResponseCache, cache_prefix,
};
pub use transaction::{
    InMemoryUnitOfWork, IsolationLevel, TransactionDecorator, Transactional, UnitOfWork,
    UnitOfWorkStep,
};
