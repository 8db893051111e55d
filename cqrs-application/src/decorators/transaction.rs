//! 事务装饰器
//!
//! `Transactional` 标记映射到 [`TransactionDecorator`]，从当前作用域解析
//! `dyn UnitOfWork`（通常注册为作用域服务，每次分发一份）：
//! - 内层成功 → 提交；
//! - 内层失败 → 回滚后原样返回错误；
//! - 内层返回后发现已取消 → 回滚并返回 `Cancelled`。
//!
use crate::{
    context::AppContext,
    decorator::DecoratorArgs,
    error::AppError,
    marker::Marker,
    pipeline::{RequestEnvelope, RequestHandler, SharedOutput},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

/// 事务标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transactional {
    pub isolation: IsolationLevel,
}

impl Transactional {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation(isolation: IsolationLevel) -> Self {
        Self { isolation }
    }
}

impl Marker for Transactional {}

/// 工作单元（事务边界）
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self, isolation: IsolationLevel) -> Result<(), AppError>;
    async fn commit(&self) -> Result<(), AppError>;
    async fn rollback(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOfWorkStep {
    Begin(IsolationLevel),
    Commit,
    Rollback,
}

/// 仅记录调用轨迹的内存工作单元
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    journal: Mutex<Vec<UnitOfWorkStep>>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Vec<UnitOfWorkStep> {
        self.journal
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }

    fn push(&self, step: UnitOfWorkStep) -> Result<(), AppError> {
        self.journal
            .lock()
            .map(|mut steps| steps.push(step))
            .map_err(|_| AppError::Infra("unit of work journal poisoned".into()))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn begin(&self, isolation: IsolationLevel) -> Result<(), AppError> {
        self.push(UnitOfWorkStep::Begin(isolation))
    }

    async fn commit(&self) -> Result<(), AppError> {
        self.push(UnitOfWorkStep::Commit)
    }

    async fn rollback(&self) -> Result<(), AppError> {
        self.push(UnitOfWorkStep::Rollback)
    }
}

pub struct TransactionDecorator {
    inner: Arc<dyn RequestHandler>,
    uow: Arc<dyn UnitOfWork>,
    isolation: IsolationLevel,
}

impl TransactionDecorator {
    pub fn new(
        inner: Arc<dyn RequestHandler>,
        uow: Arc<dyn UnitOfWork>,
        isolation: IsolationLevel,
    ) -> Self {
        Self {
            inner,
            uow,
            isolation,
        }
    }

    pub fn from_args(args: &DecoratorArgs<'_, Transactional>) -> Result<Self, AppError> {
        let uow = args.resolve::<dyn UnitOfWork>()?;
        Ok(Self::new(args.inner.clone(), uow, args.marker.isolation))
    }
}

#[async_trait]
impl RequestHandler for TransactionDecorator {
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        let name = request.info().name;
        ctx.ensure_not_cancelled(name)?;

        self.uow.begin(self.isolation).await?;
        match self.inner.handle(ctx, request).await {
            Ok(_) if ctx.is_cancelled() => {
                self.uow.rollback().await?;
                Err(AppError::Cancelled { request: name })
            }
            Ok(out) => {
                self.uow.commit().await?;
                Ok(out)
            }
            Err(err) => {
                // 回滚失败只记录，不覆盖原始错误
                if let Err(rollback) = self.uow.rollback().await {
                    tracing::error!(
                        request = name,
                        error = %err,
                        rollback_error = %rollback,
                        "rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}
