//! 审计装饰器
//!
//! `Audited` 标记映射到 [`AuditDecorator`]：在 `tracing` span 内执行内层处理器，
//! 结束后把一条 [`AuditRecord`] 交给 [`AuditSink`]。错误原样向外传播。
//!
use crate::{
    context::AppContext,
    decorator::DecoratorArgs,
    error::AppError,
    marker::Marker,
    pipeline::{RequestEnvelope, RequestHandler, RequestKind, SharedOutput},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// 审计标记；`action` 为可选的业务动作名
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audited {
    pub action: Option<String>,
}

impl Audited {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
        }
    }
}

impl Marker for Audited {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

impl AuditOutcome {
    fn of<T>(result: &Result<T, AppError>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(err) if err.is_cancelled() => Self::Cancelled,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// 一次请求处理的审计记录
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub request: &'static str,
    pub kind: RequestKind,
    pub handler: &'static str,
    pub action: Option<String>,
    pub correlation_id: Option<String>,
    pub actor_id: Option<String>,
    pub outcome: AuditOutcome,
    pub elapsed: Duration,
}

/// 审计记录的去向
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// 审计配置
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// 是否输出处理器类型名
    pub include_handler: bool,
    /// 超过该耗时的成功请求以 warn 级别输出
    pub slow_threshold_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            include_handler: true,
            slow_threshold_ms: 500,
        }
    }
}

/// 以 `tracing` 事件输出审计记录
#[derive(Clone, Debug, Default)]
pub struct TracingAuditSink {
    config: AuditConfig,
}

impl TracingAuditSink {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) {
        let handler = self.config.include_handler.then_some(record.handler);
        let elapsed_ms = elapsed_millis(record.elapsed);
        let correlation_id = record.correlation_id.as_deref().unwrap_or("-");
        let action = record.action.as_deref().unwrap_or("-");

        match &record.outcome {
            AuditOutcome::Succeeded if elapsed_ms >= self.config.slow_threshold_ms => {
                tracing::warn!(
                    request = record.request,
                    kind = ?record.kind,
                    handler,
                    action,
                    correlation_id,
                    elapsed_ms,
                    "slow request"
                );
            }
            AuditOutcome::Succeeded => {
                tracing::info!(
                    request = record.request,
                    kind = ?record.kind,
                    handler,
                    action,
                    correlation_id,
                    elapsed_ms,
                    "request succeeded"
                );
            }
            AuditOutcome::Cancelled => {
                tracing::info!(
                    request = record.request,
                    kind = ?record.kind,
                    handler,
                    correlation_id,
                    elapsed_ms,
                    "request cancelled"
                );
            }
            AuditOutcome::Failed(reason) => {
                tracing::error!(
                    request = record.request,
                    kind = ?record.kind,
                    handler,
                    action,
                    correlation_id,
                    elapsed_ms,
                    error = %reason,
                    "request failed"
                );
            }
        }
    }
}

// 超出 u64 时饱和
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pub struct AuditDecorator {
    inner: Arc<dyn RequestHandler>,
    sink: Arc<dyn AuditSink>,
    action: Option<String>,
}

impl AuditDecorator {
    pub fn new(
        inner: Arc<dyn RequestHandler>,
        sink: Arc<dyn AuditSink>,
        action: Option<String>,
    ) -> Self {
        Self {
            inner,
            sink,
            action,
        }
    }

    /// 未注册 `dyn AuditSink` 时使用 [`TracingAuditSink`]（读取可选的 [`AuditConfig`]）
    pub fn from_args(args: &DecoratorArgs<'_, Audited>) -> Result<Self, AppError> {
        let sink = match args.try_resolve::<dyn AuditSink>() {
            Some(sink) => sink,
            None => {
                let config = args
                    .try_resolve::<AuditConfig>()
                    .map(|config| *config)
                    .unwrap_or_default();
                Arc::new(TracingAuditSink::new(config)) as Arc<dyn AuditSink>
            }
        };
        Ok(Self::new(args.inner.clone(), sink, args.marker.action.clone()))
    }
}

#[async_trait]
impl RequestHandler for AuditDecorator {
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        let info = request.info().clone();
        let span = tracing::info_span!(
            "audit",
            request = info.name,
            kind = ?info.kind,
            correlation_id = ctx.biz.correlation_id().unwrap_or("-"),
        );

        let started = Instant::now();
        let result = self.inner.handle(ctx, request).instrument(span).await;

        self.sink
            .record(AuditRecord {
                request: info.name,
                kind: info.kind,
                handler: info.handler,
                action: self.action.clone(),
                correlation_id: ctx.biz.correlation_id().map(str::to_owned),
                actor_id: ctx.biz.actor_id().map(str::to_owned),
                outcome: AuditOutcome::of(&result),
                elapsed: started.elapsed(),
            })
            .await;

        result
    }
}
