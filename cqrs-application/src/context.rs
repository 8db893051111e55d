use crate::error::AppError;
use cqrs_domain::domain_event::BusinessContext;
use tokio_util::sync::CancellationToken;

/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用（命令/查询/事件）所需的横切信息：
/// - 业务语境（`BusinessContext`）：关联追踪、因果链、执行者；
/// - 幂等键（`idempotency_key`）：由基础设施层实现请求幂等；
/// - 取消令牌：装饰器原样向内传递，业务处理器启动前检查。
///
/// ```rust
/// use cqrs_application::context::AppContext;
/// use cqrs_domain::domain_event::BusinessContext;
///
/// let ctx = AppContext::new(
///     BusinessContext::builder()
///         .correlation_id("cor-123".into())
///         .actor_type("user".into())
///         .actor_id("u-1".into())
///         .build(),
/// );
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    /// 业务语境（链路追踪、审计主体、操作因果）
    pub biz: BusinessContext,
    /// 幂等键（可选）
    pub idempotency_key: Option<String>,
    cancellation: CancellationToken,
}

impl AppContext {
    pub fn new(biz: BusinessContext) -> Self {
        Self {
            biz,
            ..Self::default()
        }
    }

    /// 使用调用方提供的取消令牌
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// 已取消时返回 `AppError::Cancelled`
    pub fn ensure_not_cancelled(&self, request: &'static str) -> Result<(), AppError> {
        if self.is_cancelled() {
            return Err(AppError::Cancelled { request });
        }
        Ok(())
    }

    /// 嵌套分发使用的子上下文：共享取消令牌，记录因果
    pub fn caused_by(&self, cause: impl Into<String>) -> Self {
        Self {
            biz: self.biz.caused_by(cause),
            idempotency_key: None,
            cancellation: self.cancellation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_context_shares_cancellation() {
        let token = CancellationToken::new();
        let ctx = AppContext::default()
            .with_cancellation(token.clone())
            .with_idempotency_key("idem-1");
        let child = ctx.caused_by("CreateProduct");

        assert_eq!(child.idempotency_key, None);
        assert_eq!(child.biz.causation_id(), Some("CreateProduct"));

        token.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(
            child.ensure_not_cancelled("X"),
            Err(AppError::Cancelled { request: "X" })
        ));
    }
}
