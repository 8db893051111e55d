use bon::Builder;
use serde::{Deserialize, Serialize};

/// 业务上下文信息
///
/// 随一次应用层调用传播；嵌套分发（如处理器内发布领域事件）时通过
/// [`BusinessContext::caused_by`] 派生，保持 `correlation_id` 不变并记录因果。
#[derive(Builder, Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    /// 关联ID
    correlation_id: Option<String>,
    /// 因果ID
    causation_id: Option<String>,
    /// 触发调用的主体类型（如用户、系统等）
    actor_type: Option<String>,
    /// 触发调用的主体ID
    actor_id: Option<String>,
}

impl BusinessContext {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_type(&self) -> Option<&str> {
        self.actor_type.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    /// 以 `cause` 为因果派生子语境，主体与关联ID沿用当前值
    pub fn caused_by(&self, cause: impl Into<String>) -> Self {
        Self {
            causation_id: Some(cause.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caused_by_keeps_correlation_and_actor() {
        let ctx = BusinessContext::builder()
            .correlation_id("cor-1".into())
            .actor_type("user".into())
            .actor_id("u-1".into())
            .build();

        let child = ctx.caused_by("CreateProduct");

        assert_eq!(child.correlation_id(), Some("cor-1"));
        assert_eq!(child.causation_id(), Some("CreateProduct"));
        assert_eq!(child.actor_id(), Some("u-1"));
        assert_eq!(ctx.causation_id(), None);
    }
}
