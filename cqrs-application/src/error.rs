use cqrs_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("validation: {0}")]
    Validation(String),

    #[error("authorization: {0}")]
    Authorization(String),

    #[error("infra: {0}")]
    Infra(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("handler not found: request={request}, result={result}")]
    HandlerNotFound {
        request: &'static str,
        result: &'static str,
    },

    #[error("cancelled: request={request}")]
    Cancelled { request: &'static str },

    // --- 配置错误：只应出现在启动/装配阶段 ---
    #[error("handler already registered: command={command}, existing={existing}")]
    AlreadyRegisteredCommand {
        command: &'static str,
        existing: &'static str,
    },

    #[error("handler already registered: query={query}, result={result}, existing={existing}")]
    AlreadyRegisteredQuery {
        query: &'static str,
        result: &'static str,
        existing: &'static str,
    },

    #[error("event handler already registered: event={event}, handler={handler}")]
    AlreadyRegisteredEventHandler {
        event: &'static str,
        handler: &'static str,
    },

    #[error("ambiguous decorator mapping: marker={marker}")]
    AmbiguousDecorator { marker: &'static str },

    #[error(
        "unresolved dependency: dependency={dependency}, component={component}, handler={handler}"
    )]
    UnresolvedDependency {
        dependency: &'static str,
        component: &'static str,
        handler: &'static str,
    },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl AppError {
    /// 是否为启动期致命的配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegisteredCommand { .. }
                | Self::AlreadyRegisteredQuery { .. }
                | Self::AlreadyRegisteredEventHandler { .. }
                | Self::AmbiguousDecorator { .. }
                | Self::UnresolvedDependency { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
