//! 事件核心统一错误定义
//!
//! 覆盖事件构造、Schema 注册/校验、事件上抬、处理器失败分类（永久/瞬时）、
//! 重试耗尽、取消与总线关闭等情形，便于调用方按类型区分处理。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventingError {
    // --- 事件构造/序列化 ---
    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- Schema 注册与校验 ---
    #[error("schema already exists: type={event_type}, version={version}")]
    SchemaAlreadyExists { event_type: String, version: usize },
    #[error("schema not found: type={event_type}, version={version}")]
    SchemaNotFound { event_type: String, version: usize },
    #[error("validation failed: type={event_type}, version={version}, missing required field `{field}`")]
    MissingField {
        event_type: String,
        version: usize,
        field: String,
    },
    #[error("validation failed: type={event_type}, version={version}, reason={reason}")]
    InvalidPayload {
        event_type: String,
        version: usize,
        reason: String,
    },

    // --- 事件上抬 ---
    #[error("upgrade already registered: type={event_type}, from_version={from_version}")]
    UpgradeAlreadyRegistered {
        event_type: String,
        from_version: usize,
    },
    #[error("upgrade failed: type={event_type}, from_version={from_version}, reason={reason}")]
    UpgradeFailed {
        event_type: String,
        from_version: usize,
        reason: String,
    },
    #[error(
        "upgrade made no progress: type={event_type}, from_version={from_version}, to_version={to_version}"
    )]
    UpgradeNoProgress {
        event_type: String,
        from_version: usize,
        to_version: usize,
    },

    // --- 事件处理 ---
    #[error("handler failed permanently: handler={handler}, type={event_type}, reason={reason}")]
    HandlerPermanent {
        handler: String,
        event_type: String,
        reason: String,
    },
    #[error("handler failed transiently: handler={handler}, type={event_type}, reason={reason}")]
    HandlerTransient {
        handler: String,
        event_type: String,
        reason: String,
    },
    #[error(
        "non-retryable failure: handler={handler}, type={event_type}, attempts={attempts}: {source}"
    )]
    NonRetryable {
        handler: String,
        event_type: String,
        attempts: u32,
        #[source]
        source: Box<EventingError>,
    },
    #[error("retry exhausted: handler={handler}, type={event_type}, attempts={attempts}: {source}")]
    RetryExhausted {
        handler: String,
        event_type: String,
        attempts: u32,
        #[source]
        source: Box<EventingError>,
    },
    #[error("cancelled: handler={handler}, type={event_type}, attempts={attempts}")]
    Cancelled {
        handler: String,
        event_type: String,
        attempts: u32,
    },

    // --- 事件总线 ---
    #[error(
        "event bus closed{}",
        .event_type.as_deref().map(|t| format!(": type={t}")).unwrap_or_default()
    )]
    BusClosed { event_type: Option<String> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EventingError {
    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            reason: reason.into(),
        }
    }

    pub fn bus_closed(event_type: impl Into<String>) -> Self {
        Self::BusClosed {
            event_type: Some(event_type.into()),
        }
    }

    pub fn permanent(
        handler: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::HandlerPermanent {
            handler: handler.into(),
            event_type: event_type.into(),
            reason: reason.into(),
        }
    }

    pub fn transient(
        handler: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::HandlerTransient {
            handler: handler.into(),
            event_type: event_type.into(),
            reason: reason.into(),
        }
    }

    /// 默认的重试判定：仅瞬时失败与未分类的外部错误可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HandlerTransient { .. } | Self::Other(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// 重试装饰器产生的错误所记录的调用次数
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::NonRetryable { attempts, .. }
            | Self::RetryExhausted { attempts, .. }
            | Self::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// 统一 Result 类型别名
pub type EventingResult<T> = Result<T, EventingError>;
