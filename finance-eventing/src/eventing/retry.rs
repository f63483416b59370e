//! 重试装饰器（RetryableHandler）
//!
//! 以组合方式包装任意处理器，对瞬时失败按指数退避重试：
//! - 成功立即返回；
//! - 不可重试的错误包装为 `NonRetryable` 直接返回；
//! - 调用次数达到 `max_attempts` 时返回 `RetryExhausted`（携带最后一次错误）；
//! - 退避等待可被 `DispatchContext` 取消，此时返回 `Cancelled` 而非处理器错误。
//!
//! 装饰器对外暴露与被包装处理器相同的名称，可直接替换注册。
//!
use super::{DispatchContext, EventHandler};
use crate::domain_event::Event;
use crate::error::{EventingError, EventingResult as Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

/// 重试策略
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 首次重试前的等待
    pub initial_interval: Duration,
    /// 单次等待上限
    pub max_interval: Duration,
    /// 含首次调用在内的最大调用次数（0 视为 1）
    pub max_attempts: u32,
    /// 指数增长因子
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            max_attempts: 3,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次失败后的等待时长
    ///
    /// `attempt` 为 0 或 1 时取 `initial_interval`，之后为
    /// `initial_interval × multiplier^(attempt-1)`，并截断到 `max_interval`。
    pub fn next_backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_interval.min(self.max_interval);
        }

        let exp = (attempt - 1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_interval.as_nanos() as f64 * self.multiplier.powi(exp);
        let max_nanos = self.max_interval.as_nanos() as f64;

        if !nanos.is_finite() || nanos < 0.0 || nanos >= max_nanos {
            self.max_interval
        } else {
            Duration::from_nanos(nanos.round() as u64)
        }
    }

    fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// 判定某个错误是否值得重试
pub type RetryClassifier = Arc<dyn Fn(&EventingError) -> bool + Send + Sync>;

pub struct RetryableHandler {
    inner: Arc<dyn EventHandler>,
    policy: RetryPolicy,
    classifier: RetryClassifier,
}

impl RetryableHandler {
    /// 使用默认判定 `EventingError::is_retryable` 包装处理器
    pub fn new(inner: Arc<dyn EventHandler>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            classifier: Arc::new(EventingError::is_retryable),
        }
    }

    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&EventingError) -> bool + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn cancelled(&self, event: &Event, attempts: u32) -> EventingError {
        EventingError::Cancelled {
            handler: self.inner.handler_name().to_string(),
            event_type: event.event_type().to_string(),
            attempts,
        }
    }
}

#[async_trait]
impl EventHandler for RetryableHandler {
    fn handler_name(&self) -> &str {
        self.inner.handler_name()
    }

    async fn handle(&self, ctx: &DispatchContext, event: &Event) -> Result<()> {
        let max_attempts = self.policy.effective_max_attempts();
        let mut attempts: u32 = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(self.cancelled(event, attempts));
            }

            let err = match self.inner.handle(ctx, event).await {
                Ok(()) => {
                    if attempts > 0 {
                        debug!(
                            handler = self.handler_name(),
                            event_type = event.event_type(),
                            attempt = attempts + 1,
                            "handler recovered after retry"
                        );
                    }
                    return Ok(());
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => err,
            };
            attempts += 1;

            if !(self.classifier)(&err) {
                return Err(EventingError::NonRetryable {
                    handler: self.handler_name().to_string(),
                    event_type: event.event_type().to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }
            if attempts >= max_attempts {
                return Err(EventingError::RetryExhausted {
                    handler: self.handler_name().to_string(),
                    event_type: event.event_type().to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.policy.next_backoff(attempts);
            warn!(
                handler = self.handler_name(),
                event_type = event.event_type(),
                attempt = attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "handler failed, retrying"
            );

            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(self.cancelled(event, attempts)),
                _ = time::sleep(delay) => {}
            }
        }
    }
}
