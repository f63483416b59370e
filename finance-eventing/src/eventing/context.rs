use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// 分发上下文：随每次处理传递的取消信号与可选截止时间
///
/// 处理器（尤其是重试装饰器）在等待期间应关注 `cancelled()`，
/// 以便调用方能及时中止并得到可区分的“已取消”结果。
#[derive(Clone, Debug, Default)]
pub struct DispatchContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// 在 `timeout` 之后视为取消；时长超出时钟可表示范围时不设截止
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// 派生子上下文：父级取消会传递给子级，反之不会
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 取消信号触发或截止时间到达时完成
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_as_cancellation() {
        let ctx = DispatchContext::with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
        assert!(!ctx.token().is_cancelled());
    }

    #[tokio::test]
    async fn huge_timeout_means_no_deadline() {
        let ctx = DispatchContext::with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert!(!ctx.is_cancelled());

        ctx.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn child_follows_parent() {
        let parent = DispatchContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());

        let parent = DispatchContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }
}
