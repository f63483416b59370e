//! 解耦订阅者（EventSubscriber）
//!
//! 与同步总线不同，生产者通过 `publish_event` 将事件放入有界 FIFO 队列后立即返回，
//! 由后台循环逐个取出并分发：
//! - 同一事件并发扇出给全部匹配的处理器，全部完成后才取下一个事件；
//! - 队列已满或订阅者未运行时直接丢弃事件（生产者永不阻塞）；
//! - `stop` 只发出退出信号，正在处理的事件会先处理完。
//!
//! 需要保证送达的生产者应改用 `InMemoryEventBus`。
//!
use super::{DispatchContext, EventHandler, HandlerRegistry};
use crate::domain_event::Event;
use futures_util::{StreamExt, stream};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 订阅者配置
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// 队列容量，超出部分的事件被丢弃
    pub queue_capacity: usize,
    /// 单事件的处理并发（同一事件扇出给多个 handler），0 表示不限制
    pub handler_concurrency: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            handler_concurrency: 8,
        }
    }
}

struct Running {
    cancel: CancellationToken,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl Running {
    fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.stop.is_cancelled() && !self.task.is_finished()
    }
}

pub struct EventSubscriber {
    registry: Arc<RwLock<HandlerRegistry>>,
    tx: mpsc::Sender<Event>,
    rx: Arc<AsyncMutex<mpsc::Receiver<Event>>>,
    running: Mutex<Option<Running>>,
    config: SubscriberConfig,
}

impl Default for EventSubscriber {
    fn default() -> Self {
        Self::new(SubscriberConfig::default())
    }
}

impl EventSubscriber {
    pub fn new(config: SubscriberConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            registry: Arc::new(RwLock::new(HandlerRegistry::new())),
            tx,
            rx: Arc::new(AsyncMutex::new(rx)),
            running: Mutex::new(None),
            config,
        }
    }

    pub fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let name = handler.handler_name().to_string();
        if self.registry.write().register(event_type, handler) {
            debug!(event_type, handler = %name, "handler subscribed");
        }
    }

    pub fn unsubscribe(&self, event_type: &str, handler_name: &str) {
        if self.registry.write().unregister(event_type, handler_name) {
            debug!(event_type, handler = handler_name, "handler unsubscribed");
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.registry.read().handler_count(event_type)
    }

    /// 启动后台分发循环（需在 tokio 运行时内调用）；已在运行时为空操作
    ///
    /// `cancel` 触发时循环退出，同时作为处理器的取消信号传入 `DispatchContext`。
    pub fn start(&self, cancel: &CancellationToken) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(Running::is_active) {
            return;
        }

        let stop = CancellationToken::new();
        let task = tokio::spawn(dispatch_loop(
            self.registry.clone(),
            self.rx.clone(),
            cancel.clone(),
            stop.clone(),
            self.config.handler_concurrency,
        ));

        *running = Some(Running {
            cancel: cancel.clone(),
            stop,
            task,
        });
    }

    /// 通知循环退出；正在处理的事件会先完成
    ///
    /// 已入队但尚未取出的事件不会在停止前排空：它们留在队列中，
    /// 下次 `start` 后继续处理；若不再启动则随订阅者一起丢弃。
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().as_ref() {
            running.stop.cancel();
        }
    }

    /// 等待分发循环结束
    pub async fn join(&self) {
        let task = self.running.lock().take().map(|r| r.task);
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().as_ref().is_some_and(Running::is_active)
    }

    /// 非阻塞入队；返回事件是否被接收
    pub fn publish_event(&self, event: Event) -> bool {
        if !self.is_running() {
            debug!(
                event_type = event.event_type(),
                event_id = event.id(),
                "subscriber not running, event dropped"
            );
            return false;
        }

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(
                    event_type = event.event_type(),
                    event_id = event.id(),
                    capacity = self.tx.max_capacity(),
                    "subscriber queue full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// 当前排队（未开始处理）的事件数
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.stop();
    }
}

fn snapshot(registry: &RwLock<HandlerRegistry>, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
    registry.read().matching(event_type)
}

async fn dispatch_loop(
    registry: Arc<RwLock<HandlerRegistry>>,
    rx: Arc<AsyncMutex<mpsc::Receiver<Event>>>,
    cancel: CancellationToken,
    stop: CancellationToken,
    concurrency: usize,
) {
    // 上一轮循环尚未退出时在此等待其释放队列
    let mut rx = rx.lock().await;
    let ctx = DispatchContext::with_token(cancel.clone());
    info!("event subscriber started");

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = stop.cancelled() => break,
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => event,
                None => break,
            },
        };

        let handlers = snapshot(&registry, event.event_type());
        if handlers.is_empty() {
            debug!(event_type = event.event_type(), "no handler subscribed");
            continue;
        }

        let ctx = &ctx;
        let event = &event;
        stream::iter(handlers)
            .for_each_concurrent(Some(concurrency), |h| async move {
                if let Err(err) = h.handle(ctx, event).await {
                    warn!(
                        event_type = event.event_type(),
                        event_id = event.id(),
                        handler = h.handler_name(),
                        error = %err,
                        "event handler failed"
                    );
                }
            })
            .await;
    }

    info!(pending = rx.len(), "event subscriber stopped");
}
