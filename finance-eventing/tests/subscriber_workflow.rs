use async_trait::async_trait;
use finance_eventing::eventing::{DispatchContext, EventHandler, EventSubscriber, SubscriberConfig};
use finance_eventing::{Event, EventingError, EventingResult};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

type Journal = Arc<Mutex<Vec<String>>>;

/// 记录开始/结束的慢处理器，用于观察单事件在途与 FIFO
struct Slow {
    name: &'static str,
    journal: Journal,
}

#[async_trait]
impl EventHandler for Slow {
    fn handler_name(&self) -> &str {
        self.name
    }

    async fn handle(&self, _ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("start {} {}", event.id(), self.name));
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.journal
            .lock()
            .unwrap()
            .push(format!("end {} {}", event.id(), self.name));
        Ok(())
    }
}

/// 第一次调用时阻塞，直到测试放行
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    handled: Journal,
}

#[async_trait]
impl EventHandler for Gate {
    fn handler_name(&self) -> &str {
        "gate"
    }

    async fn handle(&self, _ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        if event.id() == "ev-0" {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.handled.lock().unwrap().push(event.id().to_string());
        Ok(())
    }
}

/// 在处理中等待取消或放行，并记录处理器看到的取消状态
struct Watcher {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    outcome: Journal,
}

#[async_trait]
impl EventHandler for Watcher {
    fn handler_name(&self) -> &str {
        "watcher"
    }

    async fn handle(&self, ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        self.entered.notify_one();
        tokio::select! {
            _ = ctx.cancelled() => {
                self.outcome.lock().unwrap().push("cancelled".to_string());
                Err(EventingError::Cancelled {
                    handler: self.handler_name().to_string(),
                    event_type: event.event_type().to_string(),
                    attempts: 1,
                })
            }
            _ = self.release.notified() => {
                self.outcome
                    .lock()
                    .unwrap()
                    .push(format!("released cancelled={}", ctx.is_cancelled()));
                Ok(())
            }
        }
    }
}

fn watched(sub: &EventSubscriber) -> (Arc<Notify>, Arc<Notify>, Journal) {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let outcome: Journal = Arc::new(Mutex::new(Vec::new()));
    sub.subscribe(
        "achievement.unlocked",
        Arc::new(Watcher {
            entered: entered.clone(),
            release: release.clone(),
            outcome: outcome.clone(),
        }),
    );
    (entered, release, outcome)
}

fn mk_event(n: usize) -> Event {
    Event::builder()
        .id(format!("ev-{n}"))
        .event_type("achievement.unlocked")
        .aggregate_id("user-7")
        .aggregate_type("profile")
        .payload(json!({"badge": "first-budget", "n": n}))
        .build()
        .expect("valid event")
}

async fn wait_until(journal: &Journal, len: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while journal.lock().unwrap().len() < len {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber should make progress");
}

#[tokio::test(flavor = "multi_thread")]
async fn events_dispatched_in_fifo_one_at_a_time() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let sub = EventSubscriber::default();
    for name in ["x", "y"] {
        sub.subscribe(
            "achievement.unlocked",
            Arc::new(Slow {
                name,
                journal: journal.clone(),
            }),
        );
    }

    let cancel = CancellationToken::new();
    sub.start(&cancel);
    for n in 0..3 {
        assert!(sub.publish_event(mk_event(n)));
    }
    wait_until(&journal, 12).await;

    let entries = journal.lock().unwrap().clone();
    // 每个事件的 4 条记录连续出现，且事件按入队顺序处理
    for (n, chunk) in entries.chunks(4).enumerate() {
        let id = format!("ev-{n}");
        assert!(chunk.iter().all(|e| e.contains(&id)), "{entries:?}");
        assert!(chunk[..2].iter().all(|e| e.starts_with("start")), "{entries:?}");
        assert!(chunk[2..].iter().all(|e| e.starts_with("end")), "{entries:?}");
    }

    cancel.cancel();
    sub.join().await;
    assert!(!sub.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_queue_drops_without_blocking() {
    let handled: Journal = Arc::new(Mutex::new(Vec::new()));
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let sub = EventSubscriber::new(SubscriberConfig {
        queue_capacity: 1,
        handler_concurrency: 1,
    });
    sub.subscribe(
        "achievement.unlocked",
        Arc::new(Gate {
            entered: entered.clone(),
            release: release.clone(),
            handled: handled.clone(),
        }),
    );

    let cancel = CancellationToken::new();
    sub.start(&cancel);

    assert!(sub.publish_event(mk_event(0)));
    entered.notified().await;

    // ev-0 在途，ev-1 占满队列，ev-2 被丢弃
    assert!(sub.publish_event(mk_event(1)));
    assert_eq!(sub.queued(), 1);
    assert!(!sub.publish_event(mk_event(2)));

    release.notify_one();
    wait_until(&handled, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*handled.lock().unwrap(), vec!["ev-0", "ev-1"]);

    sub.stop();
    sub.join().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_finishes_in_flight_and_allows_restart() {
    let handled: Journal = Arc::new(Mutex::new(Vec::new()));
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let sub = EventSubscriber::default();
    sub.subscribe(
        "achievement.unlocked",
        Arc::new(Gate {
            entered: entered.clone(),
            release: release.clone(),
            handled: handled.clone(),
        }),
    );

    let cancel = CancellationToken::new();
    sub.start(&cancel);
    assert!(sub.publish_event(mk_event(0)));
    entered.notified().await;

    sub.stop();
    assert!(!sub.publish_event(mk_event(1)));
    release.notify_one();
    sub.join().await;
    assert_eq!(*handled.lock().unwrap(), vec!["ev-0"]);

    sub.start(&cancel);
    assert!(sub.is_running());
    assert!(sub.publish_event(mk_event(3)));
    wait_until(&handled, 2).await;
    assert_eq!(handled.lock().unwrap()[1], "ev-3");

    cancel.cancel();
    sub.join().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unsubscribed_handler_receives_nothing() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let sub = EventSubscriber::default();
    sub.subscribe(
        "achievement.unlocked",
        Arc::new(Slow {
            name: "x",
            journal: journal.clone(),
        }),
    );
    sub.unsubscribe("achievement.unlocked", "x");
    sub.unsubscribe("achievement.unlocked", "x");
    assert_eq!(sub.handler_count("achievement.unlocked"), 0);

    let cancel = CancellationToken::new();
    sub.start(&cancel);
    assert!(sub.publish_event(mk_event(0)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(journal.lock().unwrap().is_empty());

    cancel.cancel();
    sub.join().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn external_cancel_reaches_in_flight_handler() {
    let sub = EventSubscriber::default();
    let (entered, _release, outcome) = watched(&sub);

    let cancel = CancellationToken::new();
    sub.start(&cancel);
    assert!(sub.publish_event(mk_event(0)));
    entered.notified().await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), sub.join())
        .await
        .expect("loop should exit once the handler observes cancellation");
    assert_eq!(*outcome.lock().unwrap(), vec!["cancelled"]);
    assert!(!sub.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_leaves_handler_context_live() {
    let sub = EventSubscriber::default();
    let (entered, release, outcome) = watched(&sub);

    let cancel = CancellationToken::new();
    sub.start(&cancel);
    assert!(sub.publish_event(mk_event(0)));
    entered.notified().await;

    sub.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(outcome.lock().unwrap().is_empty());

    release.notify_one();
    sub.join().await;
    assert_eq!(*outcome.lock().unwrap(), vec!["released cancelled=false"]);
    assert!(!cancel.is_cancelled());
}
