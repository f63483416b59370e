use anyhow::Result as AnyResult;
use async_trait::async_trait;
use finance_eventing::event_upgrader::EventUpgrader;
use finance_eventing::eventing::{
    DispatchContext, EventBus, EventHandler, EventSubscriber, InMemoryEventBus, RetryPolicy,
    RetryableHandler, SubscriberConfig,
};
use finance_eventing::schema::{EventSchema, FieldType, SchemaRegistry};
use finance_eventing::{Event, EventingError, EventingResult, Metadata};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

const TX_RECORDED: &str = "transaction.recorded";
const BADGE_UNLOCKED: &str = "achievement.unlocked";

#[derive(Debug, Deserialize)]
struct TransactionRecorded {
    portfolio_id: String,
    amount_minor: i64,
    currency: String,
}

/// 组合余额投影
#[derive(Default)]
struct PortfolioProjector {
    balances: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl EventHandler for PortfolioProjector {
    fn handler_name(&self) -> &str {
        "portfolio-projector"
    }

    async fn handle(&self, _ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        let tx: TransactionRecorded = event.payload_as()?;
        let mut balances = self.balances.lock().unwrap();
        *balances.entry(tx.portfolio_id).or_default() += tx.amount_minor;
        info!(currency = %tx.currency, "portfolio balance updated");
        Ok(())
    }
}

/// 成就计算：首次调用模拟下游超时，并把解锁事件交给订阅者异步处理
struct BadgeAwarder {
    calls: AtomicUsize,
    subscriber: Arc<EventSubscriber>,
}

#[async_trait]
impl EventHandler for BadgeAwarder {
    fn handler_name(&self) -> &str {
        "badge-awarder"
    }

    async fn handle(&self, _ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(EventingError::transient(
                self.handler_name(),
                event.event_type(),
                "badge service timed out",
            ));
        }
        let unlocked = Event::builder()
            .event_type(BADGE_UNLOCKED)
            .aggregate_id(event.aggregate_id())
            .aggregate_type("profile")
            .metadata(Metadata::new().with(Metadata::CAUSATION_ID, event.id()))
            .payload(json!({"badge": "first-transaction"}))
            .build()?;
        self.subscriber.publish_event(unlocked);
        Ok(())
    }
}

struct Notifier;

#[async_trait]
impl EventHandler for Notifier {
    fn handler_name(&self) -> &str {
        "notifier"
    }

    async fn handle(&self, _ctx: &DispatchContext, event: &Event) -> EventingResult<()> {
        info!(
            badge = %event.payload()["badge"],
            causation_id = event.metadata().get(Metadata::CAUSATION_ID),
            "achievement notification sent"
        );
        Ok(())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn catalog() -> AnyResult<(SchemaRegistry, EventUpgrader)> {
    let schemas = SchemaRegistry::new();
    schemas.register_schema(
        TX_RECORDED,
        EventSchema::new(1)
            .required("portfolio_id", FieldType::String, "target portfolio")
            .required("amount", FieldType::Number, "decimal amount"),
    )?;
    schemas.register_schema(
        TX_RECORDED,
        EventSchema::new(2)
            .required("portfolio_id", FieldType::String, "target portfolio")
            .required("amount_minor", FieldType::Integer, "amount in cents")
            .required("currency", FieldType::String, "ISO 4217 code"),
    )?;

    let upgrader = EventUpgrader::new();
    upgrader.register_upgrade(TX_RECORDED, 1, |ev: Event| {
        let amount = ev.payload()["amount"].as_f64().unwrap_or_default();
        let portfolio_id = ev.payload()["portfolio_id"].clone();
        Ok(ev.upgraded(
            2,
            json!({
                "portfolio_id": portfolio_id,
                "amount_minor": (amount * 100.0).round() as i64,
                "currency": "EUR",
            }),
        ))
    })?;

    Ok((schemas, upgrader))
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    init_tracing();
    println!("=== finance-eventing 示例 ===\n");

    let (schemas, upgrader) = catalog()?;

    let subscriber = Arc::new(EventSubscriber::new(SubscriberConfig::default()));
    subscriber.subscribe(BADGE_UNLOCKED, Arc::new(Notifier));
    let shutdown = CancellationToken::new();
    subscriber.start(&shutdown);

    let projector = Arc::new(PortfolioProjector::default());
    let awarder = Arc::new(RetryableHandler::new(
        Arc::new(BadgeAwarder {
            calls: AtomicUsize::new(0),
            subscriber: subscriber.clone(),
        }),
        RetryPolicy {
            initial_interval: Duration::from_millis(50),
            ..RetryPolicy::default()
        },
    ));

    let bus = InMemoryEventBus::new();
    bus.register(TX_RECORDED, projector.clone())?;
    bus.register(TX_RECORDED, awarder)?;

    // 历史导入的 v1 事件：先校验原始版本，升级后再按最新 Schema 校验
    let legacy = Event::builder()
        .event_type(TX_RECORDED)
        .aggregate_id("acc-1")
        .aggregate_type("account")
        .metadata(Metadata::new().with(Metadata::CORRELATION_ID, "import-1"))
        .payload(json!({"portfolio_id": "pf-main", "amount": 42.5}))
        .build()?;
    schemas.validate_event(&legacy)?;
    let current = upgrader.upgrade_event(legacy)?;
    schemas.validate_event(&current)?;
    println!("✅ 升级后版本: v{}", current.version());

    bus.publish(&DispatchContext::with_timeout(Duration::from_secs(5)), &current)
        .await?;
    println!(
        "✅ 组合余额: {:?}",
        projector.balances.lock().unwrap().get("pf-main")
    );

    // 给订阅者留出处理解锁事件的时间
    tokio::time::sleep(Duration::from_millis(100)).await;

    bus.close();
    subscriber.stop();
    subscriber.join().await;
    schemas.clear();
    upgrader.clear();
    println!("\n=== 已关闭 ===");

    Ok(())
}
