use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use oms_collect::{CollectorError, OrderCollector};
use oms_schemas::CollectedOrder;

/// Collector returning a fixed list of orders for every window, or a
/// transport error when built with [`ScriptedCollector::failing`].
pub struct ScriptedCollector {
    code: String,
    orders: Mutex<Vec<CollectedOrder>>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedCollector {
    pub fn new(code: impl Into<String>, orders: Vec<CollectedOrder>) -> Self {
        Self {
            code: code.into(),
            orders: Mutex::new(orders),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(code: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(code, Vec::new())
        }
    }

    /// Replace the orders returned by later calls.
    pub fn set_orders(&self, orders: Vec<CollectedOrder>) {
        if let Ok(mut g) = self.orders.lock() {
            *g = orders;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OrderCollector for ScriptedCollector {
    fn channel_code(&self) -> &str {
        &self.code
    }

    async fn collect_orders(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CollectedOrder>, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollectorError::Transport("channel unreachable".to_string()));
        }
        self.orders
            .lock()
            .map(|g| g.clone())
            .map_err(|_| CollectorError::Transport("scripted orders poisoned".to_string()))
    }

    async fn get_order(&self, channel_order_no: &str) -> Result<CollectedOrder, CollectorError> {
        let orders = self.collect_orders(Utc::now(), Utc::now()).await?;
        orders
            .into_iter()
            .find(|o| o.channel_order_no == channel_order_no)
            .ok_or_else(|| CollectorError::NotFound {
                channel_order_no: channel_order_no.to_string(),
            })
    }

    async fn test_connection(&self) -> bool {
        !self.fail
    }

    fn collector_type(&self) -> &'static str {
        "SCRIPTED"
    }
}
