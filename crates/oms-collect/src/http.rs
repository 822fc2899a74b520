//! Generic JSON-over-HTTP collector.
//!
//! Any channel adapter (or a gateway in front of a real marketplace) that
//! speaks this protocol can be collected from without new code:
//!
//! - `GET {base}/orders?from=<rfc3339>&to=<rfc3339>` -> JSON array of orders
//! - `GET {base}/orders/{channel_order_no}` -> one order, `404` if unknown.
//!   The order number is percent-encoded as one path segment.
//! - `GET {base}/health` -> any `2xx` means alive
//!
//! Order objects use the [`CollectedOrder`] field names; `channel_code` may
//! be omitted. The verbatim JSON of each order is kept in `raw_json`.
//! The API key, if any, is sent as `Authorization: Bearer <key>` and never logged.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use oms_config::secrets::ApiKey;
use oms_schemas::CollectedOrder;
use reqwest::Url;
use serde_json::Value;

use crate::collector::{check_window, CollectorError, OrderCollector};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct HttpCollector {
    code: String,
    base_url: Url,
    api_key: Option<ApiKey>,
    http: reqwest::Client,
}

impl HttpCollector {
    pub fn new(
        code: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<ApiKey>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, CollectorError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("http client build failed: {e}")))?;
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| CollectorError::Config(format!("invalid base_url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CollectorError::Config(format!(
                "base_url '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            code: code.into(),
            base_url,
            api_key,
            http,
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded as a single
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CollectorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CollectorError::Config(format!("base_url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments.iter().copied());
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<reqwest::RequestBuilder, CollectorError> {
        let req = self.http.get(self.endpoint(segments)?);
        Ok(match &self.api_key {
            Some(k) => req.bearer_auth(k.expose()),
            None => req,
        })
    }

    /// Fill in `channel_code` when omitted, keep the verbatim text.
    fn decode_order(&self, mut v: Value) -> Result<CollectedOrder, CollectorError> {
        let raw = v.to_string();
        let obj = v
            .as_object_mut()
            .ok_or_else(|| CollectorError::Decode("order is not a JSON object".to_string()))?;
        let declared = obj
            .get("channel_code")
            .and_then(Value::as_str)
            .map(str::to_string);
        match declared {
            None => {
                obj.insert("channel_code".to_string(), Value::String(self.code.clone()));
            }
            Some(c) if c != self.code => {
                return Err(CollectorError::Decode(format!(
                    "order for channel '{c}' returned by collector '{}'",
                    self.code
                )));
            }
            Some(_) => {}
        }
        let mut order: CollectedOrder =
            serde_json::from_value(v).map_err(|e| CollectorError::Decode(e.to_string()))?;
        if order.raw_json.is_none() {
            order.raw_json = Some(raw);
        }
        Ok(order)
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, CollectorError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CollectorError::Api {
        status: Some(status.as_u16()),
        message: body.chars().take(200).collect(),
    })
}

#[async_trait::async_trait]
impl OrderCollector for HttpCollector {
    fn channel_code(&self) -> &str {
        &self.code
    }

    async fn collect_orders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CollectedOrder>, CollectorError> {
        check_window(start, end)?;
        let from = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let to = end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let resp = self
            .get(&["orders"])?
            .query(&[("from", from.as_str()), ("to", to.as_str())])
            .send()
            .await
            .map_err(|e| CollectorError::Transport(e.to_string()))?;
        let resp = error_for_status(resp).await?;
        let body: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| CollectorError::Decode(e.to_string()))?;

        let orders = body
            .into_iter()
            .map(|v| self.decode_order(v))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(channel = %self.code, count = orders.len(), "http collection");
        Ok(orders)
    }

    async fn get_order(&self, channel_order_no: &str) -> Result<CollectedOrder, CollectorError> {
        let resp = self
            .get(&["orders", channel_order_no])?
            .send()
            .await
            .map_err(|e| CollectorError::Transport(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CollectorError::NotFound {
                channel_order_no: channel_order_no.to_string(),
            });
        }
        let resp = error_for_status(resp).await?;
        let v: Value = resp
            .json()
            .await
            .map_err(|e| CollectorError::Decode(e.to_string()))?;
        self.decode_order(v)
    }

    async fn test_connection(&self) -> bool {
        let req = match self.get(&["health"]) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(channel = %self.code, error = %e, "health check failed");
                return false;
            }
        };
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(channel = %self.code, error = %e, "health check failed");
                false
            }
        }
    }

    fn collector_type(&self) -> &'static str {
        "HTTP"
    }
}
