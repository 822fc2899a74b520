use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An external sales channel (marketplace).
///
/// Owned by channel management; the pipeline only reads it and records
/// `last_collected_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesChannel {
    pub id: Uuid,
    /// Stable code, e.g. `"NAVER"`, `"COUPANG"`, `"11ST"`.
    pub code: String,
    pub name: String,
    /// `REST` | `SOAP` | `CSV`
    pub api_type: Option<String>,
    pub api_base_url: Option<String>,
    pub is_active: bool,
    pub collection_interval_minutes: i32,
    /// Last collection *attempt*, successful or not.
    pub last_collected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesChannel {
    /// Active REST channel with default bookkeeping.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            api_type: Some("REST".to_string()),
            api_base_url: None,
            is_active: true,
            collection_interval_minutes: 10,
            last_collected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_api_type(&self) -> bool {
        matches!(
            self.api_type.as_deref().map(str::to_ascii_uppercase).as_deref(),
            Some("REST") | Some("SOAP")
        )
    }
}
