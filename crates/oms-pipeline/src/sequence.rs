//! Order numbers: `OMS-YYYYMMDD-NNNN`, sequence restarting every business day.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::store::OmsStore;

pub const ORDER_NO_PREFIX: &str = "OMS";
/// Four zero-padded digits.
pub const MAX_DAILY_SEQ: u32 = 9_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderNo {
    pub day: NaiveDate,
    pub seq: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderNoError {
    Malformed(String),
    /// The day's counter passed the 4-digit range.
    Overflow { day: NaiveDate, seq: i64 },
}

impl fmt::Display for OrderNoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderNoError::Malformed(s) => write!(f, "malformed order number: {s}"),
            OrderNoError::Overflow { day, seq } => write!(
                f,
                "order sequence for {day} exhausted (seq {seq} > {MAX_DAILY_SEQ})"
            ),
        }
    }
}

impl std::error::Error for OrderNoError {}

impl OrderNo {
    pub fn new(day: NaiveDate, seq: i64) -> Result<Self, OrderNoError> {
        match u32::try_from(seq) {
            Ok(s) if (1..=MAX_DAILY_SEQ).contains(&s) => Ok(Self { day, seq: s }),
            _ => Err(OrderNoError::Overflow { day, seq }),
        }
    }

    pub fn parse(s: &str) -> Result<Self, OrderNoError> {
        let malformed = || OrderNoError::Malformed(s.to_string());
        let mut parts = s.splitn(3, '-');
        let (prefix, date, seq) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(d), Some(n)) => (p, d, n),
            _ => return Err(malformed()),
        };
        if prefix != ORDER_NO_PREFIX
            || date.len() != 8
            || seq.len() != 4
            || !seq.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let day = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| malformed())?;
        let seq: u32 = seq.parse().map_err(|_| malformed())?;
        if seq == 0 {
            return Err(malformed());
        }
        Ok(Self { day, seq })
    }
}

impl fmt::Display for OrderNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ORDER_NO_PREFIX}-{}-{:04}",
            self.day.format("%Y%m%d"),
            self.seq
        )
    }
}

/// Mints order numbers from the store's atomic per-day counter.
///
/// The store increment is the cross-process guarantee; the local mutex keeps
/// minting within one process strictly sequential.
pub struct SequenceGenerator {
    store: Arc<dyn OmsStore>,
    tz: Tz,
    lock: Mutex<()>,
}

impl SequenceGenerator {
    pub fn new(store: Arc<dyn OmsStore>, tz: Tz) -> Self {
        Self {
            store,
            tz,
            lock: Mutex::new(()),
        }
    }

    /// Calendar day of `now` in the business timezone.
    pub fn business_day(&self, now: DateTime<Utc>) -> NaiveDate {
        crate::calendar::business_day(self.tz, now)
    }

    pub async fn next_order_no(&self, now: DateTime<Utc>) -> Result<OrderNo> {
        self.next_for_day(self.business_day(now)).await
    }

    pub async fn next_for_day(&self, day: NaiveDate) -> Result<OrderNo> {
        let _guard = self.lock.lock().await;
        let seq = self.store.next_order_seq(day).await?;
        Ok(OrderNo::new(day, i64::from(seq))?)
    }
}
