//! Deterministic mock collectors for NAVER, COUPANG and 11ST.
//!
//! Orders are generated on an epoch-aligned grid of 5-minute slots. Each
//! slot's orders depend only on `(channel, slot)`, so overlapping windows
//! return the same orders with the same channel order numbers, exactly the
//! shape a real channel gives the dedup boundary. Content comes from a
//! seeded generator and never from the clock.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use oms_schemas::{CollectedOrder, CollectedOrderItem};

use crate::collector::{check_window, CollectorError, OrderCollector};

const SLOT_SECS: i64 = 300;
const SHIPPING_FEE: &str = "3000";

const LAST_NAMES: &[&str] = &["김", "이", "박", "최", "정", "강", "조", "윤"];
const FIRST_NAMES: &[&str] = &["민수", "지혜", "서연", "준호", "유진", "하은", "도윤", "예은"];
const CITIES: &[&str] = &["서울특별시 강남구", "서울특별시 마포구", "경기도 성남시", "부산광역시 해운대구"];
const ROADS: &[&str] = &["테헤란로", "강남대로", "논현로", "선릉로"];
const SIZES: &[&str] = &["S", "M", "L", "XL"];
const COLORS: &[&str] = &["블랙", "네이비", "차콜", "베이지"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Profile {
    code: &'static str,
    order_prefix: &'static str,
    /// Max orders per slot (inclusive).
    max_per_slot: u64,
    products: &'static [(&'static str, &'static str)],
}

const NAVER: Profile = Profile {
    code: "NAVER",
    order_prefix: "NAVER",
    max_per_slot: 2,
    products: &[
        ("NAVER-PRD-1001", "젝시믹스 레깅스"),
        ("NAVER-PRD-1002", "젝시믹스 브라탑"),
        ("NAVER-PRD-1003", "젝시믹스 후디"),
    ],
};

const COUPANG: Profile = Profile {
    code: "COUPANG",
    order_prefix: "CP",
    max_per_slot: 1,
    products: &[
        ("CP-PRD-2001", "젝시믹스 레깅스"),
        ("CP-PRD-2002", "젝시믹스 크롭티"),
        ("CP-PRD-2003", "젝시믹스 요가매트"),
    ],
};

const ELEVEN_ST: Profile = Profile {
    code: "11ST",
    order_prefix: "11ST",
    max_per_slot: 1,
    products: &[
        ("11ST-PRD-3001", "젝시믹스 트레이닝복"),
        ("11ST-PRD-3002", "젝시믹스 브라탑"),
    ],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCollector {
    profile: Profile,
}

impl MockCollector {
    pub fn naver() -> Self {
        Self { profile: NAVER }
    }

    pub fn coupang() -> Self {
        Self { profile: COUPANG }
    }

    pub fn eleven_st() -> Self {
        Self { profile: ELEVEN_ST }
    }

    /// Built-in mock for `code`, if there is one.
    pub fn for_channel(code: &str) -> Option<Self> {
        match code {
            "NAVER" => Some(Self::naver()),
            "COUPANG" => Some(Self::coupang()),
            "11ST" => Some(Self::eleven_st()),
            _ => None,
        }
    }

    fn orders_in_slot(&self, slot_ts: i64) -> Vec<CollectedOrder> {
        let mut rng = slot_rng(self.profile.code, slot_ts, 0);
        let count = rng.gen_range(0..=self.profile.max_per_slot);
        (0..count).map(|i| self.build_order(slot_ts, i)).collect()
    }

    fn build_order(&self, slot_ts: i64, index: u64) -> CollectedOrder {
        // Per-order stream so an order's content does not depend on its siblings.
        let mut rng = slot_rng(self.profile.code, slot_ts, index + 1);
        let p = &self.profile;

        let no = format!("{}-{}-{}", p.order_prefix, slot_ts, index);
        let mut o = CollectedOrder::new(p.code, no);

        let name = format!("{}{}", pick(&mut rng, LAST_NAMES), pick(&mut rng, FIRST_NAMES));
        let phone = format!(
            "010-{:04}-{:04}",
            rng.gen_range(0..10_000u64),
            rng.gen_range(0..10_000u64)
        );
        o.customer_name = Some(name.clone());
        o.customer_phone = Some(phone.clone());
        o.customer_email = Some(format!("customer{}@test.com", rng.gen_range(0..1000u64)));
        o.recipient_name = Some(name);
        o.recipient_phone = Some(phone);
        o.postal_code = Some(format!("{:05}", rng.gen_range(0..100_000u64)));
        o.address = Some(format!(
            "{} {} {}",
            pick(&mut rng, CITIES),
            pick(&mut rng, ROADS),
            rng.gen_range(1..=500u64)
        ));
        o.address_detail = Some(format!(
            "{}동 {}호",
            rng.gen_range(1..=10u64),
            rng.gen_range(1..=1000u64)
        ));
        o.delivery_memo = Some("문 앞에 놓아주세요".to_string());
        o.status = Some("PAYED".to_string());
        o.payment_status = Some("PAID".to_string());
        o.payment_method = Some("CARD".to_string());

        let offset = (index as i64) * 60 + rng.gen_range(0..60u64) as i64;
        let ordered_at = Utc.timestamp_opt(slot_ts + offset, 0).single();
        o.ordered_at = ordered_at;
        o.paid_at = ordered_at;

        let mut total: i64 = 0;
        for _ in 0..rng.gen_range(1..=3u64) {
            let (code, pname) = pick(&mut rng, p.products);
            let quantity = rng.gen_range(1..=3i32);
            let unit_price = 29_900 + (rng.gen_range(0..400u64) as i64) * 100;
            total += unit_price * i64::from(quantity);
            let item = CollectedOrderItem::new(code, pname, quantity, unit_price.to_string())
                .with_option(format!("{} / {}", pick(&mut rng, SIZES), pick(&mut rng, COLORS)));
            o.add_item(CollectedOrderItem {
                total_price: Some((unit_price * i64::from(quantity)).to_string()),
                barcode: Some(format!("880{:010}", rng.gen_range(0..1_000_000_000u64))),
                sku: Some(format!("XEXYMIX-{}", rng.gen_range(0..10_000u64))),
                ..item
            });
        }

        let discount = (rng.gen_range(0..50u64) as i64) * 100;
        o.total_amount = Some(total.to_string());
        o.shipping_fee = Some(SHIPPING_FEE.to_string());
        o.discount_amount = Some(discount.to_string());
        o.payment_amount = Some((total + 3000 - discount).to_string());
        o
    }

    /// `<prefix>-<slot_ts>-<index>` -> `(slot_ts, index)`.
    fn parse_order_no(&self, channel_order_no: &str) -> Option<(i64, u64)> {
        let rest = channel_order_no
            .strip_prefix(self.profile.order_prefix)?
            .strip_prefix('-')?;
        let (slot, index) = rest.split_once('-')?;
        let slot_ts: i64 = slot.parse().ok()?;
        if slot_ts.rem_euclid(SLOT_SECS) != 0 {
            return None;
        }
        Some((slot_ts, index.parse().ok()?))
    }
}

#[async_trait::async_trait]
impl OrderCollector for MockCollector {
    fn channel_code(&self) -> &str {
        self.profile.code
    }

    async fn collect_orders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CollectedOrder>, CollectorError> {
        check_window(start, end)?;
        tracing::info!(channel = self.profile.code, %start, %end, "mock collection");

        let first = start.timestamp().div_euclid(SLOT_SECS) * SLOT_SECS;
        let first = if first < start.timestamp() {
            first + SLOT_SECS
        } else {
            first
        };

        let mut out = Vec::new();
        let mut slot = first;
        while slot < end.timestamp() {
            out.extend(self.orders_in_slot(slot));
            slot += SLOT_SECS;
        }
        Ok(out)
    }

    async fn get_order(&self, channel_order_no: &str) -> Result<CollectedOrder, CollectorError> {
        let not_found = || CollectorError::NotFound {
            channel_order_no: channel_order_no.to_string(),
        };
        let (slot_ts, index) = self.parse_order_no(channel_order_no).ok_or_else(not_found)?;
        self.orders_in_slot(slot_ts)
            .into_iter()
            .nth(index as usize)
            .ok_or_else(not_found)
    }

    async fn test_connection(&self) -> bool {
        true
    }

    fn collector_type(&self) -> &'static str {
        "MOCK"
    }
}

// ---------------------------------------------------------------------------
// Deterministic seeding
// ---------------------------------------------------------------------------

/// Generator seeded from `(code, slot_ts, stream)` through SHA-256, so the
/// stream does not depend on process, platform or call order.
fn slot_rng(code: &str, slot_ts: i64, stream: u64) -> StdRng {
    let mut h = Sha256::new();
    h.update(code.as_bytes());
    h.update(slot_ts.to_be_bytes());
    h.update(stream.to_be_bytes());
    let digest = h.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

fn pick<T: Copy + Default>(rng: &mut StdRng, xs: &[T]) -> T {
    xs.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn same_window_same_orders() {
        let c = MockCollector::naver();
        let a = c.collect_orders(t(9, 0), t(12, 0)).await.unwrap();
        let b = c.collect_orders(t(9, 0), t(12, 0)).await.unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty(), "36 slots should produce at least one order");
        for o in &a {
            assert!(o.channel_order_no.starts_with("NAVER-"));
            assert!(o.is_valid());
            assert_eq!(o.status.as_deref(), Some("PAYED"));
            let at = o.ordered_at.unwrap();
            assert!(at >= t(9, 0) && at < t(12, 0));
        }
    }

    #[tokio::test]
    async fn overlapping_windows_share_order_numbers() {
        let c = MockCollector::coupang();
        let wide = c.collect_orders(t(0, 0), t(23, 0)).await.unwrap();
        let narrow = c.collect_orders(t(10, 0), t(11, 0)).await.unwrap();
        for o in &narrow {
            assert!(o.channel_order_no.starts_with("CP-"));
            assert!(wide.iter().any(|w| w == o));
        }
    }

    #[tokio::test]
    async fn get_order_regenerates_collected_order() {
        let c = MockCollector::eleven_st();
        let orders = c.collect_orders(t(0, 0), t(23, 0)).await.unwrap();
        let first = orders.first().expect("a day of slots yields orders");
        assert_eq!(c.get_order(&first.channel_order_no).await.unwrap(), *first);
        assert!(matches!(
            c.get_order("11ST-garbage").await,
            Err(CollectorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_window_is_rejected() {
        let c = MockCollector::naver();
        assert!(matches!(
            c.collect_orders(t(9, 0), t(9, 0)).await,
            Err(CollectorError::InvalidWindow { .. })
        ));
    }
}
