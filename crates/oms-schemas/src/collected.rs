//! Channel-native order representation.
//!
//! A [`CollectedOrder`] is exactly what a collector observed on the channel.
//! Amounts are decimal strings (e.g. `"29900"`, `"12.50"`) so that the
//! normalizer can convert them to micros without floating-point rounding.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One order as returned by a channel collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedOrder {
    /// Channel identifier (e.g. `"NAVER"`). Used to resolve the owning channel.
    pub channel_code: String,
    /// Channel-assigned order number. Unique per channel.
    pub channel_order_no: String,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,

    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub address_detail: Option<String>,
    pub delivery_memo: Option<String>,

    /// Decimal string amounts, channel currency.
    pub total_amount: Option<String>,
    pub payment_amount: Option<String>,
    pub shipping_fee: Option<String>,
    pub discount_amount: Option<String>,

    /// Channel vocabulary (e.g. `"PAYED"`, `"DELIVERING"`).
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,

    pub ordered_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub items: Vec<CollectedOrderItem>,

    /// Verbatim channel response text, when the collector has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
}

/// One line of a [`CollectedOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedOrderItem {
    pub channel_product_code: String,
    pub product_name: String,
    pub option_name: Option<String>,
    pub quantity: i32,
    /// Decimal string.
    pub unit_price: String,
    /// Upstream-claimed line total. Informational only; the normalizer
    /// always recomputes `unit_price * quantity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// First required field found missing by [`CollectedOrder::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    ChannelOrderNo,
    RecipientName,
    RecipientPhone,
    Address,
    Items,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::ChannelOrderNo => "channel_order_no",
            MissingField::RecipientName => "recipient_name",
            MissingField::RecipientPhone => "recipient_phone",
            MissingField::Address => "address",
            MissingField::Items => "items",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CollectedOrder {
    /// Minimal order with no optional fields set.
    pub fn new(channel_code: impl Into<String>, channel_order_no: impl Into<String>) -> Self {
        Self {
            channel_code: channel_code.into(),
            channel_order_no: channel_order_no.into(),
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            recipient_name: None,
            recipient_phone: None,
            postal_code: None,
            address: None,
            address_detail: None,
            delivery_memo: None,
            total_amount: None,
            payment_amount: None,
            shipping_fee: None,
            discount_amount: None,
            status: None,
            payment_status: None,
            payment_method: None,
            ordered_at: None,
            paid_at: None,
            items: Vec::new(),
            raw_json: None,
        }
    }

    pub fn add_item(&mut self, item: CollectedOrderItem) {
        self.items.push(item);
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// An order is usable only with an order number, recipient name/phone,
    /// an address and at least one item.
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.channel_order_no.trim().is_empty() {
            return Err(MissingField::ChannelOrderNo);
        }
        if is_blank(&self.recipient_name) {
            return Err(MissingField::RecipientName);
        }
        if is_blank(&self.recipient_phone) {
            return Err(MissingField::RecipientPhone);
        }
        if is_blank(&self.address) {
            return Err(MissingField::Address);
        }
        if self.items.is_empty() {
            return Err(MissingField::Items);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl CollectedOrderItem {
    pub fn new(
        channel_product_code: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: impl Into<String>,
    ) -> Self {
        Self {
            channel_product_code: channel_product_code.into(),
            product_name: product_name.into(),
            option_name: None,
            quantity,
            unit_price: unit_price.into(),
            total_price: None,
            barcode: None,
            sku: None,
        }
    }

    pub fn with_option(mut self, option_name: impl Into<String>) -> Self {
        self.option_name = Some(option_name.into());
        self
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}
