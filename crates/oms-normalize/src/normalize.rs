use std::fmt;

use chrono::{DateTime, Utc};
use oms_schemas::{CollectedOrder, MissingField, Order, OrderItem, RawOrder, SalesChannel};
use uuid::Uuid;

use crate::phone::normalize_phone;
use crate::price::{optional_price_to_micros, price_to_micros, PriceError};
use crate::product::ProductCodeLookup;
use crate::status::{map_order_status, map_payment_status};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A field required for a usable order is absent.
    MissingField(MissingField),
    /// The raw order does not belong to the channel passed in.
    ChannelMismatch { raw_channel_id: Uuid, channel_id: Uuid },
    /// Amount could not be converted. `line` is the item index, if any.
    Price { line: Option<usize>, source: PriceError },
    /// Item quantity must be > 0.
    InvalidQuantity { line: usize, quantity: i32 },
    /// Item unit price must be > 0.
    NonPositiveUnitPrice { line: usize, unit_price_micros: i64 },
    /// An order-level amount is negative.
    NegativeAmount { field: &'static str, micros: i64 },
    /// Item has no channel product code.
    MissingProductCode { line: usize },
    /// Checked arithmetic overflowed while totalling.
    Overflow { what: &'static str },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::MissingField(field) => {
                write!(f, "collected order is missing required field '{field}'")
            }
            NormalizeError::ChannelMismatch {
                raw_channel_id,
                channel_id,
            } => write!(
                f,
                "raw order belongs to channel {raw_channel_id}, not {channel_id}"
            ),
            NormalizeError::Price { line: Some(l), source } => write!(f, "item {l}: {source}"),
            NormalizeError::Price { line: None, source } => write!(f, "{source}"),
            NormalizeError::InvalidQuantity { line, quantity } => {
                write!(f, "item {line}: quantity must be > 0 (got {quantity})")
            }
            NormalizeError::NonPositiveUnitPrice {
                line,
                unit_price_micros,
            } => write!(
                f,
                "item {line}: unit price must be > 0 (got {unit_price_micros} micros)"
            ),
            NormalizeError::NegativeAmount { field, micros } => {
                write!(f, "{field} must not be negative (got {micros} micros)")
            }
            NormalizeError::MissingProductCode { line } => {
                write!(f, "item {line}: channel product code is empty")
            }
            NormalizeError::Overflow { what } => write!(f, "arithmetic overflow computing {what}"),
        }
    }
}

impl std::error::Error for NormalizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NormalizeError::Price { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// A fully normalized order still waiting for its order number.
///
/// Numbers are minted only after normalization succeeds, so a rejected
/// payload never consumes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOrder {
    order: Order,
}

impl DraftOrder {
    pub fn assign_order_no(self, order_no: impl Into<String>) -> Order {
        let mut order = self.order;
        order.order_no = order_no.into();
        order
    }
}

/// Transform a collected order into the canonical model.
///
/// - phone numbers are canonicalized (unknown formats kept as-is)
/// - statuses go through the case-insensitive vocabularies (unknown -> PENDING)
/// - item product codes go through `products` (unmapped -> channel code)
/// - item totals are always recomputed as `unit_price * quantity`
/// - a missing order total is the item sum; a missing payment amount is
///   `total + shipping - discount`
/// - a missing `ordered_at` falls back to the raw order's `collected_at`
///
/// Returns `Err` on any input a usable order cannot be built from.
pub fn normalize(
    collected: &CollectedOrder,
    raw: &RawOrder,
    channel: &SalesChannel,
    products: &dyn ProductCodeLookup,
    now: DateTime<Utc>,
) -> Result<DraftOrder, NormalizeError> {
    collected.validate().map_err(NormalizeError::MissingField)?;
    if raw.channel_id != channel.id {
        return Err(NormalizeError::ChannelMismatch {
            raw_channel_id: raw.channel_id,
            channel_id: channel.id,
        });
    }

    let mut items = Vec::with_capacity(collected.items.len());
    let mut items_total: i64 = 0;
    for (line, ci) in collected.items.iter().enumerate() {
        if ci.channel_product_code.trim().is_empty() {
            return Err(NormalizeError::MissingProductCode { line });
        }
        if ci.quantity <= 0 {
            return Err(NormalizeError::InvalidQuantity {
                line,
                quantity: ci.quantity,
            });
        }
        let unit_price_micros =
            price_to_micros(&ci.unit_price, "unit_price").map_err(|source| {
                NormalizeError::Price {
                    line: Some(line),
                    source,
                }
            })?;
        if unit_price_micros <= 0 {
            return Err(NormalizeError::NonPositiveUnitPrice {
                line,
                unit_price_micros,
            });
        }
        let total_price_micros = unit_price_micros
            .checked_mul(i64::from(ci.quantity))
            .ok_or(NormalizeError::Overflow {
                what: "item total",
            })?;
        items_total = items_total
            .checked_add(total_price_micros)
            .ok_or(NormalizeError::Overflow {
                what: "items total",
            })?;

        items.push(OrderItem {
            id: Uuid::new_v4(),
            product_code: products.map_to_product_code(&ci.channel_product_code),
            channel_product_code: ci.channel_product_code.clone(),
            product_name: ci.product_name.clone(),
            option_name: ci.option_name.clone(),
            quantity: ci.quantity,
            unit_price_micros,
            total_price_micros,
            created_at: now,
        });
    }

    let amount = |v: &Option<String>, field: &'static str| -> Result<Option<i64>, NormalizeError> {
        let micros = optional_price_to_micros(v.as_deref(), field)
            .map_err(|source| NormalizeError::Price { line: None, source })?;
        match micros {
            Some(m) if m < 0 => Err(NormalizeError::NegativeAmount { field, micros: m }),
            other => Ok(other),
        }
    };

    let total_amount_micros = amount(&collected.total_amount, "total_amount")?.unwrap_or(items_total);
    let shipping_fee_micros = amount(&collected.shipping_fee, "shipping_fee")?.unwrap_or(0);
    let discount_amount_micros = amount(&collected.discount_amount, "discount_amount")?.unwrap_or(0);
    let payment_amount_micros = match amount(&collected.payment_amount, "payment_amount")? {
        Some(p) => p,
        None => total_amount_micros
            .checked_add(shipping_fee_micros)
            .and_then(|v| v.checked_sub(discount_amount_micros))
            .ok_or(NormalizeError::Overflow {
                what: "payment amount",
            })?,
    };

    let recipient_phone = normalize_phone(collected.recipient_phone.as_deref())
        .ok_or(NormalizeError::MissingField(MissingField::RecipientPhone))?;

    let order = Order {
        id: Uuid::new_v4(),
        order_no: String::new(),
        raw_order_id: raw.id,
        channel_id: channel.id,
        channel_order_no: collected.channel_order_no.clone(),
        customer_name: collected.customer_name.clone(),
        customer_phone: normalize_phone(collected.customer_phone.as_deref()),
        customer_email: collected.customer_email.clone(),
        recipient_name: collected.recipient_name.clone().unwrap_or_default(),
        recipient_phone,
        postal_code: collected.postal_code.clone(),
        address: collected.address.clone().unwrap_or_default(),
        address_detail: collected.address_detail.clone(),
        delivery_memo: collected.delivery_memo.clone(),
        total_amount_micros,
        payment_amount_micros,
        shipping_fee_micros,
        discount_amount_micros,
        order_status: map_order_status(collected.status.as_deref()),
        payment_status: map_payment_status(collected.payment_status.as_deref()),
        ordered_at: collected.ordered_at.unwrap_or(raw.collected_at),
        paid_at: collected.paid_at,
        created_at: now,
        updated_at: now,
        items,
    };

    tracing::debug!(
        channel = %channel.code,
        channel_order_no = %order.channel_order_no,
        items = order.items.len(),
        "order normalized"
    );

    Ok(DraftOrder { order })
}
