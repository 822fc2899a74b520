//! Channel status vocabularies -> canonical enums.
//!
//! Lookups are case-insensitive. Unknown or missing values map to `Pending`;
//! unknown values also log a warning. These functions never fail.

use oms_schemas::{OrderStatus, PaymentStatus};

pub fn map_order_status(channel_status: Option<&str>) -> OrderStatus {
    let Some(raw) = channel_status else {
        return OrderStatus::Pending;
    };
    match raw.trim().to_ascii_uppercase().as_str() {
        "PAYMENT_WAITING" | "PENDING" => OrderStatus::Pending,
        "PAYED" | "PAID" | "PRODUCT_PREPARE" | "CONFIRMED" => OrderStatus::Confirmed,
        "DELIVERING" | "SHIPPING" | "SHIPPED" => OrderStatus::Shipped,
        "DELIVERED" | "COMPLETE" => OrderStatus::Delivered,
        "CANCELED" | "CANCELLED" => OrderStatus::Cancelled,
        _ => {
            tracing::warn!(status = raw, "unknown order status, defaulting to PENDING");
            OrderStatus::Pending
        }
    }
}

pub fn map_payment_status(channel_status: Option<&str>) -> PaymentStatus {
    let Some(raw) = channel_status else {
        return PaymentStatus::Pending;
    };
    match raw.trim().to_ascii_uppercase().as_str() {
        "PENDING" | "WAITING" => PaymentStatus::Pending,
        "PAID" | "PAYED" | "COMPLETE" => PaymentStatus::Paid,
        "CANCELED" | "CANCELLED" => PaymentStatus::Cancelled,
        "REFUNDED" | "REFUND" => PaymentStatus::Refunded,
        _ => {
            tracing::warn!(
                payment_status = raw,
                "unknown payment status, defaulting to PENDING"
            );
            PaymentStatus::Pending
        }
    }
}
