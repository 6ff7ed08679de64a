//! Domain library for the Orders service.
//!
//! This crate is dependency-free (inherits workspace metadata only) and holds
//! the Order types, the repository port, and error definitions. Keep adapters
//! and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

/// Identifier of a stored order (64-bit, assigned by the store).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(i64);

impl OrderId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Parse a decimal identifier, e.g. from a URL path segment.
    ///
    /// Only an optional `-` followed by ASCII digits is accepted; no
    /// surrounding whitespace, no `+`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidOrderId(s.to_string());
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<i64>().map(Self).map_err(|_| invalid())
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    WaitingPayment,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::WaitingPayment => "waiting_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "waiting_payment" => Some(OrderStatus::WaitingPayment),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

/// Stored order record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    /// When the order was placed.
    pub moment: SystemTime,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(id: OrderId, moment: SystemTime, status: OrderStatus) -> Self {
        Self { id, moment, status }
    }
}

/// Input for store-side creation; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub moment: SystemTime,
    pub status: OrderStatus,
}

/// Repository port for reading persisted orders.
///
/// Read-only on purpose: orders are created and removed outside the service.
/// Adapters expose their own write helpers for seeding.
pub trait OrderRepository: Send + Sync {
    /// Every stored order. No ordering is guaranteed by the port.
    fn find_all(&self) -> Result<Vec<Order>, CoreError>;
    /// The order with the given id, or `None` when absent.
    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError>;
}

impl<R: OrderRepository + ?Sized> OrderRepository for &R {
    fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError> {
        (**self).find_by_id(id)
    }
}

impl<R: OrderRepository + ?Sized> OrderRepository for Arc<R> {
    fn find_all(&self) -> Result<Vec<Order>, CoreError> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, CoreError> {
        (**self).find_by_id(id)
    }
}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug)]
pub enum CoreError {
    InvalidOrderId(String),
    AlreadyExists,
    NotFound,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidOrderId(raw) => write!(f, "invalid order id: {}", raw),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - orders domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod service;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_parse_accepts_integers() {
        assert_eq!(OrderId::parse("7").unwrap(), OrderId::new(7));
        assert_eq!(OrderId::parse("-3").unwrap().get(), -3);
        assert_eq!(OrderId::parse("9223372036854775807").unwrap().get(), i64::MAX);
    }

    #[test]
    fn order_id_parse_rejects_garbage() {
        let err = OrderId::parse("abc").unwrap_err();
        match err {
            CoreError::InvalidOrderId(raw) => assert_eq!(raw, "abc"),
            _ => panic!("expected InvalidOrderId"),
        }
        // one past i64::MAX
        assert!(OrderId::parse("9223372036854775808").is_err());
        assert!(OrderId::parse("").is_err());
        assert!(OrderId::parse("-").is_err());
        assert!(OrderId::parse(" 42 ").is_err());
        assert!(OrderId::parse("+7").is_err());
        assert!(OrderId::parse(" +7").is_err());
    }

    #[test]
    fn order_status_strings() {
        for status in [
            OrderStatus::WaitingPayment,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("PAID"), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::parse("lost"), None);
    }

    #[test]
    fn not_found_display() {
        assert_eq!(CoreError::NotFound.to_string(), "not found");
    }
}
