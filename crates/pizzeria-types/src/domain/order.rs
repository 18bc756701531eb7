use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => anyhow::bail!("unknown order status {other:?}"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {0} is not pending")]
    NotPending(i64),
}

/// A line item as submitted by a client, before storage assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrderItem {
    pub quantity: i64,
    pub flavor: String,
    pub size: String,
    pub unit_price: f64,
}

impl NewOrderItem {
    pub fn new(
        quantity: i64,
        flavor: String,
        size: String,
        unit_price: f64,
    ) -> anyhow::Result<Self> {
        if quantity <= 0 {
            anyhow::bail!("item quantity must be > 0");
        }
        if flavor.trim().is_empty() {
            anyhow::bail!("flavor empty");
        }
        if size.trim().is_empty() {
            anyhow::bail!("size empty");
        }
        if !unit_price.is_finite() || unit_price < 0.0 {
            anyhow::bail!("unit_price must be a non-negative number");
        }
        Ok(Self {
            quantity,
            flavor,
            size,
            unit_price,
        })
    }

    pub fn into_item(self, id: i64, order_id: i64) -> OrderItem {
        OrderItem {
            id,
            quantity: self.quantity,
            flavor: self.flavor,
            size: self.size,
            unit_price: self.unit_price,
            order_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub quantity: i64,
    pub flavor: String,
    pub size: String,
    pub unit_price: f64,
    pub order_id: i64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Order aggregate. `total_price` is derived from `items` and is kept in sync
/// by every method that touches the item list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub owner_user_id: i64,
    pub status: OrderStatus,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(id: i64, owner_user_id: i64) -> Self {
        Self {
            id,
            owner_user_id,
            status: OrderStatus::Pending,
            total_price: 0.0,
            items: Vec::new(),
        }
    }

    pub fn recalculate_total(&mut self) {
        self.total_price = self.items.iter().map(OrderItem::subtotal).sum();
    }

    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(OrderError::NotPending(self.id));
        }
        self.items.push(item);
        self.recalculate_total();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: i64) -> Option<OrderItem> {
        let idx = self.items.iter().position(|it| it.id == item_id)?;
        let removed = self.items.remove(idx);
        self.recalculate_total();
        Some(removed)
    }

    /// Cancelling is terminal; cancelling twice is a no-op.
    pub fn cancel(&mut self) {
        self.status = OrderStatus::Cancelled;
    }
}
