//! Status enums for orders and contact submissions.
//!
//! Values mirror what the catalog backend stores and serializes, so these
//! deserialize directly from its JSON responses.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created as `Pending` by the backend and move forward from
/// there; the storefront only ever reads this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Human-readable label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the order has reached a terminal state.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Subject categories accepted by the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactSubject {
    #[default]
    General,
    Order,
    Product,
    Feedback,
    Other,
}

impl ContactSubject {
    /// All subjects, in the order the form presents them.
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Order,
        Self::Product,
        Self::Feedback,
        Self::Other,
    ];

    /// Human-readable label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::General => "General Inquiry",
            Self::Order => "Order Issue",
            Self::Product => "Product Information",
            Self::Feedback => "Feedback",
            Self::Other => "Other",
        }
    }

    /// Wire value sent to the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Order => "order",
            Self::Product => "product",
            Self::Feedback => "feedback",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ContactSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContactSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "order" => Ok(Self::Order),
            "product" => Ok(Self::Product),
            "feedback" => Ok(Self::Feedback),
            "other" => Ok(Self::Other),
            _ => Err(format!("invalid contact subject: {s}")),
        }
    }
}
