/*
[INPUT]:  Ripple Prime API value sets
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - shared enumerations
[UPDATE]: When the API adds order types, sides, or event topics
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Event topics published on the account event stream
pub const EVENT_TOPICS: [&str; 12] = [
    "balance.update",
    "trade.executed",
    "order.filled",
    "order.cancelled",
    "order.rejected",
    "position.update",
    "margin.call",
    "risk.alert",
    "settlement.complete",
    "settlement.failed",
    "transfer.complete",
    "transfer.failed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
    Fok,
    Ioc,
    Gtc,
    Gtd,
    Twap,
    Vwap,
    Iceberg,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
            OrderType::TrailingStop => "trailing_stop",
            OrderType::Fok => "fok",
            OrderType::Ioc => "ioc",
            OrderType::Gtc => "gtc",
            OrderType::Gtd => "gtd",
            OrderType::Twap => "twap",
            OrderType::Vwap => "vwap",
            OrderType::Iceberg => "iceberg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "partially_filled")]
    PartiallyFilled,
    #[serde(rename = "filled")]
    Filled,
    #[serde(rename = "cancelled", alias = "canceled")]
    Cancelled,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "expired")]
    Expired,
}

impl OrderStatus {
    /// No further fills can arrive
    pub fn is_final(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}
