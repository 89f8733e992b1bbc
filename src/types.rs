use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

/// One source row as it comes off the sheet. Every cell is optional text;
/// typing happens in the loader so a bad cell never aborts the load.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Order ID")]
    pub order_id: Option<String>,
    #[serde(rename = "Customer Name")]
    pub customer_name: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Sub Category")]
    pub sub_category: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Order Date")]
    pub order_date: Option<String>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Sales")]
    pub sales: Option<String>,
    #[serde(rename = "Discount")]
    pub discount: Option<String>,
    #[serde(rename = "Profit")]
    pub profit: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
}

/// A cleaned sales line item. `sales`, `profit` and `region` are guaranteed
/// present; everything else may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub order_id: Option<String>,
    pub customer_name: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub city: Option<String>,
    pub region: String,
    pub state: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month_name: Option<String>,
    /// Zero-padded `YYYY-MM`, so string order is chronological order.
    pub year_month: Option<String>,
    pub sales: f64,
    pub profit: f64,
    pub discount: Option<f64>,
}

/// Grouping key with an explicit bucket for records whose key is missing.
///
/// The derived ordering puts `Missing` after every `Value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Value(String),
    Missing,
}

impl GroupKey {
    pub fn value(s: impl Into<String>) -> Self {
        GroupKey::Value(s.into())
    }
}

impl From<Option<&str>> for GroupKey {
    fn from(v: Option<&str>) -> Self {
        match v {
            Some(s) => GroupKey::Value(s.to_string()),
            None => GroupKey::Missing,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Value(s) => f.write_str(s),
            GroupKey::Missing => f.write_str("(missing)"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One (key, summed metric) pair of a flat aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: GroupKey,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTotal {
    pub region: String,
    pub state: GroupKey,
    pub sales: f64,
}

/// Category level of the treemap; `sales` is the sum of its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapNode {
    pub category: GroupKey,
    pub sales: f64,
    pub children: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_sales: f64,
    pub total_profit: f64,
    pub total_orders: usize,
    pub total_customers: usize,
    pub avg_discount: Option<f64>,
}

/// Every grouped result the dashboard draws a chart from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub monthly_sales: Vec<GroupTotal>,
    pub sales_by_region: Vec<GroupTotal>,
    pub profit_by_region: Vec<GroupTotal>,
    pub sales_by_state: Vec<StateTotal>,
    pub sales_by_category: Vec<GroupTotal>,
    pub sales_treemap: Vec<TreemapNode>,
    pub sales_by_customer: Vec<GroupTotal>,
    pub sales_by_city: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct KpiCard {
    #[tabled(rename = "Metric")]
    pub title: String,
    #[tabled(rename = "Value")]
    pub value: String,
}
