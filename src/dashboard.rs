//! The precomputed dashboard context and the tab dispatcher.
//!
//! Everything here is built once from the cleaned table and only read
//! afterwards; switching tabs never recomputes anything.

use crate::loader::LoadReport;
use crate::reports::{build_aggregates, build_kpis};
use crate::types::{Aggregates, GroupTotal, KpiCard, Kpis, SalesRecord};
use crate::util::{format_currency, format_int, format_percent};

/// Immutable state shared by the dispatcher and the renderers.
#[derive(Debug, Clone)]
pub struct Dashboard {
    records: Vec<SalesRecord>,
    load_report: LoadReport,
    kpis: Kpis,
    aggregates: Aggregates,
}

impl Dashboard {
    pub fn build(records: Vec<SalesRecord>, load_report: LoadReport) -> Self {
        let kpis = build_kpis(&records);
        let aggregates = build_aggregates(&records);
        Dashboard {
            records,
            load_report,
            kpis,
            aggregates,
        }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn kpis(&self) -> &Kpis {
        &self.kpis
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Card text for one KPI, formatted the way the dashboard shows it.
    pub fn card(&self, kpi: Kpi) -> KpiCard {
        let k = &self.kpis;
        let value = match kpi {
            Kpi::TotalSales => format_currency(k.total_sales),
            Kpi::TotalProfit => format_currency(k.total_profit),
            Kpi::TotalOrders => format_int(k.total_orders),
            Kpi::TotalCustomers => format_int(k.total_customers),
            Kpi::AvgDiscount => k
                .avg_discount
                .map(format_percent)
                .unwrap_or_else(|| "n/a".to_string()),
        };
        KpiCard {
            title: kpi.title().to_string(),
            value,
        }
    }

    /// Flatten one chart's aggregate into labelled rows.
    pub fn chart(&self, id: ChartId) -> ChartData {
        let a = &self.aggregates;
        let rows = match id {
            ChartId::MonthlySales => flat_rows(&a.monthly_sales),
            ChartId::SalesByRegion => flat_rows(&a.sales_by_region),
            ChartId::ProfitByRegion => flat_rows(&a.profit_by_region),
            ChartId::SalesByState => a
                .sales_by_state
                .iter()
                .map(|s| ChartRow {
                    labels: vec![s.region.clone(), s.state.to_string()],
                    value: s.sales,
                    depth: 0,
                })
                .collect(),
            ChartId::SalesByCategory => flat_rows(&a.sales_by_category),
            ChartId::SalesTreemap => a
                .sales_treemap
                .iter()
                .flat_map(|node| {
                    let parent = ChartRow {
                        labels: vec![node.category.to_string(), String::new()],
                        value: node.sales,
                        depth: 0,
                    };
                    let leaves = node.children.iter().map(|leaf| ChartRow {
                        labels: vec![node.category.to_string(), leaf.key.to_string()],
                        value: leaf.value,
                        depth: 1,
                    });
                    std::iter::once(parent).chain(leaves)
                })
                .collect(),
            ChartId::SalesByCustomer => flat_rows(&a.sales_by_customer),
            ChartId::SalesByCity => flat_rows(&a.sales_by_city),
        };
        ChartData { id, rows }
    }
}

fn flat_rows(totals: &[GroupTotal]) -> Vec<ChartRow> {
    totals
        .iter()
        .map(|g| ChartRow {
            labels: vec![g.key.to_string()],
            value: g.value,
            depth: 0,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kpi {
    TotalSales,
    TotalProfit,
    TotalOrders,
    TotalCustomers,
    AvgDiscount,
}

impl Kpi {
    pub fn title(self) -> &'static str {
        match self {
            Kpi::TotalSales => "Total Sales",
            Kpi::TotalProfit => "Total Profit",
            Kpi::TotalOrders => "Total Orders",
            Kpi::TotalCustomers => "Unique Customers",
            Kpi::AvgDiscount => "Average Discount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartId {
    MonthlySales,
    SalesByRegion,
    ProfitByRegion,
    SalesByState,
    SalesByCategory,
    SalesTreemap,
    SalesByCustomer,
    SalesByCity,
}

impl ChartId {
    pub const ALL: [ChartId; 8] = [
        ChartId::MonthlySales,
        ChartId::SalesByRegion,
        ChartId::ProfitByRegion,
        ChartId::SalesByState,
        ChartId::SalesByCategory,
        ChartId::SalesTreemap,
        ChartId::SalesByCustomer,
        ChartId::SalesByCity,
    ];

    /// Stable identifier, also used as the export file stem.
    pub fn name(self) -> &'static str {
        match self {
            ChartId::MonthlySales => "monthly_sales",
            ChartId::SalesByRegion => "sales_by_region",
            ChartId::ProfitByRegion => "profit_by_region",
            ChartId::SalesByState => "sales_by_state",
            ChartId::SalesByCategory => "sales_by_category",
            ChartId::SalesTreemap => "sales_treemap",
            ChartId::SalesByCustomer => "sales_by_customer",
            ChartId::SalesByCity => "sales_by_city",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartId::MonthlySales => "Monthly Sales Trend",
            ChartId::SalesByRegion => "Sales by Region",
            ChartId::ProfitByRegion => "Profit by Region",
            ChartId::SalesByState => "Top 15 States by Sales",
            ChartId::SalesByCategory => "Sales by Category",
            ChartId::SalesTreemap => "Sales Distribution by Category & Sub Category",
            ChartId::SalesByCustomer => "Top 10 Customers by Sales",
            ChartId::SalesByCity => "Top 10 Cities by Sales",
        }
    }

    /// Column headers: the label columns followed by the metric column.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ChartId::MonthlySales => &["YearMonth", "Sales"],
            ChartId::SalesByRegion => &["Region", "Sales"],
            ChartId::ProfitByRegion => &["Region", "Profit"],
            ChartId::SalesByState => &["Region", "State", "Sales"],
            ChartId::SalesByCategory => &["Category", "Sales"],
            ChartId::SalesTreemap => &["Category", "Sub Category", "Sales"],
            ChartId::SalesByCustomer => &["Customer Name", "Sales"],
            ChartId::SalesByCity => &["City", "Sales"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub labels: Vec<String>,
    pub value: f64,
    /// 0 for top-level rows, 1 for treemap leaves.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub id: ChartId,
    pub rows: Vec<ChartRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Region,
    Category,
    CustomerCity,
    Unknown(String),
}

impl Tab {
    pub const KNOWN: [Tab; 4] = [Tab::Overview, Tab::Region, Tab::Category, Tab::CustomerCity];

    /// Accepts `overview`, `region`, `category`, `customer_city`, with or
    /// without a `tab-` prefix, `-` or `_` separators, any case.
    pub fn parse(id: &str) -> Tab {
        let norm = id.trim().to_ascii_lowercase().replace('-', "_");
        let norm = norm.strip_prefix("tab_").unwrap_or(&norm);
        match norm {
            "overview" => Tab::Overview,
            "region" => Tab::Region,
            "category" => Tab::Category,
            "customer_city" => Tab::CustomerCity,
            _ => Tab::Unknown(id.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Tab::Overview => "overview",
            Tab::Region => "region",
            Tab::Category => "category",
            Tab::CustomerCity => "customer_city",
            Tab::Unknown(id) => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Region => "Region Analysis",
            Tab::Category => "Category & Sub-Category",
            Tab::CustomerCity => "Customer & City",
            Tab::Unknown(_) => "Unknown",
        }
    }
}

/// What a tab shows, resolved against the precomputed context.
#[derive(Debug, Clone, PartialEq)]
pub enum TabView {
    Panel {
        title: &'static str,
        cards: Vec<KpiCard>,
        charts: Vec<ChartData>,
    },
    Unknown {
        requested: String,
    },
}

pub const UNKNOWN_TAB_MESSAGE: &str = "Unknown tab selected.";

/// Fixed assignment of cards and charts to each known tab.
pub fn layout(tab: &Tab) -> Option<(&'static [Kpi], &'static [ChartId])> {
    match tab {
        Tab::Overview => Some((
            &[Kpi::TotalSales, Kpi::TotalProfit, Kpi::TotalOrders, Kpi::AvgDiscount],
            &[ChartId::MonthlySales, ChartId::SalesByCategory],
        )),
        Tab::Region => Some((
            &[],
            &[ChartId::SalesByRegion, ChartId::ProfitByRegion, ChartId::SalesByState],
        )),
        Tab::Category => Some((&[], &[ChartId::SalesByCategory, ChartId::SalesTreemap])),
        Tab::CustomerCity => Some((&[], &[ChartId::SalesByCustomer, ChartId::SalesByCity])),
        Tab::Unknown(_) => None,
    }
}

/// Map a tab to its cards and charts. Unrecognized tabs get a placeholder.
pub fn dispatch(dashboard: &Dashboard, tab: &Tab) -> TabView {
    match layout(tab) {
        Some((kpis, charts)) => TabView::Panel {
            title: tab.label(),
            cards: kpis.iter().map(|k| dashboard.card(*k)).collect(),
            charts: charts.iter().map(|c| dashboard.chart(*c)).collect(),
        },
        None => TabView::Unknown {
            requested: tab.id().to_string(),
        },
    }
}
