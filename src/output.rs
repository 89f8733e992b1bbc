use crate::dashboard::{ChartData, ChartId, Dashboard, TabView, UNKNOWN_TAB_MESSAGE};
use crate::error::DashboardError;
use crate::util::format_number;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table};
use tracing::info;

pub const DASHBOARD_TITLE: &str = "Supermart Sales Dashboard";
pub const DASHBOARD_HINT: &str = "Use the tabs below to navigate between different analysis views.";

const BAR_WIDTH: usize = 30;

pub fn write_chart_csv(path: &Path, chart: &ChartData) -> Result<(), DashboardError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(chart.id.columns())?;
    for row in &chart.rows {
        let mut record = row.labels.clone();
        record.push(row.value.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DashboardError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write every chart as `<name>.csv` plus `kpis.json` into `dir`.
pub fn export_all(dir: &Path, dashboard: &Dashboard) -> Result<Vec<PathBuf>, DashboardError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(ChartId::ALL.len() + 1);
    for id in ChartId::ALL {
        let path = dir.join(format!("{}.csv", id.name()));
        write_chart_csv(&path, &dashboard.chart(id))?;
        written.push(path);
    }
    let kpi_path = dir.join("kpis.json");
    write_json(&kpi_path, dashboard.kpis())?;
    written.push(kpi_path);
    info!(dir = %dir.display(), files = written.len(), "exported dashboard data");
    Ok(written)
}

/// Proportional bar; negative values use a lighter block.
fn bar(value: f64, max_abs: f64) -> String {
    if max_abs <= 0.0 || !value.is_finite() {
        return String::new();
    }
    let width = ((value.abs() / max_abs) * BAR_WIDTH as f64).round() as usize;
    let block = if value < 0.0 { "░" } else { "█" };
    block.repeat(width.min(BAR_WIDTH))
}

/// Render one chart as a titled markdown table, at most `max_rows` rows.
pub fn render_chart(chart: &ChartData, max_rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {}\n", chart.id.title());
    if chart.rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    let max_abs = chart
        .rows
        .iter()
        .filter(|r| r.depth == 0)
        .map(|r| r.value.abs())
        .fold(0.0_f64, f64::max);

    let mut builder = Builder::default();
    let mut header: Vec<String> = chart.id.columns().iter().map(|c| c.to_string()).collect();
    header.push(String::new());
    builder.push_record(header);
    for row in chart.rows.iter().take(max_rows) {
        let mut record = row.labels.clone();
        if row.depth > 0 {
            // Leaves are indented under their category.
            if let Some(first) = record.first_mut() {
                first.clear();
            }
        }
        record.push(format_number(row.value, 2));
        record.push(bar(row.value, max_abs));
        builder.push_record(record);
    }
    let table = builder.build().with(Style::markdown()).to_string();
    let _ = writeln!(out, "{}", table);
    if chart.rows.len() > max_rows {
        let _ = writeln!(out, "({} more rows)", chart.rows.len() - max_rows);
    }
    out
}

pub fn render_header(dashboard: &Dashboard) -> String {
    let report = dashboard.load_report();
    format!(
        "# {}\n{}\n({} of {} rows loaded)\n",
        DASHBOARD_TITLE, DASHBOARD_HINT, report.retained_rows, report.total_rows
    )
}

/// Render a dispatched tab view for the terminal.
pub fn render_view(view: &TabView, max_rows: usize) -> String {
    match view {
        TabView::Unknown { requested } => {
            format!("{} ({})\n", UNKNOWN_TAB_MESSAGE, requested)
        }
        TabView::Panel {
            title,
            cards,
            charts,
        } => {
            let mut out = format!("## {}\n\n", title);
            if !cards.is_empty() {
                let table = Table::new(cards.iter().cloned()).with(Style::markdown()).to_string();
                let _ = writeln!(out, "{}\n", table);
            }
            for chart in charts {
                let _ = writeln!(out, "{}", render_chart(chart, max_rows));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{ChartRow, Tab};
    use crate::loader::LoadReport;
    use crate::types::SalesRecord;

    fn chart(rows: Vec<(&str, f64)>) -> ChartData {
        ChartData {
            id: ChartId::SalesByRegion,
            rows: rows
                .into_iter()
                .map(|(l, v)| ChartRow {
                    labels: vec![l.to_string()],
                    value: v,
                    depth: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn bars_scale_to_the_largest_value() {
        assert_eq!(bar(10.0, 10.0).chars().count(), BAR_WIDTH);
        assert_eq!(bar(5.0, 10.0).chars().count(), BAR_WIDTH / 2);
        assert!(bar(-5.0, 10.0).starts_with('░'));
        assert_eq!(bar(1.0, 0.0), "");
    }

    #[test]
    fn chart_table_has_title_and_rows() {
        let out = render_chart(&chart(vec![("South", 200.0), ("North", 1500.5)]), 10);
        assert!(out.starts_with("### Sales by Region"));
        assert!(out.contains("| Region"));
        assert!(out.contains("South"));
        assert!(out.contains("1,500.50"));
    }

    #[test]
    fn chart_preview_is_capped() {
        let out = render_chart(&chart(vec![("A", 3.0), ("B", 2.0), ("C", 1.0)]), 2);
        assert!(out.contains("(1 more rows)"));
        assert!(!out.contains("| C"));
    }

    #[test]
    fn empty_chart_renders_placeholder() {
        let out = render_chart(&chart(vec![]), 10);
        assert!(out.contains("(no rows)"));
    }

    #[test]
    fn unknown_view_shows_message() {
        let d = Dashboard::build(Vec::<SalesRecord>::new(), LoadReport::default());
        let view = crate::dashboard::dispatch(&d, &Tab::parse("nope"));
        assert_eq!(render_view(&view, 5), "Unknown tab selected. (nope)\n");
    }

    #[test]
    fn export_writes_every_chart_and_kpis() {
        let dir = tempfile::tempdir().unwrap();
        let d = Dashboard::build(Vec::<SalesRecord>::new(), LoadReport::default());
        let written = export_all(dir.path(), &d).unwrap();
        assert_eq!(written.len(), ChartId::ALL.len() + 1);
        let csv = std::fs::read_to_string(dir.path().join("sales_by_state.csv")).unwrap();
        assert_eq!(csv.trim(), "Region,State,Sales");
        let kpis: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("kpis.json")).unwrap())
                .unwrap();
        assert_eq!(kpis["total_orders"], 0);
        assert!(kpis["avg_discount"].is_null());
    }
}
