// Entry point and high-level CLI flow.
//
// The table is loaded and aggregated exactly once. After that the binary
// either renders the tab given on the command line, or runs a small menu
// loop where the user picks tabs until they quit.
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use supermart_dashboard::{dispatch, loader, output, util, Dashboard, Tab};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATA_FILE: &str = "Supermart Grocery Sales - Retail Analytics Dataset.csv";

#[derive(Parser, Debug)]
#[command(name = "supermart-dashboard", about = "Sales and profit dashboard for the Supermart dataset.")]
struct Args {
    /// Sales table to load (.csv, .tsv, .xlsx, .xls, .xlsb, .ods).
    #[arg(long, env = "SUPERMART_DATA", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Render one tab (overview, region, category, customer_city) and exit.
    #[arg(long)]
    tab: Option<String>,

    /// Also write every chart as CSV plus kpis.json into this directory.
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Maximum rows printed per chart.
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,
}

fn init_tracing() {
    // Logs go to stderr so stdout carries only the dashboard.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Read a single trimmed line after the "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Menu entries are numbered from 1; anything else is treated as a tab id.
fn tab_from_choice(choice: &str) -> Tab {
    match choice.parse::<usize>() {
        Ok(n) if (1..=Tab::KNOWN.len()).contains(&n) => Tab::KNOWN[n - 1].clone(),
        _ => Tab::parse(choice),
    }
}

fn run_menu(dashboard: &Dashboard, preview_rows: usize) {
    loop {
        println!("Select Tab:");
        for (i, tab) in Tab::KNOWN.iter().enumerate() {
            println!("[{}] {}", i + 1, tab.label());
        }
        println!("[q] Quit\n");
        let Some(choice) = read_choice() else {
            break;
        };
        if choice.eq_ignore_ascii_case("q") {
            println!("Exiting the program.");
            break;
        }
        let view = dispatch(dashboard, &tab_from_choice(&choice));
        println!("\n{}", output::render_view(&view, preview_rows));
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let (records, load_report) = loader::load_and_clean(&args.data)
        .with_context(|| format!("failed to load {}", args.data.display()))?;
    info!(
        "Processing dataset... ({} rows loaded, {} kept)",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.retained_rows)
    );
    let dashboard = Dashboard::build(records, load_report);

    if let Some(dir) = &args.export_dir {
        output::export_all(dir, &dashboard)
            .with_context(|| format!("failed to export to {}", dir.display()))?;
    }

    println!("{}", output::render_header(&dashboard));
    match &args.tab {
        Some(id) => {
            let view = dispatch(&dashboard, &Tab::parse(id));
            println!("{}", output::render_view(&view, args.preview_rows));
        }
        None => run_menu(&dashboard, args.preview_rows),
    }
    Ok(())
}
