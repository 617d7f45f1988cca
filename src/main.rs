// Entry point and high-level CLI flow.
//
// With `--view` the selected report is printed once (and exported when an
// output directory is configured). Without it, a menu mirrors the dashboard
// navigation and the loaded dataset is reused until the user reloads it.
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use lead_report::cache::DatasetCache;
use lead_report::filter::{self, FilterConfig, Selection};
use lead_report::loader::{self, LoadedDataset};
use lead_report::output;
use lead_report::reports::{self, StatusField};
use lead_report::types::{GroupKey, LeadRecord, SummaryStats};
use lead_report::util::format_int;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_EXPORT_DIR: &str = "reports";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Overview,
    PerSource,
    Cancellations,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListField {
    Dealers,
    Brands,
}

impl ListField {
    fn key(self) -> GroupKey {
        match self {
            ListField::Dealers => GroupKey::Dealer,
            ListField::Brands => GroupKey::InterestMake,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lead_report")]
#[command(about = "Lead status, source and cancellation reports from a lead export")]
struct Args {
    /// Lead export to read
    #[arg(short, long, env = "LEAD_REPORT_DATA", default_value = "leads.csv")]
    data: PathBuf,

    /// First day of the report (YYYY-MM-DD); defaults to the earliest lead
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the report (YYYY-MM-DD); defaults to the latest lead
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Dealer to include; repeat for several, or pass `all`
    #[arg(long = "dealer")]
    dealers: Vec<String>,

    /// Brand to include; repeat for several, or pass `all`
    #[arg(long = "brand")]
    brands: Vec<String>,

    /// Print one report and exit instead of showing the menu
    #[arg(long, value_enum)]
    view: Option<View>,

    /// Print the values `--dealer` or `--brand` accept and exit
    #[arg(long, value_enum)]
    list: Option<ListField>,

    /// Number of reasons in the top-reasons tables
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Directory for CSV and JSON exports
    #[arg(short, long, env = "LEAD_REPORT_OUT")]
    out_dir: Option<PathBuf>,
}

struct App {
    args: Args,
    cache: DatasetCache,
}

impl App {
    fn cache_key(&self) -> String {
        self.args.data.display().to_string()
    }

    fn dataset(&mut self) -> Result<Arc<LoadedDataset>> {
        let key = self.cache_key();
        let fresh = self.cache.get(&key).is_none();
        let path = self.args.data.clone();
        let loaded = self
            .cache
            .get_or_load(&key, || loader::load_and_clean(&path))
            .with_context(|| format!("failed to load {}", path.display()))?;
        if fresh {
            let report = &loaded.report;
            println!(
                "Processing dataset... ({} rows read, {} leads loaded)",
                format_int(report.total_rows),
                format_int(report.loaded_rows)
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse/validation errors.",
                    format_int(report.parse_errors)
                );
            }
            println!();
        }
        Ok(loaded)
    }

    /// Build the filter from the command line, clamped to the dataset's
    /// date range, and apply it.
    fn selection(&mut self) -> Result<(FilterConfig, Vec<LeadRecord>)> {
        let data = self.dataset()?;
        let Some(bounds) = filter::date_bounds(&data.records) else {
            bail!("no leads loaded from {}", self.args.data.display());
        };
        let config = FilterConfig::new(
            self.args.start.unwrap_or(bounds.0),
            self.args.end.unwrap_or(bounds.1),
        )
        .clamped_to(bounds)
        .with_dealers(Selection::from_values(self.args.dealers.clone()))
        .with_brands(Selection::from_values(self.args.brands.clone()));
        let selected = filter::filter(&data.records, &config)?;
        info!(
            start = %config.start,
            end = %config.end,
            leads = selected.len(),
            "selection applied"
        );
        Ok((config, selected))
    }

    fn show(&mut self, view: View) -> Result<()> {
        let (config, data) = self.selection()?;
        println!("Leads {} - {}\n", config.start, config.end);
        print_metrics(&data);
        match view {
            View::Overview => show_overview(&data),
            View::PerSource => show_per_source(&data)?,
            View::Cancellations => show_cancellations(&data, self.args.top),
            View::All => {
                show_overview(&data);
                show_per_source(&data)?;
                show_cancellations(&data, self.args.top);
            }
        }
        Ok(())
    }

    fn list(&mut self, field: ListField) -> Result<()> {
        let data = self.dataset()?;
        println!("{}", filter::ALL_SENTINEL);
        for option in filter::available_options(&data.records, field.key()) {
            println!("{}", option);
        }
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        let dir = self
            .args
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        let (config, data) = self.selection()?;

        let summary = SummaryStats {
            start_date: config.start.to_string(),
            end_date: config.end.to_string(),
            metrics: reports::lead_metrics(&data),
            per_source: reports::leads_per_source(&data)?,
            per_brand_source: reports::leads_per_source_per_brand(&data)?,
            cancelled_reasons: reports::cancellation_reasons(&data, "Cancelled"),
            lost_reasons: reports::cancellation_reasons(&data, "Lost"),
        };
        output::write_pivot_csv(dir.join("leads_per_source.csv"), &summary.per_source)?;
        output::write_pivot_csv(dir.join("leads_per_brand_source.csv"), &summary.per_brand_source)?;
        output::write_csv(dir.join("cancelled_reasons.csv"), &summary.cancelled_reasons)?;
        output::write_csv(dir.join("lost_reasons.csv"), &summary.lost_reasons)?;
        output::write_csv(
            dir.join("status_check.csv"),
            &reports::status_breakdown(&data, StatusField::StatusCheck),
        )?;
        output::write_json(dir.join("summary.json"), &summary)?;
        println!("Reports exported to {}\n", dir.display());
        Ok(())
    }
}

fn print_metrics(data: &[LeadRecord]) {
    let m = reports::lead_metrics(data);
    println!(
        "Total Leads: {} | Active Leads: {} | Lost Leads: {} | Sold Leads: {}\n",
        format_int(m.total_leads),
        format_int(m.active_leads),
        format_int(m.lost_leads),
        format_int(m.sold_leads)
    );
}

fn show_overview(data: &[LeadRecord]) {
    println!("Lead Overview\n");
    println!("Leads Per Category");
    let categories = reports::status_breakdown(data, StatusField::StatusCheck);
    output::preview_table_rows(&categories, categories.len());
    println!("Leads Per Status");
    let statuses = reports::status_breakdown(data, StatusField::LeadStatus);
    output::preview_table_rows(&statuses, statuses.len());
}

fn show_per_source(data: &[LeadRecord]) -> Result<()> {
    println!("Lead Overview Per Lead Source");
    println!("{}\n", output::pivot_table(&reports::leads_per_source(data)?));
    println!("Lead Overview Per Brand and Lead Source");
    println!("{}\n", output::pivot_table(&reports::leads_per_source_per_brand(data)?));
    Ok(())
}

fn show_cancellations(data: &[LeadRecord], top: usize) {
    for status in ["Cancelled", "Lost"] {
        println!("{} Reasons", status);
        let reasons = reports::cancellation_reasons(data, status);
        output::preview_table_rows(&reasons, reasons.len());
        println!("Top {} reasons {}", top, status);
        output::preview_table_rows(&reports::top_reasons(data, status, top), top);
    }
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn run_menu(app: &mut App) -> Result<()> {
    loop {
        println!("Report Navigation:");
        println!("[1] Lead Overview");
        println!("[2] Leads Per Source");
        println!("[3] Lost or Cancelled Leads");
        println!("[4] Reload the file");
        println!("[5] Export reports");
        println!("[0] Exit\n");
        let outcome = match read_choice().as_str() {
            "1" => app.show(View::Overview),
            "2" => app.show(View::PerSource),
            "3" => app.show(View::Cancellations),
            "4" => {
                let key = app.cache_key();
                app.cache.invalidate(&key);
                app.dataset().map(|_| ())
            }
            "5" => app.export(),
            "0" | "" => {
                println!("Exiting the program.");
                return Ok(());
            }
            _ => {
                println!("Invalid choice. Please enter 0-5.\n");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("{:#}", e);
            eprintln!("Error: {:#}\n", e);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lead_report=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let view = args.view;
    let list = args.list;
    let mut app = App { args, cache: DatasetCache::new() };

    if let Some(field) = list {
        return app.list(field);
    }
    match view {
        Some(view) => {
            app.show(view)?;
            if app.args.out_dir.is_some() {
                app.export()?;
            }
            Ok(())
        }
        None => run_menu(&mut app),
    }
}
