// src/main.rs - Command-line driver for the SmartAsset client core
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartasset_client::api::HttpApiClient;
use smartasset_client::auth::{self, ChangePasswordRequest, FileSlot, LoginRequest, SessionStore};
use smartasset_client::config::{load_config, ClientConfig};
use smartasset_client::error::ClientResult;
use smartasset_client::filters::{FilterState, FilteredTable};
use smartasset_client::models::{AssetRow, MonthlyCost};
use smartasset_client::pagination::Paginator;
use smartasset_client::rbac::capabilities;
use smartasset_client::reports::{level_monthly_cost, ChartSeries, ChartSurface, Downloader};
use smartasset_client::scanner::resolve;
use smartasset_client::views::{AssetView, ExportKind, ReportView, ScanView};
use smartasset_client::{ClientError, UserRole};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  \
         {program} resolve <text>                    resolve scan text to an asset id\n  \
         {program} level <json-file>                 gap-fill a monthly-cost JSON array\n  \
         {program} filter <json-file> [--text T] [--category C] [--location L]\n  \
         {program} caps <ROLE>                       show capabilities of ADMIN, MANAGER or TECH\n  \
         {program} login <email> <password>          sign in and store the session\n  \
         {program} change-password <new-password>    complete the first-login password change\n  \
         {program} whoami                            show the stored session\n  \
         {program} logout                            clear the stored session\n  \
         {program} assets [--text T] [--category C] [--location L]\n  \
         {program} scan <text>                       resolve and fetch the scanned asset\n  \
         {program} report                            monthly cost chart and expiring warranties\n  \
         {program} dashboard                         asset and log totals with cost per month\n  \
         {program} export <assets|logs>              download a CSV export\n\n\
         Configuration: CONFIG_FILE (TOML), ENV_FILE, SMARTASSET_API_URL, SMARTASSET_API_TIMEOUT_SECS,\n\
         SMARTASSET_SESSION_DIR, SMARTASSET_PAGE_SIZE, RUST_LOG"
    );
}

fn setup_logging(config: &ClientConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let level = config.logging.level.as_str();
            tracing_subscriber::EnvFilter::new(level)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

// ==================== TERMINAL COLLABORATORS ====================

/// Renders a chart as horizontal bars on stdout.
struct TextChart {
    title: String,
}

impl ChartSurface for TextChart {
    fn render(&mut self, series: &ChartSeries) {
        println!("{}", self.title);
        let max = series.values.iter().cloned().fold(0.0_f64, f64::max);
        for (label, value) in series.labels.iter().zip(&series.values) {
            let width = if max > 0.0 { ((value / max) * 40.0).round() as usize } else { 0 };
            println!("  {:<7} {:>10.2} {}", label, value, "#".repeat(width));
        }
    }
}

/// Saves downloads into a directory.
struct DirDownloader {
    dir: PathBuf,
}

#[async_trait]
impl Downloader for DirDownloader {
    async fn save(&self, bytes: Vec<u8>, filename: &str) -> ClientResult<()> {
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

// ==================== ARGUMENTS ====================

fn filter_flags(args: &[String]) -> Result<FilterState> {
    let mut state = FilterState::new();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("missing value for {}", flag))?;
        state = match flag.as_str() {
            "--text" => state.with_text(value.as_str()),
            "--category" => state.with_category(value.as_str()),
            "--location" => state.with_location(value.as_str()),
            other => return Err(anyhow!("unknown flag: {}", other)),
        };
    }
    Ok(state)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_assets(table: &FilteredTable<AssetRow>) {
    let info = table.page_info();
    for row in table.page() {
        println!(
            "{:>5}  {:<28} {:<14} {:<14} {}",
            row.id,
            row.name.as_deref().unwrap_or("-"),
            row.category.as_deref().unwrap_or("-"),
            row.location.as_deref().unwrap_or("-"),
            row.purchase_date.as_deref().unwrap_or(""),
        );
    }
    println!(
        "page {}/{} ({} of {} rows match)",
        info.page,
        info.total_pages.max(1),
        info.total,
        table.rows().len()
    );
    let options = table.options();
    println!("categories: {}", options.categories.join(", "));
    println!("locations: {}", options.locations.join(", "));
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument: {}", name))
}

/// Surfaces the notice and, for expired sessions, clears the stored session.
fn report_error(store: &mut SessionStore<FileSlot>, err: ClientError) -> anyhow::Error {
    if err.redirect().is_some() {
        store.logout();
        return anyhow!("{} Run `login` again.", err.notice());
    }
    anyhow!(err.notice())
}

// ==================== MAIN ====================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("smartasset").to_string();
    let Some(command) = args.get(1).cloned() else {
        print_usage(&program);
        return Ok(());
    };
    let rest = &args[2..];

    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;
    setup_logging(&config)?;
    config.print_startup_info();

    let mut store = SessionStore::new(FileSlot::new(&config.session.storage_dir, &config.session.storage_key));
    let api = HttpApiClient::new(&config.api)
        .map_err(|e| anyhow!(e.notice()))?
        .with_token(store.token());

    match command.as_str() {
        "resolve" => {
            let text = arg(rest, 0, "text")?;
            match resolve(text) {
                Ok(id) => println!("{}", id),
                Err(e) => return Err(anyhow!(e.notice())),
            }
        }
        "level" => {
            let rows: Vec<MonthlyCost> = read_json(Path::new(arg(rest, 0, "json-file")?))?;
            let series = level_monthly_cost(&rows);
            println!("{}", serde_json::to_string_pretty(&series.to_chart())?);
        }
        "filter" => {
            let rows: Vec<AssetRow> = read_json(Path::new(arg(rest, 0, "json-file")?))?;
            let mut table = FilteredTable::new(Paginator::new(config.reports.page_size));
            table.set_rows(rows);
            table.set_state(filter_flags(&rest[1..])?);
            print_assets(&table);
        }
        "caps" => {
            let role = UserRole::from_str(arg(rest, 0, "ROLE")?)
                .map_err(|_| anyhow!("unknown role; expected ADMIN, MANAGER or TECH"))?;
            println!("{} - {}", role.display_name(), role.description());
            println!("{}", serde_json::to_string_pretty(&capabilities(role))?);
        }
        "login" => {
            let request = LoginRequest::new(arg(rest, 0, "email")?, arg(rest, 1, "password")?);
            let route = auth::sign_in(&api, &mut store, &request)
                .await
                .map_err(|e| anyhow!(e.notice()))?;
            println!("Signed in as {} ({})", store.display_name(), store.role().map(|r| r.to_string()).unwrap_or_default());
            println!("next: {}", route.path());
        }
        "change-password" => {
            let request = ChangePasswordRequest {
                new_password: arg(rest, 0, "new-password")?.to_string(),
            };
            let route = auth::change_password(&api, &mut store, &request)
                .await
                .map_err(|e| report_error(&mut store, e))?;
            println!("Password changed. next: {}", route.path());
        }
        "whoami" => match store.load() {
            Some(payload) if payload.has_token() => {
                println!("{} <{}> [{}] {}", payload.name, payload.email, payload.role, payload.initials());
                println!("next: {}", store.landing_route().path());
                println!("{}", serde_json::to_string_pretty(&store.capabilities())?);
            }
            _ => println!("Not signed in."),
        },
        "logout" => {
            let route = store.logout();
            println!("Signed out. next: {}", route.path());
        }
        "assets" => {
            let mut view = AssetView::new(store.capabilities(), config.reports.page_size);
            view.refresh(&api).await.map_err(|e| report_error(&mut store, e))?;
            view.table_mut().set_state(filter_flags(rest)?);
            print_assets(view.table());
        }
        "scan" => {
            let mut view = ScanView::new();
            let found = view
                .scan_text(&api, arg(rest, 0, "text")?)
                .await
                .map_err(|e| report_error(&mut store, e))?
                .cloned();
            match (found, view.error()) {
                (Some(asset), _) => println!("{}", serde_json::to_string_pretty(&asset)?),
                (None, Some(msg)) => return Err(anyhow!(msg.to_string())),
                (None, None) => println!("Nothing to look up."),
            }
        }
        "report" => {
            let mut view = ReportView::new(config.reports.chart_label.clone(), config.warranty_window());
            let mut chart = TextChart { title: config.reports.chart_label.clone() };
            view.refresh_costs(&api, &mut chart)
                .await
                .map_err(|e| report_error(&mut store, e))?;
            println!("total: {:.2}", view.series().total());

            let window = view.window();
            view.refresh_warranty(&api, window)
                .await
                .map_err(|e| report_error(&mut store, e))?;
            println!("\nWarranties expiring within {} days", window.days());
            let today = Local::now().date_naive();
            for asset in view.expiring() {
                let days = asset
                    .days_remaining(today)
                    .map(|d| format!("{}d", d))
                    .unwrap_or_default();
                println!("  {:>5}  {:<28} {} {}", asset.id, asset.name, asset.warranty_end, days);
            }
        }
        "dashboard" => {
            let mut view = ReportView::new(config.reports.chart_label.clone(), config.warranty_window());
            let mut chart = TextChart { title: config.reports.chart_label.clone() };
            view.refresh_summary(&api, &mut chart)
                .await
                .map_err(|e| report_error(&mut store, e))?;
            if let Some(summary) = view.summary() {
                println!(
                    "assets: {}  logs: {}  overdue: {}",
                    summary.total_assets, summary.total_logs, summary.overdue_logs
                );
            }
        }
        "export" => {
            let kind = match arg(rest, 0, "assets|logs")? {
                "assets" => ExportKind::Assets,
                "logs" => ExportKind::Logs,
                other => return Err(anyhow!("unknown export: {}", other)),
            };
            let downloader = DirDownloader { dir: env::current_dir()? };
            let mut view = ReportView::new(config.reports.chart_label.clone(), config.warranty_window());
            let file = view
                .export(&api, &downloader, kind, Local::now().date_naive())
                .await
                .map_err(|e| report_error(&mut store, e))?;
            println!("Saved {}", file);
        }
        "help" | "-h" | "--help" => print_usage(&program),
        other => {
            print_usage(&program);
            return Err(anyhow!("unknown command: {}", other));
        }
    }

    Ok(())
}
