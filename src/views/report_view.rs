// src/views/report_view.rs
//! Reports: monthly cost chart, warranty-expiring list, CSV exports

use chrono::NaiveDate;
use tracing::info;

use crate::api::ReportsApi;
use crate::error::ClientResult;
use crate::models::{DashboardSummary, ExpiringAsset, MonthlyCost};
use crate::reports::{export_filename, level_monthly_cost, ChartSurface, DenseSeries, Downloader, WarrantyWindow};
use crate::sequencer::{RequestSequencer, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Assets,
    Logs,
}

impl ExportKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ExportKind::Assets => "assets",
            ExportKind::Logs => "maintenance_logs",
        }
    }
}

pub struct ReportView {
    chart_label: String,
    series: DenseSeries,
    window: WarrantyWindow,
    expiring: Vec<ExpiringAsset>,
    summary: Option<DashboardSummary>,
    cost_seq: RequestSequencer,
    warranty_seq: RequestSequencer,
    summary_seq: RequestSequencer,
    notice: Option<String>,
}

impl ReportView {
    pub fn new(chart_label: impl Into<String>, window: WarrantyWindow) -> Self {
        Self {
            chart_label: chart_label.into(),
            series: DenseSeries::default(),
            window,
            expiring: Vec::new(),
            summary: None,
            cost_seq: RequestSequencer::new(),
            warranty_seq: RequestSequencer::new(),
            summary_seq: RequestSequencer::new(),
            notice: None,
        }
    }

    pub fn chart_label(&self) -> &str {
        &self.chart_label
    }

    pub fn series(&self) -> &DenseSeries {
        &self.series
    }

    pub fn window(&self) -> WarrantyWindow {
        self.window
    }

    pub fn expiring(&self) -> &[ExpiringAsset] {
        &self.expiring
    }

    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ==================== MONTHLY COST ====================

    pub fn begin_costs(&mut self) -> Ticket {
        self.cost_seq.issue()
    }

    /// Levels the response and hands it to `surface` when it is still current.
    pub fn complete_costs<C: ChartSurface + ?Sized>(
        &mut self,
        ticket: Ticket,
        result: ClientResult<Vec<MonthlyCost>>,
        surface: &mut C,
    ) -> ClientResult<bool> {
        if !self.cost_seq.accept(ticket) {
            return Ok(false);
        }
        let rows = self.note_err(result)?;
        self.series = level_monthly_cost(&rows);
        surface.render(&self.series.to_chart());
        Ok(true)
    }

    pub async fn refresh_costs<R, C>(&mut self, api: &R, surface: &mut C) -> ClientResult<()>
    where
        R: ReportsApi + ?Sized,
        C: ChartSurface + ?Sized,
    {
        let ticket = self.begin_costs();
        let result = api.monthly_cost().await;
        self.complete_costs(ticket, result, surface).map(|_| ())
    }

    // ==================== DASHBOARD ====================

    pub fn begin_summary(&mut self) -> Ticket {
        self.summary_seq.issue()
    }

    /// Keeps the totals and renders the per-month cost chart when still current.
    pub fn complete_summary<C: ChartSurface + ?Sized>(
        &mut self,
        ticket: Ticket,
        result: ClientResult<DashboardSummary>,
        surface: &mut C,
    ) -> ClientResult<bool> {
        if !self.summary_seq.accept(ticket) {
            return Ok(false);
        }
        let summary = self.note_err(result)?;
        surface.render(&summary.cost_chart());
        self.summary = Some(summary);
        Ok(true)
    }

    pub async fn refresh_summary<R, C>(&mut self, api: &R, surface: &mut C) -> ClientResult<()>
    where
        R: ReportsApi + ?Sized,
        C: ChartSurface + ?Sized,
    {
        let ticket = self.begin_summary();
        let result = api.dashboard_summary().await;
        self.complete_summary(ticket, result, surface).map(|_| ())
    }

    // ==================== WARRANTY ====================

    /// Changing the window supersedes any warranty query still in flight.
    pub fn set_window(&mut self, window: WarrantyWindow) -> Ticket {
        self.window = window;
        self.warranty_seq.issue()
    }

    pub fn complete_warranty(&mut self, ticket: Ticket, result: ClientResult<Vec<ExpiringAsset>>) -> ClientResult<bool> {
        if !self.warranty_seq.accept(ticket) {
            return Ok(false);
        }
        let mut rows = self.note_err(result)?;
        rows.sort_by(|a, b| a.warranty_end.cmp(&b.warranty_end));
        self.expiring = rows;
        Ok(true)
    }

    pub async fn refresh_warranty<R: ReportsApi + ?Sized>(&mut self, api: &R, window: WarrantyWindow) -> ClientResult<()> {
        let ticket = self.set_window(window);
        let result = api.warranty_expiring(window.days()).await;
        self.complete_warranty(ticket, result).map(|_| ())
    }

    // ==================== EXPORTS ====================

    /// Downloads the CSV and returns the file name it was saved under.
    pub async fn export<R, D>(&mut self, api: &R, downloader: &D, kind: ExportKind, today: NaiveDate) -> ClientResult<String>
    where
        R: ReportsApi + ?Sized,
        D: Downloader + ?Sized,
    {
        let bytes = match kind {
            ExportKind::Assets => api.export_assets().await,
            ExportKind::Logs => api.export_logs().await,
        };
        let bytes = self.note_err(bytes)?;
        let filename = export_filename(kind.prefix(), today);
        let saved = downloader.save(bytes, &filename).await;
        self.note_err(saved)?;
        info!(file = %filename, "export saved");
        Ok(filename)
    }

    fn note_err<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            self.notice = Some(e.notice());
        }
        result
    }

    pub fn teardown(&mut self) {
        self.cost_seq.teardown();
        self.warranty_seq.teardown();
        self.summary_seq.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::MonthCostEntry;
    use crate::views::fakes::{RecordingChart, RecordingDownloader};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeReports {
        costs: Vec<MonthlyCost>,
        expiring_days: Mutex<Vec<u32>>,
        fail_exports: bool,
    }

    impl FakeReports {
        fn new(costs: Vec<MonthlyCost>) -> Self {
            Self { costs, expiring_days: Mutex::new(Vec::new()), fail_exports: false }
        }
    }

    #[async_trait]
    impl ReportsApi for FakeReports {
        async fn monthly_cost(&self) -> ClientResult<Vec<MonthlyCost>> {
            Ok(self.costs.clone())
        }

        async fn warranty_expiring(&self, days: u32) -> ClientResult<Vec<ExpiringAsset>> {
            self.expiring_days.lock().unwrap().push(days);
            Ok(vec![
                ExpiringAsset { id: 2, name: "AC".to_string(), category: None, warranty_end: "2024-03-20".to_string() },
                ExpiringAsset { id: 1, name: "UPS".to_string(), category: None, warranty_end: "2024-03-02".to_string() },
            ])
        }

        async fn dashboard_summary(&self) -> ClientResult<DashboardSummary> {
            Ok(DashboardSummary {
                total_assets: 4,
                total_logs: 9,
                overdue_logs: 1,
                monthly_cost: vec![
                    MonthCostEntry { month: "Feb".to_string(), cost: 80.0 },
                    MonthCostEntry { month: "Jun".to_string(), cost: 20.0 },
                ],
            })
        }

        async fn export_assets(&self) -> ClientResult<Vec<u8>> {
            if self.fail_exports {
                return Err(ClientError::from_response(500, &serde_json::json!({})));
            }
            Ok(b"id,name\n1,UPS\n".to_vec())
        }

        async fn export_logs(&self) -> ClientResult<Vec<u8>> {
            Ok(b"id,asset_id\n".to_vec())
        }
    }

    fn cost(year: i32, month: u32, total: f64) -> MonthlyCost {
        MonthlyCost { year, month, total_cost: Some(total) }
    }

    #[tokio::test]
    async fn test_costs_are_levelled_before_render() {
        let api = FakeReports::new(vec![cost(2024, 1, 100.0), cost(2024, 8, 50.0)]);
        let mut chart = RecordingChart::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());

        view.refresh_costs(&api, &mut chart).await.unwrap();

        assert_eq!(chart.renders.len(), 1);
        let rendered = &chart.renders[0];
        assert_eq!(rendered.labels.len(), 8);
        assert_eq!(rendered.labels[0], "Jan 24");
        assert_eq!(rendered.values[1], 0.0);
        assert_eq!(view.series().total(), 150.0);
    }

    #[test]
    fn test_stale_cost_response_not_rendered() {
        let mut chart = RecordingChart::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());
        let old = view.begin_costs();
        let new = view.begin_costs();

        assert!(view.complete_costs(new, Ok(vec![cost(2024, 2, 1.0)]), &mut chart).unwrap());
        assert!(!view.complete_costs(old, Ok(vec![cost(2023, 1, 1.0)]), &mut chart).unwrap());
        assert_eq!(chart.renders.len(), 1);
        assert_eq!(view.series().points[0].label, "Feb 24");
    }

    #[tokio::test]
    async fn test_warranty_window_query() {
        let api = FakeReports::new(vec![]);
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::Days30);

        view.refresh_warranty(&api, WarrantyWindow::Days90).await.unwrap();
        assert_eq!(*api.expiring_days.lock().unwrap(), vec![90]);
        assert_eq!(view.window(), WarrantyWindow::Days90);
        // soonest first
        assert_eq!(view.expiring()[0].name, "UPS");
    }

    #[test]
    fn test_window_change_supersedes_pending_query() {
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::Days30);
        let t30 = view.set_window(WarrantyWindow::Days30);
        let _t60 = view.set_window(WarrantyWindow::Days60);
        assert!(!view.complete_warranty(t30, Ok(vec![])).unwrap());
    }

    #[tokio::test]
    async fn test_export_saves_dated_file() {
        let api = FakeReports::new(vec![]);
        let downloader = RecordingDownloader::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        let name = view.export(&api, &downloader, ExportKind::Assets, today).await.unwrap();
        assert_eq!(name, "assets_2024-03-07.csv");
        let saved = downloader.saved.lock().unwrap();
        assert_eq!(saved[0].0, "assets_2024-03-07.csv");
        assert!(saved[0].1.starts_with(b"id,name"));
    }

    #[tokio::test]
    async fn test_failed_export_sets_notice() {
        let mut api = FakeReports::new(vec![]);
        api.fail_exports = true;
        let downloader = RecordingDownloader::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        assert!(view.export(&api, &downloader, ExportKind::Assets, today).await.is_err());
        assert!(view.take_notice().is_some());
        assert!(downloader.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_summary_renders_month_costs() {
        let api = FakeReports::new(vec![]);
        let mut chart = RecordingChart::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());

        view.refresh_summary(&api, &mut chart).await.unwrap();

        let summary = view.summary().unwrap();
        assert_eq!((summary.total_assets, summary.total_logs, summary.overdue_logs), (4, 9, 1));
        assert_eq!(chart.renders.len(), 1);
        assert_eq!(chart.renders[0].labels, vec!["Feb", "Jun"]);
        assert_eq!(chart.renders[0].values, vec![80.0, 20.0]);
    }

    #[test]
    fn test_summary_after_teardown_is_dropped() {
        let mut chart = RecordingChart::default();
        let mut view = ReportView::new("Maintenance Cost", WarrantyWindow::default());
        let ticket = view.begin_summary();
        view.teardown();

        assert!(!view.complete_summary(ticket, Ok(DashboardSummary::default()), &mut chart).unwrap());
        assert!(view.summary().is_none());
        assert!(chart.renders.is_empty());
    }
}
