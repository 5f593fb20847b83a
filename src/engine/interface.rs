use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::Duration;

use indexmap::IndexMap;

use chrono::NaiveDate;

use crate::types::{
    CreateReportRequest, DailyReport, LatestReport, Meal, MealRequest, MealType, Product, Report,
    ReportCreation, ReportData, UpdateProductRequest, UserDetails, UserSummary,
};

use super::refresh::RefreshTarget;

/// Handle to the backend engine held by the UI layer.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(super) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Send a request to the engine. Non-blocking.
    pub fn send(&self, req: Request) {
        // The engine has already shut down if the receiver is gone.
        let _ = self.tx.send(req);
    }
}

/// Implemented by both `BackendEngine` and `StubEngine`.
pub trait Engine: Send + 'static {
    fn start(self) -> EngineHandle;
}

/// All operations the UI layer can send to the engine.
pub enum Request {
    // -----------------------------------------------------------------------
    // Fetch operations
    // -----------------------------------------------------------------------
    FetchUsers {
        /// Skip the response cache.
        force: bool,
        reply_tx: Sender<Event>,
    },
    FetchUserDetails {
        login: String,
        reply_tx: Sender<Event>,
    },
    FetchProducts {
        force: bool,
        reply_tx: Sender<Event>,
    },
    /// Meals logged on one day, with nutrient totals filled in.
    FetchMeals {
        date: NaiveDate,
        force: bool,
        reply_tx: Sender<Event>,
    },
    /// Meal types and product names for the meal form pickers.
    FetchMealCatalog {
        reply_tx: Sender<Event>,
    },
    /// `page` is 1-based, as shown in the UI.
    FetchReportsPage {
        page: usize,
        size: usize,
        force: bool,
        reply_tx: Sender<Event>,
    },
    /// Status/period plus the text content of one report.
    FetchReport {
        id: i64,
        reply_tx: Sender<Event>,
    },
    FetchLatestReport {
        reply_tx: Sender<Event>,
    },
    CheckReportExists {
        period: CreateReportRequest,
        reply_tx: Sender<Event>,
    },
    FetchDailyReports {
        year: i32,
        month: u32,
        force: bool,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Background refresh registration (once per view)
    // -----------------------------------------------------------------------
    RegisterRefresh {
        target: RefreshTarget,
        interval: Duration,
        notify_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------
    UpdateProduct {
        request: UpdateProductRequest,
        reply_tx: Sender<Event>,
    },
    DeleteProduct {
        id: i64,
        reply_tx: Sender<Event>,
    },
    /// Create a meal when `request.id` is `None`, otherwise update it.
    SaveMeal {
        request: MealRequest,
        reply_tx: Sender<Event>,
    },
    DeleteMeal {
        id: i64,
        reply_tx: Sender<Event>,
    },
    GenerateReport {
        period: CreateReportRequest,
        reply_tx: Sender<Event>,
    },
    RetryReport {
        id: i64,
        reply_tx: Sender<Event>,
    },
    /// Save the CSV export of `report` into `dir`.
    DownloadReport {
        report: Report,
        dir: PathBuf,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------
    Shutdown,
}

/// What a failed fetch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Users,
    UserDetails,
    Products,
    Meals,
    MealCatalog,
    Reports,
    Report,
    LatestReport,
    ReportCheck,
    Download,
    DailyReports,
}

/// Identifies a mutation in its outcome event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    UpdateProduct { id: i64 },
    DeleteProduct { id: i64 },
    SaveMeal { id: Option<i64> },
    DeleteMeal { id: i64 },
    RetryReport { id: i64 },
    GenerateReport,
}

/// All events the engine can push back to UI views.
pub enum Event {
    // -----------------------------------------------------------------------
    // Fetch results
    // -----------------------------------------------------------------------
    UsersFetched {
        users: Vec<UserSummary>,
        /// Produced by the refresh scheduler rather than a view request.
        background: bool,
    },
    UserDetailsFetched {
        login: String,
        details: UserDetails,
    },
    ProductsFetched {
        products: Vec<Product>,
        background: bool,
    },
    MealsFetched {
        date: NaiveDate,
        meals: Vec<Meal>,
    },
    MealCatalogFetched {
        meal_types: Vec<MealType>,
        product_names: Vec<String>,
    },
    ReportsPageFetched {
        page: usize,
        size: usize,
        reports: Vec<Report>,
        total_count: usize,
        background: bool,
    },
    ReportFetched {
        id: i64,
        data: ReportData,
        /// Absent while the report has no content yet.
        content: Option<String>,
    },
    LatestReportFetched {
        latest: Option<LatestReport>,
    },
    ReportExists {
        period: CreateReportRequest,
        exists: bool,
    },
    DailyReportsFetched {
        year: i32,
        month: u32,
        reports: Vec<DailyReport>,
    },
    FetchError {
        target: FetchTarget,
        message: String,
        background: bool,
    },

    // -----------------------------------------------------------------------
    // Mutation results
    // -----------------------------------------------------------------------
    ReportGenerated {
        creation: ReportCreation,
    },
    ReportDownloaded {
        id: i64,
        path: PathBuf,
    },
    MutationOk {
        mutation: Mutation,
        description: String,
    },
    MutationError {
        mutation: Mutation,
        description: String,
        message: String,
        /// Per-field messages from a server-side validation failure.
        field_errors: IndexMap<String, String>,
    },
}
