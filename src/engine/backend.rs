use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::{ApiClient, ApiError};
use crate::types::{Meal, MealType, Report, annotate_meals};

use super::interface::{Engine, EngineHandle, Event, FetchTarget, Mutation, Request};
use super::poll::TransientPoller;
use super::refresh::{DueEntry, RefreshScheduler, RefreshTarget};

/// How often the engine checks for due background refreshes.
const REFRESH_TICK: Duration = Duration::from_secs(30);

/// The engine talking to the real backend over HTTP.
pub struct BackendEngine {
    client: ApiClient,
    poll_interval: Duration,
}

impl BackendEngine {
    pub fn new(client: ApiClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

impl Engine for BackendEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("nutri-engine".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new().expect("tokio runtime init");
                rt.block_on(self.run_loop(rx));
            });
        handle
    }
}

/// Mutable engine state shared by request handlers.
struct State {
    client: ApiClient,
    scheduler: RefreshScheduler,
    poller: TransientPoller,
}

impl BackendEngine {
    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        let mut state = State {
            client: self.client,
            scheduler: RefreshScheduler::new(),
            poller: TransientPoller::new(self.poll_interval),
        };

        let mut refresh_tick = tokio::time::interval(REFRESH_TICK);
        // Consume the immediate first tick.
        refresh_tick.tick().await;

        loop {
            tokio::select! {
                biased;
                maybe_req = rx.recv() => {
                    match maybe_req {
                        None | Some(Request::Shutdown) => {
                            tracing::debug!("engine: shutting down");
                            break;
                        }
                        Some(req) => handle_request(req, &mut state).await,
                    }
                }
                _ = refresh_tick.tick() => tick_refresh(&mut state).await,
            }
        }
        state.poller.stop();
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_lines)]
async fn handle_request(req: Request, state: &mut State) {
    let client = &state.client;
    match req {
        Request::FetchUsers { force, reply_tx } => match client.list_users(force).await {
            Ok(users) => {
                state.scheduler.mark_fetched(RefreshTarget::Users);
                tracing::debug!("engine: sending UsersFetched count={}", users.len());
                let _ = reply_tx.send(Event::UsersFetched {
                    users,
                    background: false,
                });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::Users, false, &e),
        },

        Request::FetchUserDetails { login, reply_tx } => {
            match client.user_details(&login).await {
                Ok(details) => {
                    let _ = reply_tx.send(Event::UserDetailsFetched { login, details });
                }
                Err(e) => fetch_failed(&reply_tx, FetchTarget::UserDetails, false, &e),
            }
        }

        Request::FetchProducts { force, reply_tx } => match client.list_products(force).await {
            Ok(products) => {
                state.scheduler.mark_fetched(RefreshTarget::Products);
                tracing::debug!("engine: sending ProductsFetched count={}", products.len());
                let _ = reply_tx.send(Event::ProductsFetched {
                    products,
                    background: false,
                });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::Products, false, &e),
        },

        Request::FetchMeals {
            date,
            force,
            reply_tx,
        } => match fetch_meals(client, date, force).await {
            Ok(meals) => {
                tracing::debug!("engine: sending MealsFetched {date} count={}", meals.len());
                let _ = reply_tx.send(Event::MealsFetched { date, meals });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::Meals, false, &e),
        },

        Request::FetchMealCatalog { reply_tx } => match fetch_meal_catalog(client).await {
            Ok((meal_types, product_names)) => {
                let _ = reply_tx.send(Event::MealCatalogFetched {
                    meal_types,
                    product_names,
                });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::MealCatalog, false, &e),
        },

        Request::FetchReportsPage {
            page,
            size,
            force,
            reply_tx,
        } => match fetch_reports_page(client, page, size, force).await {
            Ok((reports, total_count)) => {
                tracing::debug!(
                    "engine: sending ReportsPageFetched page={page} size={size} count={} total={total_count}",
                    reports.len()
                );
                state.poller.sync(page, size, &reports, client, &reply_tx);
                let _ = reply_tx.send(Event::ReportsPageFetched {
                    page,
                    size,
                    reports,
                    total_count,
                    background: false,
                });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::Reports, false, &e),
        },

        Request::FetchReport { id, reply_tx } => {
            let (data, content) = tokio::join!(client.report_data(id), client.report_content(id));
            match data {
                Ok(data) => {
                    let content = content
                        .inspect_err(|e| tracing::debug!("engine: no content for report {id}: {e}"))
                        .ok();
                    let _ = reply_tx.send(Event::ReportFetched { id, data, content });
                }
                Err(e) => fetch_failed(&reply_tx, FetchTarget::Report, false, &e),
            }
        }

        Request::FetchLatestReport { reply_tx } => match client.latest_report().await {
            Ok(latest) => {
                let _ = reply_tx.send(Event::LatestReportFetched { latest });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::LatestReport, false, &e),
        },

        Request::CheckReportExists { period, reply_tx } => {
            match client.check_report_exists(&period).await {
                Ok(exists) => {
                    let _ = reply_tx.send(Event::ReportExists { period, exists });
                }
                Err(e) => fetch_failed(&reply_tx, FetchTarget::ReportCheck, false, &e),
            }
        }

        Request::FetchDailyReports {
            year,
            month,
            force,
            reply_tx,
        } => match client.daily_reports(year, month, force).await {
            Ok(reports) => {
                tracing::debug!(
                    "engine: sending DailyReportsFetched {year}-{month:02} count={}",
                    reports.len()
                );
                let _ = reply_tx.send(Event::DailyReportsFetched {
                    year,
                    month,
                    reports,
                });
            }
            Err(e) => fetch_failed(&reply_tx, FetchTarget::DailyReports, false, &e),
        },

        Request::RegisterRefresh {
            target,
            interval,
            notify_tx,
        } => {
            tracing::debug!("engine: refresh registered for {target:?} every {interval:?}");
            state.scheduler.register(target, interval, &notify_tx);
            // The view has normally loaded by now; start the clock.
            state.scheduler.mark_fetched(target);
        }

        // -------------------------------------------------------------------
        // Mutations
        // -------------------------------------------------------------------
        Request::UpdateProduct { request, reply_tx } => {
            let mutation = Mutation::UpdateProduct { id: request.id };
            match client.update_product(&request).await {
                Ok(()) => {
                    let _ = reply_tx.send(Event::MutationOk {
                        mutation,
                        description: format!("Saved product \"{}\"", request.name),
                    });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    mutation,
                    format!("Save product #{}", request.id),
                    e.user_message(),
                    &e,
                ),
            }
        }

        Request::DeleteProduct { id, reply_tx } => {
            let mutation = Mutation::DeleteProduct { id };
            match client.delete_product(id).await {
                Ok(()) => {
                    let _ = reply_tx.send(Event::MutationOk {
                        mutation,
                        description: format!("Deleted product #{id}"),
                    });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    mutation,
                    format!("Delete product #{id}"),
                    e.delete_message("product"),
                    &e,
                ),
            }
        }

        Request::SaveMeal { request, reply_tx } => {
            let mutation = Mutation::SaveMeal { id: request.id };
            let (result, description) = match request.id {
                Some(id) => (
                    client.update_meal(id, &request).await,
                    format!("Saved meal #{id}"),
                ),
                None => (
                    client.create_meal(&request).await,
                    format!("Logged {} meal", request.meal_type_name),
                ),
            };
            match result {
                Ok(()) => {
                    let _ = reply_tx.send(Event::MutationOk {
                        mutation,
                        description,
                    });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    mutation,
                    "Save meal".to_owned(),
                    e.user_message(),
                    &e,
                ),
            }
        }

        Request::DeleteMeal { id, reply_tx } => {
            let mutation = Mutation::DeleteMeal { id };
            match client.delete_meal(id).await {
                Ok(()) => {
                    let _ = reply_tx.send(Event::MutationOk {
                        mutation,
                        description: format!("Deleted meal #{id}"),
                    });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    mutation,
                    format!("Delete meal #{id}"),
                    e.delete_message("meal"),
                    &e,
                ),
            }
        }

        Request::GenerateReport { period, reply_tx } => {
            match client.generate_report(&period).await {
                Ok(creation) => {
                    tracing::info!(
                        "engine: generate {}..{} -> {} {:?}",
                        period.start_date,
                        period.end_date,
                        creation.status,
                        creation.report_id
                    );
                    let _ = reply_tx.send(Event::ReportGenerated { creation });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    Mutation::GenerateReport,
                    "Generate report".to_owned(),
                    e.user_message(),
                    &e,
                ),
            }
        }

        Request::RetryReport { id, reply_tx } => {
            let mutation = Mutation::RetryReport { id };
            match client.retry_report(id).await {
                Ok(()) => {
                    let _ = reply_tx.send(Event::MutationOk {
                        mutation,
                        description: format!("Report #{id} queued again"),
                    });
                }
                Err(e) => mutation_failed(
                    &reply_tx,
                    mutation,
                    format!("Retry report #{id}"),
                    e.user_message(),
                    &e,
                ),
            }
        }

        Request::DownloadReport {
            report,
            dir,
            reply_tx,
        } => match download(client, &report, &dir).await {
            Ok(path) => {
                tracing::info!("engine: saved report {} to {}", report.id, path.display());
                let _ = reply_tx.send(Event::ReportDownloaded {
                    id: report.id,
                    path,
                });
            }
            Err(message) => {
                tracing::warn!("engine: download of report {} failed: {message}", report.id);
                let _ = reply_tx.send(Event::FetchError {
                    target: FetchTarget::Download,
                    message,
                    background: false,
                });
            }
        },

        Request::Shutdown => unreachable!("handled at run_loop level"),
    }
}

// ---------------------------------------------------------------------------
// Background refresh
// ---------------------------------------------------------------------------

async fn tick_refresh(state: &mut State) {
    for DueEntry { target, notify_tx } in state.scheduler.due_entries() {
        tracing::debug!("engine: background refresh of {target:?}");
        let event = match target {
            RefreshTarget::Users => state.client.list_users(true).await.map(|users| {
                Event::UsersFetched {
                    users,
                    background: true,
                }
            }),
            RefreshTarget::Products => state.client.list_products(true).await.map(|products| {
                Event::ProductsFetched {
                    products,
                    background: true,
                }
            }),
        };
        match event {
            Ok(event) => {
                state.scheduler.mark_fetched(target);
                let _ = notify_tx.send(event);
            }
            Err(e) => tracing::warn!("engine: background refresh of {target:?} failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One page (1-based) of reports plus the overall count.
pub(super) async fn fetch_reports_page(
    client: &ApiClient,
    page: usize,
    size: usize,
    force: bool,
) -> Result<(Vec<Report>, usize), ApiError> {
    tokio::try_join!(
        client.reports_page(page.saturating_sub(1), size, force),
        client.reports_count(force),
    )
}

/// Meals of one day, annotated from the product catalogue.
async fn fetch_meals(
    client: &ApiClient,
    date: NaiveDate,
    force: bool,
) -> Result<Vec<Meal>, ApiError> {
    let (mut meals, products) = tokio::try_join!(
        client.meals_for_date(date, force),
        client.list_products(false),
    )?;
    annotate_meals(&mut meals, &products);
    Ok(meals)
}

async fn fetch_meal_catalog(client: &ApiClient) -> Result<(Vec<MealType>, Vec<String>), ApiError> {
    let (meal_types, products) =
        tokio::try_join!(client.meal_types(false), client.list_products(false))?;
    let mut names: Vec<String> = products.into_iter().map(|p| p.name).collect();
    names.sort_by_key(|n| n.to_lowercase());
    names.dedup();
    Ok((meal_types, names))
}

async fn download(
    client: &ApiClient,
    report: &Report,
    dir: &Path,
) -> Result<std::path::PathBuf, String> {
    let bytes = client
        .download_report(report.id)
        .await
        .map_err(|e| e.user_message())?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
    let path = dir.join(report.download_file_name());
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    Ok(path)
}

fn fetch_failed(reply_tx: &Sender<Event>, target: FetchTarget, background: bool, err: &ApiError) {
    tracing::warn!("engine: fetch {target:?} failed: {err}");
    let _ = reply_tx.send(Event::FetchError {
        target,
        message: err.user_message(),
        background,
    });
}

fn mutation_failed(
    reply_tx: &Sender<Event>,
    mutation: Mutation,
    description: String,
    message: String,
    err: &ApiError,
) {
    tracing::warn!("engine: {description} failed: {err}");
    let _ = reply_tx.send(Event::MutationError {
        mutation,
        description,
        message,
        field_errors: err.field_errors(),
    });
}
