use tokio::sync::mpsc::UnboundedReceiver;

use crate::types::{
    DailyReport, LatestReport, Meal, MealEntry, MealNutrition, MealType, Product, Report,
    ReportCreation, ReportData, UserSummary, annotate_meals,
};

use super::interface::{Engine, EngineHandle, Event, FetchTarget, Mutation, Request};

/// A stub engine that serves fixture data without any network calls.
///
/// Useful for integration tests and UI demos without a running backend.
#[derive(Default)]
pub struct StubEngine {
    pub users: Vec<UserSummary>,
    pub products: Vec<Product>,
    /// Served for every date.
    pub meals: Vec<Meal>,
    pub meal_types: Vec<MealType>,
    pub reports: Vec<Report>,
    pub daily_reports: Vec<DailyReport>,
}

impl Engine for StubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("stub tokio runtime");
            rt.block_on(self.run_loop(rx));
        });
        EngineHandle::new(tx)
    }
}

impl StubEngine {
    #[allow(clippy::too_many_lines)]
    async fn run_loop(mut self, mut rx: UnboundedReceiver<Request>) {
        while let Some(req) = rx.recv().await {
            match req {
                Request::FetchUsers { reply_tx, .. } => {
                    let _ = reply_tx.send(Event::UsersFetched {
                        users: self.users.clone(),
                        background: false,
                    });
                }
                Request::FetchProducts { reply_tx, .. } => {
                    let _ = reply_tx.send(Event::ProductsFetched {
                        products: self.products.clone(),
                        background: false,
                    });
                }
                Request::FetchMeals { date, reply_tx, .. } => {
                    let mut meals = self.meals.clone();
                    annotate_meals(&mut meals, &self.products);
                    let _ = reply_tx.send(Event::MealsFetched { date, meals });
                }
                Request::FetchMealCatalog { reply_tx } => {
                    let _ = reply_tx.send(Event::MealCatalogFetched {
                        meal_types: self.meal_types.clone(),
                        product_names: self.products.iter().map(|p| p.name.clone()).collect(),
                    });
                }
                Request::FetchReportsPage {
                    page,
                    size,
                    reply_tx,
                    ..
                } => {
                    let reports = self
                        .reports
                        .iter()
                        .skip(page.saturating_sub(1) * size)
                        .take(size)
                        .cloned()
                        .collect();
                    let _ = reply_tx.send(Event::ReportsPageFetched {
                        page,
                        size,
                        reports,
                        total_count: self.reports.len(),
                        background: false,
                    });
                }
                Request::FetchReport { id, reply_tx } => {
                    let event = match self.reports.iter().find(|r| r.id == id) {
                        Some(r) => Event::ReportFetched {
                            id,
                            data: ReportData {
                                status: r.status,
                                period_start: r.period_start.clone(),
                                period_end: r.period_end.clone(),
                                total_execution_time: r.total_execution_time,
                            },
                            content: None,
                        },
                        None => not_found(FetchTarget::Report),
                    };
                    let _ = reply_tx.send(event);
                }
                Request::FetchLatestReport { reply_tx } => {
                    let latest = self.reports.iter().max_by_key(|r| r.id).map(|r| LatestReport {
                        id: r.id,
                        status: r.status,
                    });
                    let _ = reply_tx.send(Event::LatestReportFetched { latest });
                }
                Request::CheckReportExists { period, reply_tx } => {
                    let exists = self.reports.iter().any(|r| {
                        r.period().is_some_and(|p| {
                            p.start == period.start_date && p.end == period.end_date
                        })
                    });
                    let _ = reply_tx.send(Event::ReportExists { period, exists });
                }
                Request::FetchDailyReports {
                    year,
                    month,
                    reply_tx,
                    ..
                } => {
                    let _ = reply_tx.send(Event::DailyReportsFetched {
                        year,
                        month,
                        reports: self.daily_reports.clone(),
                    });
                }
                Request::FetchUserDetails { reply_tx, .. } => {
                    let _ = reply_tx.send(not_found(FetchTarget::UserDetails));
                }
                Request::DownloadReport { reply_tx, .. } => {
                    let _ = reply_tx.send(Event::FetchError {
                        target: FetchTarget::Download,
                        message: "downloads are not available offline".into(),
                        background: false,
                    });
                }

                // Refresh registration is ignored by the stub.
                Request::RegisterRefresh { .. } => {}

                // Mutations succeed instantly and are applied to the fixtures.
                Request::UpdateProduct { request, reply_tx } => {
                    if let Some(p) = self.products.iter_mut().find(|p| p.id == request.id) {
                        p.name.clone_from(&request.name);
                        p.calories_per_100g = Some(request.calories_per_100g);
                        p.proteins_per_100g = Some(request.proteins_per_100g);
                        p.fats_per_100g = Some(request.fats_per_100g);
                        p.carbs_per_100g = Some(request.carbs_per_100g);
                    }
                    let _ = reply_tx.send(ok(Mutation::UpdateProduct { id: request.id }));
                }
                Request::DeleteProduct { id, reply_tx } => {
                    self.products.retain(|p| p.id != id);
                    let _ = reply_tx.send(ok(Mutation::DeleteProduct { id }));
                }
                Request::SaveMeal { request, reply_tx } => {
                    let meal_entries = request
                        .product_names
                        .iter()
                        .zip(&request.quantities)
                        .map(|(name, grams)| MealEntry {
                            product_name: name.clone(),
                            quantity_grams: *grams,
                        })
                        .collect();
                    let id = request.id.unwrap_or_else(|| {
                        self.meals.iter().map(|m| m.id).max().unwrap_or(0) + 1
                    });
                    self.meals.retain(|m| m.id != id);
                    self.meals.push(Meal {
                        id,
                        meal_type: request.meal_type_name,
                        meal_entries,
                        nutrition: MealNutrition::default(),
                    });
                    let _ = reply_tx.send(ok(Mutation::SaveMeal { id: request.id }));
                }
                Request::DeleteMeal { id, reply_tx } => {
                    self.meals.retain(|m| m.id != id);
                    let _ = reply_tx.send(ok(Mutation::DeleteMeal { id }));
                }
                Request::RetryReport { id, reply_tx } => {
                    let _ = reply_tx.send(ok(Mutation::RetryReport { id }));
                }
                Request::GenerateReport { period, reply_tx } => {
                    let next_id = self.reports.iter().map(|r| r.id).max().unwrap_or(0) + 1;
                    let _ = reply_tx.send(Event::ReportGenerated {
                        creation: ReportCreation {
                            report_id: Some(next_id),
                            status: "success".into(),
                            message: Some("stub report created".into()),
                            period_start: Some(period.start_date.to_string()),
                            period_end: Some(period.end_date.to_string()),
                        },
                    });
                }

                Request::Shutdown => break,
            }
        }
    }
}

fn ok(mutation: Mutation) -> Event {
    Event::MutationOk {
        mutation,
        description: "stub ok".into(),
    }
}

fn not_found(target: FetchTarget) -> Event {
    Event::FetchError {
        target,
        message: "not found in stub data".into(),
        background: false,
    }
}
