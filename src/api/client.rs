use std::time::Duration;

use anyhow::{Context, Result, bail};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::api::ApiError;
use crate::config::types::BackendConfig;
use chrono::NaiveDate;

use crate::types::{
    CreateReportRequest, DailyReport, LatestReport, Meal, MealRequest, MealType, Product,
    REPORT_PAGE_SIZES, Report, ReportCreation, ReportData, UpdateProductRequest, UserDetails,
    UserSummary,
};

/// Header carrying the anti-forgery token on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

const CSRF_ENV: &str = "NUTRI_BOARD_CSRF_TOKEN";
const AUTH_ENV: &str = "NUTRI_BOARD_TOKEN";

type Query<'a> = &'a [(&'a str, String)];

/// HTTP client for the nutrition backend, with a short-lived cache for GETs.
///
/// Cloning is cheap: the connection pool and the cache are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    csrf_token: Option<String>,
    auth_token: Option<String>,
    cache: Cache<String, String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("csrf_token", &self.csrf_token.is_some())
            .field("auth_token", &self.auth_token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from the `[backend]` config section.
    ///
    /// Tokens missing from the config are read from `NUTRI_BOARD_CSRF_TOKEN`
    /// and `NUTRI_BOARD_TOKEN`.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid backend URL {:?}", config.base_url))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            bail!("backend URL must be http(s): {}", config.base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("nutri-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
            .build();

        Ok(Self {
            http,
            base_url,
            csrf_token: token_or_env(config.csrf_token.as_deref(), CSRF_ENV),
            auth_token: token_or_env(config.auth_token.as_deref(), AUTH_ENV),
            cache,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Drop every cached response.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    // -- Users ---------------------------------------------------------------

    pub async fn list_users(&self, force: bool) -> Result<Vec<UserSummary>, ApiError> {
        self.get_json(&["admin", "api", "users"], &[], "users", force)
            .await
    }

    pub async fn user_details(&self, login: &str) -> Result<UserDetails, ApiError> {
        let what = format!("user \"{login}\"");
        self.get_json(&["admin", "api", "users", login], &[], &what, false)
            .await
    }

    // -- Products ------------------------------------------------------------

    pub async fn list_products(&self, force: bool) -> Result<Vec<Product>, ApiError> {
        self.get_json(&["api", "products", "all"], &[], "products", force)
            .await
    }

    /// The backend answers `null` for an unknown id.
    pub async fn product(&self, id: i64) -> Result<Product, ApiError> {
        let id = id.to_string();
        let found: Option<Product> = self
            .get_json(&["api", "products", &id], &[], "product", true)
            .await?;
        found.ok_or_else(|| ApiError::NotFound {
            what: "product".to_owned(),
        })
    }

    pub async fn update_product(&self, request: &UpdateProductRequest) -> Result<(), ApiError> {
        let id = request.id.to_string();
        let req = self
            .request(Method::PUT, &["api", "products", &id])
            .json(request);
        self.mutate(req, "product").await.map(drop)
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let req = self.request(Method::DELETE, &["api", "products", &id]);
        self.mutate(req, "product").await.map(drop)
    }

    // -- Meals ---------------------------------------------------------------

    /// Meals logged on `date`, without nutrient totals.
    pub async fn meals_for_date(&self, date: NaiveDate, force: bool) -> Result<Vec<Meal>, ApiError> {
        let query = [("date", date.to_string())];
        self.get_json(&["api", "meals"], &query, "meals", force)
            .await
    }

    pub async fn meal_types(&self, force: bool) -> Result<Vec<MealType>, ApiError> {
        self.get_json(&["api", "meal-types"], &[], "meal types", force)
            .await
    }

    /// The backend always files a new meal under today's date.
    pub async fn create_meal(&self, request: &MealRequest) -> Result<(), ApiError> {
        let req = self
            .request(Method::POST, &["api", "meals", "create"])
            .json(request);
        self.mutate(req, "meal").await.map(drop)
    }

    pub async fn update_meal(&self, id: i64, request: &MealRequest) -> Result<(), ApiError> {
        let id = id.to_string();
        let req = self
            .request(Method::PUT, &["api", "meals", "update", &id])
            .json(request);
        self.mutate(req, "meal").await.map(drop)
    }

    pub async fn delete_meal(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let req = self.request(Method::DELETE, &["api", "meals", &id]);
        self.mutate(req, "meal").await.map(drop)
    }

    // -- Reports -------------------------------------------------------------

    /// One page of reports. `page` is 0-based; sizes outside
    /// [`REPORT_PAGE_SIZES`] fall back to the smallest.
    pub async fn reports_page(
        &self,
        page: usize,
        size: usize,
        force: bool,
    ) -> Result<Vec<Report>, ApiError> {
        let size = if REPORT_PAGE_SIZES.contains(&size) {
            size
        } else {
            REPORT_PAGE_SIZES[0]
        };
        let query = [("page", page.to_string()), ("size", size.to_string())];
        self.get_json(&["admin", "api", "reports", "page"], &query, "reports", force)
            .await
    }

    pub async fn reports_count(&self, force: bool) -> Result<usize, ApiError> {
        self.get_json(&["admin", "api", "reports", "count"], &[], "report count", force)
            .await
    }

    /// `None` when no report has been created yet.
    pub async fn latest_report(&self) -> Result<Option<LatestReport>, ApiError> {
        match self
            .get_json(&["admin", "api", "reports", "latest"], &[], "latest report", true)
            .await
        {
            Ok(latest) => Ok(Some(latest)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn report_data(&self, id: i64) -> Result<ReportData, ApiError> {
        let id = id.to_string();
        self.get_json(&["admin", "api", "reports", &id, "data"], &[], "report", true)
            .await
    }

    pub async fn report_content(&self, id: i64) -> Result<String, ApiError> {
        let id = id.to_string();
        self.get_text(&["admin", "api", "reports", &id, "content"], &[], "report", true)
            .await
    }

    /// Whether a report already covers exactly this period.
    pub async fn check_report_exists(&self, period: &CreateReportRequest) -> Result<bool, ApiError> {
        let query = [
            ("startDate", period.start_date.to_string()),
            ("endDate", period.end_date.to_string()),
        ];
        self.get_json(&["admin", "api", "reports", "check"], &query, "report", true)
            .await
    }

    /// Start generating a report. A refusal from the backend (bad period,
    /// duplicate) comes back as an unsuccessful [`ReportCreation`].
    pub async fn generate_report(
        &self,
        period: &CreateReportRequest,
    ) -> Result<ReportCreation, ApiError> {
        let req = self
            .request(Method::POST, &["admin", "api", "reports", "generate"])
            .json(period);
        let resp = self.send_mutation(req).await?;
        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<ReportCreation>(&body) {
            Ok(creation) if status.is_success() => {
                self.invalidate_cache();
                Ok(creation)
            }
            Ok(refusal) if status == StatusCode::BAD_REQUEST => Ok(refusal),
            Err(e) if status.is_success() => Err(ApiError::malformed("report", e)),
            _ => Err(ApiError::from_response(status, &body, "report")),
        }
    }

    pub async fn retry_report(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let req = self.request(Method::POST, &["admin", "api", "reports", &id, "retry"]);
        self.mutate(req, "report").await.map(drop)
    }

    /// CSV export of a completed report.
    pub async fn download_report(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        let id = id.to_string();
        let resp = self
            .request(Method::GET, &["admin", "api", "reports", &id, "download"])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(ApiError::from_response(status, &body, "report"));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    // -- Daily reports -------------------------------------------------------

    pub async fn daily_reports(
        &self,
        year: i32,
        month: u32,
        force: bool,
    ) -> Result<Vec<DailyReport>, ApiError> {
        let query = [("year", year.to_string()), ("month", month.to_string())];
        self.get_json(&["api", "daily-reports", "data"], &query, "daily reports", force)
            .await
    }

    // -- Plumbing ------------------------------------------------------------

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let req = self.http.request(method, self.endpoint(segments));
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_text(
        &self,
        segments: &[&str],
        query: Query<'_>,
        what: &str,
        force: bool,
    ) -> Result<String, ApiError> {
        let key = cache_key(&self.endpoint(segments), query);
        if !force && let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(%key, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(%key, force, "GET");
        let resp = self.request(Method::GET, segments).query(query).send().await?;
        let body = read_body(resp, what).await?;
        self.cache.insert(key, body.clone()).await;
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Query<'_>,
        what: &str,
        force: bool,
    ) -> Result<T, ApiError> {
        let body = self.get_text(segments, query, what, force).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::malformed(what, e))
    }

    async fn send_mutation(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let req = match &self.csrf_token {
            Some(token) => req.header(CSRF_HEADER, token),
            None => {
                tracing::warn!("no CSRF token configured; mutation will likely be rejected");
                req
            }
        };
        Ok(req.send().await?)
    }

    /// Send a state-changing request; success invalidates the GET cache.
    async fn mutate(&self, req: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let resp = self.send_mutation(req).await?;
        let body = read_body(resp, what).await?;
        self.invalidate_cache();
        Ok(body)
    }
}

async fn read_body(resp: Response, what: &str) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        tracing::debug!(%status, what, "request failed");
        Err(ApiError::from_response(status, &body, what))
    }
}

fn cache_key(url: &Url, query: Query<'_>) -> String {
    let mut key = url.to_string();
    for (i, (k, v)) in query.iter().enumerate() {
        key.push(if i == 0 { '?' } else { '&' });
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

fn token_or_env(configured: Option<&str>, var: &str) -> Option<String> {
    configured
        .map(str::to_owned)
        .or_else(|| std::env::var(var).ok())
        .filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&BackendConfig {
            base_url: base.to_owned(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoint_joins_segments_under_base_path() {
        let c = client("http://host:8080/nutri/");
        assert_eq!(
            c.endpoint(&["admin", "api", "users", "a b"]).as_str(),
            "http://host:8080/nutri/admin/api/users/a%20b"
        );
        let c = client("http://host:8080");
        assert_eq!(
            c.endpoint(&["api", "products", "all"]).as_str(),
            "http://host:8080/api/products/all"
        );
    }

    #[test]
    fn cache_key_includes_query() {
        let c = client("http://host");
        let url = c.endpoint(&["x"]);
        assert_eq!(
            cache_key(&url, &[("page", "0".into()), ("size", "8".into())]),
            "http://host/x?page=0&size=8"
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        let config = BackendConfig {
            base_url: "mailto:admin@example.com".to_owned(),
            ..BackendConfig::default()
        };
        assert!(ApiClient::new(&config).is_err());
    }
}
