use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::controller::{DateRange, FieldDescriptor, FieldValue, Record, Schema};
use crate::util::parse_date;

/// Page sizes the reports endpoint accepts.
pub const REPORT_PAGE_SIZES: [usize; 4] = [8, 16, 32, 48];

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Created,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl ReportStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        }
    }

    /// Still being generated; worth polling.
    pub fn is_transient(self) -> bool {
        self == Self::Processing
    }

    pub fn can_retry(self) -> bool {
        matches!(self, Self::Error | Self::Created)
    }

    pub fn can_download(self) -> bool {
        self == Self::Completed
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

/// One row of `GET /admin/api/reports/page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub status: ReportStatus,
    /// `yyyy.MM.dd`
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    /// `yyyy.MM.dd HH:mm:ss`
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Milliseconds.
    #[serde(default)]
    pub total_execution_time: Option<i64>,
}

impl Record for Report {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

impl Report {
    #[allow(clippy::cast_precision_loss)]
    pub fn schema() -> Schema<Self> {
        Schema::new([
            FieldDescriptor::numeric("id", "#", |r: &Self| FieldValue::Number(r.id as f64)),
            FieldDescriptor::numeric("period", "Period", |r: &Self| {
                FieldValue::opt_number(r.period().map(|p| p.days() as f64))
            }),
            FieldDescriptor::text("status", "Status", |r: &Self| FieldValue::text(r.status.label()))
                .searchable(),
            FieldDescriptor::datetime("created", "Created", |r: &Self| {
                FieldValue::opt_text(r.created_at.as_deref())
            }),
            FieldDescriptor::datetime("completed", "Completed", |r: &Self| {
                FieldValue::opt_text(r.completed_at.as_deref())
            }),
            FieldDescriptor::numeric("executionTime", "Time", |r: &Self| {
                FieldValue::opt_number(r.total_execution_time.map(|ms| ms as f64))
            }),
            FieldDescriptor::text("periodText", "Dates", |r: &Self| FieldValue::text(r.period_label()))
                .searchable(),
        ])
    }

    pub fn period(&self) -> Option<DateRange> {
        let start = parse_date(self.period_start.as_deref()?)?;
        let end = parse_date(self.period_end.as_deref()?)?;
        Some(DateRange::new(start, end))
    }

    /// `"2025.03.01 – 2025.03.07"`
    pub fn period_label(&self) -> String {
        format!(
            "{} – {}",
            self.period_start.as_deref().unwrap_or("?"),
            self.period_end.as_deref().unwrap_or("?")
        )
    }

    /// File name used when saving the CSV export.
    pub fn download_file_name(&self) -> String {
        let compact = |s: Option<&str>| {
            s.and_then(parse_date)
                .map_or_else(|| "unknown".to_owned(), |d| d.format("%Y%m%d").to_string())
        };
        format!(
            "report_{}_{}_{}.csv",
            self.id,
            compact(self.period_start.as_deref()),
            compact(self.period_end.as_deref())
        )
    }
}

/// Counters over the loaded report page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub total: usize,
    pub completed: usize,
    pub processing: usize,
    pub failed: usize,
}

impl ReportStats {
    pub fn compute<'a>(reports: impl IntoIterator<Item = &'a Report>, total: usize) -> Self {
        let mut stats = Self {
            total,
            ..Self::default()
        };
        for r in reports {
            match r.status {
                ReportStatus::Completed => stats.completed += 1,
                ReportStatus::Processing => stats.processing += 1,
                ReportStatus::Error => stats.failed += 1,
                ReportStatus::Created | ReportStatus::Unknown => {}
            }
        }
        stats
    }
}

/// `GET /admin/api/reports/{id}/data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub status: ReportStatus,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub total_execution_time: Option<i64>,
}

/// `GET /admin/api/reports/latest`. Only the identity is used; the rest of
/// the entity is fetched through `/data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LatestReport {
    pub id: i64,
    pub status: ReportStatus,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Body of `POST /admin/api/reports/generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<DateRange> for CreateReportRequest {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
        }
    }
}

/// Reply of `POST /admin/api/reports/generate`, on success and on 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCreation {
    #[serde(default)]
    pub report_id: Option<i64>,
    /// `"success"` or `"error"`.
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
}

impl ReportCreation {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("end date {end} is in the future")]
    EndInFuture { end: NaiveDate },
}

/// Client-side check before asking the backend to generate a report.
pub fn validate_period(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<CreateReportRequest, PeriodError> {
    if start > end {
        return Err(PeriodError::StartAfterEnd { start, end });
    }
    if end > today {
        return Err(PeriodError::EndInFuture { end });
    }
    Ok(CreateReportRequest {
        start_date: start,
        end_date: end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).expect("valid date")
    }

    fn report(json: &str) -> Report {
        serde_json::from_str(json).expect("valid report")
    }

    #[test]
    fn status_parsing_tolerates_unknown_values() {
        let r = report(r#"{"id":1,"status":"QUEUED"}"#);
        assert_eq!(r.status, ReportStatus::Unknown);
        let r = report(r#"{"id":2,"status":"PROCESSING"}"#);
        assert!(r.status.is_transient());
    }

    #[test]
    fn actions_follow_status() {
        assert!(ReportStatus::Completed.can_download());
        assert!(!ReportStatus::Error.can_download());
        assert!(ReportStatus::Created.can_retry());
        assert!(ReportStatus::Error.can_retry());
        assert!(!ReportStatus::Processing.can_retry());
    }

    #[test]
    fn period_day_count_and_file_name() {
        let r = report(
            r#"{"id":42,"status":"COMPLETED","periodStart":"2025.03.01","periodEnd":"2025.03.07"}"#,
        );
        assert_eq!(r.period().map(|p| p.days()), Some(7));
        assert_eq!(r.download_file_name(), "report_42_20250301_20250307.csv");
    }

    #[test]
    fn validate_period_rules() {
        let today = d(3, 14);
        assert_eq!(
            validate_period(d(3, 10), d(3, 1), today),
            Err(PeriodError::StartAfterEnd {
                start: d(3, 10),
                end: d(3, 1)
            })
        );
        assert_eq!(
            validate_period(d(3, 10), d(3, 15), today),
            Err(PeriodError::EndInFuture { end: d(3, 15) })
        );
        assert!(validate_period(d(3, 14), d(3, 14), today).is_ok());
    }

    #[test]
    fn create_request_serializes_iso_dates() {
        let body = serde_json::to_string(&CreateReportRequest {
            start_date: d(3, 1),
            end_date: d(3, 7),
        })
        .expect("serializable");
        assert_eq!(body, r#"{"startDate":"2025-03-01","endDate":"2025-03-07"}"#);
    }

    #[test]
    fn stats_count_by_status() {
        let reports = [
            report(r#"{"id":1,"status":"COMPLETED"}"#),
            report(r#"{"id":2,"status":"PROCESSING"}"#),
            report(r#"{"id":3,"status":"ERROR"}"#),
            report(r#"{"id":4,"status":"COMPLETED"}"#),
        ];
        let stats = ReportStats::compute(&reports, 40);
        assert_eq!(
            stats,
            ReportStats {
                total: 40,
                completed: 2,
                processing: 1,
                failed: 1
            }
        );
    }
}
