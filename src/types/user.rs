use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::common::{LooseNumber, loose_field};
use crate::controller::{FieldDescriptor, FieldValue, Record, Schema};
use crate::util::parse_date;

/// Row of the admin user list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Full name, surname first.
    #[serde(default)]
    pub fio: Option<String>,
    #[serde(default)]
    pub streak: Option<LooseNumber>,
    #[serde(default)]
    pub last_activity: Option<String>,
}

impl Record for UserSummary {
    type Key = String;

    fn key(&self) -> String {
        self.login.clone()
    }
}

impl UserSummary {
    pub fn schema() -> Schema<Self> {
        Schema::new([
            FieldDescriptor::text("login", "Login", |u: &Self| FieldValue::text(&u.login))
                .searchable(),
            FieldDescriptor::text("email", "Email", |u: &Self| {
                FieldValue::opt_text(u.email.as_deref())
            })
            .searchable(),
            FieldDescriptor::text("fio", "Name", |u: &Self| FieldValue::opt_text(u.fio.as_deref()))
                .searchable(),
            FieldDescriptor::numeric("streak", "Streak", |u: &Self| loose_field(u.streak.as_ref())),
            FieldDescriptor::datetime("lastActivity", "Last activity", |u: &Self| {
                FieldValue::opt_text(u.last_activity.as_deref())
            }),
        ])
    }

    pub fn streak_days(&self) -> f64 {
        self.streak.as_ref().map_or(0.0, LooseNumber::as_f64)
    }

    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity.as_deref().and_then(parse_date)
    }
}

/// Full profile shown in the details modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub current_streak: Option<i64>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub daily_calorie_goal: Option<i64>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserDetails {
    /// `"Surname Name Patronymic"`, skipping blanks.
    pub fn full_name(&self) -> String {
        [&self.surname, &self.name, &self.patronymic]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Summary counters over the loaded user list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub active_today: usize,
    pub average_streak: i64,
}

impl UserStats {
    pub fn compute<'a>(users: impl IntoIterator<Item = &'a UserSummary>, today: NaiveDate) -> Self {
        let mut total = 0usize;
        let mut active_today = 0usize;
        let mut streak_sum = 0.0;
        for user in users {
            total += 1;
            if user.last_activity_date() == Some(today) {
                active_today += 1;
            }
            streak_sum += user.streak_days();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let average_streak = if total == 0 {
            0
        } else {
            (streak_sum / total as f64).round() as i64
        };
        Self {
            total,
            active_today,
            average_streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<UserSummary> {
        serde_json::from_str(
            r#"[
                {"login":"anna","email":"anna@example.com","fio":"Ivanova Anna","streak":4,"lastActivity":"2025-03-14 09:12:00"},
                {"login":"boris","email":null,"fio":null,"streak":"3","lastActivity":"2025-03-13 22:00:00"},
                {"login":"vera","streak":null}
            ]"#,
        )
        .expect("valid json")
    }

    #[test]
    fn stats_count_active_today_and_round_average() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid");
        let stats = UserStats::compute(&users(), today);
        assert_eq!(
            stats,
            UserStats {
                total: 3,
                active_today: 1,
                average_streak: 2,
            }
        );
    }

    #[test]
    fn empty_stats_are_zero() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid");
        assert_eq!(UserStats::compute(&[], today), UserStats::default());
    }

    #[test]
    fn full_name_skips_blank_parts() {
        let details = UserDetails {
            login: "anna".to_owned(),
            email: None,
            name: Some("Anna".to_owned()),
            surname: Some("Ivanova".to_owned()),
            patronymic: Some(" ".to_owned()),
            current_streak: None,
            activity_level: None,
            daily_calorie_goal: None,
            last_activity: None,
            created_at: None,
        };
        assert_eq!(details.full_name(), "Ivanova Anna");
    }
}
