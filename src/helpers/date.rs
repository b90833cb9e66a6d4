//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

/// A timestamp that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp: {0:?}")]
pub struct DateError(pub String);

/// Display locale for dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    PtBr,
    En,
}

const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl Locale {
    /// Resolve a language tag such as `pt-BR` or `en_US`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase().replace('_', "-");
        match tag.as_str() {
            "pt" | "pt-br" => Some(Locale::PtBr),
            t if t == "en" || t.starts_with("en-") => Some(Locale::En),
            _ => None,
        }
    }

    /// Abbreviated month name, `month` is 1-based
    pub fn month_abbrev(self, month: u32) -> &'static str {
        let idx = (month.clamp(1, 12) - 1) as usize;
        match self {
            Locale::PtBr => PT_BR_MONTHS[idx],
            Locale::En => EN_MONTHS[idx],
        }
    }
}

/// Formats publication timestamps as `dd MMM yyyy` in a fixed locale and time zone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(Locale::PtBr, Tz::UTC)
    }
}

impl DateFormatter {
    pub fn new(locale: Locale, timezone: Tz) -> Self {
        Self { locale, timezone }
    }

    /// Build from the `language` and `timezone` settings, falling back to
    /// English and UTC for values we don't know
    pub fn from_settings(language: &str, timezone: &str) -> Self {
        let locale = Locale::from_tag(language).unwrap_or_else(|| {
            tracing::warn!("Unsupported language {:?}, formatting dates in English", language);
            Locale::En
        });
        let timezone = if timezone.trim().is_empty() {
            Tz::UTC
        } else {
            timezone.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!("Unknown timezone {:?}, using UTC", timezone);
                Tz::UTC
            })
        };
        Self::new(locale, timezone)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Format an optional ISO-8601 timestamp; absent values format as ""
    pub fn format(&self, value: Option<&str>) -> Result<String, DateError> {
        match value {
            None => Ok(String::new()),
            Some(s) => {
                let date = parse_timestamp(s).ok_or_else(|| DateError(s.to_string()))?;
                Ok(self.format_date(&date))
            }
        }
    }

    /// Format an already parsed date
    pub fn format_date<Z: TimeZone>(&self, date: &DateTime<Z>) -> String {
        let local = date.with_timezone(&self.timezone);
        format!(
            "{:02} {} {}",
            local.day(),
            self.locale.month_abbrev(local.month()),
            local.year()
        )
    }
}

/// Parse RFC 3339 timestamps, the `+0000` offset form the CMS emits, and
/// bare dates (taken as UTC midnight)
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(date);
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    utc.from_local_datetime(&day.and_hms_opt(0, 0, 0)?).single()
}
