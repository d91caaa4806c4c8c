//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SiteConfig;
use crate::prismic::parse_date;

/// Formats publication timestamps in the site's locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    pub fn new(config: &SiteConfig) -> Self {
        Self::with(&config.chrono_locale(), &config.timezone)
    }

    pub fn with(locale: &str, timezone: &str) -> Self {
        Self {
            locale: to_locale(locale),
            timezone: to_timezone(timezone),
        }
    }

    /// Format a raw service timestamp; `None` when missing or unparseable
    pub fn format(&self, raw: Option<&str>, pattern: &str) -> Option<String> {
        let date = raw.and_then(parse_date)?;
        Some(self.format_date(&date, pattern))
    }

    pub fn format_date(&self, date: &DateTime<FixedOffset>, pattern: &str) -> String {
        let local = date.with_timezone(&self.timezone);
        format_date(&local, pattern, self.locale)
    }
}

/// Format a date using a Moment.js-compatible pattern and locale
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", Locale::pt_BR) // -> "15 mar 2021"
/// ```
pub fn format_date<Z: TimeZone>(date: &DateTime<Z>, format: &str, locale: Locale) -> String
where
    Z::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, locale).to_string()
}

/// Map a `language_REGION` name to a chrono locale, falling back to POSIX
fn to_locale(name: &str) -> Locale {
    match name {
        "pt_BR" | "pt" => Locale::pt_BR,
        "pt_PT" => Locale::pt_PT,
        "en_US" | "en" => Locale::en_US,
        "en_GB" => Locale::en_GB,
        "es_ES" | "es" => Locale::es_ES,
        "fr_FR" | "fr" => Locale::fr_FR,
        "de_DE" | "de" => Locale::de_DE,
        "it_IT" | "it" => Locale::it_IT,
        _ => {
            tracing::debug!("No locale data for {:?}, using POSIX", name);
            Locale::POSIX
        }
    }
}

/// Parse an IANA timezone name; empty or unknown names mean UTC
fn to_timezone(name: &str) -> Tz {
    if name.is_empty() {
        return Tz::UTC;
    }
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone {:?}, using UTC", name);
        Tz::UTC
    })
}

/// Current time as a unix timestamp
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Convert Moment.js format to chrono format
///
/// Text inside `[...]` is copied literally.
fn moment_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each letter
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("m", "%-M"),
        ("ss", "%S"),
        ("s", "%-S"),
        ("SSS", "%3f"),
        ("ZZ", "%z"),
        ("Z", "%:z"),
        ("A", "%p"),
        ("a", "%P"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                result.push_str(&rest[1..close].replace('%', "%%"));
                rest = &rest[close + 1..];
                continue;
            }
        }

        for (from, to) in TOKENS {
            if let Some(stripped) = rest.strip_prefix(from) {
                result.push_str(to);
                rest = stripped;
                continue 'outer;
            }
        }

        if c == '%' {
            result.push_str("%%");
        } else {
            result.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    result
}
