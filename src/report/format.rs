//! Formatted terminal output: run summary, comparison sentence, holiday table.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use chrono::{Datelike, NaiveDate};

use crate::calendar::{CALENDAR_VERSION, HolidayCalendar};
use crate::domain::{ComparisonResult, Locale, ModelDiagnostics};
use crate::forecast::ForecastOutcome;
use crate::io::ingest::{IngestedSeries, StartDateOrigin};

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];
const MONTHS_IT: [&str; 12] = [
    "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto", "settembre", "ottobre",
    "novembre", "dicembre",
];

/// Round to an integer and group thousands (`,` in English, `.` in Italian).
pub fn format_number(value: f64, locale: Locale) -> String {
    let sep = match locale {
        Locale::En => ',',
        Locale::It => '.',
    };
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Signed percentage with two decimals (`+12.50%`, Italian `+12,50%`).
pub fn format_percent(value: f64, locale: Locale) -> String {
    let s = format!("{value:+.2}%");
    match locale {
        Locale::En => s,
        Locale::It => s.replace('.', ","),
    }
}

/// `20 March 2023` / `20 marzo 2023`.
pub fn format_date(date: NaiveDate, locale: Locale) -> String {
    let months = match locale {
        Locale::En => &MONTHS_EN,
        Locale::It => &MONTHS_IT,
    };
    format!("{} {} {}", date.day(), months[date.month0() as usize], date.year())
}

/// The one-line narrative of the comparison.
pub fn format_comparison_sentence(c: &ComparisonResult, locale: Locale) -> String {
    let days = c.window_days;
    let total = format_number(c.sum_b, locale);
    let pct = format_percent(c.percent_change, locale);
    let label = c.trend.label(locale);
    let a_start = format_date(c.period_a.start_exclusive.succ_opt().unwrap_or(c.period_a.start_exclusive), locale);
    let b_end = format_date(c.period_b.end_inclusive, locale);

    match locale {
        Locale::En => format!(
            "Traffic over the last {days} days of the forecast is projected at {total}, \
             a {pct} {label} on the previous {days} days ({a_start} to {b_end})."
        ),
        Locale::It => format!(
            "Il traffico negli ultimi {days} giorni della previsione è stimato in {total}, \
             con una variazione del {pct} ({label}) rispetto ai {days} giorni precedenti \
             (dal {a_start} al {b_end})."
        ),
    }
}

fn format_diagnostics(d: &ModelDiagnostics, locale: Locale) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "- config: {} (changepoints={}, yearly order={}, weekly order={}, holiday regressors={})\n",
        d.label, d.changepoints, d.yearly_order, d.weekly_order, d.holiday_regressors
    ));
    out.push_str(&format!(
        "- fit: n={} RMSE={} BIC={:.2}\n",
        d.n,
        format_number(d.rmse, locale),
        d.bic
    ));
    out.push_str(&format!(
        "- candidates: {} fitted, {} skipped\n",
        d.candidates_fitted, d.candidates_skipped
    ));
    out
}

/// Format the full run summary (dataset stats + fit diagnostics + comparison).
pub fn format_run_summary(
    ingest: &IngestedSeries,
    forecast: &ForecastOutcome,
    comparison: &ComparisonResult,
    locale: Locale,
) -> String {
    let mut out = String::new();

    out.push_str("=== tf - Traffic Forecast ===\n");
    out.push_str(&format!("Source: {}\n", ingest.source_kind.display_name()));
    if let Some((date, origin)) = ingest.start_date {
        let from = match origin {
            StartDateOrigin::Explicit => "--start-date",
            StartDateOrigin::ExportHeader => "export header",
        };
        out.push_str(&format!("Start date: {} (from {from})\n", format_date(date, locale)));
    }
    if let Some(warning) = &ingest.sniff_warning {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    out.push_str(&format!(
        "Rows: read={} used={} dropped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.dropped()
    ));
    for e in ingest.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if ingest.row_errors.len() > 5 {
        out.push_str(&format!("  ... and {} more\n", ingest.row_errors.len() - 5));
    }

    let series = &ingest.series;
    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        out.push_str(&format!(
            "History: {} to {} ({} points, total {})\n",
            format_date(first, locale),
            format_date(last, locale),
            series.len(),
            format_number(series.total(), locale)
        ));
    }
    if let Some(last) = forecast.series.last_date() {
        out.push_str(&format!(
            "Forecast: through {} ({} projected days)\n",
            format_date(last, locale),
            forecast.series.projected().count()
        ));
    }

    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format_diagnostics(&forecast.diagnostics, locale));

    out.push('\n');
    out.push_str(&format_comparison_sentence(comparison, locale));
    out.push('\n');

    out
}

/// Format the holiday calendar as a table.
pub fn format_holiday_table(calendar: &HolidayCalendar, locale: Locale) -> String {
    let window = calendar.window();
    let mut out = String::new();
    out.push_str(&format!(
        "Holiday calendar {CALENDAR_VERSION}: {} events, window [-{}, +{}] days\n",
        calendar.len(),
        window.days_before,
        window.days_after
    ));
    out.push_str(&format!("{:<14} {:<20} {}\n", "Date", "Name", "Label"));
    for e in calendar.events() {
        out.push_str(&format!(
            "{:<14} {:<20} {}\n",
            e.date.format("%Y-%m-%d").to_string(),
            e.name,
            format_date(e.date, locale)
        ));
    }
    out
}
