//! Metric keyword index
//!
//! Maps the words around a figure to the summary metrics they may name.

use std::collections::BTreeSet;

use super::extract::{FigureMention, extract_figures};
use crate::constants::validation::TRAILING_KEYWORD_WEIGHT;
use crate::types::domain::RECORD_COUNT_ALIASES;
use crate::types::{DataSummary, DatasetKind, metric_aliases};

/// Pseudo-metric name for the record count
pub const RECORD_COUNT: &str = "record_count";

/// Words that put a nearby number in calendar context
const DATE_WORDS: &[&str] = &[
    "tahun", "bulan", "hari", "tanggal", "minggu", "pekan", "semester", "periode", "angkatan",
    "ke", "kuartal", "triwulan", "jam", "pukul", "year", "month", "day", "week", "quarter",
    "januari", "februari", "maret", "april", "mei", "juni", "juli", "agustus", "september",
    "oktober", "november", "desember", "january", "february", "march", "may", "june", "july",
    "august", "october", "december",
];

#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub label: String,
    pub value: f64,
    pub display: String,
    aliases: BTreeSet<String>,
}

impl MetricEntry {
    fn matches(&self, word: &str) -> bool {
        let word = word.trim_matches(|c: char| c == '-' || c == '\'');
        self.aliases.contains(word)
    }
}

/// Keyword index over a summary's numeric metrics and record count
#[derive(Debug, Clone)]
pub struct MetricIndex {
    entries: Vec<MetricEntry>,
    /// Numbers embedded in categorical values ("Semester 5")
    category_numbers: Vec<f64>,
}

impl MetricIndex {
    pub fn new(summary: &DataSummary) -> Self {
        let kind = summary.dataset_kind();
        let mut record_aliases: BTreeSet<String> =
            RECORD_COUNT_ALIASES.iter().map(|a| a.to_string()).collect();
        record_aliases.extend(record_nouns(kind).iter().map(|n| n.to_string()));

        let mut entries = vec![MetricEntry {
            name: RECORD_COUNT.to_string(),
            label: "jumlah data".to_string(),
            value: summary.record_count() as f64,
            display: summary.record_count().to_string(),
            aliases: record_aliases,
        }];

        for (metric, value) in summary.numeric_metrics() {
            let label = metric.display_label();
            entries.push(MetricEntry {
                name: metric.name.clone(),
                aliases: metric_aliases(&metric.name, Some(&label)),
                label,
                value,
                display: metric.display_value(),
            });
        }

        let category_numbers = summary
            .categorical_metrics()
            .flat_map(|(_, value)| extract_figures(value))
            .flat_map(|figure| figure.candidates)
            .collect();

        Self {
            entries,
            category_numbers,
        }
    }

    pub fn entries(&self) -> &[MetricEntry] {
        &self.entries
    }

    /// Metrics named near the figure, strongest first
    ///
    /// Each matching word scores `1 / distance`; words after the figure are
    /// discounted. Ties keep summary order.
    pub fn keyword_matches(&self, mention: &FigureMention) -> Vec<(&MetricEntry, f64)> {
        let mut scored: Vec<(&MetricEntry, f64)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let before: f64 = mention
                    .before
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| entry.matches(w))
                    .map(|(i, _)| 1.0 / (i + 1) as f64)
                    .sum();
                let after: f64 = mention
                    .after
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| entry.matches(w))
                    .map(|(i, _)| TRAILING_KEYWORD_WEIGHT / (i + 1) as f64)
                    .sum();
                let score = before + after;
                (score > 0.0).then_some((entry, score))
            })
            .collect();

        // Stable sort keeps summary order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }

    /// Any metric or categorical number equal to one of the figure's readings
    pub fn value_match(&self, mention: &FigureMention, tolerance_pct: f64) -> Option<&MetricEntry> {
        self.entries.iter().find(|entry| {
            mention
                .candidates
                .iter()
                .any(|c| within_tolerance(*c, entry.value, tolerance_pct))
        })
    }

    pub fn in_categories(&self, mention: &FigureMention) -> bool {
        mention.candidates.iter().any(|c| {
            self.category_numbers
                .iter()
                .any(|n| within_tolerance(*c, *n, 0.0))
        })
    }
}

fn record_nouns(kind: DatasetKind) -> &'static [&'static str] {
    match kind {
        DatasetKind::Student => &["mahasiswa", "siswa", "students", "student"],
        DatasetKind::Finance => &["transaksi", "transactions", "transaction"],
        DatasetKind::Unknown => &[],
    }
}

/// Relative comparison; an expected zero needs an (almost) exact zero
pub fn within_tolerance(observed: f64, expected: f64, tolerance_pct: f64) -> bool {
    use crate::constants::validation::ZERO_ABS_TOLERANCE;

    if expected == 0.0 {
        return observed.abs() <= ZERO_ABS_TOLERANCE;
    }
    let allowed = (tolerance_pct / 100.0 * expected.abs()).max(expected.abs() * f64::EPSILON * 4.0);
    (observed - expected).abs() <= allowed
}

/// Year-shaped or next to a calendar word
pub fn is_date_like(mention: &FigureMention) -> bool {
    use crate::constants::validation::{YEAR_MAX, YEAR_MIN};

    let value = mention.primary();
    if mention.plain_integer && (YEAR_MIN..=YEAR_MAX).contains(&value) {
        return true;
    }

    let adjacent = |words: &[String]| {
        words
            .first()
            .map(|w| DATE_WORDS.contains(&w.trim_matches('-')))
            .unwrap_or(false)
    };
    adjacent(&mention.before) || adjacent(&mention.after)
}

/// Small counting numbers, years and dates that need no metric behind them
pub fn is_incidental(mention: &FigureMention) -> bool {
    use crate::constants::validation::SMALL_ORDINAL_MAX;

    let value = mention.primary();
    let small_ordinal = mention.plain_integer && value.abs() <= SMALL_ORDINAL_MAX;
    small_ordinal || is_date_like(mention)
}
