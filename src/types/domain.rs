//! Domain Terminology
//!
//! Bilingual vocabulary shared by the prompt builder, the template fallback and
//! the fact validator. Metric keys are usually English snake_case
//! (`avg_grade`) while narratives are Indonesian ("rata-rata nilai"), so
//! every stage resolves words through the same table.

use std::collections::BTreeSet;

/// One concept with its Indonesian display label and all accepted spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainTerm {
    /// Canonical English key fragment
    pub canonical: &'static str,
    /// Indonesian label used when rendering the metric
    pub label: &'static str,
    /// Lowercase spellings recognized in keys and narratives
    pub aliases: &'static [&'static str],
    /// Statistic terms lead the label ("rata-rata nilai", not "nilai rata-rata")
    pub statistic: bool,
}

const fn term(
    canonical: &'static str,
    label: &'static str,
    aliases: &'static [&'static str],
    statistic: bool,
) -> DomainTerm {
    DomainTerm {
        canonical,
        label,
        aliases,
        statistic,
    }
}

pub const DOMAIN_TERMS: &[DomainTerm] = &[
    // Statistics
    term("avg", "rata-rata", &["avg", "mean", "average", "rata-rata", "rerata", "rata"], true),
    term("median", "median", &["median", "tengah"], true),
    term("min", "minimum", &["min", "minimum", "terendah", "terkecil", "lowest"], true),
    term("max", "maksimum", &["max", "maximum", "maksimum", "tertinggi", "terbesar", "highest"], true),
    term("std", "simpangan baku", &["std", "stdev", "deviation", "simpangan", "deviasi", "standar"], true),
    term("total", "total", &["total", "sum", "jumlah"], true),
    term("count", "jumlah", &["count", "jumlah", "banyaknya", "banyak"], true),
    term("unique", "jumlah kategori", &["unique", "unik", "kategori", "berbeda"], true),
    term("most_common", "paling umum", &["most", "common", "terbanyak", "paling", "umum", "dominan"], true),
    term("rate", "tingkat", &["rate", "ratio", "rasio", "persentase", "persen", "percent", "tingkat"], true),
    // Academic
    term("grade", "nilai", &["grade", "grades", "nilai", "score", "skor"], false),
    term("gpa", "IPK", &["gpa", "ipk", "indeks", "prestasi"], false),
    term("student", "mahasiswa", &["student", "students", "mahasiswa", "siswa"], false),
    term("attendance", "kehadiran", &["attendance", "kehadiran", "presensi", "absensi"], false),
    term("credit", "SKS", &["credit", "credits", "sks"], false),
    term("semester", "semester", &["semester"], false),
    term("pass", "kelulusan", &["pass", "passed", "lulus", "kelulusan"], false),
    term("midterm", "UTS", &["midterm", "uts", "mid"], false),
    term("final", "UAS", &["final", "uas"], false),
    term("assignment", "tugas", &["assignment", "tugas", "homework"], false),
    // Finance
    term("revenue", "pendapatan", &["revenue", "income", "pendapatan", "pemasukan"], false),
    term("expense", "pengeluaran", &["expense", "expenses", "pengeluaran", "biaya", "cost"], false),
    term("balance", "saldo", &["balance", "saldo", "sisa"], false),
    term("profit", "laba", &["profit", "laba", "keuntungan", "surplus"], false),
    term("budget", "anggaran", &["budget", "anggaran"], false),
    term("payment", "pembayaran", &["payment", "payments", "pembayaran", "bayar"], false),
    term("amount", "nominal", &["amount", "nominal", "besaran"], false),
    term("tuition", "UKT", &["tuition", "ukt", "spp", "kuliah"], false),
];

/// Words that may hold a record count in narrative text
pub const RECORD_COUNT_ALIASES: &[&str] = &[
    "record", "records", "data", "catatan", "baris", "entri", "responden", "jumlah", "total",
    "sebanyak", "tercatat",
];

/// Find the term a single lowercase word belongs to
pub fn lookup(word: &str) -> Option<&'static DomainTerm> {
    let word = word.trim_matches(|c: char| c == '-' || c == '\'');
    DOMAIN_TERMS
        .iter()
        .find(|t| t.canonical == word || t.aliases.contains(&word))
}

/// Split a metric key into lowercase tokens (`avg_grade` -> `["avg", "grade"]`)
pub fn key_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| c == '_' || c == ' ' || c == '-' || c == '.' || c == '/')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Indonesian display label for a metric key
///
/// Known statistic terms move to the front and unknown tokens pass through
/// unchanged, so `ipk_mean` renders as "rata-rata IPK".
pub fn indonesian_label(name: &str) -> String {
    let mut statistics = Vec::new();
    let mut subjects = Vec::new();

    for token in key_tokens(name) {
        match lookup(&token) {
            Some(t) if t.statistic => statistics.push(t.label.to_string()),
            Some(t) => subjects.push(t.label.to_string()),
            None => subjects.push(token),
        }
    }

    statistics.dedup();
    statistics
        .into_iter()
        .chain(subjects)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every lowercase word that can refer to the metric with this key and label
pub fn metric_aliases(name: &str, label: Option<&str>) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();

    let label_words = label
        .map(|l| {
            l.split_whitespace()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    for token in key_tokens(name).into_iter().chain(label_words) {
        if let Some(t) = lookup(&token) {
            aliases.insert(t.canonical.to_string());
            aliases.extend(t.aliases.iter().map(|a| a.to_string()));
        }
        aliases.insert(token);
    }

    aliases
}
