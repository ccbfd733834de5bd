//! Phrases that signal invented context or model hedging
//!
//! A narrative may only restate the summary. Mentions of surveys, earlier
//! periods, national figures or the model itself point at content that did
//! not come from the data.

const FABRICATION_MARKERS: &[&str] = &[
    // Outside sources
    "menurut survei",
    "berdasarkan survei",
    "hasil survei",
    "menurut penelitian",
    "berdasarkan penelitian",
    "studi menunjukkan",
    "penelitian menunjukkan",
    "menurut sumber",
    "menurut data nasional",
    "secara nasional",
    "rata-rata nasional",
    // Earlier periods the summary does not cover
    "dibandingkan tahun lalu",
    "dibandingkan tahun sebelumnya",
    "tahun lalu",
    "tahun sebelumnya",
    "periode sebelumnya",
    "meningkat dari",
    "menurun dari",
    // Speculation
    "diperkirakan",
    "kemungkinan besar",
    "diasumsikan",
    // Model talking about itself
    "sebagai model bahasa",
    "sebagai ai",
    "saya tidak dapat",
    "tidak dapat dipastikan",
    "data yang diberikan tidak",
    "data tidak tersedia",
    "informasi tidak tersedia",
    // English leakage
    "according to",
    "as an ai",
    "last year",
    "industry average",
    "national average",
];

/// Distinct markers present in the text, longest phrase first
///
/// A marker only counts on word boundaries, and a shorter marker inside a
/// longer one already found ("tahun lalu" in "dibandingkan tahun lalu") is
/// not reported again.
pub fn find_markers(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut markers: Vec<&'static str> = FABRICATION_MARKERS.to_vec();
    markers.sort_by_key(|m| std::cmp::Reverse(m.len()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found = Vec::new();

    for marker in markers {
        let mut hit = false;
        for (start, _) in lower.match_indices(marker) {
            let end = start + marker.len();
            if !on_word_boundary(&lower, start, end) {
                continue;
            }
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            claimed.push((start, end));
            hit = true;
        }
        if hit {
            found.push(marker);
        }
    }

    found
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}
