//! Figure extraction from narrative text
//!
//! Splits text into words, numbers and clause breaks, then turns every
//! number into a [`FigureMention`] carrying the words around it. Dates and
//! clock times are recognized first so their digits never become figures.
//! Separators inside a number are consumed by the number, so a comma only
//! acts as a break between words.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::validation::{CONTEXT_WORDS_AFTER, CONTEXT_WORDS_BEFORE};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<date>\b\d{1,4}[/-]\d{1,2}[/-]\d{1,4}\b|\b\d{1,2}:\d{2}\b)",
        r"|(?P<num>\d+(?:[.,]\d+)*(?:\s?%)?)",
        r"|(?P<word>\p{L}[\p{L}'-]*)",
        r"|(?P<brk>[.,!?;\n])",
    ))
    .expect("token pattern is valid")
});

/// Scale words that multiply the figure before them
const MAGNITUDES: &[(&str, f64)] = &[
    ("ribu", 1e3),
    ("rb", 1e3),
    ("thousand", 1e3),
    ("juta", 1e6),
    ("jt", 1e6),
    ("million", 1e6),
    ("miliar", 1e9),
    ("milyar", 1e9),
    ("billion", 1e9),
    ("triliun", 1e12),
    ("trillion", 1e12),
];

/// Words that turn a bare number into a percentage
const PERCENT_WORDS: &[&str] = &["persen", "percent"];

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    /// Lowercased word
    Word(String),
    /// `sign_len` is the byte length of a leading minus, 0 when positive
    Number { raw: String, sign_len: usize },
    Break,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// A number found in narrative text with its surrounding words
#[derive(Debug, Clone, PartialEq)]
pub struct FigureMention {
    /// Figure as written, sign and scale word included
    pub raw: String,
    /// Every value the written figure may stand for
    pub candidates: Vec<f64>,
    /// Words before the figure, nearest first
    pub before: Vec<String>,
    /// Words after the figure, nearest first
    pub after: Vec<String>,
    /// Written without a decimal or thousands separator
    pub plain_integer: bool,
    /// Text from the first context word through the figure
    pub claim: String,
}

impl FigureMention {
    pub fn primary(&self) -> f64 {
        self.candidates.first().copied().unwrap_or(f64::NAN)
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            if caps.name("date").is_some() {
                return None;
            }
            if let Some(m) = caps.name("num") {
                return Some(Token {
                    kind: TokenKind::Number {
                        raw: m.as_str().to_string(),
                        sign_len: sign_len(text, m.start()),
                    },
                    start: m.start(),
                    end: m.end(),
                });
            }
            if let Some(m) = caps.name("word") {
                return Some(Token {
                    kind: TokenKind::Word(m.as_str().to_lowercase()),
                    start: m.start(),
                    end: m.end(),
                });
            }
            caps.name("brk").map(|m| Token {
                kind: TokenKind::Break,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// A minus sign counts only when it opens the figure (`Rp -1500`, `(-3)`)
fn sign_len(text: &str, start: usize) -> usize {
    let mut preceding = text[..start].chars().rev();
    let sign = match preceding.next() {
        Some(c @ ('-' | '−')) => c,
        _ => return 0,
    };
    match preceding.next() {
        None => sign.len_utf8(),
        Some(c) if c.is_whitespace() || c == '(' => sign.len_utf8(),
        Some(_) => 0,
    }
}

/// Parse a written number into its possible values
///
/// - both `.` and `,` present: the last one is the decimal separator
/// - one separator repeated: thousands grouping
/// - one separator followed by exactly three digits: ambiguous, both readings
/// - trailing `%`: the fraction is a candidate too
///
/// Grouping must be well formed (a lead group of one to three digits, then
/// groups of exactly three); anything else, such as `12.05.2024`, yields no
/// values.
pub fn parse_number(raw: &str) -> Vec<f64> {
    let percent = raw.ends_with('%');
    let digits = raw.trim_end_matches('%').trim_end();

    let dots = digits.matches('.').count();
    let commas = digits.matches(',').count();

    let readings: Vec<String> = match (dots, commas) {
        (0, 0) => vec![digits.to_string()],
        (d, c) if d > 0 && c > 0 => {
            let last_dot = digits.rfind('.').unwrap_or(0);
            let last_comma = digits.rfind(',').unwrap_or(0);
            let (decimal, thousands) = if last_dot > last_comma {
                ('.', ',')
            } else {
                (',', '.')
            };
            match digits.rsplit_once(decimal) {
                Some((int, frac)) if well_grouped(int, thousands) && !frac.contains(thousands) => {
                    vec![format!("{}.{}", int.replace(thousands, ""), frac)]
                }
                _ => Vec::new(),
            }
        }
        (n, 0) | (0, n) if n > 1 => {
            let separator = if dots > 0 { '.' } else { ',' };
            if well_grouped(digits, separator) {
                vec![digits.replace(separator, "")]
            } else {
                Vec::new()
            }
        }
        _ => {
            let normalized = digits.replace(',', ".");
            match normalized.split_once('.') {
                Some((int, frac)) if frac.len() == 3 && int.len() <= 3 && int != "0" => {
                    vec![format!("{}{}", int, frac), normalized.clone()]
                }
                _ => vec![normalized],
            }
        }
    };

    let mut values: Vec<f64> = readings.iter().filter_map(|r| r.parse().ok()).collect();
    if percent {
        let fractions: Vec<f64> = values.iter().map(|v| v / 100.0).collect();
        values.extend(fractions);
    }
    values
}

fn well_grouped(int: &str, separator: char) -> bool {
    let mut groups = int.split(separator);
    let lead_ok = groups
        .next()
        .is_some_and(|lead| (1..=3).contains(&lead.len()) || !int.contains(separator));
    lead_ok && groups.all(|group| group.len() == 3)
}

fn magnitude(word: &str) -> Option<f64> {
    MAGNITUDES
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, factor)| *factor)
}

/// Every figure in the text, in reading order
pub fn extract_figures(text: &str) -> Vec<FigureMention> {
    let tokens = tokenize(text);
    let mut figures = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let TokenKind::Number { raw, sign_len } = &token.kind else {
            continue;
        };

        let mut candidates = parse_number(raw);
        if candidates.is_empty() {
            continue;
        }
        let plain_integer = !raw.contains(['.', ',']);
        let mut end = token.end;
        let mut after_start = idx + 1;

        // Scale word and spelled-out percent belong to the figure
        if let Some(Token {
            kind: TokenKind::Word(next),
            end: next_end,
            ..
        }) = tokens.get(idx + 1)
        {
            if let Some(factor) = magnitude(next) {
                candidates.iter_mut().for_each(|v| *v *= factor);
                end = *next_end;
                after_start += 1;
            } else if PERCENT_WORDS.contains(&next.as_str()) && !raw.ends_with('%') {
                let fractions: Vec<f64> = candidates.iter().map(|v| v / 100.0).collect();
                candidates.extend(fractions);
                end = *next_end;
                after_start += 1;
            }
        }

        if *sign_len > 0 {
            candidates.iter_mut().for_each(|v| *v = -*v);
        }

        let mut before = Vec::new();
        let mut claim_start = token.start;
        for prev in tokens[..idx].iter().rev() {
            match &prev.kind {
                TokenKind::Word(w) if before.len() < CONTEXT_WORDS_BEFORE => {
                    before.push(w.clone());
                    claim_start = prev.start;
                }
                _ => break,
            }
        }

        let after: Vec<String> = tokens[after_start.min(tokens.len())..]
            .iter()
            .map_while(|next| match &next.kind {
                TokenKind::Word(w) => Some(w.clone()),
                _ => None,
            })
            .take(CONTEXT_WORDS_AFTER)
            .collect();

        let raw_start = token.start - sign_len;
        let written = text
            .get(raw_start..end)
            .unwrap_or(raw.as_str())
            .to_string();
        let claim = text
            .get(claim_start.min(raw_start)..end)
            .unwrap_or(written.as_str())
            .to_string();

        figures.push(FigureMention {
            raw: written,
            candidates,
            before,
            after,
            plain_integer,
            claim,
        });
    }

    figures
}

/// Whitespace-separated tokens that carry at least one letter or digit
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .count()
}
