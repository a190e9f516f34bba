//! Fuzzy matching of field labels against noisy token text.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::context::LayoutContext;
use crate::layout::TokenLayout;
use crate::models::config::ExtractionConfig;

/// Currency symbols split from the digits they prefix.
pub const CURRENCY_SYMBOLS: &[char] = &['$', '£', '€', '₹', '¥'];

/// Named field identities marked by a printed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// "PAY TO THE ORDER OF".
    PayeeLabel,
    /// "DATE".
    DateLabel,
    /// Currency symbol or code in front of the numeric amount box.
    AmountNumericBox,
    /// "THE SUM OF" / "RUPEES" in front of the written amount.
    AmountWordsLabel,
    /// "CHEQUE NO".
    ChequeNumberLabel,
}

/// A label with its accepted textual variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub variants: Vec<String>,
    /// Minimum similarity in [0, 1] for a match.
    pub threshold: f32,
}

impl Anchor {
    pub fn new(kind: AnchorKind, variants: &[&str], threshold: f32) -> Self {
        Self {
            kind,
            variants: variants.iter().map(|v| v.to_string()).collect(),
            threshold,
        }
    }

    /// Built-in anchor set for North American and Commonwealth cheques.
    pub fn default_set() -> Vec<Anchor> {
        vec![
            Anchor::new(
                AnchorKind::PayeeLabel,
                &["PAY TO THE ORDER OF", "PAY TO THE ORDER", "PAY TO", "PAY", "ORDER OF", "PAYEE"],
                0.8,
            ),
            Anchor::new(AnchorKind::DateLabel, &["DATE", "DATED"], 0.75),
            Anchor::new(
                AnchorKind::AmountNumericBox,
                &["$", "US$", "USD", "£", "€", "₹", "RS", "INR", "CAD"],
                0.9,
            ),
            Anchor::new(
                AnchorKind::AmountWordsLabel,
                &["THE SUM OF", "SUM OF", "RUPEES", "AMOUNT IN WORDS"],
                0.8,
            ),
            Anchor::new(
                AnchorKind::ChequeNumberLabel,
                &["CHEQUE NO", "CHECK NO", "CHQ NO", "CHEQUE NUMBER", "CHECK NUMBER", "NO"],
                0.8,
            ),
        ]
    }
}

/// A token window matching an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorCandidate {
    pub kind: AnchorKind,
    /// Matched tokens along one line; the first is the anchor position.
    pub tokens: Vec<usize>,
    /// Similarity in [0, 1].
    pub score: f32,
    /// Value text found in the same token after the label.
    pub remainder: Option<String>,
}

impl AnchorCandidate {
    pub fn token_index(&self) -> usize {
        self.tokens[0]
    }
}

/// Normalize OCR text for comparison.
///
/// Uppercases, drops `*` decoration, strips trailing `:`/`.`/`,` from words
/// and splits a leading currency symbol off the digits it prefixes.
pub fn normalize_words(text: &str) -> Vec<String> {
    let upper = text.to_uppercase().replace('*', " ");
    let mut words = Vec::new();

    for raw in upper.split_whitespace() {
        let word = if raw.chars().any(|c| c.is_alphanumeric()) {
            raw.trim_end_matches([':', '.', ','])
        } else {
            raw
        };

        let mut chars = word.chars();
        match chars.next() {
            Some(c) if CURRENCY_SYMBOLS.contains(&c) && !chars.as_str().is_empty() => {
                words.push(c.to_string());
                words.push(chars.as_str().to_string());
            }
            Some(_) => words.push(word.to_string()),
            None => {}
        }
    }

    words
}

/// Normalized text as a single space-joined string.
pub fn normalize_text(text: &str) -> String {
    normalize_words(text).join(" ")
}

/// Levenshtein edit distance over characters.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Keep the shorter string in the inner loop.
    let (a, b, m, n) = if m <= n { (a, b, m, n) } else { (b, a, n, m) };

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Similarity in [0, 1]: `1 - distance / max(len)`.
pub fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f32 / max_len as f32
}

/// Best match of one token window against an anchor.
struct WindowMatch {
    score: f32,
    /// Label words consumed; larger wins ties.
    coverage: usize,
    remainder: Option<String>,
}

fn better(a: &WindowMatch, b: &WindowMatch) -> bool {
    a.score > b.score || (a.score == b.score && a.coverage > b.coverage)
}

/// Matches anchors against a layout.
pub struct AnchorMatcher<'a> {
    ctx: &'a LayoutContext<'a>,
    max_window: usize,
}

impl<'a> AnchorMatcher<'a> {
    pub fn new(ctx: &'a LayoutContext<'a>, max_window: usize) -> Self {
        Self {
            ctx,
            max_window: max_window.max(1),
        }
    }

    /// All candidates scoring at least the anchor's threshold, best first,
    /// ties broken by reading order.
    pub fn find_candidates(&self, anchor: &Anchor) -> Vec<AnchorCandidate> {
        let variants: Vec<String> = anchor
            .variants
            .iter()
            .map(|v| normalize_text(v))
            .filter(|v| !v.is_empty())
            .collect();
        if variants.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();

        for start in self.ctx.usable_tokens() {
            let window: Vec<usize> = std::iter::once(start)
                .chain(
                    self.ctx
                        .lines()
                        .after(start)
                        .iter()
                        .copied()
                        .take_while(|&t| self.ctx.is_usable(t)),
                )
                .take(self.max_window)
                .collect();

            let mut best: Option<(WindowMatch, usize)> = None;
            let mut words: Vec<String> = Vec::new();

            for len in 1..=window.len() {
                words.extend(normalize_words(&self.ctx.layout().tokens()[window[len - 1]].text));
                if words.is_empty() {
                    continue;
                }
                let joined = words.join(" ");

                for variant in &variants {
                    let m = WindowMatch {
                        score: similarity(&joined, variant),
                        coverage: words.len(),
                        remainder: None,
                    };
                    if best.as_ref().is_none_or(|(b, _)| better(&m, b)) {
                        best = Some((m, len));
                    }

                    if len == 1 && words.len() > 1 {
                        for k in 1..words.len() {
                            let m = WindowMatch {
                                score: similarity(&words[..k].join(" "), variant),
                                coverage: k,
                                remainder: Some(words[k..].join(" ")),
                            };
                            if best.as_ref().is_none_or(|(b, _)| better(&m, b)) {
                                best = Some((m, 1));
                            }
                        }
                    }
                }
            }

            if let Some((m, len)) = best {
                if m.score >= anchor.threshold {
                    candidates.push(AnchorCandidate {
                        kind: anchor.kind,
                        tokens: window[..len].to_vec(),
                        score: m.score,
                        remainder: m.remainder,
                    });
                }
            }
        }

        let lines = self.ctx.lines();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| lines.rank(a.token_index()).cmp(&lines.rank(b.token_index())))
        });

        candidates
    }
}

/// Find candidates for one anchor over a whole layout, with the default
/// extraction settings.
pub fn find_anchor_candidates(layout: &TokenLayout, anchor: &Anchor) -> Vec<AnchorCandidate> {
    let extraction = ExtractionConfig::default();
    let ctx = LayoutContext::new(layout, extraction.min_token_confidence);
    AnchorMatcher::new(&ctx, extraction.max_anchor_window).find_candidates(anchor)
}

/// Candidates of every configured anchor for one document.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    candidates: HashMap<AnchorKind, Vec<AnchorCandidate>>,
}

impl AnchorIndex {
    pub fn build(ctx: &LayoutContext<'_>, anchors: &[Anchor], max_window: usize) -> Self {
        let matcher = AnchorMatcher::new(ctx, max_window);
        let candidates = anchors
            .iter()
            .map(|anchor| (anchor.kind, matcher.find_candidates(anchor)))
            .collect();
        Self { candidates }
    }

    /// Candidates of one kind, best first.
    pub fn candidates(&self, kind: AnchorKind) -> &[AnchorCandidate] {
        self.candidates.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tokens covered by candidates of any kind other than `kind`.
    pub fn covered_except(&self, kind: Option<AnchorKind>) -> HashSet<usize> {
        self.candidates
            .iter()
            .filter(|(k, _)| Some(**k) != kind)
            .flat_map(|(_, cands)| cands.iter().flat_map(|c| c.tokens.iter().copied()))
            .collect()
    }
}
