//! Layout-free heuristics used when no anchor leads to a value.

use std::collections::HashSet;

use rust_decimal::Decimal;

use super::context::LayoutContext;
use super::locator::{SpanRequest, TokenSpan};
use super::rules::patterns::{DATE_NUMERIC_SEARCH, DATE_WRITTEN_SEARCH, MONEY_SHAPE};
use super::rules::{is_amount_word, is_number_word, looks_like_serial, parse_numeric_amount};

/// Words that never belong to a payee name.
const NON_NAME_WORDS: &[&str] = &[
    "PAY", "PAYEE", "ORDER", "BEARER", "DATE", "DATED", "BANK", "BRANCH", "ACCOUNT", "MEMO", "FOR",
    "SIGNATURE", "AUTHORISED", "AUTHORIZED", "SIGNATORY", "VALID", "MONTHS", "CHEQUE", "CHECK",
    "NOT", "NEGOTIABLE", "PAYABLE", "TO", "THE", "OF",
];

/// A heuristic for finding a field without anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// Two to four capitalized words with no digits.
    ProperName,
    /// The largest money-shaped number.
    LargestAmount,
    /// The line made mostly of number words.
    AmountWords,
    /// The first date-shaped text in reading order.
    DatePattern,
    /// The longest all-digit token.
    LongestDigits,
}

/// Whether text reads like a person or company name.
pub fn is_proper_name(text: &str) -> bool {
    let cleaned = text.replace('*', " ");
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }

    words.iter().all(|word| {
        let upper = word.to_uppercase();
        let mut chars = word.chars();
        let starts_upper = chars.next().is_some_and(|c| c.is_uppercase());
        starts_upper
            && chars.all(|c| c.is_alphabetic() || matches!(c, '.' | '\'' | '-' | '&'))
            && !NON_NAME_WORDS.contains(&upper.trim_end_matches('.'))
            && !is_amount_word(&upper)
    })
}

struct Scanner<'s, 'a> {
    ctx: &'s LayoutContext<'a>,
    excluded: &'s HashSet<usize>,
    merge_gap: f32,
    max_span: usize,
}

impl Scanner<'_, '_> {
    fn free(&self, t: usize) -> bool {
        self.ctx.is_usable(t) && !self.excluded.contains(&t)
    }

    fn text(&self, tokens: &[usize]) -> String {
        tokens
            .iter()
            .map(|&t| self.ctx.token(t).text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// For each free token in reading order, the contiguous run of free
    /// tokens it starts on its line.
    fn runs(&self) -> Vec<Vec<usize>> {
        self.ctx
            .usable_tokens()
            .filter(|&t| self.free(t))
            .map(|start| {
                let mut run = vec![start];
                let mut right = self.ctx.token(start).rect().max_x;
                for &t in self.ctx.lines().after(start) {
                    let rect = self.ctx.token(t).rect();
                    if run.len() >= self.max_span || !self.free(t) || rect.min_x - right > self.merge_gap {
                        break;
                    }
                    run.push(t);
                    right = rect.max_x;
                }
                run
            })
            .collect()
    }

    fn span(&self, tokens: &[usize]) -> TokenSpan {
        TokenSpan {
            tokens: tokens.to_vec(),
            text: self.text(tokens),
        }
    }

    fn proper_name(&self, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        let mut best: Option<(TokenSpan, f32)> = None;

        for run in self.runs() {
            let found = (1..=run.len())
                .rev()
                .map(|len| self.span(&run[..len]))
                .find(|span| is_proper_name(&span.text) && (request.accept)(span));

            if let Some(span) = found {
                let confidence = self.ctx.mean_confidence(&span.tokens);
                if best.as_ref().is_none_or(|(_, c)| confidence > *c) {
                    best = Some((span, confidence));
                }
            }
        }

        best.map(|(mut span, _)| {
            span.text = span.text.replace('*', " ").split_whitespace().collect::<Vec<_>>().join(" ");
            span
        })
    }

    fn largest_amount(&self, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        let mut best: Option<(TokenSpan, Decimal)> = None;

        for t in self.ctx.usable_tokens().filter(|&t| self.free(t)) {
            let span = self.span(&[t]);
            if !MONEY_SHAPE.is_match(&span.text) || DATE_NUMERIC_SEARCH.is_match(&span.text) {
                continue;
            }
            let Ok(value) = parse_numeric_amount(&span.text, true) else {
                continue;
            };
            if !(request.accept)(&span) {
                continue;
            }
            if best.as_ref().is_none_or(|(_, v)| value > *v) {
                best = Some((span, value));
            }
        }

        best.map(|(span, _)| span)
    }

    fn amount_words(&self, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        let mut best: Option<(TokenSpan, usize)> = None;

        for line in self.ctx.lines().lines() {
            let free: Vec<usize> = line.tokens.iter().copied().filter(|&t| self.free(t)).collect();
            let words: Vec<(usize, String)> = free
                .iter()
                .flat_map(|&t| {
                    self.ctx
                        .token(t)
                        .text
                        .replace('-', " ")
                        .split_whitespace()
                        .map(|w| (t, w.to_string()))
                        .collect::<Vec<_>>()
                })
                .collect();

            let numbers = words.iter().filter(|(_, w)| is_number_word(w)).count();
            if numbers < 2 || numbers * 2 < words.len() {
                continue;
            }

            let with_amount_words: Vec<usize> = free
                .iter()
                .copied()
                .filter(|&t| {
                    self.ctx
                        .token(t)
                        .text
                        .replace('-', " ")
                        .split_whitespace()
                        .any(is_amount_word)
                })
                .collect();
            let (Some(&first), Some(&last)) = (with_amount_words.first(), with_amount_words.last()) else {
                continue;
            };

            let start = free.iter().position(|&t| t == first).unwrap_or(0);
            let end = free.iter().position(|&t| t == last).unwrap_or(start);
            let tokens: Vec<usize> = free[start..=end].iter().copied().take(self.max_span).collect();
            let span = self.span(&tokens);

            if (request.accept)(&span) && best.as_ref().is_none_or(|(_, n)| numbers > *n) {
                best = Some((span, numbers));
            }
        }

        best.map(|(span, _)| span)
    }

    fn date_pattern(&self, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        for run in self.runs() {
            for len in 1..=run.len() {
                let text = self.text(&run[..len]).to_uppercase();
                let found = DATE_NUMERIC_SEARCH
                    .find(&text)
                    .or_else(|| DATE_WRITTEN_SEARCH.find(&text));
                if let Some(m) = found {
                    let span = TokenSpan {
                        tokens: run[..len].to_vec(),
                        text: m.as_str().to_string(),
                    };
                    if (request.accept)(&span) {
                        return Some(span);
                    }
                    break;
                }
            }
        }
        None
    }

    fn longest_digits(&self, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        let mut best: Option<(TokenSpan, usize)> = None;

        for t in self.ctx.usable_tokens().filter(|&t| self.free(t)) {
            let span = self.span(&[t]);
            if !looks_like_serial(&span.text) || !(request.accept)(&span) {
                continue;
            }
            let digits = span.text.chars().filter(|c| c.is_ascii_digit()).count();
            if best.as_ref().is_none_or(|(_, d)| digits > *d) {
                best = Some((span, digits));
            }
        }

        best.map(|(span, _)| span)
    }
}

/// Run one heuristic over the tokens not in `excluded`.
pub fn locate(
    heuristic: Heuristic,
    ctx: &LayoutContext<'_>,
    excluded: &HashSet<usize>,
    merge_gap: f32,
    request: &SpanRequest<'_>,
) -> Option<TokenSpan> {
    let scanner = Scanner {
        ctx,
        excluded,
        merge_gap,
        max_span: request.max_span.max(1),
    };

    match heuristic {
        Heuristic::ProperName => scanner.proper_name(request),
        Heuristic::LargestAmount => scanner.largest_amount(request),
        Heuristic::AmountWords => scanner.amount_words(request),
        Heuristic::DatePattern => scanner.date_pattern(request),
        Heuristic::LongestDigits => scanner.longest_digits(request),
    }
}
