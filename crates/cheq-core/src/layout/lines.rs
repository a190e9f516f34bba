//! Text line grouping derived from token geometry.
//!
//! Input order is not trusted: tokens are bucketed by vertical center and
//! each line is re-sorted left to right.

use std::cmp::Ordering;

use super::TokenLayout;

/// Two tokens share a line when their centers are closer than this fraction
/// of the taller one's height.
const LINE_OVERLAP: f32 = 0.5;

/// A text line: token indices ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Token indices, left to right.
    pub tokens: Vec<usize>,
    /// Mean vertical center of the members.
    pub center_y: f32,
    /// Topmost edge of the members.
    pub top: f32,
    /// Bottommost edge of the members.
    pub bottom: f32,
}

/// Lines of a layout plus per-token lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    lines: Vec<TextLine>,
    line_of: Vec<usize>,
    rank: Vec<usize>,
}

impl LineIndex {
    pub fn build(layout: &TokenLayout) -> Self {
        let tokens = layout.tokens();

        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_by(|&a, &b| {
            let (_, ay) = tokens[a].center();
            let (_, by) = tokens[b].center();
            ay.partial_cmp(&by).unwrap_or(Ordering::Equal)
        });

        let mut lines: Vec<TextLine> = Vec::new();
        let mut line_height = 0.0f32;

        for idx in order {
            let token = &tokens[idx];
            let (_, cy) = token.center();
            let h = token.height();
            let rect = token.rect();

            let joins = lines.last().is_some_and(|line| {
                (cy - line.center_y).abs() <= LINE_OVERLAP * h.max(line_height)
            });

            match lines.last_mut() {
                Some(line) if joins => {
                    let n = line.tokens.len() as f32;
                    line.center_y = (line.center_y * n + cy) / (n + 1.0);
                    line.top = line.top.min(rect.min_y);
                    line.bottom = line.bottom.max(rect.max_y);
                    line.tokens.push(idx);
                    line_height = line_height.max(h);
                }
                _ => {
                    lines.push(TextLine {
                        tokens: vec![idx],
                        center_y: cy,
                        top: rect.min_y,
                        bottom: rect.max_y,
                    });
                    line_height = h;
                }
            }
        }

        for line in &mut lines {
            line.tokens.sort_by(|&a, &b| {
                tokens[a]
                    .rect()
                    .min_x
                    .partial_cmp(&tokens[b].rect().min_x)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let mut line_of = vec![0; tokens.len()];
        let mut rank = vec![0; tokens.len()];
        let mut next_rank = 0;
        for (line_idx, line) in lines.iter().enumerate() {
            for &idx in &line.tokens {
                line_of[idx] = line_idx;
                rank[idx] = next_rank;
                next_rank += 1;
            }
        }

        Self {
            lines,
            line_of,
            rank,
        }
    }

    /// Lines, top to bottom.
    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Index of the line holding a token.
    pub fn line_of(&self, token: usize) -> usize {
        self.line_of[token]
    }

    /// The line holding a token.
    pub fn line(&self, token: usize) -> &TextLine {
        &self.lines[self.line_of[token]]
    }

    /// Position of a token in reading order (top-to-bottom, left-to-right).
    pub fn rank(&self, token: usize) -> usize {
        self.rank[token]
    }

    /// Token indices in reading order.
    pub fn reading_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.iter().flat_map(|l| l.tokens.iter().copied())
    }

    /// Tokens following `token` on its line.
    pub fn after(&self, token: usize) -> &[usize] {
        let line = self.line(token);
        let pos = line.tokens.iter().position(|&t| t == token).unwrap_or(line.tokens.len());
        line.tokens.get(pos + 1..).unwrap_or(&[])
    }
}
