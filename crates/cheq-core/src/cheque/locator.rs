//! Spatial location of field values relative to anchors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::anchors::{AnchorCandidate, AnchorIndex, AnchorKind};
use super::context::LayoutContext;
use super::fallback::{self, Heuristic};
use crate::layout::Rect;
use crate::models::config::SpatialConfig;
use crate::models::ExtractionMethod;

/// A rectangle in fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Region {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Non-empty and inside the unit square.
    pub fn is_valid(&self) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.x0)
            && unit.contains(&self.y0)
            && unit.contains(&self.x1)
            && unit.contains(&self.y1)
            && self.x0 < self.x1
            && self.y0 < self.y1
    }

    /// The region in pixel coordinates.
    pub fn to_rect(&self, width: u32, height: u32) -> Rect {
        let (w, h) = (width as f32, height as f32);
        Rect {
            min_x: self.x0 * w,
            min_y: self.y0 * h,
            max_x: self.x1 * w,
            max_y: self.y1 * h,
        }
    }
}

/// Where a value sits relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relation {
    /// Same line, to the right.
    RightOf,
    /// The next line, starting under or right of the anchor.
    Below,
    /// Inside a fixed region; anchors are not consulted.
    WithinRegion(Region),
}

/// A located run of tokens and its text.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub tokens: Vec<usize>,
    pub text: String,
}

/// A span with how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub span: TokenSpan,
    pub method: ExtractionMethod,
    /// Similarity of the anchor used, for anchor-based spans.
    pub anchor_score: Option<f32>,
}

/// One way of finding a field, tried in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    Anchor { kind: AnchorKind, relation: Relation },
    Region(Region),
    Fallback(Heuristic),
}

/// Limits for one field's search.
pub struct SpanRequest<'r> {
    pub max_span: usize,
    /// Tokens already claimed by other fields.
    pub blocked: &'r HashSet<usize>,
    /// Cheap plausibility check on a candidate span.
    pub accept: &'r dyn Fn(&TokenSpan) -> bool,
}

/// Locate a value against a list of anchor candidates.
///
/// Candidates are tried best first; the first that yields a span passing
/// `accept` wins. Merging stops at any token in `stop`. With
/// `Relation::WithinRegion` the candidates are ignored.
pub fn locate_field<'c>(
    ctx: &LayoutContext<'_>,
    spatial: &SpatialConfig,
    candidates: &'c [AnchorCandidate],
    relation: Relation,
    stop: &HashSet<usize>,
    request: &SpanRequest<'_>,
) -> Option<(TokenSpan, Option<&'c AnchorCandidate>)> {
    let geometry = Geometry { ctx, spatial };

    if let Relation::WithinRegion(region) = relation {
        return geometry
            .within_region(region, stop, request)
            .map(|span| (span, None));
    }

    // Split labels yield overlapping candidates; their tokens are all label text.
    let label: HashSet<usize> = candidates.iter().flat_map(|c| c.tokens.iter().copied()).collect();

    for candidate in candidates {
        if candidate.tokens.iter().any(|t| request.blocked.contains(t)) {
            continue;
        }
        let span = match relation {
            Relation::RightOf => geometry.right_of(candidate, &label, stop, request.max_span),
            Relation::Below => geometry.below(candidate, stop, request.max_span),
            Relation::WithinRegion(_) => None,
        };
        match span {
            Some(span) if (request.accept)(&span) => return Some((span, Some(candidate))),
            Some(span) => trace!("Rejected span '{}' next to {:?}", span.text, candidate.kind),
            None => {}
        }
    }

    None
}

struct Geometry<'g, 'a> {
    ctx: &'g LayoutContext<'a>,
    spatial: &'g SpatialConfig,
}

impl Geometry<'_, '_> {
    fn width(&self) -> f32 {
        self.ctx.layout().width() as f32
    }

    fn height(&self) -> f32 {
        self.ctx.layout().height() as f32
    }

    fn bounds(&self, tokens: &[usize]) -> Rect {
        tokens.iter().map(|&t| self.ctx.token(t).rect()).fold(
            Rect {
                min_x: f32::INFINITY,
                min_y: f32::INFINITY,
                max_x: f32::NEG_INFINITY,
                max_y: f32::NEG_INFINITY,
            },
            |acc, r| Rect {
                min_x: acc.min_x.min(r.min_x),
                min_y: acc.min_y.min(r.min_y),
                max_x: acc.max_x.max(r.max_x),
                max_y: acc.max_y.max(r.max_y),
            },
        )
    }

    /// Extend a span rightwards along `following` while gaps stay small.
    fn merge(
        &self,
        tokens: &mut Vec<usize>,
        parts: &mut Vec<String>,
        following: impl Iterator<Item = usize>,
        mut right_edge: f32,
        stop: &HashSet<usize>,
        max_span: usize,
    ) {
        let merge_gap = self.spatial.merge_gap * self.width();
        for t in following {
            if tokens.len() >= max_span || stop.contains(&t) {
                break;
            }
            let rect = self.ctx.token(t).rect();
            if rect.min_x - right_edge > merge_gap {
                break;
            }
            tokens.push(t);
            parts.push(self.ctx.token(t).text.trim().to_string());
            right_edge = rect.max_x;
        }
    }

    fn right_of(
        &self,
        candidate: &AnchorCandidate,
        label: &HashSet<usize>,
        stop: &HashSet<usize>,
        max_span: usize,
    ) -> Option<TokenSpan> {
        let mut anchor = self.bounds(&candidate.tokens);
        let last = *candidate.tokens.last()?;
        let anchor_right = anchor.max_x;

        let mut following = self
            .ctx
            .lines()
            .after(last)
            .iter()
            .copied()
            .filter(|&t| self.ctx.is_usable(t) && self.ctx.token(t).center().0 > anchor_right)
            .peekable();

        // Absorb adjacent words of the same label left outside this window.
        if candidate.remainder.is_none() {
            let merge_gap = self.spatial.merge_gap * self.width();
            while let Some(&t) = following.peek() {
                let rect = self.ctx.token(t).rect();
                if !label.contains(&t) || rect.min_x - anchor.max_x > merge_gap {
                    break;
                }
                anchor.max_x = rect.max_x;
                following.next();
            }
        }

        let mut tokens = Vec::new();
        let mut parts = Vec::new();
        let mut right_edge = anchor.max_x;

        if let Some(remainder) = &candidate.remainder {
            tokens.push(candidate.token_index());
            parts.push(remainder.clone());
        } else {
            let first = following.next()?;
            let rect = self.ctx.token(first).rect();
            if stop.contains(&first) || rect.min_x - anchor.max_x > self.spatial.max_horizontal_gap * self.width() {
                return None;
            }
            tokens.push(first);
            parts.push(self.ctx.token(first).text.trim().to_string());
            right_edge = rect.max_x;
        }

        self.merge(&mut tokens, &mut parts, following, right_edge, stop, max_span);

        if tokens.is_empty() {
            return None;
        }
        Some(TokenSpan {
            tokens,
            text: parts.join(" "),
        })
    }

    fn below(&self, candidate: &AnchorCandidate, stop: &HashSet<usize>, max_span: usize) -> Option<TokenSpan> {
        let anchor = self.bounds(&candidate.tokens);
        let lines = self.ctx.lines();
        let next = lines.lines().get(lines.line_of(candidate.token_index()) + 1)?;

        if next.top - anchor.max_y > self.spatial.max_vertical_gap * self.height() {
            return None;
        }

        let mut following = next
            .tokens
            .iter()
            .copied()
            .filter(|&t| self.ctx.is_usable(t) && self.ctx.token(t).rect().max_x >= anchor.min_x);

        let first = following.next()?;
        if stop.contains(&first) {
            return None;
        }

        let mut tokens = vec![first];
        let mut parts = vec![self.ctx.token(first).text.trim().to_string()];
        let right_edge = self.ctx.token(first).rect().max_x;
        self.merge(&mut tokens, &mut parts, following, right_edge, stop, max_span);

        Some(TokenSpan {
            tokens,
            text: parts.join(" "),
        })
    }

    fn within_region(&self, region: Region, stop: &HashSet<usize>, request: &SpanRequest<'_>) -> Option<TokenSpan> {
        let rect = region.to_rect(self.ctx.layout().width(), self.ctx.layout().height());
        let inside = |t: usize| {
            let (cx, cy) = self.ctx.token(t).center();
            self.ctx.is_usable(t) && rect.contains_point(cx, cy)
        };

        for start in self.ctx.usable_tokens() {
            if stop.contains(&start) || request.blocked.contains(&start) || !inside(start) {
                continue;
            }

            let mut tokens = vec![start];
            let mut parts = vec![self.ctx.token(start).text.trim().to_string()];
            let following = self
                .ctx
                .lines()
                .after(start)
                .iter()
                .copied()
                .take_while(|&t| inside(t));
            let right_edge = self.ctx.token(start).rect().max_x;
            self.merge(&mut tokens, &mut parts, following, right_edge, stop, request.max_span);

            let span = TokenSpan {
                tokens,
                text: parts.join(" "),
            };
            if (request.accept)(&span) {
                return Some(span);
            }
        }

        None
    }
}

/// Runs field strategies over one document.
pub struct FieldLocator<'a> {
    ctx: &'a LayoutContext<'a>,
    anchors: &'a AnchorIndex,
    spatial: &'a SpatialConfig,
}

impl<'a> FieldLocator<'a> {
    pub fn new(ctx: &'a LayoutContext<'a>, anchors: &'a AnchorIndex, spatial: &'a SpatialConfig) -> Self {
        Self { ctx, anchors, spatial }
    }

    /// Try each strategy in order and return the first accepted span.
    pub fn locate(&self, strategies: &[Strategy], request: &SpanRequest<'_>) -> Option<Located> {
        for strategy in strategies {
            let located = match *strategy {
                Strategy::Anchor { kind, relation } => {
                    let mut stop = self.anchors.covered_except(Some(kind));
                    stop.extend(request.blocked.iter().copied());
                    locate_field(
                        self.ctx,
                        self.spatial,
                        self.anchors.candidates(kind),
                        relation,
                        &stop,
                        request,
                    )
                    .map(|(span, candidate)| Located {
                        span,
                        method: ExtractionMethod::Anchor,
                        anchor_score: candidate.map(|c| c.score),
                    })
                }
                Strategy::Region(region) => {
                    let mut stop = self.anchors.covered_except(None);
                    stop.extend(request.blocked.iter().copied());
                    locate_field(
                        self.ctx,
                        self.spatial,
                        &[],
                        Relation::WithinRegion(region),
                        &stop,
                        request,
                    )
                    .map(|(span, _)| Located {
                        span,
                        method: ExtractionMethod::Region,
                        anchor_score: None,
                    })
                }
                Strategy::Fallback(heuristic) => {
                    let mut excluded = self.anchors.covered_except(None);
                    excluded.extend(request.blocked.iter().copied());
                    let merge_gap = self.spatial.merge_gap * self.ctx.layout().width() as f32;
                    fallback::locate(heuristic, self.ctx, &excluded, merge_gap, request).map(|span| Located {
                        span,
                        method: ExtractionMethod::Fallback,
                        anchor_score: None,
                    })
                }
            };

            if let Some(located) = located {
                trace!("Located '{}' via {:?}", located.span.text, strategy);
                return Some(located);
            }
        }

        None
    }
}
