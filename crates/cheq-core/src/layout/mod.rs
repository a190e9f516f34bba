//! Token layout: the OCR collaborator's output for one cheque image.

mod lines;

pub use lines::{LineIndex, TextLine};

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Fraction of an image dimension a polygon may overshoot the image bounds.
const BOUNDS_TOLERANCE: f32 = 0.02;

/// One recognized text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Recognized text content.
    pub text: String,

    /// Quadrilateral corners, clockwise from top-left: `[[x, y]; 4]`.
    #[serde(alias = "polygon")]
    pub bbox: [[f32; 2]; 4],

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl Token {
    pub fn new(text: impl Into<String>, bbox: [[f32; 2]; 4], confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }

    /// Axis-aligned token from its top-left corner and size.
    pub fn from_rect(text: impl Into<String>, x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Self {
        Self::new(
            text,
            [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
            confidence,
        )
    }

    /// Get the center point of the bounding polygon.
    pub fn center(&self) -> (f32, f32) {
        let x = self.bbox.iter().map(|p| p[0]).sum::<f32>() / 4.0;
        let y = self.bbox.iter().map(|p| p[1]).sum::<f32>() / 4.0;
        (x, y)
    }

    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> Rect {
        let mut rect = Rect {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        };
        for [x, y] in self.bbox {
            rect.min_x = rect.min_x.min(x);
            rect.min_y = rect.min_y.min(y);
            rect.max_x = rect.max_x.max(x);
            rect.max_y = rect.max_y.max(y);
        }
        rect
    }

    /// Text height along the polygon's left edge.
    ///
    /// Falls back to the rectangle height for degenerate polygons.
    pub fn height(&self) -> f32 {
        let dx = self.bbox[3][0] - self.bbox[0][0];
        let dy = self.bbox[3][1] - self.bbox[0][1];
        let edge = (dx * dx + dy * dy).sqrt();
        if edge > 0.0 { edge } else { self.rect().height() }
    }
}

/// Ordered tokens for one image plus the image's pixel dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLayout {
    width: u32,
    height: u32,
    tokens: Vec<Token>,
}

impl TokenLayout {
    pub fn new(tokens: Vec<Token>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tokens,
        }
    }

    /// Build a layout from PaddleOCR 3.x result arrays.
    ///
    /// Blank texts are dropped and the rest trimmed. Missing scores count as 0.
    pub fn from_paddle(
        texts: &[String],
        scores: &[f32],
        polys: &[[[f32; 2]; 4]],
        width: u32,
        height: u32,
    ) -> Self {
        let tokens = texts
            .iter()
            .zip(polys)
            .enumerate()
            .filter(|(_, (text, _))| !text.trim().is_empty())
            .map(|(i, (text, poly))| {
                Token::new(text.trim(), *poly, scores.get(i).copied().unwrap_or(0.0))
            })
            .collect();
        Self::new(tokens, width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Group tokens into text lines from their geometry.
    pub fn lines(&self) -> LineIndex {
        LineIndex::build(self)
    }

    /// Check the input contract.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.tokens.is_empty() {
            return Err(LayoutError::Empty);
        }

        let (w, h) = (self.width as f32, self.height as f32);
        let (tol_x, tol_y) = (w * BOUNDS_TOLERANCE, h * BOUNDS_TOLERANCE);

        for (index, token) in self.tokens.iter().enumerate() {
            if token.bbox.iter().flatten().any(|c| !c.is_finite()) {
                return Err(LayoutError::NonFiniteCoordinate { index });
            }
            if !(0.0..=1.0).contains(&token.confidence) {
                return Err(LayoutError::InvalidConfidence {
                    index,
                    confidence: token.confidence,
                });
            }
            let r = token.rect();
            if r.min_x < -tol_x || r.min_y < -tol_y || r.max_x > w + tol_x || r.max_y > h + tol_y {
                return Err(LayoutError::TokenOutOfBounds {
                    index,
                    width: self.width,
                    height: self.height,
                });
            }
        }

        Ok(())
    }
}
