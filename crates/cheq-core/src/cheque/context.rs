use crate::layout::{LineIndex, Token, TokenLayout};

/// A layout with its line index and the tokens trusted enough to read.
pub struct LayoutContext<'a> {
    layout: &'a TokenLayout,
    lines: LineIndex,
    usable: Vec<bool>,
}

impl<'a> LayoutContext<'a> {
    /// Tokens below `min_confidence` are ignored by matching and location.
    pub fn new(layout: &'a TokenLayout, min_confidence: f32) -> Self {
        let usable = layout
            .tokens()
            .iter()
            .map(|t| t.confidence >= min_confidence && !t.text.trim().is_empty())
            .collect();

        Self {
            layout,
            lines: layout.lines(),
            usable,
        }
    }

    pub fn layout(&self) -> &'a TokenLayout {
        self.layout
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn token(&self, index: usize) -> &'a Token {
        &self.layout.tokens()[index]
    }

    pub fn is_usable(&self, index: usize) -> bool {
        self.usable.get(index).copied().unwrap_or(false)
    }

    /// Usable tokens in reading order.
    pub fn usable_tokens(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.reading_order().filter(|&t| self.usable[t])
    }

    /// Mean recognition confidence of a set of tokens.
    pub fn mean_confidence(&self, tokens: &[usize]) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        tokens.iter().map(|&t| self.token(t).confidence).sum::<f32>() / tokens.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_tokens_are_skipped() {
        let layout = TokenLayout::new(
            vec![
                Token::from_rect("PAY", 10.0, 10.0, 40.0, 20.0, 0.9),
                Token::from_rect("~~", 60.0, 10.0, 20.0, 20.0, 0.1),
                Token::from_rect("JOHN", 90.0, 10.0, 40.0, 20.0, 0.7),
            ],
            200,
            100,
        );
        let ctx = LayoutContext::new(&layout, 0.3);

        assert!(!ctx.is_usable(1));
        assert_eq!(ctx.usable_tokens().collect::<Vec<_>>(), vec![0, 2]);
        assert!((ctx.mean_confidence(&[0, 2]) - 0.8).abs() < 1e-6);
        assert_eq!(ctx.mean_confidence(&[]), 0.0);
    }
}
