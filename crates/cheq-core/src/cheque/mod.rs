//! Cheque field extraction module.

pub mod anchors;
pub mod context;
pub mod fallback;
pub mod locator;
mod parser;
pub mod rules;
pub mod validator;

pub use anchors::{find_anchor_candidates, Anchor, AnchorCandidate, AnchorIndex, AnchorKind, AnchorMatcher};
pub use context::LayoutContext;
pub use fallback::Heuristic;
pub use locator::{locate_field, FieldLocator, Located, Region, Relation, SpanRequest, Strategy, TokenSpan};
pub use parser::{ChequeExtractor, ChequeParser};
pub use validator::CrossValidator;
