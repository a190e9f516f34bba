//! Inspect command - show text lines and anchor matches of a layout.

use std::path::Path;

use clap::Args;
use console::style;

use cheq_core::cheque::{AnchorIndex, LayoutContext};

use super::{load_config, InputArgs};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    input: InputArgs,
}

pub fn run(args: InspectArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let layout = args.input.load_layout()?;
    layout.validate()?;

    let ctx = LayoutContext::new(&layout, config.extraction.min_token_confidence);

    println!(
        "{} {} tokens, {}x{} px",
        style("Layout:").bold(),
        layout.len(),
        layout.width(),
        layout.height()
    );
    println!();

    println!("{}", style("Lines:").bold());
    for (i, line) in ctx.lines().lines().iter().enumerate() {
        let tokens: Vec<String> = line
            .tokens
            .iter()
            .map(|&t| {
                let token = ctx.token(t);
                let text = format!("[{}] \"{}\" ({:.2})", t, token.text, token.confidence);
                if ctx.is_usable(t) {
                    text
                } else {
                    style(text).dim().to_string()
                }
            })
            .collect();
        println!("  {:>3}  {}", i + 1, tokens.join("  "));
    }
    println!();

    let anchors = AnchorIndex::build(&ctx, &config.anchors, config.extraction.max_anchor_window);

    println!("{}", style("Anchors:").bold());
    let mut any = false;
    for anchor in &config.anchors {
        for candidate in anchors.candidates(anchor.kind) {
            any = true;
            let text: Vec<&str> = candidate.tokens.iter().map(|&t| ctx.token(t).text.as_str()).collect();
            let remainder = candidate
                .remainder
                .as_ref()
                .map(|r| format!(" -> '{}'", r))
                .unwrap_or_default();
            println!(
                "  {:<22} {:.2}  tokens {:?} \"{}\"{}",
                format!("{:?}", anchor.kind),
                candidate.score,
                candidate.tokens,
                text.join(" "),
                remainder
            );
        }
    }
    if !any {
        println!("  {}", style("no anchor matched").yellow());
    }

    Ok(())
}
