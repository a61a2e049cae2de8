use std::path::Path;

use listcart_core::extract_items;

use super::{read_text, Context};
use crate::OutputFormat;

/// Normalize, parse and de-duplicate a list without touching the network.
pub(crate) fn cmd_parse(input: &Path, ctx: &Context<'_>) {
    let text = match read_text(input) {
        Ok(text) => text,
        Err(e) => ctx.fail(&e),
    };

    let items = extract_items(&text);
    match ctx.output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&items)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            for item in &items {
                println!("{} x {}", item.quantity(), item.name());
            }
            ctx.note(&format!("{} items", items.len()));
        }
    }
}
