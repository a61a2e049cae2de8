//! `scan`, `chat` and `recipe`: run the pipeline, review, confirm.

use std::path::{Path, PathBuf};
use std::process;

use tokio::sync::broadcast::{self, error::TryRecvError};

use listcart_core::commit::CommitReport;
use listcart_core::{ImageData, OrderInput, OrderSession, PendingSet, SessionEvent, StageOutcome};

use super::{read_text, runtime, Context};
use crate::OutputFormat;

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Where an order starts.
#[derive(Debug, Clone)]
pub(crate) enum Request {
    ListFile(PathBuf),
    ImageFile(PathBuf),
    Chat(String),
    Recipe(String),
}

/// Edits applied to the pending set before confirming.
#[derive(Debug, Clone, Default)]
pub(crate) struct Review {
    pub set: Vec<(String, i64)>,
    pub drop: Vec<String>,
    pub yes: bool,
}

/// Parse a `--set PRODUCT_ID=QTY` argument.
pub(crate) fn parse_quantity_edit(s: &str) -> Result<(String, i64), String> {
    let (id, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PRODUCT_ID=QTY, got '{}'", s))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing product id in '{}'", s));
    }
    let qty = qty
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid quantity in '{}': {}", s, e))?;
    Ok((id.to_string(), qty))
}

pub(crate) fn cmd_order(request: Request, review: &Review, ctx: &Context<'_>) {
    let services = ctx.services();

    let input = match request {
        Request::ListFile(path) => match read_text(&path) {
            Ok(text) => OrderInput::ListText(text),
            Err(e) => ctx.fail(&e),
        },
        Request::ImageFile(path) => {
            if !services.has_oracle {
                ctx.fail(&format!(
                    "reading an image needs the assistant; set {} or pass --text",
                    ctx.config.assistant.api_key_env
                ));
            }
            match load_image(&path) {
                Ok(image) => OrderInput::Image(image),
                Err(e) => ctx.fail(&e),
            }
        }
        Request::Chat(message) => OrderInput::Chat(message),
        Request::Recipe(name) => OrderInput::Recipe(name),
    };

    if services.offline {
        ctx.note("Using the offline catalog; nothing is sent to a store.");
    }

    let mut expired = services.events.subscribe();
    let session = services.order_session(ctx.config);
    let rt = runtime(ctx);

    rt.block_on(async {
        let outcome = session.set_input(input).await;
        if session_expired(&mut expired) {
            ctx.fail(SESSION_EXPIRED);
        }

        match outcome {
            StageOutcome::Pending => {}
            StageOutcome::Replied => {
                let reply = session.result().unwrap_or_default();
                match ctx.output {
                    OutputFormat::Json => {
                        println!("{}", serde_json::json!({ "reply": reply }));
                    }
                    OutputFormat::Text => println!("{}", reply),
                }
                return;
            }
            StageOutcome::NothingFound | StageOutcome::Failed | StageOutcome::Superseded => {
                let msg = session.result().unwrap_or_else(|| session.status());
                ctx.fail(&msg);
            }
        }
        ctx.note(&session.status());

        apply_review(&session, review, ctx);
        let pending = match session.pending() {
            Some(pending) => pending,
            None => {
                ctx.note(&session.status());
                return;
            }
        };

        match ctx.output {
            OutputFormat::Text => print!("{}", render_pending(&pending)),
            OutputFormat::Json if !review.yes => eprint!("{}", render_pending(&pending)),
            OutputFormat::Json => {}
        }

        if !review.yes && !confirmed() {
            session.cancel();
            eprintln!("Order cancelled.");
            process::exit(1);
        }

        let report = match session.confirm().await {
            Some(report) => report,
            None => ctx.fail("nothing to confirm"),
        };
        let expired_on_commit = session_expired(&mut expired);

        match ctx.output {
            OutputFormat::Json => {
                let doc = serde_json::json!({ "pending": pending, "report": report });
                let pretty = serde_json::to_string_pretty(&doc)
                    .unwrap_or_else(|e| format!("serialization error: {}", e));
                println!("{}", pretty);
            }
            OutputFormat::Text => {
                print!("{}", render_report(&report));
                ctx.note(&session.status());
            }
        }

        if expired_on_commit {
            ctx.fail(SESSION_EXPIRED);
        }
        if report.success_count() == 0 {
            process::exit(1);
        }
    });
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn apply_review(session: &OrderSession, review: &Review, ctx: &Context<'_>) {
    for (product_id, quantity) in &review.set {
        if !session.update_quantity(product_id, *quantity) {
            ctx.fail(&format!("no pending item with id '{}'", product_id));
        }
    }
    for product_id in &review.drop {
        if !session.remove(product_id) {
            ctx.fail(&format!("no pending item with id '{}'", product_id));
        }
    }
}

fn confirmed() -> bool {
    eprintln!("Type 'yes' to add these items to your cart:");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).is_ok() && input.trim() == "yes"
}

fn session_expired(rx: &mut broadcast::Receiver<SessionEvent>) -> bool {
    match rx.try_recv() {
        Ok(SessionEvent::Unauthorized) | Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}

fn load_image(path: &Path) -> Result<ImageData, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        other => {
            return Err(format!(
                "unsupported image type '{}' for '{}'",
                other,
                path.display()
            ))
        }
    };
    let bytes = std::fs::read(path)
        .map_err(|e| format!("error reading '{}': {}", path.display(), e))?;
    Ok(ImageData::Raw {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

fn render_pending(pending: &PendingSet) -> String {
    let mut out = String::new();
    for item in pending.items() {
        out.push_str(&format!(
            "  {}  {}  x{}  ${:.2}\n",
            item.product_id,
            item.display_name,
            item.quantity,
            item.line_total()
        ));
    }
    if !pending.unavailable().is_empty() {
        out.push_str(&format!(
            "Unavailable: {}\n",
            pending.unavailable().join(", ")
        ));
    }
    out.push_str(&format!("Subtotal: ${:.2}\n", pending.subtotal()));
    out
}

fn render_report(report: &CommitReport) -> String {
    let mut out = format!("{}\n", report.summary());
    for line in &report.failed {
        out.push_str(&format!(
            "  failed: {} ({}): {}\n",
            line.display_name, line.product_id, line.reason
        ));
    }
    out
}
