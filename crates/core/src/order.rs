//! The interactive ordering session exposed to a front end.
//!
//! An [`OrderSession`] runs one pipeline per input (photo, list text, chat
//! message or recipe name) and publishes its progress through watch
//! channels: the pending set under review, a status line, a terminal
//! result message and a busy flag. The front end edits the pending set and
//! then confirms or cancels.
//!
//! Every new input, cancel and reset starts a new generation. A pipeline
//! that finishes after its generation has been replaced publishes nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{CartApi, CatalogSearch};
use crate::classify::{Intent, IntentClassifier};
use crate::commit::{CommitCoordinator, CommitReport};
use crate::local_cart::LocalCart;
use crate::oracle::Assistant;
use crate::parser::extract_items;
use crate::pending::{PendingEdit, PendingSet};
use crate::recipe::{Expansion, RecipeExpander};
use crate::reconcile::{Reconciler, ResolutionMode};
use crate::resolve::{ProductResolver, SEARCH_LIMIT};
use crate::session::SessionEvents;
use crate::types::{ImageData, ParsedItem};

const IDLE_STATUS: &str = "Take a photo or upload an image of your grocery list.";

/// One user-initiated request.
#[derive(Debug, Clone)]
pub enum OrderInput {
    /// Free text with one item per line.
    ListText(String),
    /// A photographed list.
    Image(ImageData),
    /// A chat message, classified before anything is looked up.
    Chat(String),
    /// A recipe name whose ingredients are looked up.
    Recipe(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfig {
    pub location_id: String,
    pub search_limit: usize,
    pub resolution_mode: ResolutionMode,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            location_id: "01400943".to_string(),
            search_limit: SEARCH_LIMIT,
            resolution_mode: ResolutionMode::Sequential,
        }
    }
}

/// How a call to [`OrderSession::set_input`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A pending set is waiting for confirmation.
    Pending,
    /// Nothing could be extracted or resolved.
    NothingFound,
    /// The message was answered conversationally.
    Replied,
    /// The assistant failed before anything was resolved.
    Failed,
    /// A newer input, cancel or reset replaced this one.
    Superseded,
}

pub struct OrderSession {
    assistant: Arc<dyn Assistant>,
    classifier: IntentClassifier,
    expander: RecipeExpander,
    reconciler: Reconciler,
    committer: CommitCoordinator,
    pending: watch::Sender<Option<PendingSet>>,
    status: watch::Sender<String>,
    result: watch::Sender<Option<String>>,
    busy: watch::Sender<bool>,
    generation: AtomicU64,
}

impl OrderSession {
    pub fn new(
        assistant: Arc<dyn Assistant>,
        catalog: Arc<dyn CatalogSearch>,
        cart: Arc<dyn CartApi>,
        local: LocalCart,
        events: SessionEvents,
        config: OrderConfig,
    ) -> Self {
        let resolver = ProductResolver::new(catalog, Arc::clone(&assistant), config.location_id)
            .with_limit(config.search_limit);
        Self {
            classifier: IntentClassifier::new(Arc::clone(&assistant)),
            expander: RecipeExpander::new(Arc::clone(&assistant)),
            reconciler: Reconciler::new(
                Arc::new(resolver),
                events.clone(),
                config.resolution_mode,
            ),
            committer: CommitCoordinator::new(cart, local, events),
            assistant,
            pending: watch::channel(None).0,
            status: watch::channel(IDLE_STATUS.to_string()).0,
            result: watch::channel(None).0,
            busy: watch::channel(false).0,
            generation: AtomicU64::new(0),
        }
    }

    // ── Observable state ─────────────────────────────────────────────────────

    pub fn pending(&self) -> Option<PendingSet> {
        self.pending.borrow().clone()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn result(&self) -> Option<String> {
        self.result.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<Option<PendingSet>> {
        self.pending.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn subscribe_result(&self) -> watch::Receiver<Option<String>> {
        self.result.subscribe()
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn local_cart(&self) -> &LocalCart {
        self.committer.local_cart()
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Run the pipeline for a new input up to the confirmation step.
    ///
    /// Discards any pending set from an earlier input.
    pub async fn set_input(&self, input: OrderInput) -> StageOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.send_replace(None);
        self.result.send_replace(None);
        self.busy.send_replace(true);

        let outcome = match input {
            OrderInput::ListText(text) => {
                self.set_status(generation, "Processing list...");
                let items = extract_items(&text);
                self.resolve_items(generation, items, "Couldn't find any items in the list.")
                    .await
            }
            OrderInput::Image(image) => self.run_image(generation, &image).await,
            OrderInput::Chat(text) => self.run_chat(generation, &text).await,
            OrderInput::Recipe(name) => self.run_recipe(generation, name.trim()).await,
        };

        if self.publish(&self.busy, generation, false) {
            tracing::debug!(?outcome, generation, "input processed");
            outcome
        } else {
            tracing::debug!(generation, "discarding superseded result");
            StageOutcome::Superseded
        }
    }

    /// Set a pending line's quantity; zero or less removes it.
    pub fn update_quantity(&self, product_id: &str, quantity: i64) -> bool {
        self.edit(PendingEdit::SetQuantity {
            product_id: product_id.to_string(),
            quantity,
        })
    }

    pub fn remove(&self, product_id: &str) -> bool {
        self.edit(PendingEdit::Remove {
            product_id: product_id.to_string(),
        })
    }

    /// Commit the pending set as it is now. `None` when nothing is pending.
    pub async fn confirm(&self) -> Option<CommitReport> {
        let set = self.pending.send_replace(None)?;
        self.busy.send_replace(true);
        self.status.send_replace("Adding items to cart...".to_string());

        let report = self.committer.commit(set).await;

        let summary = report.summary();
        self.status.send_replace(format!(
            "{} Scan another list or check your cart.",
            summary
        ));
        self.result.send_replace(Some(summary));
        self.busy.send_replace(false);
        Some(report)
    }

    /// Drop the pending set and ignore any pipeline still running.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.send_replace(None);
        self.busy.send_replace(false);
        self.status
            .send_replace("Cancelled. Take another photo or upload an image.".to_string());
    }

    /// Back to the idle state, clearing the result message too.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.send_replace(None);
        self.result.send_replace(None);
        self.busy.send_replace(false);
        self.status.send_replace(IDLE_STATUS.to_string());
    }

    pub fn clear_result(&self) {
        self.result.send_replace(None);
    }

    // ── Pipeline stages ──────────────────────────────────────────────────────

    async fn run_image(&self, generation: u64, image: &ImageData) -> StageOutcome {
        self.set_status(generation, "Analyzing image with AI...");
        let text = match self.assistant.transcribe(image).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "vision extraction failed, treating as empty");
                String::new()
            }
        };
        if !self.is_current(generation) {
            return StageOutcome::Superseded;
        }
        let items = extract_items(&text);
        self.resolve_items(
            generation,
            items,
            "No items found in the image. Try a clearer photo.",
        )
        .await
    }

    async fn run_chat(&self, generation: u64, text: &str) -> StageOutcome {
        self.set_status(generation, "Thinking...");
        let intent = self.classifier.classify(text).await;
        if !self.is_current(generation) {
            return StageOutcome::Superseded;
        }
        match intent {
            Intent::Items(items) => {
                self.resolve_items(generation, items, "Couldn't find any items in that message.")
                    .await
            }
            Intent::Recipe(name) => self.run_recipe(generation, &name).await,
            Intent::Conversation(text) => {
                let reply = self.assistant.converse(&text).await;
                if !self.is_current(generation) {
                    return StageOutcome::Superseded;
                }
                match reply {
                    Ok(reply) => {
                        self.set_status(generation, "");
                        self.set_result(generation, reply.trim().to_string());
                        StageOutcome::Replied
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "conversation failed");
                        self.set_result(
                            generation,
                            "The assistant is unavailable. Try naming the items you need."
                                .to_string(),
                        );
                        StageOutcome::Failed
                    }
                }
            }
        }
    }

    async fn run_recipe(&self, generation: u64, name: &str) -> StageOutcome {
        self.set_status(generation, &format!("Finding ingredients for {}...", name));
        let expansion = self.expander.expand(name).await;
        if !self.is_current(generation) {
            return StageOutcome::Superseded;
        }
        match expansion {
            Expansion::Failed(_) => {
                self.set_result(
                    generation,
                    "AI service temporarily unavailable. Please try again.".to_string(),
                );
                StageOutcome::Failed
            }
            Expansion::NoIngredients => {
                self.set_result(
                    generation,
                    format!("Couldn't determine ingredients for {}.", name),
                );
                StageOutcome::NothingFound
            }
            Expansion::Ingredients(names) => {
                self.set_status(
                    generation,
                    &format!(
                        "Found {} ingredients: {}. Searching...",
                        names.len(),
                        names.join(", ")
                    ),
                );
                let items = Expansion::Ingredients(names).into_items();
                self.resolve_items(
                    generation,
                    items,
                    &format!("Couldn't determine ingredients for {}.", name),
                )
                .await
            }
        }
    }

    async fn resolve_items(
        &self,
        generation: u64,
        items: Vec<ParsedItem>,
        nothing_message: &str,
    ) -> StageOutcome {
        if items.is_empty() {
            self.set_status(generation, nothing_message);
            return StageOutcome::NothingFound;
        }
        self.set_status(
            generation,
            &format!("Found {} items. Searching products...", items.len()),
        );

        let report_status = |message: String| self.set_status(generation, &message);
        let reconciliation = self.reconciler.reconcile(&items, &report_status).await;
        if !self.is_current(generation) {
            return StageOutcome::Superseded;
        }
        if reconciliation.session_expired {
            self.set_result(generation, "Session expired. Please log in again.".to_string());
        }

        match reconciliation.into_pending() {
            Some(set) => {
                self.set_status(
                    generation,
                    &format!("Found {} products. Review and confirm.", set.len()),
                );
                if !self.publish(&self.pending, generation, Some(set)) {
                    return StageOutcome::Superseded;
                }
                StageOutcome::Pending
            }
            None => {
                self.set_status(generation, "Couldn't find any products from the list.");
                StageOutcome::NothingFound
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Store `value` only while `generation` is current. The check runs under
    /// the channel's write lock; `cancel` and `reset` bump the generation
    /// before clearing.
    fn publish<T>(&self, tx: &watch::Sender<T>, generation: u64, value: T) -> bool {
        tx.send_if_modified(|slot| {
            if !self.is_current(generation) {
                return false;
            }
            *slot = value;
            true
        })
    }

    fn set_status(&self, generation: u64, message: &str) {
        self.publish(&self.status, generation, message.to_string());
    }

    fn set_result(&self, generation: u64, message: String) {
        self.publish(&self.result, generation, Some(message));
    }

    fn edit(&self, edit: PendingEdit) -> bool {
        let changed = self.pending.send_if_modified(|slot| edit.apply(slot));
        if changed && self.pending.borrow().is_none() {
            self.status
                .send_replace("Nothing left to confirm.".to_string());
        }
        changed
    }
}
