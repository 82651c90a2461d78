//! Notify Template Core - Conditional Notification Templates
//!
//! A template is a list of blocks:
//! `[BASE]`, `[SI cond]`, `[SINO PERO cond]` and `[SINO]`, each closed by `[FIN]`.
//! Exactly one block is chosen and its `{{ placeholders }}` are filled
//! from the ticket/client context.
//!
//! # Outcomes
//! 1. Rendered - a block applied and every placeholder resolved
//! 2. No match - no condition held and there is no `[SINO]`
//! 3. Failed - bad condition grammar or an unresolved reference

pub mod blocks;
pub mod condition;
pub mod context;
pub mod placeholder;
pub mod evaluator;
pub mod engine;
pub mod templates;
pub mod pipeline;

pub use blocks::{split_blocks, BlockKind, CommandBlock};
pub use condition::{parse_condition, Comparator, Connective, GrammarError, Operation};
pub use context::{Context, ContextRoot, EntityKind, EvaluationEvent};
pub use placeholder::ResolutionError;
pub use engine::{Engine, EngineError, RenderOutcome};
pub use templates::{NotificationTemplate, TemplateId, TemplateRegistry};
pub use pipeline::{NotificationPipeline, PipelineError, RenderRequest, RenderStatus, RenderedMessage};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
