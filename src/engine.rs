//! Rendering Engine - Branch Selection
//!
//! Picks exactly one block: BASE, else the SI block, else the first
//! matching SINO PERO, else SINO. Only the chosen body is substituted.

use thiserror::Error;
use tracing::{debug, warn};

use crate::blocks::{split_blocks, CommandBlock};
use crate::condition::{parse_condition, GrammarError};
use crate::context::{Context, EntityKind, EvaluationEvent};
use crate::evaluator::{evaluate_condition, EvaluationScope};
use crate::placeholder::{substitute, ResolutionError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Condition has no operations")]
    EmptyCondition,

    #[error("Change detection needs a 'previamente.ticket' object")]
    MissingPreviousSnapshot,
}

/// Result of one render. `NoMatch` and `Failed` are different outcomes:
/// the first means no branch applied, the second that the template or
/// context is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    NoMatch,
    Failed(EngineError),
}

impl RenderOutcome {
    pub fn rendered(&self) -> Option<&str> {
        match self {
            RenderOutcome::Rendered(text) => Some(text),
            RenderOutcome::NoMatch | RenderOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RenderOutcome::Failed(_))
    }
}

impl From<Result<Option<String>, EngineError>> for RenderOutcome {
    fn from(result: Result<Option<String>, EngineError>) -> Self {
        match result {
            Ok(Some(text)) => RenderOutcome::Rendered(text),
            Ok(None) => RenderOutcome::NoMatch,
            Err(e) => RenderOutcome::Failed(e),
        }
    }
}

/// One render request: a template plus the data it is evaluated against.
#[derive(Debug, Clone)]
pub struct Engine {
    template: String,
    context: Context,
    event: Option<EvaluationEvent>,
    entity: Option<EntityKind>,
}

impl Engine {
    pub fn new(
        template: impl Into<String>,
        context: Context,
        event: Option<EvaluationEvent>,
        entity: Option<EntityKind>,
    ) -> Self {
        Self {
            template: template.into(),
            context,
            event,
            entity,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the template. Any error collapses into [`RenderOutcome::Failed`].
    pub fn start(&self) -> RenderOutcome {
        let outcome = RenderOutcome::from(self.try_render());
        if let RenderOutcome::Failed(e) = &outcome {
            warn!(error = %e, "template render failed");
        }
        outcome
    }

    /// Render the template, keeping the failure cause.
    ///
    /// `Ok(None)` means no block applied.
    pub fn try_render(&self) -> Result<Option<String>, EngineError> {
        let blocks = split_blocks(&self.template);
        debug!(blocks = blocks.len(), "template split");

        match self.select(&blocks)? {
            Some(block) => {
                debug!(kind = block.kind().keyword(), "branch selected");
                Ok(Some(substitute(block.body(), &self.context)?))
            }
            None => {
                debug!("no branch matched");
                Ok(None)
            }
        }
    }

    fn select<'b>(&self, blocks: &'b [CommandBlock]) -> Result<Option<&'b CommandBlock>, EngineError> {
        if let Some(base) = blocks.iter().find(|b| matches!(b, CommandBlock::Base { .. })) {
            return Ok(Some(base));
        }

        let si = blocks.iter().find(|b| matches!(b, CommandBlock::Si { .. }));
        let sino_pero = blocks.iter().filter(|b| matches!(b, CommandBlock::SinoPero { .. }));

        for block in si.into_iter().chain(sino_pero) {
            if self.holds(block)? {
                return Ok(Some(block));
            }
        }

        Ok(blocks.iter().find(|b| matches!(b, CommandBlock::Sino { .. })))
    }

    fn holds(&self, block: &CommandBlock) -> Result<bool, EngineError> {
        let operations = parse_condition(block.condition().unwrap_or_default())?;
        let scope = EvaluationScope {
            context: &self.context,
            event: self.event,
            entity: self.entity,
        };
        let verdict = evaluate_condition(&operations, &scope)?;
        debug!(
            kind = block.kind().keyword(),
            operations = operations.len(),
            verdict,
            "condition evaluated"
        );
        Ok(verdict)
    }
}
