//! Notification Pipeline - Single Entry Point
//!
//! Looks up a catalogue template, checks it against this engine version
//! and renders it. Render failures are part of the message, not errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::{Context, EntityKind, EvaluationEvent};
use crate::engine::{Engine, RenderOutcome};
use crate::templates::{NotificationTemplate, TemplateRegistry};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template version {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    pub context: Context,
    #[serde(default)]
    pub event: Option<EvaluationEvent>,
    #[serde(default)]
    pub entity: Option<EntityKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Rendered,
    NoMatch,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub id: String,
    pub template_id: Option<String>,
    pub template_version: Option<String>,
    pub engine_version: String,
    pub rendered_at: DateTime<Utc>,
    pub status: RenderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderedMessage {
    fn from_outcome(template: Option<&NotificationTemplate>, outcome: RenderOutcome) -> Self {
        let (status, body, error) = match outcome {
            RenderOutcome::Rendered(text) => (RenderStatus::Rendered, Some(text), None),
            RenderOutcome::NoMatch => (RenderStatus::NoMatch, None, None),
            RenderOutcome::Failed(e) => (RenderStatus::Failed, None, Some(e.to_string())),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            template_id: template.map(|t| t.id.clone()),
            template_version: template.map(|t| t.template_version.clone()),
            engine_version: ENGINE_VERSION.to_string(),
            rendered_at: Utc::now(),
            status,
            body,
            error,
        }
    }
}

pub struct NotificationPipeline {
    registry: TemplateRegistry,
}

impl NotificationPipeline {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn list_templates(&self) -> Vec<&NotificationTemplate> {
        self.registry.list()
    }

    pub fn get_template(&self, id: &str) -> Option<&NotificationTemplate> {
        self.registry.get(id)
    }

    /// Render a catalogue template. The request's event and entity win
    /// over the ones the template is bound to.
    pub fn render(&self, template_id: &str, request: &RenderRequest) -> Result<RenderedMessage, PipelineError> {
        let template = self
            .registry
            .get(template_id)
            .ok_or_else(|| PipelineError::TemplateNotFound(template_id.to_string()))?;

        self.check_engine_version(template)?;

        if template.deprecated {
            warn!(
                id = %template.id,
                superseded_by = template.superseded_by.as_deref().unwrap_or("-"),
                "rendering deprecated template"
            );
        }

        let engine = Engine::new(
            template.body.as_str(),
            request.context.clone(),
            request.event.or(template.event),
            request.entity.or(template.entity),
        );
        let message = RenderedMessage::from_outcome(Some(template), engine.start());
        info!(id = %message.id, template = %template.id, status = ?message.status, "message rendered");
        Ok(message)
    }

    /// Render ad-hoc template text outside the catalogue.
    pub fn render_text(&self, template_text: &str, request: &RenderRequest) -> RenderedMessage {
        let engine = Engine::new(template_text, request.context.clone(), request.event, request.entity);
        let message = RenderedMessage::from_outcome(None, engine.start());
        info!(id = %message.id, status = ?message.status, "ad-hoc message rendered");
        message
    }

    fn check_engine_version(&self, template: &NotificationTemplate) -> Result<(), PipelineError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)?;
        let min_ver = semver::Version::parse(&template.engine_min_version)?;

        if engine_ver < min_ver {
            return Err(PipelineError::EngineVersionMismatch(
                template.template_version.clone(),
                template.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for NotificationPipeline {
    fn default() -> Self {
        Self::new(TemplateRegistry::default())
    }
}
