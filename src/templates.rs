//! Notification Template Catalogue
//!
//! One JSON file per template. The body is the conditional template text
//! handed to the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::context::{EntityKind, EvaluationEvent};

pub type TemplateId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Trigger this template is bound to, if any.
    #[serde(default)]
    pub event: Option<EvaluationEvent>,
    #[serde(default)]
    pub entity: Option<EntityKind>,
    pub body: String,
    pub template_version: String,
    pub engine_min_version: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub superseded_by: Option<String>,
}

/// Template registry - loads and caches templates
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, NotificationTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self { templates: HashMap::new() }
    }

    /// Load every `*.json` file in `dir`. Files that cannot be read or
    /// parsed are skipped.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if !dir.exists() {
            warn!(dir = %dir.display(), "templates directory does not exist");
            return Ok(registry);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<NotificationTemplate>(&content).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(template) => {
                    debug!(id = %template.id, path = %path.display(), "template loaded");
                    registry.register(template);
                }
                Err(error) => warn!(path = %path.display(), %error, "skipping template file"),
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&NotificationTemplate> {
        self.templates.get(id)
    }

    /// All templates, sorted by id.
    pub fn list(&self) -> Vec<&NotificationTemplate> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Non-deprecated templates bound to this trigger.
    pub fn find_for(&self, event: EvaluationEvent, entity: EntityKind) -> Vec<&NotificationTemplate> {
        self.list()
            .into_iter()
            .filter(|t| !t.deprecated && t.event == Some(event) && t.entity == Some(entity))
            .collect()
    }

    pub fn register(&mut self, template: NotificationTemplate) {
        self.templates.insert(template.id.clone(), template);
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
