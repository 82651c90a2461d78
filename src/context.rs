//! Evaluation Context - Entity Roots
//!
//! Placeholders may only start from one of the fixed roots below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRoot {
    Usuario,
    Cliente,
    Ticket,
    Previamente,
    CategoriaDeServicio,
}

impl ContextRoot {
    pub const ALL: [ContextRoot; 5] = [
        ContextRoot::Usuario,
        ContextRoot::Cliente,
        ContextRoot::Ticket,
        ContextRoot::Previamente,
        ContextRoot::CategoriaDeServicio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextRoot::Usuario => "usuario",
            ContextRoot::Cliente => "cliente",
            ContextRoot::Ticket => "ticket",
            ContextRoot::Previamente => "previamente",
            ContextRoot::CategoriaDeServicio => "categoría_de_servicio",
        }
    }

    /// Match the first segment of a dotted path.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.as_str() == segment)
    }
}

impl fmt::Display for ContextRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event that triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationEvent {
    Creation,
    Modification,
    Elimination,
}

impl FromStr for EvaluationEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "creation" => Ok(Self::Creation),
            "modification" => Ok(Self::Modification),
            "elimination" => Ok(Self::Elimination),
            other => Err(format!("unknown event: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Ticket,
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ticket" => Ok(Self::Ticket),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Caller-supplied snapshot data, keyed by root name.
///
/// Keys that are not one of the [`ContextRoot`] names are kept but can
/// never be reached from a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    roots: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, root: ContextRoot, value: Value) -> Self {
        self.insert(root, value);
        self
    }

    pub fn insert(&mut self, root: ContextRoot, value: Value) {
        self.roots.insert(root.as_str().to_string(), value);
    }

    pub fn get(&self, root: ContextRoot) -> Option<&Value> {
        self.roots.get(root.as_str())
    }

    /// The `previamente.ticket` snapshot, when it is an object.
    pub fn previous_ticket(&self) -> Option<&Map<String, Value>> {
        self.get(ContextRoot::Previamente)?
            .get("ticket")?
            .as_object()
    }
}

impl TryFrom<Value> for Context {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_lookup_is_exact() {
        assert_eq!(ContextRoot::from_segment("ticket"), Some(ContextRoot::Ticket));
        assert_eq!(
            ContextRoot::from_segment("categoría_de_servicio"),
            Some(ContextRoot::CategoriaDeServicio)
        );
        assert_eq!(ContextRoot::from_segment("Ticket"), None);
        assert_eq!(ContextRoot::from_segment("desconocido"), None);
    }

    #[test]
    fn test_context_from_json() {
        let ctx = Context::try_from(json!({
            "ticket": {"estado": "ABIERTO"},
            "previamente": {"ticket": {"estado": "CERRADO"}}
        }))
        .unwrap();

        assert_eq!(ctx.get(ContextRoot::Ticket), Some(&json!({"estado": "ABIERTO"})));
        assert_eq!(ctx.previous_ticket().unwrap().get("estado"), Some(&json!("CERRADO")));
        assert!(ctx.get(ContextRoot::Cliente).is_none());
    }

    #[test]
    fn test_context_rejects_non_object() {
        assert!(Context::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_event_parse() {
        assert_eq!("MODIFICATION".parse::<EvaluationEvent>(), Ok(EvaluationEvent::Modification));
        assert!("update".parse::<EvaluationEvent>().is_err());
        assert_eq!("ticket".parse::<EntityKind>(), Ok(EntityKind::Ticket));
    }
}
