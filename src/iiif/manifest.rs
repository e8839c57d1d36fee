//! IIIF Presentation 2 manifest, typed for exactly the fields the pipeline
//! reads and writes. Every other field is retained in a flattened map so a
//! round trip is lossless.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequences: Option<Vec<Sequence>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvases: Option<Vec<Canvas>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(rename = "@id")]
    pub id: String,
    /// Display label, string or number per the source manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    /// Held opaquely: only canvases that receive matches get this replaced,
    /// so pre-existing annotation data on other canvases survives untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).map_err(|err| AppError::Parse(format!("manifest: {err}")))
    }

    /// Canvases of the first sequence, the page order a viewer renders.
    pub fn canvases(&self) -> &[Canvas] {
        self.sequences
            .as_deref()
            .and_then(|sequences| sequences.first())
            .and_then(|sequence| sequence.canvases.as_deref())
            .unwrap_or(&[])
    }

    pub fn canvases_mut(&mut self) -> Option<&mut Vec<Canvas>> {
        self.sequences
            .as_mut()
            .and_then(|sequences| sequences.first_mut())
            .and_then(|sequence| sequence.canvases.as_mut())
    }

    pub fn to_pretty_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| AppError::Internal(err.to_string()))
    }
}

impl Canvas {
    /// The label as display text; `None` when the label is absent or not a
    /// scalar.
    pub fn label_text(&self) -> Option<String> {
        match self.label.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}
