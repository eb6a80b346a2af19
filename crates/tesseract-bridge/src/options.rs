//! Per-request engine configuration.
//!
//! A request's `args` mapping is parsed once, up front, into an ordered list of [`EngineOption`]s. The reserved
//! `psm` key becomes a typed [`EngineOption::SegmentationMode`]; every other key is an engine variable that is
//! forwarded verbatim. Parsing happens before the engine is touched, so a malformed `psm` never leaves the engine
//! half-configured.
//!
//! [`apply_options`] then forwards all variables in request order and sets the segmentation mode exactly once,
//! after the variables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engine::OcrEngine;
use crate::error::{BridgeError, Result};
use crate::types::PageSegMode;

/// Reserved option key selecting the page segmentation mode.
pub const PSM_KEY: &str = "psm";

/// One parsed request option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineOption {
    /// The reserved `psm` key
    SegmentationMode(PageSegMode),
    /// Any other key, forwarded as an engine variable assignment
    Variable { name: String, value: String },
}

impl EngineOption {
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        if key == PSM_KEY {
            return Ok(EngineOption::SegmentationMode(PageSegMode::parse(value)?));
        }
        Ok(EngineOption::Variable {
            name: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Parsed request options in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    entries: Vec<EngineOption>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_args(args: &IndexMap<String, String>) -> Result<Self> {
        let entries = args
            .iter()
            .map(|(key, value)| EngineOption::parse(key, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn push(&mut self, option: EngineOption) {
        self.entries.push(option);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The requested segmentation mode. When `psm` appears more than once the last one wins.
    pub fn segmentation_mode(&self) -> Option<PageSegMode> {
        self.entries.iter().rev().find_map(|option| match option {
            EngineOption::SegmentationMode(mode) => Some(*mode),
            EngineOption::Variable { .. } => None,
        })
    }

    /// Engine variables in request order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|option| match option {
            EngineOption::Variable { name, value } => Some((name.as_str(), value.as_str())),
            EngineOption::SegmentationMode(_) => None,
        })
    }
}

impl TryFrom<&IndexMap<String, String>> for EngineOptions {
    type Error = BridgeError;

    fn try_from(args: &IndexMap<String, String>) -> Result<Self> {
        Self::from_args(args)
    }
}

/// Apply parsed options to an initialized engine.
///
/// Variable assignment failures are logged and skipped; engines reject unknown variables routinely. Returns the
/// segmentation mode that was set.
pub fn apply_options(
    engine: &mut dyn OcrEngine,
    options: &EngineOptions,
    default_mode: PageSegMode,
) -> Result<PageSegMode> {
    for (name, value) in options.variables() {
        if let Err(e) = engine.set_variable(name, value) {
            tracing::warn!(variable = name, error = %e, "Engine rejected variable assignment, ignoring");
        }
    }

    let mode = options.segmentation_mode().unwrap_or(default_mode);
    engine
        .set_page_seg_mode(mode)
        .map_err(|e| BridgeError::recognition_with_source(format!("Failed to set PSM mode {}", mode.as_i32()), e))?;

    tracing::debug!(psm = mode.as_i32(), variables = options.len(), "Applied engine options");
    Ok(mode)
}
