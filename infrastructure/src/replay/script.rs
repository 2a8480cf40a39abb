use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read replay script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid replay script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Recorded chain outputs and tool responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// Raw outputs per chain id, consumed in order
    pub chains: HashMap<String, Vec<Value>>,
    /// Canned results per tool id and function name
    pub tools: BTreeMap<String, HashMap<String, Value>>,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_chain(mut self, chain_id: impl Into<String>, outputs: Vec<Value>) -> Self {
        self.chains.insert(chain_id.into(), outputs);
        self
    }

    pub fn with_tool_result(
        mut self,
        tool_id: impl Into<String>,
        function: impl Into<String>,
        result: Value,
    ) -> Self {
        self.tools
            .entry(tool_id.into())
            .or_default()
            .insert(function.into(), result);
        self
    }
}
