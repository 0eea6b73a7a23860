//! Configuration aggregate: a set of expectations plus tracking metadata,
//! loadable from JSON or YAML and exportable as the mocking engine's wire
//! JSON (a bare array of expectation objects).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::expectation::Expectation;
use crate::progressive;

/// Versioning and tracking information for a stored configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub project_id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Size in bytes of the stored snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ConfigMetadata {
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
            description: None,
            provider: None,
            size: None,
        }
    }
}

/// Provenance and labeling options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ConfigSettings {
    fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.import_method.is_none()
            && self.tags.is_empty()
            && self.metadata.is_empty()
    }
}

/// Aggregate counts over a configuration's expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationStats {
    pub total: usize,
    pub by_method: BTreeMap<String, usize>,
    pub by_status_code: BTreeMap<u16, usize>,
}

/// A complete configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockConfiguration {
    pub metadata: ConfigMetadata,
    pub expectations: Vec<Expectation>,
    #[serde(default, skip_serializing_if = "ConfigSettings::is_empty")]
    pub settings: ConfigSettings,
}

impl MockConfiguration {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            metadata: ConfigMetadata::new(project_id),
            expectations: Vec::new(),
            settings: ConfigSettings::default(),
        }
    }

    /// Check structural requirements, reporting the first offending field by
    /// its path.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.project_id.is_empty() {
            return Err(Error::validation("metadata.project_id", "project ID is required"));
        }
        if self.expectations.is_empty() {
            return Err(Error::validation(
                "expectations",
                "at least one expectation is required",
            ));
        }
        for (i, exp) in self.expectations.iter().enumerate() {
            if exp.http_request.method.is_empty() {
                return Err(Error::validation(
                    format!("expectations[{i}].httpRequest.method"),
                    "HTTP method is required",
                ));
            }
            if exp.http_request.path.is_empty() {
                return Err(Error::validation(
                    format!("expectations[{i}].httpRequest.path"),
                    "HTTP path is required",
                ));
            }
            if exp.http_response.status_code == 0 {
                return Err(Error::validation(
                    format!("expectations[{i}].httpResponse.statusCode"),
                    "HTTP status code is required",
                ));
            }
            if let Some(policy) = &exp.progressive {
                policy.validate().map_err(|e| {
                    Error::validation(format!("expectations[{i}].progressive"), e.to_string())
                })?;
            }
        }
        Ok(())
    }

    /// Wrap a raw wire-format array (as served by the mocking engine) in a
    /// fresh configuration.
    pub fn from_wire_json(json: &str) -> Result<Self> {
        let expectations: Vec<Expectation> = serde_json::from_str(json)?;
        info!(count = expectations.len(), "imported wire-format expectations");
        Ok(Self {
            metadata: ConfigMetadata::new(""),
            expectations,
            settings: ConfigSettings::default(),
        })
    }

    /// Render the expectations as the engine's wire JSON: a pretty-printed
    /// array. The internal progressive policy is not part of the engine's
    /// schema and is stripped from the output.
    pub fn to_wire_json(&self) -> Result<String> {
        let wire: Vec<Expectation> = self
            .expectations
            .iter()
            .map(|e| {
                let mut e = e.deep_clone();
                e.progressive = None;
                e
            })
            .collect();
        Ok(serde_json::to_string_pretty(&wire)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Expand all progressive delay policies into their clone chains and
    /// refresh the update timestamp.
    pub fn expand_progressive(mut self) -> Self {
        self.expectations = progressive::expand_progressive(self.expectations);
        self.metadata.updated_at = Utc::now();
        self
    }

    pub fn stats(&self) -> ExpectationStats {
        let mut stats = ExpectationStats {
            total: self.expectations.len(),
            ..ExpectationStats::default()
        };
        for exp in &self.expectations {
            *stats
                .by_method
                .entry(exp.http_request.method.to_ascii_uppercase())
                .or_default() += 1;
            *stats
                .by_status_code
                .entry(exp.http_response.status_code)
                .or_default() += 1;
        }
        stats
    }
}
