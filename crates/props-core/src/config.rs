//! Activation parameters for a property store

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter naming the property whose value is the backing file path.
pub const PROP_FILE: &str = "props.file.propertyName";

/// Configuration a [`PropertyStore`](crate::PropertyStore) is activated with.
///
/// `file_property_name` is the first indirection: the name of a framework
/// or system property. That property's value, read at load time, is the
/// path of the backing file. One application can run several stores, each
/// pointed at its own file through its own property name.
///
/// ```toml
/// "props.file.propertyName" = "app.config.file"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "props.file.propertyName")]
    pub file_property_name: String,
}

impl StoreConfig {
    pub fn new(file_property_name: impl Into<String>) -> Self {
        Self {
            file_property_name: file_property_name.into(),
        }
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        config.validate()
    }

    /// Build from a flat activation parameter map.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let name = params.get(PROP_FILE).ok_or_else(|| Error::MissingParameter {
            name: PROP_FILE.to_string(),
        })?;
        Self::new(name.as_str()).validate()
    }

    fn validate(self) -> Result<Self> {
        if self.file_property_name.trim().is_empty() {
            return Err(Error::MissingParameter {
                name: PROP_FILE.to_string(),
            });
        }
        Ok(self)
    }
}
