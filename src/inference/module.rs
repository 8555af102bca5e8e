//! Module outline types and their JSON wire shape
//!
//! The serialized form is part of the output contract:
//!
//! ```json
//! [{"module": "Account", "Description": "...", "Submodules": {"Privacy": "..."}}]
//! ```
//!
//! `module` is lowercase, `Description` and `Submodules` are capitalized,
//! and submodules keep their insertion order.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A named sub-feature of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    pub name: String,
    pub description: String,
}

impl Submodule {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A top-level section of a documentation site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub description: String,
    pub submodules: Vec<Submodule>,
}

impl Module {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            submodules: Vec::new(),
        }
    }

    pub fn with_submodule(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.submodules.push(Submodule::new(name, description));
        self
    }

    /// Looks up a submodule description by exact name
    pub fn submodule(&self, name: &str) -> Option<&str> {
        self.submodules
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.description.as_str())
    }
}

struct SubmoduleMap<'a>(&'a [Submodule]);

impl Serialize for SubmoduleMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for sub in self.0 {
            map.serialize_entry(&sub.name, &sub.description)?;
        }
        map.end()
    }
}

impl Serialize for Module {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("module", &self.name)?;
        map.serialize_entry("Description", &self.description)?;
        map.serialize_entry("Submodules", &SubmoduleMap(&self.submodules))?;
        map.end()
    }
}

/// The shape a remote model is asked to produce
#[derive(Deserialize)]
struct RawModule {
    module: String,

    #[serde(rename = "Description")]
    description: String,

    #[serde(rename = "Submodules", default)]
    submodules: Option<Map<String, Value>>,
}

impl RawModule {
    /// Validates the raw shape into a [`Module`]
    fn validate(self) -> Result<Module, String> {
        let name = self.module.trim().to_string();
        if name.is_empty() {
            return Err("module name is empty".to_string());
        }

        let mut submodules = Vec::new();
        for (sub_name, value) in self.submodules.unwrap_or_default() {
            let Value::String(description) = value else {
                return Err(format!(
                    "submodule '{}' of '{}' has a non-string description",
                    sub_name, name
                ));
            };
            submodules.push(Submodule::new(sub_name.trim(), description.trim()));
        }

        Ok(Module {
            name,
            description: self.description.trim().to_string(),
            submodules,
        })
    }
}

impl<'de> Deserialize<'de> for Module {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawModule::deserialize(deserializer)?;
        raw.validate().map_err(D::Error::custom)
    }
}
