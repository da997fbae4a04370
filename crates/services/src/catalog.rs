use icenet_executor::ArgGuard;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Service entry {0} has an empty display name")]
    EmptyDisplayName(usize),

    #[error("Invalid unit name '{unit}': {reason}")]
    InvalidUnitName { unit: String, reason: String },

    #[error("Duplicate unit name: {0}")]
    DuplicateUnit(String),
}

/// A unit the control panel manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub display_name: String,
    pub unit_name: String,
    #[serde(default)]
    pub description: String,
    /// Journal phrases meaning the machine lacks hardware the unit needs.
    /// A non-empty list turns on the post-failure hardware check for `start`.
    #[serde(default)]
    pub hardware_markers: Vec<String>,
}

impl ServiceRef {
    pub fn new(display_name: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            unit_name: unit_name.into(),
            description: String::new(),
            hardware_markers: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_hardware_markers(mut self, markers: &[&str]) -> Self {
        self.hardware_markers = markers.iter().map(|m| (*m).to_string()).collect();
        self
    }
}

/// Fixed set of managed units, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalog {
    services: Vec<ServiceRef>,
}

impl ServiceCatalog {
    pub fn new(services: Vec<ServiceRef>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for (idx, service) in services.iter().enumerate() {
            if service.display_name.trim().is_empty() {
                return Err(CatalogError::EmptyDisplayName(idx));
            }
            ArgGuard::validate_unit_name(&service.unit_name).map_err(|e| {
                CatalogError::InvalidUnitName {
                    unit: service.unit_name.clone(),
                    reason: e.to_string(),
                }
            })?;
            if !seen.insert(service.unit_name.as_str()) {
                return Err(CatalogError::DuplicateUnit(service.unit_name.clone()));
            }
        }
        Ok(Self { services })
    }

    /// The units shipped with IceNet-OS.
    pub fn icenet_default() -> Self {
        Self {
            services: vec![
                ServiceRef::new("Thermal Management", "icenet-thermal")
                    .with_description("CPU-based heating for cold environments")
                    .with_hardware_markers(&[
                        "no thermal zones found",
                        "no thermal sensors",
                        "thermal sensor not found",
                    ]),
                ServiceRef::new("Meshtastic Bridge (Headless)", "meshtastic-bridge")
                    .with_description("Headless bridge service for Meshtastic radios"),
                ServiceRef::new("Mesh Bridge GUI", "mesh-bridge-gui")
                    .with_description("Visual interface for mesh bridge configuration"),
            ],
        }
    }

    pub fn get(&self, unit_name: &str) -> Option<&ServiceRef> {
        self.services.iter().find(|s| s.unit_name == unit_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRef> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::icenet_default()
    }
}
