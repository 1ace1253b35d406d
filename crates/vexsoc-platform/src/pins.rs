//! Board pin catalogue.
//!
//! Logical signal groups available on a board, plus the connectors that
//! extensions may place new groups on. Requesting a resource records a pin
//! requirement for the downstream constraint resolver; physical assignment is
//! not performed here.

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

/// One named signal within a resource (e.g. `creset` on `pmoda:1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Subsignal {
    pub name: String,
    /// Pin designator, either a package pin or `connector:index`.
    pub pins: String,
    #[serde(default)]
    pub io_standard: Option<String>,
}

impl Subsignal {
    pub fn new(name: &str, pins: &str, io_standard: Option<&str>) -> Self {
        Self {
            name: name.into(),
            pins: pins.into(),
            io_standard: io_standard.map(Into::into),
        }
    }

    /// Connector of every `connector:index` designator, in pin order.
    /// Package pins contribute nothing.
    pub fn connectors(&self) -> impl Iterator<Item = &str> {
        self.pins
            .split_whitespace()
            .filter_map(|pin| pin.split_once(':').map(|(connector, _)| connector))
    }
}

/// A numbered group of signals, as requested by peripherals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PinResource {
    pub name: String,
    pub number: u32,
    pub subsignals: Vec<Subsignal>,
}

impl PinResource {
    pub fn new(name: &str, number: u32, subsignals: Vec<Subsignal>) -> Self {
        Self {
            name: name.into(),
            number,
            subsignals,
        }
    }

    /// A single-signal resource such as an LED.
    pub fn single(name: &str, number: u32, pins: &str, io_standard: &str) -> Self {
        Self::new(name, number, vec![Subsignal::new(name, pins, Some(io_standard))])
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.number)
    }

    pub fn subsignal(&self, name: &str) -> Option<&Subsignal> {
        self.subsignals.iter().find(|s| s.name == name)
    }
}

/// Pin resources and connectors of one board, with the requests made so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinCatalogue {
    resources: Vec<PinResource>,
    connectors: Vec<String>,
    requested: Vec<String>,
}

impl PinCatalogue {
    pub fn new(resources: Vec<PinResource>, connectors: Vec<String>) -> Self {
        Self {
            resources,
            connectors,
            requested: Vec::new(),
        }
    }

    pub fn has_connector(&self, name: &str) -> bool {
        self.connectors.iter().any(|c| c == name)
    }

    pub fn resource(&self, name: &str, number: u32) -> Option<&PinResource> {
        self.resources
            .iter()
            .find(|r| r.name == name && r.number == number)
    }

    /// Add new resources. Each must be new and may only reference known
    /// connectors.
    pub fn add_extension(&mut self, extension: Vec<PinResource>) -> Result<()> {
        for (i, resource) in extension.iter().enumerate() {
            if self.resource(&resource.name, resource.number).is_some() {
                return Err(PlatformError::PinConflict {
                    resource: resource.key(),
                    detail: "already declared by the board".into(),
                });
            }
            if extension[..i].iter().any(|r| r.key() == resource.key()) {
                return Err(PlatformError::PinConflict {
                    resource: resource.key(),
                    detail: "declared twice in one extension".into(),
                });
            }
            for sub in &resource.subsignals {
                if let Some(connector) = sub.connectors().find(|c| !self.has_connector(c)) {
                    return Err(PlatformError::PinNotFound {
                        resource: connector.into(),
                    });
                }
            }
        }
        for resource in extension {
            tracing::debug!(resource = %resource.key(), "added pin extension");
            self.resources.push(resource);
        }
        Ok(())
    }

    /// Claim a resource for one peripheral.
    pub fn request(&mut self, name: &str, number: u32) -> Result<PinResource> {
        let resource = self
            .resource(name, number)
            .cloned()
            .ok_or_else(|| PlatformError::PinNotFound {
                resource: format!("{name}:{number}"),
            })?;
        let key = resource.key();
        if self.requested.contains(&key) {
            return Err(PlatformError::PinConflict {
                resource: key,
                detail: "already requested by another peripheral".into(),
            });
        }
        self.requested.push(key);
        Ok(resource)
    }

    /// Resources requested so far, in request order.
    pub fn requirements(&self) -> Vec<&PinResource> {
        self.requested
            .iter()
            .filter_map(|key| self.resources.iter().find(|r| &r.key() == key))
            .collect()
    }
}
