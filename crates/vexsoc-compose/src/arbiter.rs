//! Shared memory-access arbiter (the SDRAM crossbar).
//!
//! Consumers ask for streaming ports; each clock domain commits to a single
//! data width on first use and every consumer holds at most one port.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use vexsoc_platform::SdramDescriptor;

use crate::error::{ComposeError, Result};

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortMode {
    Read,
    Write,
    Both,
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::Read => write!(f, "read"),
            PortMode::Write => write!(f, "write"),
            PortMode::Both => write!(f, "both"),
        }
    }
}

/// A request for a crossbar port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PortRequest {
    /// Name of the consuming core.
    pub consumer: String,
    pub mode: PortMode,
    /// Port data width in bits.
    pub data_width: u32,
    pub clock_domain: String,
    /// Reverse the word order within the native width.
    #[serde(default)]
    pub reverse: bool,
}

/// A granted port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub id: usize,
    pub request: PortRequest,
}

/// Arbiter in front of one DRAM controller.
#[derive(Debug, Clone)]
pub struct PortArbiter {
    native_data_width: u32,
    ports: Vec<Port>,
    domains: BTreeMap<String, u32>,
}

const MIN_PORT_WIDTH: u32 = 8;
/// Ports may be up to this many times the controller's native width.
const MAX_WIDTH_RATIO: u32 = 4;

impl PortArbiter {
    pub fn new(sdram: &SdramDescriptor) -> Self {
        Self {
            native_data_width: sdram.native_data_width,
            ports: Vec::new(),
            domains: BTreeMap::new(),
        }
    }

    /// Grant a port or fail without changing any state.
    pub fn get_port(&mut self, request: PortRequest) -> Result<Port> {
        let width = request.data_width;
        let max = self.native_data_width.saturating_mul(MAX_WIDTH_RATIO);
        if !width.is_power_of_two() || !(MIN_PORT_WIDTH..=max).contains(&width) {
            return Err(ComposeError::validation(format!(
                "port width {width} for '{}' must be a power of two in {MIN_PORT_WIDTH}..={max}",
                request.consumer
            )));
        }
        if self
            .ports
            .iter()
            .any(|p| p.request.consumer == request.consumer)
        {
            return Err(ComposeError::Conflict {
                resource: "crossbar port".into(),
                detail: format!("'{}' already holds a port", request.consumer),
            });
        }
        if let Some(&committed) = self.domains.get(&request.clock_domain) {
            if committed != width {
                let holder = self
                    .ports
                    .iter()
                    .find(|p| p.request.clock_domain == request.clock_domain)
                    .map(|p| p.request.consumer.as_str())
                    .unwrap_or("?");
                return Err(ComposeError::Conflict {
                    resource: format!("clock domain '{}'", request.clock_domain),
                    detail: format!(
                        "committed to {committed}-bit ports by '{holder}', '{}' requested {width} bits",
                        request.consumer
                    ),
                });
            }
        }

        self.domains
            .insert(request.clock_domain.clone(), width);
        let port = Port {
            id: self.ports.len(),
            request,
        };
        tracing::debug!(
            id = port.id,
            consumer = %port.request.consumer,
            mode = %port.request.mode,
            width,
            domain = %port.request.clock_domain,
            "granted crossbar port"
        );
        self.ports.push(port.clone());
        Ok(port)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn arbiter() -> PortArbiter {
        PortArbiter::new(&SdramDescriptor {
            module: "MT41K128M16".into(),
            native_data_width: 128,
        })
    }

    fn request(consumer: &str, width: u32, domain: &str) -> PortRequest {
        PortRequest {
            consumer: consumer.into(),
            mode: PortMode::Read,
            data_width: width,
            clock_domain: domain.into(),
            reverse: false,
        }
    }

    #[test]
    fn grants_sequential_ids() {
        let mut arb = arbiter();
        assert_eq!(arb.get_port(request("a", 32, "sys")).unwrap().id, 0);
        assert_eq!(arb.get_port(request("b", 32, "sys")).unwrap().id, 1);
        assert_eq!(arb.ports().len(), 2);
    }

    #[test]
    fn domain_width_mismatch_conflicts() {
        let mut arb = arbiter();
        arb.get_port(request("framegrabber", 64, "init")).unwrap();
        let err = arb.get_port(request("hdmi_out", 32, "init")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("framegrabber"));
        // Failed request left nothing behind.
        assert_eq!(arb.ports().len(), 1);
    }

    #[test]
    fn consumer_holds_one_port() {
        let mut arb = arbiter();
        arb.get_port(request("hdmi_out", 32, "init")).unwrap();
        let err = arb.get_port(request("hdmi_out", 32, "sys")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn width_must_be_power_of_two() {
        let mut arb = arbiter();
        let err = arb.get_port(request("x", 24, "sys")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(arb.get_port(request("x", 4, "sys")).is_err());
        assert!(arb.get_port(request("x", 1024, "sys")).is_err());
    }
}
