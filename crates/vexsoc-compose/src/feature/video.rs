//! HDMI video output: a framebuffer reader on the DRAM crossbar driving the
//! HDMI connector, plus the DDC (I2C) lines for reading the monitor's EDID.

use super::{Core, Feature, FeatureAttachment, FeatureKind};
use crate::arbiter::{PortMode, PortRequest};
use crate::compose::SocState;
use crate::error::{ComposeError, Result};
use crate::wiring::{SignalRef, Tristate, Wire};

const CORE: &str = "hdmi_out";
const IIC: &str = "hdmi_iic";

/// Video output pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOut {
    /// Pixel clock domain of the pipeline.
    pub clock_domain: String,
    /// Framebuffer read port width in bits.
    pub data_width: u32,
}

impl Default for VideoOut {
    fn default() -> Self {
        Self {
            clock_domain: "init".into(),
            data_width: 32,
        }
    }
}

fn pad(name: &str) -> SignalRef {
    SignalRef::new(format!("hdmi.{name}"))
}

fn source(name: &str) -> SignalRef {
    SignalRef::new(format!("{CORE}.source.{name}"))
}

impl Feature for VideoOut {
    fn kind(&self) -> FeatureKind {
        FeatureKind::VideoOut
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        let mut attachment = FeatureAttachment::new(self.kind());

        let port = soc
            .arbiter
            .as_mut()
            .ok_or_else(|| ComposeError::NotFound {
                what: "memory-access arbiter (board has no DRAM controller)".into(),
            })?
            .get_port(PortRequest {
                consumer: CORE.into(),
                mode: PortMode::Read,
                data_width: self.data_width,
                clock_domain: self.clock_domain.clone(),
                reverse: true,
            })?;
        let port_id = port.id;
        attachment.port = Some(port);

        attachment.request_pins(soc, "hdmi", 0)?;
        attachment.bind_csr(soc, CORE)?;
        attachment.cores.push(Core::VideoOut {
            name: CORE.into(),
            port: port_id,
        });

        // Channel order on the connector is the reverse of the pipeline's
        // packed pixel word.
        let d = pad("d");
        let data = source("data");
        attachment.wires.extend([
            Wire::new(d.clone().bits(0..8), data.clone().bits(16..24)),
            Wire::new(d.clone().bits(8..16), data.clone().bits(8..16)),
            Wire::new(d.bits(16..24), data.bits(0..8)),
            Wire::inverted(pad("vsync"), source("vsync")),
            Wire::inverted(pad("hsync"), source("hsync")),
            Wire::new(pad("de"), source("de")),
            Wire::clock(pad("clk"), &self.clock_domain),
            Wire::constant(source("ready"), 1),
        ]);

        // Status taps.
        let led0 = attachment.request_pins(soc, "user_led", 0)?;
        let led1 = attachment.request_pins(soc, "user_led", 1)?;
        attachment.wires.extend([
            Wire::new(SignalRef::new(format!("{}{}", led0.name, led0.number)), source("vsync")),
            Wire::new(SignalRef::new(format!("{}{}", led1.name, led1.number)), source("de")),
        ]);

        attachment.bind_csr(soc, IIC)?;
        attachment.cores.push(Core::GpioInOut {
            name: IIC.into(),
            width: 2,
        });
        for (bit, line) in ["sda", "scl"].into_iter().enumerate() {
            let bit = bit as u32;
            attachment.tristates.push(Tristate::open_drain(
                pad(line),
                SignalRef::new(format!("{IIC}.out")).bit(bit),
                SignalRef::new(format!("{IIC}.in")).bit(bit),
            ));
        }

        tracing::debug!(
            port = port_id,
            domain = %self.clock_domain,
            width = self.data_width,
            "video pipeline wired"
        );
        Ok(attachment)
    }
}
