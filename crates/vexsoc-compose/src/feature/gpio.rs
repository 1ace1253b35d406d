//! Output-only GPIO banks.

use vexsoc_platform::{PinResource, Subsignal};

use super::{Core, Feature, FeatureAttachment, FeatureKind};
use crate::compose::SocState;
use crate::error::{ComposeError, Result};
use crate::wiring::{SignalRef, Wire};

/// Programming lines of an auxiliary iCE40 FPGA, driven from a 4-bit output
/// register through an expansion connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceGpo {
    pub connector: String,
    pub io_standard: String,
}

impl Default for IceGpo {
    fn default() -> Self {
        Self {
            connector: "pmoda".into(),
            io_standard: "LVCMOS33".into(),
        }
    }
}

/// Register bit order.
const ICE_LINES: [&str; 4] = ["creset", "csn", "sck", "mosi"];

impl IceGpo {
    fn extension(&self) -> PinResource {
        let subsignals = ICE_LINES
            .iter()
            .enumerate()
            .map(|(i, line)| {
                Subsignal::new(
                    line,
                    &format!("{}:{}", self.connector, i + 1),
                    Some(self.io_standard.as_str()),
                )
            })
            .collect();
        PinResource::new("ice", 0, subsignals)
    }
}

impl Feature for IceGpo {
    fn kind(&self) -> FeatureKind {
        FeatureKind::IceGpo
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        let mut attachment = FeatureAttachment::new(self.kind());
        soc.pins.add_extension(vec![self.extension()])?;
        attachment.request_pins(soc, "ice", 0)?;
        attachment.bind_csr(soc, "ice_gpo")?;
        attachment.cores.push(Core::GpioOut {
            name: "ice_gpo".into(),
            width: ICE_LINES.len() as u32,
        });
        for (bit, line) in ICE_LINES.iter().enumerate() {
            attachment.wires.push(Wire::new(
                SignalRef::new(format!("ice.{line}")),
                SignalRef::new("ice_gpo.out").bit(bit as u32),
            ));
        }
        Ok(attachment)
    }
}

/// User LEDs 0..count behind one output register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leds {
    pub count: u32,
}

impl Feature for Leds {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Leds
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        if self.count == 0 || self.count > 32 {
            return Err(ComposeError::validation(format!(
                "LED bank width {} must be in 1..=32",
                self.count
            )));
        }
        let mut attachment = FeatureAttachment::new(self.kind());
        for i in 0..self.count {
            attachment.request_pins(soc, "user_led", i)?;
            attachment.wires.push(Wire::new(
                SignalRef::new(format!("user_led{i}")),
                SignalRef::new("leds.out").bit(i),
            ));
        }
        attachment.bind_csr(soc, "leds")?;
        attachment.cores.push(Core::GpioOut {
            name: "leds".into(),
            width: self.count,
        });
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Composer;
    use crate::config::CompositionConfig;
    use crate::error::ErrorKind;
    use vexsoc_platform::{Board, Namespace};

    fn arty() -> Composer {
        Composer::new(CompositionConfig::new(Board::arty())).unwrap()
    }

    #[test]
    fn ice_lines_in_register_order() {
        let soc = arty().apply(&IceGpo::default()).unwrap().emit().unwrap();
        assert_eq!(soc.registry().lookup(Namespace::Csr, "ice_gpo").unwrap(), 12);
        let a = soc.attachment(FeatureKind::IceGpo).unwrap();
        let rendered: Vec<String> = a.wires.iter().map(|w| w.to_string()).collect();
        assert_eq!(
            rendered,
            [
                "ice.creset = ice_gpo.out[0]",
                "ice.csn = ice_gpo.out[1]",
                "ice.sck = ice_gpo.out[2]",
                "ice.mosi = ice_gpo.out[3]",
            ]
        );
        let ice = soc
            .pin_requirements()
            .into_iter()
            .find(|r| r.name == "ice")
            .unwrap();
        assert_eq!(ice.subsignal("mosi").unwrap().pins, "pmoda:4");
    }

    #[test]
    fn unknown_connector_is_not_found() {
        let gpo = IceGpo {
            connector: "pmodz".into(),
            ..IceGpo::default()
        };
        assert_eq!(arty().apply(&gpo).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn ice_twice_conflicts() {
        let c = arty().apply(&IceGpo::default()).unwrap();
        assert_eq!(
            c.apply(&IceGpo::default()).unwrap_err().kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn leds_bank() {
        let c = Composer::new(CompositionConfig::new(Board::versa_ecp5()))
            .unwrap()
            .apply(&Leds { count: 8 })
            .unwrap();
        assert_eq!(c.state().pins.requirements().len(), 8);
        assert!(c.state().registry.lookup(Namespace::Csr, "leds").is_ok());
    }

    #[test]
    fn leds_wider_than_board_fails() {
        let err = arty().apply(&Leds { count: 5 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
