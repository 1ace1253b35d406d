//! Board catalogue.
//!
//! A board pairs a base platform with the toolchain used to build it, the
//! features it can carry, and the device-tree variant describing it.

use serde::{Deserialize, Serialize};

use crate::pins::{PinResource, Subsignal};
use crate::platform::{BasePlatform, FpgaFamily, SdramDescriptor};

/// Synthesis toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Toolchain {
    Vivado,
    Ise,
    Trellis,
}

/// Optional features a board is able to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Serial,
    Ethernet,
    SpiFlash,
    Leds,
}

/// A buildable board target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Board {
    /// Board name (e.g., "arty").
    pub name: String,
    /// One-line description.
    pub description: String,
    pub toolchain: Toolchain,
    pub capabilities: Vec<Capability>,
    /// Device-tree source variant; `None` selects the default source.
    #[serde(default)]
    pub dts_variant: Option<String>,
    pub platform: BasePlatform,
}

impl Board {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Capabilities joined the way board listings show them ("serial+ethernet").
    pub fn capability_string(&self) -> String {
        self.capabilities
            .iter()
            .map(|c| match c {
                Capability::Serial => "serial",
                Capability::Ethernet => "ethernet",
                Capability::SpiFlash => "spiflash",
                Capability::Leds => "leds",
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Digilent Arty A7-35T.
    pub fn arty() -> Self {
        let mut platform = BasePlatform::linux_vexriscv(
            FpgaFamily::Xilinx7Series,
            100_000_000,
            0x1000_0000, // 256 MiB DDR3
            SdramDescriptor {
                module: "MT41K128M16".into(),
                native_data_width: 128,
            },
            true,
        );
        platform.pins = vec![
            PinResource::single("user_led", 0, "H5", "LVCMOS33"),
            PinResource::single("user_led", 1, "J5", "LVCMOS33"),
            PinResource::single("user_led", 2, "T9", "LVCMOS33"),
            PinResource::single("user_led", 3, "T10", "LVCMOS33"),
            PinResource::new(
                "serial",
                0,
                vec![
                    Subsignal::new("tx", "D10", Some("LVCMOS33")),
                    Subsignal::new("rx", "A9", Some("LVCMOS33")),
                ],
            ),
            PinResource::new(
                "spiflash4x",
                0,
                vec![
                    Subsignal::new("cs_n", "L13", Some("LVCMOS33")),
                    Subsignal::new("dq", "K17 K18 L14 M14", Some("LVCMOS33")),
                ],
            ),
            PinResource::new(
                "hdmi",
                0,
                vec![
                    Subsignal::new("d", &connector_pins("ck_io", 0, 24), Some("LVCMOS33")),
                    Subsignal::new("clk", "ck_io:24", Some("LVCMOS33")),
                    Subsignal::new("de", "ck_io:25", Some("LVCMOS33")),
                    Subsignal::new("hsync", "ck_io:26", Some("LVCMOS33")),
                    Subsignal::new("vsync", "ck_io:27", Some("LVCMOS33")),
                    Subsignal::new("sda", "ck_io:28", Some("LVCMOS33")),
                    Subsignal::new("scl", "ck_io:29", Some("LVCMOS33")),
                ],
            ),
        ];
        platform.connectors = vec![
            "pmoda".into(),
            "pmodb".into(),
            "pmodc".into(),
            "pmodd".into(),
            "ck_io".into(),
        ];
        Self {
            name: "arty".into(),
            description: "Digilent Arty A7 (Artix-7, DDR3, 10/100 Ethernet)".into(),
            toolchain: Toolchain::Vivado,
            capabilities: vec![Capability::Serial, Capability::Ethernet, Capability::SpiFlash],
            dts_variant: Some("arty".into()),
            platform,
        }
    }

    /// Scarab miniSpartan6+.
    pub fn minispartan6() -> Self {
        let mut platform = BasePlatform::linux_vexriscv(
            FpgaFamily::Spartan6,
            80_000_000,
            0x200_0000, // 32 MiB SDR
            SdramDescriptor {
                module: "AS4C16M16".into(),
                native_data_width: 16,
            },
            false,
        );
        platform.pins = (0..8)
            .map(|i| PinResource::single("user_led", i, LEDS_MINISPARTAN6[i as usize], "LVTTL"))
            .collect();
        platform.connectors = vec!["porta".into(), "portb".into(), "portc".into()];
        Self {
            name: "minispartan6".into(),
            description: "Scarab miniSpartan6+ (Spartan-6, SDR SDRAM)".into(),
            toolchain: Toolchain::Ise,
            capabilities: vec![Capability::Serial],
            dts_variant: None,
            platform,
        }
    }

    /// Lattice ECP5 Versa.
    pub fn versa_ecp5() -> Self {
        let mut platform = BasePlatform::linux_vexriscv(
            FpgaFamily::Ecp5,
            75_000_000,
            0x800_0000, // 128 MiB DDR3
            SdramDescriptor {
                module: "MT41K64M16".into(),
                native_data_width: 128,
            },
            true,
        );
        platform.pins = (0..8)
            .map(|i| PinResource::single("user_led", i, LEDS_VERSA[i as usize], "LVCMOS25"))
            .collect();
        platform.connectors = vec!["x3".into(), "x4".into()];
        Self {
            name: "versa_ecp5".into(),
            description: "Lattice ECP5 Versa (ECP5-5G, DDR3, Gigabit Ethernet)".into(),
            toolchain: Toolchain::Trellis,
            capabilities: vec![Capability::Serial, Capability::Ethernet, Capability::Leds],
            dts_variant: None,
            platform,
        }
    }

    /// Radiona ULX3S.
    pub fn ulx3s() -> Self {
        let mut platform = BasePlatform::linux_vexriscv(
            FpgaFamily::Ecp5,
            50_000_000,
            0x200_0000, // 32 MiB SDR
            SdramDescriptor {
                module: "MT48LC16M16".into(),
                native_data_width: 16,
            },
            false,
        );
        platform.pins = (0..8)
            .map(|i| PinResource::single("user_led", i, LEDS_ULX3S[i as usize], "LVCMOS33"))
            .collect();
        platform.connectors = vec!["gpio".into()];
        Self {
            name: "ulx3s".into(),
            description: "Radiona ULX3S (ECP5, SDR SDRAM)".into(),
            toolchain: Toolchain::Trellis,
            capabilities: vec![Capability::Serial],
            dts_variant: None,
            platform,
        }
    }
}

const LEDS_MINISPARTAN6: [&str; 8] = ["P11", "N9", "M9", "P9", "T8", "N8", "P8", "P7"];
const LEDS_VERSA: [&str; 8] = ["E16", "D17", "D18", "E18", "F17", "F18", "E17", "F16"];
const LEDS_ULX3S: [&str; 8] = ["B2", "C2", "C1", "D2", "D1", "E2", "E1", "H3"];

fn connector_pins(connector: &str, first: u32, count: u32) -> String {
    (first..first + count)
        .map(|i| format!("{connector}:{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a built-in board by name.
pub fn builtin_board(name: &str) -> Option<Board> {
    match name {
        "arty" => Some(Board::arty()),
        "minispartan6" => Some(Board::minispartan6()),
        "versa_ecp5" => Some(Board::versa_ecp5()),
        "ulx3s" => Some(Board::ulx3s()),
        _ => None,
    }
}

/// All built-in boards, in listing order.
pub fn builtin_boards() -> Vec<Board> {
    vec![
        Board::arty(),
        Board::minispartan6(),
        Board::versa_ecp5(),
        Board::ulx3s(),
    ]
}
