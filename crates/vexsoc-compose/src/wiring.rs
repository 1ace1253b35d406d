//! Declarative signal connections recorded by feature modules.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A signal, or a bit slice of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalRef {
    pub signal: String,
    pub bits: Option<Range<u32>>,
}

impl SignalRef {
    pub fn new(signal: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            bits: None,
        }
    }

    pub fn bits(mut self, bits: Range<u32>) -> Self {
        self.bits = Some(bits);
        self
    }

    pub fn bit(self, bit: u32) -> Self {
        self.bits(bit..bit + 1)
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bits {
            Some(r) if r.end == r.start + 1 => write!(f, "{}[{}]", self.signal, r.start),
            Some(r) => write!(f, "{}[{}:{}]", self.signal, r.start, r.end),
            None => write!(f, "{}", self.signal),
        }
    }
}

/// What drives a wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireSource {
    Signal(SignalRef),
    /// Clock of a named clock domain.
    Clock(String),
    Const(u64),
}

/// A combinational assignment `dest = [~]source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wire {
    pub dest: SignalRef,
    pub source: WireSource,
    pub inverted: bool,
}

impl Wire {
    pub fn new(dest: SignalRef, source: SignalRef) -> Self {
        Self {
            dest,
            source: WireSource::Signal(source),
            inverted: false,
        }
    }

    pub fn inverted(dest: SignalRef, source: SignalRef) -> Self {
        Self {
            inverted: true,
            ..Self::new(dest, source)
        }
    }

    pub fn clock(dest: SignalRef, domain: &str) -> Self {
        Self {
            dest,
            source: WireSource::Clock(domain.into()),
            inverted: false,
        }
    }

    pub fn constant(dest: SignalRef, value: u64) -> Self {
        Self {
            dest,
            source: WireSource::Const(value),
            inverted: false,
        }
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neg = if self.inverted { "~" } else { "" };
        match &self.source {
            WireSource::Signal(s) => write!(f, "{} = {neg}{s}", self.dest),
            WireSource::Clock(d) => write!(f, "{} = {neg}clk({d})", self.dest),
            WireSource::Const(v) => write!(f, "{} = {neg}{v}", self.dest),
        }
    }
}

/// An open-drain pad: the output value is fixed low, the (inverted) register
/// bit drives the output enable, and the pad level is sampled independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tristate {
    pub pad: SignalRef,
    pub output: u64,
    pub output_enable: SignalRef,
    pub output_enable_inverted: bool,
    pub input: SignalRef,
}

impl Tristate {
    pub fn open_drain(pad: SignalRef, output_bit: SignalRef, input_bit: SignalRef) -> Self {
        Self {
            pad,
            output: 0,
            output_enable: output_bit,
            output_enable_inverted: true,
            input: input_bit,
        }
    }
}
