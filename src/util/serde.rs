//! Shared serializable identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of interchangeable printers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Black-and-white printers.
    Monochrome,
    /// Color printers.
    Color,
}

impl ResourceClass {
    /// Every known class.
    pub const ALL: [Self; 2] = [Self::Monochrome, Self::Color];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monochrome => "monochrome",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monochrome" | "mono" | "bw" => Ok(Self::Monochrome),
            "color" | "colour" => Ok(Self::Color),
            other => Err(format!("unknown resource class `{other}`")),
        }
    }
}

/// Admission policy of a resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// First to acquire wins.
    Unordered,
    /// Admission follows arrival sequence numbers.
    StrictArrivalOrder,
}

impl fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unordered => f.write_str("unordered"),
            Self::StrictArrivalOrder => f.write_str("strict_arrival_order"),
        }
    }
}
