use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of the latest day-over-day move
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    #[serde(rename = "up")]
    Up,

    #[serde(rename = "down")]
    Down,
}

impl Direction {
    /// Strictly greater is `Up`; equal averages resolve to `Down`.
    pub fn between(previous: f64, latest: f64) -> Self {
        if latest > previous {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Past-tense verb for user-facing messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Up => "rose",
            Direction::Down => "fell",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown trend direction: {}", other)),
        }
    }
}

/// The single live trend record for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub ticker: String,
    pub date: NaiveDate,
    pub direction: Direction,
}
