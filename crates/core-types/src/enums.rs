use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

/// The trading session a trade was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    London,
    NewYork,
    Asia,
    Other,
}

impl Session {
    /// Every session, in reporting order.
    pub const ALL: [Session; 4] = [Session::London, Session::NewYork, Session::Asia, Session::Other];

    /// The raw key as stored and serialized.
    pub fn key(&self) -> &'static str {
        match self {
            Session::London => "london",
            Session::NewYork => "newyork",
            Session::Asia => "asia",
            Session::Other => "other",
        }
    }

    /// Display label for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            Session::London => "London",
            Session::NewYork => "New York",
            Session::Asia => "Asia",
            Session::Other => "Other",
        }
    }
}

/// Classification of the entry assigned by the chart review step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryQuality {
    #[serde(rename = "High Probability")]
    HighProbability,
    Aggressive,
    Poor,
}

impl EntryQuality {
    pub const ALL: [EntryQuality; 3] = [
        EntryQuality::HighProbability,
        EntryQuality::Aggressive,
        EntryQuality::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryQuality::HighProbability => "High Probability",
            EntryQuality::Aggressive => "Aggressive",
            EntryQuality::Poor => "Poor",
        }
    }
}

/// Side of a broker fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillAction {
    Buy,
    Sell,
}

impl FillAction {
    /// The trade direction opened by a fill on this side.
    pub fn direction(&self) -> Direction {
        match self {
            FillAction::Buy => Direction::Long,
            FillAction::Sell => Direction::Short,
        }
    }
}

/// Lifecycle state of a prop-firm challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    #[default]
    Active,
    Passed,
    Failed,
    Breached,
}

impl ChallengeState {
    pub const ALL: [ChallengeState; 4] = [
        ChallengeState::Active,
        ChallengeState::Passed,
        ChallengeState::Failed,
        ChallengeState::Breached,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeState::Active => "active",
            ChallengeState::Passed => "passed",
            ChallengeState::Failed => "failed",
            ChallengeState::Breached => "breached",
        }
    }

    /// A closed challenge has an end date and takes no more trades.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ChallengeState::Active)
    }
}

/// Win/loss classification of a single trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    /// Zero or missing P&L. Counted as neither a win nor a loss.
    Flat,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Display for EntryQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(CoreError::InvalidInput("direction".to_string(), other.to_string())),
        }
    }
}

impl FromStr for Session {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Session::ALL
            .into_iter()
            .find(|session| session.key() == s)
            .ok_or_else(|| CoreError::InvalidInput("session".to_string(), s.to_string()))
    }
}

impl FromStr for EntryQuality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryQuality::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput("entry_quality".to_string(), s.to_string()))
    }
}

impl FromStr for ChallengeState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChallengeState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInput("status".to_string(), s.to_string()))
    }
}
