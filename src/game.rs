use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// A mini-game expressed as a state machine.
///
/// `update` is the transition function: it consumes one event, mutates the
/// state and reports what happened as notices for the presentation layer.
/// Events the current state forbids produce no notices and no change.
pub trait MiniGame {
    type Event;
    type Notice;
    type Snapshot: Serialize;

    fn kind(&self) -> GameKind;

    fn update(&mut self, event: Self::Event) -> Vec<Self::Notice>;

    /// Moves the game's clock forward; timers and simulation steps fire here.
    fn advance(&mut self, elapsed: Duration) -> Vec<Self::Notice>;

    fn snapshot(&self) -> Self::Snapshot;

    /// Returns the game to the state it had right after mounting.
    fn reset(&mut self);

    /// Releases input handles and drops pending timers before unmounting.
    fn teardown(&mut self);

    /// True once the game reached its terminal state.
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    Snowman,
    IceSlide,
    Match,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Snowman, GameKind::IceSlide, GameKind::Match];

    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Snowman => "snowman",
            GameKind::IceSlide => "ice-slide",
            GameKind::Match => "match",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameKind::Snowman => "Build a Snowman",
            GameKind::IceSlide => "Ice Slide",
            GameKind::Match => "Match the Snowflakes",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GameKind::Snowman => "Drag & drop the snowman's parts to build him!",
            GameKind::IceSlide => "Race down the mountain on a sleigh!",
            GameKind::Match => "Find matching snowflake pairs!",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = GameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "snowman" | "build-a-snowman" => Ok(GameKind::Snowman),
            "ice-slide" | "slide" => Ok(GameKind::IceSlide),
            "match" | "snowflakes" => Ok(GameKind::Match),
            other => Err(GameError::UnknownGame(other.to_string())),
        }
    }
}
