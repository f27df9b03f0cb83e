//! Snowman Builder, Ice Slide and Match the Snowflakes.
//!
//! [`GamesSection`] is the menu a player picks from; it keeps one game
//! mounted and tears it down on the way out. Ice Slide runs at a fixed 60
//! steps per second whatever the host's frame rate; the other two games only
//! move when the player does, apart from the memory game turning a mismatched
//! pair back over after a second.
//!
//! [`autoplay`] plays each game to the end for the `frost-games` binary.
//!
//! ```
//! use frost_games::{GameConfig, GameKind, GamesSection, SectionNotice};
//!
//! let mut section = GamesSection::new(GameConfig::default(), 7)?;
//! let notices = section.select(GameKind::Match)?;
//! assert_eq!(notices, vec![SectionNotice::Mounted(GameKind::Match)]);
//! assert_eq!(section.active_kind(), Some(GameKind::Match));
//! # Ok::<(), frost_games::GameError>(())
//! ```

pub mod autoplay;
pub mod config;
pub mod error;
pub mod game;
pub mod geometry;
pub mod ice_slide;
pub mod input;
pub mod matching;
pub mod section;
pub mod snowman;
pub mod timing;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{GameConfig, IceSlideConfig, MatchConfig, SnowmanConfig};
pub use error::GameError;
pub use game::{GameKind, MiniGame};
pub use geometry::Rect;
pub use ice_slide::{IceSlide, IceSlideEvent, IceSlideNotice, ObstacleSpawner, Pace, SlideState};
pub use input::{InputState, KeyCode, NamedKey};
pub use matching::{MatchEvent, MatchGame, MatchNotice};
pub use section::{GamesSection, SectionEvent, SectionNotice, SectionSnapshot};
pub use snowman::{PartId, PlacementRule, SnowmanBuilder, SnowmanEvent, SnowmanNotice};
