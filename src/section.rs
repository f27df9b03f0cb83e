//! The games section: a menu plus one slot holding the active mini-game.
//!
//! Swapping games always tears the previous one down first, so its input
//! handle is detached and its timers are gone before the next one mounts.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use serde::Serialize;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::game::{GameKind, MiniGame};
use crate::ice_slide::{IceSlide, IceSlideEvent, IceSlideNotice, IceSlideSnapshot};
use crate::input::InputState;
use crate::matching::{MatchEvent, MatchGame, MatchNotice, MatchSnapshot};
use crate::snowman::{Layout, SnowmanBuilder, SnowmanEvent, SnowmanNotice, SnowmanSnapshot};

#[derive(Debug)]
pub enum ActiveGame {
    Snowman(SnowmanBuilder),
    IceSlide(IceSlide),
    Match(MatchGame),
}

impl ActiveGame {
    pub fn kind(&self) -> GameKind {
        match self {
            ActiveGame::Snowman(game) => game.kind(),
            ActiveGame::IceSlide(game) => game.kind(),
            ActiveGame::Match(game) => game.kind(),
        }
    }

    fn advance(&mut self, elapsed: Duration) -> Vec<SectionNotice> {
        match self {
            ActiveGame::Snowman(game) => wrap(game.advance(elapsed), SectionNotice::Snowman),
            ActiveGame::IceSlide(game) => wrap(game.advance(elapsed), SectionNotice::IceSlide),
            ActiveGame::Match(game) => wrap(game.advance(elapsed), SectionNotice::Match),
        }
    }

    fn reset(&mut self) {
        match self {
            ActiveGame::Snowman(game) => game.reset(),
            ActiveGame::IceSlide(game) => game.reset(),
            ActiveGame::Match(game) => game.reset(),
        }
    }

    fn teardown(&mut self) {
        match self {
            ActiveGame::Snowman(game) => game.teardown(),
            ActiveGame::IceSlide(game) => game.teardown(),
            ActiveGame::Match(game) => game.teardown(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            ActiveGame::Snowman(game) => game.is_finished(),
            ActiveGame::IceSlide(game) => game.is_finished(),
            ActiveGame::Match(game) => game.is_finished(),
        }
    }

    fn snapshot(&self) -> SectionSnapshot {
        match self {
            ActiveGame::Snowman(game) => SectionSnapshot::Snowman(game.snapshot()),
            ActiveGame::IceSlide(game) => SectionSnapshot::IceSlide(game.snapshot()),
            ActiveGame::Match(game) => SectionSnapshot::Match(game.snapshot()),
        }
    }
}

fn wrap<N>(notices: Vec<N>, variant: fn(N) -> SectionNotice) -> Vec<SectionNotice> {
    notices.into_iter().map(variant).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionEvent {
    Snowman(SnowmanEvent),
    IceSlide(IceSlideEvent),
    Match(MatchEvent),
}

impl SectionEvent {
    pub fn kind(&self) -> GameKind {
        match self {
            SectionEvent::Snowman(_) => GameKind::Snowman,
            SectionEvent::IceSlide(_) => GameKind::IceSlide,
            SectionEvent::Match(_) => GameKind::Match,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "game", content = "notice", rename_all = "kebab-case")]
pub enum SectionNotice {
    Mounted(GameKind),
    Unmounted(GameKind),
    Snowman(SnowmanNotice),
    IceSlide(IceSlideNotice),
    Match(MatchNotice),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub kind: GameKind,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "state", rename_all = "kebab-case")]
pub enum SectionSnapshot {
    Menu(Vec<CatalogEntry>),
    Snowman(SnowmanSnapshot),
    IceSlide(IceSlideSnapshot),
    Match(MatchSnapshot),
}

#[derive(Debug)]
pub struct GamesSection {
    config: GameConfig,
    layout: Layout,
    seed: u64,
    mounts: u64,
    active: Option<ActiveGame>,
}

impl GamesSection {
    /// Validates the whole config up front.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        let layout = Layout::from_config(&config.snowman)?;
        Ok(Self {
            config,
            layout,
            seed,
            mounts: 0,
            active: None,
        })
    }

    pub fn catalog() -> Vec<CatalogEntry> {
        GameKind::ALL
            .into_iter()
            .map(|kind| CatalogEntry {
                kind,
                title: kind.title(),
                description: kind.description(),
            })
            .collect()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn active_kind(&self) -> Option<GameKind> {
        self.active.as_ref().map(ActiveGame::kind)
    }

    pub fn active(&self) -> Option<&ActiveGame> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveGame> {
        self.active.as_mut()
    }

    /// Unmounts the current game, if any, and mounts a fresh `kind`.
    ///
    /// The new game is built first; if its config is rejected the current
    /// game stays mounted.
    pub fn select(&mut self, kind: GameKind) -> Result<Vec<SectionNotice>, GameError> {
        let seed = self.seed.wrapping_add(self.mounts);
        let game = match kind {
            GameKind::Snowman => ActiveGame::Snowman(SnowmanBuilder::with_layout(
                self.layout.clone(),
                self.config.snowman.tolerance,
                self.config.snowman.rule,
            )),
            GameKind::IceSlide => {
                ActiveGame::IceSlide(IceSlide::new(self.config.ice_slide.clone(), seed)?)
            }
            GameKind::Match => ActiveGame::Match(MatchGame::new(&self.config.matching, seed)?),
        };
        self.mounts += 1;
        let mut notices = self.back();
        debug!("mounted {kind}");
        self.active = Some(game);
        notices.push(SectionNotice::Mounted(kind));
        Ok(notices)
    }

    /// Returns to the menu, tearing down the active game.
    pub fn back(&mut self) -> Vec<SectionNotice> {
        match self.active.take() {
            Some(mut game) => {
                game.teardown();
                debug!("unmounted {}", game.kind());
                vec![SectionNotice::Unmounted(game.kind())]
            }
            None => Vec::new(),
        }
    }

    /// Routes an event to the active game; events for other games are dropped.
    pub fn dispatch(&mut self, event: SectionEvent) -> Vec<SectionNotice> {
        let Some(active) = self.active.as_mut() else {
            trace!("dropping {} event on the menu", event.kind());
            return Vec::new();
        };
        match (active, event) {
            (ActiveGame::Snowman(game), SectionEvent::Snowman(event)) => {
                wrap(game.update(event), SectionNotice::Snowman)
            }
            (ActiveGame::IceSlide(game), SectionEvent::IceSlide(event)) => {
                wrap(game.update(event), SectionNotice::IceSlide)
            }
            (ActiveGame::Match(game), SectionEvent::Match(event)) => {
                wrap(game.update(event), SectionNotice::Match)
            }
            (game, event) => {
                trace!("dropping {} event while {} is active", event.kind(), game.kind());
                Vec::new()
            }
        }
    }

    pub fn advance(&mut self, elapsed: Duration) -> Vec<SectionNotice> {
        self.active
            .as_mut()
            .map(|game| game.advance(elapsed))
            .unwrap_or_default()
    }

    /// Resets the active game in place.
    pub fn reset(&mut self) {
        if let Some(game) = self.active.as_mut() {
            game.reset();
        }
    }

    pub fn snapshot(&self) -> SectionSnapshot {
        match &self.active {
            Some(game) => game.snapshot(),
            None => SectionSnapshot::Menu(Self::catalog()),
        }
    }

    /// Input handle of the running Ice Slide, for wiring up listeners.
    pub fn ice_slide_controls(&self) -> Option<Arc<InputState>> {
        match &self.active {
            Some(ActiveGame::IceSlide(game)) => game.controls(),
            _ => None,
        }
    }
}

impl Drop for GamesSection {
    fn drop(&mut self) {
        if let Some(game) = self.active.as_mut() {
            game.teardown();
        }
    }
}
