//! Scripted players that drive each game through a [`GamesSection`].
//!
//! They only use the same events a human host would send, which makes them
//! handy for the CLI and for end-to-end tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use glam::Vec2;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::game::GameKind;
use crate::geometry::Rect;
use crate::ice_slide::{IceSlideEvent, IceSlideNotice, Pace, SlideState};
use crate::input::{KeyCode, NamedKey};
use crate::matching::MatchEvent;
use crate::section::{ActiveGame, GamesSection, SectionEvent, SectionNotice, SectionSnapshot};
use crate::snowman::{PartId, SnowmanEvent, SnowmanNotice};
use crate::timing::FixedTimestep;

/// Steps the ice slide pilot plays before giving up on crashing.
pub const DEFAULT_STEP_BUDGET: u64 = 3600;

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub game: GameKind,
    pub summary: String,
    pub snapshot: SectionSnapshot,
}

impl Outcome {
    fn new(section: &GamesSection, game: GameKind, summary: String) -> Self {
        Self {
            game,
            summary,
            snapshot: section.snapshot(),
        }
    }
}

/// Drags every part onto its target in a shuffled order.
///
/// Each drop is nudged a little off centre first; a miss is retried dead on.
pub fn play_snowman(section: &mut GamesSection, seed: u64) -> Result<Outcome> {
    section.select(GameKind::Snowman)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (board, tolerance) = {
        let config = &section.config().snowman;
        (config.board, config.tolerance)
    };

    let mut order = PartId::ALL;
    order.shuffle(&mut rng);

    let mut placements = 0;
    for (slot, part) in order.into_iter().enumerate() {
        let (target, size) = match section.active() {
            Some(ActiveGame::Snowman(game)) => (
                game.layout().zone(part).bounds.center(),
                game.layout().part_size(part),
            ),
            _ => bail!("snowman is not mounted"),
        };
        let tray = Vec2::new(
            board.x * (slot as f32 + 1.0) / (PartId::ALL.len() as f32 + 1.0),
            board.y - size.y,
        );
        let wobble = tolerance / 2.0;
        let nudge = Vec2::new(
            rng.random_range(-wobble..=wobble),
            rng.random_range(-wobble..=wobble),
        );

        let mut placed = false;
        for aim in [target + nudge, target] {
            let notices = drag(section, part, tray, aim, size);
            if notices
                .iter()
                .any(|n| matches!(n, SectionNotice::Snowman(SnowmanNotice::Placed { .. })))
            {
                placed = true;
                break;
            }
            debug!("missed {part}, retrying");
        }
        if !placed {
            bail!("could not place {part}");
        }
        placements += 1;
    }

    match section.active() {
        Some(game) if game.is_finished() => {}
        _ => bail!("snowman incomplete after {placements} placements"),
    }
    let summary = format!("Snowman complete after {placements} placements");
    info!("{summary}");
    Ok(Outcome::new(section, GameKind::Snowman, summary))
}

fn drag(
    section: &mut GamesSection,
    part: PartId,
    from: Vec2,
    to: Vec2,
    size: Vec2,
) -> Vec<SectionNotice> {
    let delta = to - from;
    let mut notices = section.dispatch(SectionEvent::Snowman(SnowmanEvent::DragStart { part }));
    notices.extend(section.dispatch(SectionEvent::Snowman(SnowmanEvent::DragMove { part, delta })));
    notices.extend(section.dispatch(SectionEvent::Snowman(SnowmanEvent::DragEnd {
        part,
        bounds: Rect::from_center(to, size),
    })));
    notices
}

/// Steers away from whatever is falling towards the sleigh until it crashes
/// or `budget` steps have run.
pub fn play_ice_slide(section: &mut GamesSection, pace: Pace, budget: u64) -> Result<Outcome> {
    section.select(GameKind::IceSlide)?;
    section.dispatch(SectionEvent::IceSlide(IceSlideEvent::Start(pace)));

    let step = {
        let config = &section.config().ice_slide;
        FixedTimestep::new(config.steps_per_second, 1).step()
    };
    let mut held: Option<NamedKey> = None;
    let mut final_score = None;

    for _ in 0..budget {
        let wanted = match section.active() {
            Some(ActiveGame::IceSlide(game)) => {
                steer(game.sleigh(), game.obstacles(), game.config().field.x)
            }
            _ => bail!("ice slide is not mounted"),
        };
        if wanted != held {
            if let Some(key) = held {
                section.dispatch(SectionEvent::IceSlide(IceSlideEvent::KeyUp(KeyCode::Named(
                    key,
                ))));
            }
            if let Some(key) = wanted {
                section.dispatch(SectionEvent::IceSlide(IceSlideEvent::KeyDown(
                    KeyCode::Named(key),
                )));
            }
            held = wanted;
        }

        for notice in section.advance(step) {
            if let SectionNotice::IceSlide(IceSlideNotice::GameOver { final_score: score }) = notice
            {
                final_score = Some(score);
            }
        }
        if final_score.is_some() {
            break;
        }
    }

    let summary = match final_score {
        Some(score) => format!("Ice Slide over: score {score}"),
        None => {
            let (score, steps) = match section.active() {
                Some(ActiveGame::IceSlide(game)) if game.state() == SlideState::Running => {
                    (game.score(), game.steps())
                }
                _ => bail!("ice slide stopped unexpectedly"),
            };
            format!("Ice Slide survived {steps} steps: score {score}")
        }
    };
    info!("{summary}");
    Ok(Outcome::new(section, GameKind::IceSlide, summary))
}

/// Picks the key to hold this step, if any.
fn steer(sleigh: Rect, obstacles: &[Rect], field_width: f32) -> Option<NamedKey> {
    let margin = 2.0;
    let threats: Vec<&Rect> = obstacles
        .iter()
        .filter(|o| o.bottom() <= sleigh.bottom())
        .collect();
    let clear = |x: f32| {
        threats
            .iter()
            .all(|o| x + sleigh.size.x + margin <= o.left() || x >= o.right() + margin)
    };

    let x = sleigh.left();
    if clear(x) {
        return None;
    }

    let max_x = field_width - sleigh.size.x;
    let target = threats
        .iter()
        .flat_map(|o| [o.left() - margin - sleigh.size.x, o.right() + margin])
        .filter(|&c| (0.0..=max_x).contains(&c) && clear(c))
        .min_by(|a, b| (a - x).abs().total_cmp(&(b - x).abs()))?;

    if target < x {
        Some(NamedKey::Left)
    } else {
        Some(NamedKey::Right)
    }
}

/// Plays match with perfect memory of every card it has seen.
pub fn play_match(section: &mut GamesSection) -> Result<Outcome> {
    section.select(GameKind::Match)?;
    let revert_delay = section.config().matching.revert_delay();
    let mut seen: HashMap<usize, String> = HashMap::new();

    let card_count = match section.snapshot() {
        SectionSnapshot::Match(state) => state.cards.len(),
        _ => bail!("match is not mounted"),
    };

    for _ in 0..card_count * card_count {
        let state = match section.snapshot() {
            SectionSnapshot::Match(state) => state,
            _ => bail!("match is not mounted"),
        };
        if state.matched_pairs == state.total_pairs {
            let summary = format!("Match complete in {} moves", state.moves);
            info!("{summary}");
            return Ok(Outcome::new(section, GameKind::Match, summary));
        }

        let open = |index: &usize| !state.cards[*index].matched;
        let known_pair = seen
            .iter()
            .filter(|&(index, _)| open(index))
            .find_map(|(&a, pattern)| {
                seen.iter()
                    .find(|&(&b, other)| b != a && other == pattern && open(&b))
                    .map(|(&b, _)| (a, b))
            });

        let (first, second) = match known_pair {
            Some(pair) => pair,
            None => {
                let first = (0..card_count)
                    .find(|i| !seen.contains_key(i) && open(i))
                    .unwrap_or(0);
                let pattern = flip(section, first, &mut seen)?;
                let partner = seen
                    .iter()
                    .find(|&(&i, p)| i != first && *p == pattern && open(&i))
                    .map(|(&i, _)| i);
                let second = match partner {
                    Some(index) => index,
                    None => (0..card_count)
                        .find(|&i| i != first && !seen.contains_key(&i) && open(&i))
                        .unwrap_or(first),
                };
                flip(section, second, &mut seen)?;
                settle(section, revert_delay);
                continue;
            }
        };
        flip(section, first, &mut seen)?;
        flip(section, second, &mut seen)?;
        settle(section, revert_delay);
    }
    bail!("match did not finish")
}

fn flip(
    section: &mut GamesSection,
    index: usize,
    seen: &mut HashMap<usize, String>,
) -> Result<String> {
    section.dispatch(SectionEvent::Match(MatchEvent::Click(index)));
    match section.snapshot() {
        SectionSnapshot::Match(state) => {
            let card = &state.cards[index];
            if !card.face_up {
                bail!("card {index} did not turn over");
            }
            seen.insert(index, card.pattern.clone());
            Ok(card.pattern.clone())
        }
        _ => bail!("match is not mounted"),
    }
}

/// Waits out a pending mismatch so the next pair can be flipped.
fn settle(section: &mut GamesSection, revert_delay: Duration) {
    section.advance(revert_delay);
}
