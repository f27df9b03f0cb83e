//! Match the Snowflakes: a 16-card pair-matching game.

use std::time::Duration;

use log::{debug, info, trace};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::MatchConfig;
use crate::error::GameError;
use crate::game::{GameKind, MiniGame};
use crate::timing::Deferred;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    Click(usize),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MatchNotice {
    Flipped { index: usize },
    Matched { pattern: String, moves: u32 },
    Mismatched { first: usize, second: usize, moves: u32 },
    Reverted { first: usize, second: usize },
    Completed { moves: u32 },
    Shuffled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    Playing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: String,
    pub pattern: String,
    pub face_up: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub cards: Vec<CardView>,
    pub flipped: Vec<usize>,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    pub moves: u32,
    pub revert_pending: bool,
}

#[derive(Debug, Clone)]
pub struct MatchGame {
    symbols: Vec<String>,
    revert_delay: Duration,
    rng: ChaCha8Rng,
    cards: Vec<Card>,
    flipped: Vec<usize>,
    matched: Vec<String>,
    moves: u32,
    clock: Duration,
    revert: Deferred<[usize; 2]>,
    phase: MatchPhase,
}

impl MatchGame {
    pub fn new(config: &MatchConfig, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        let mut game = Self {
            symbols: config.symbols.clone(),
            revert_delay: config.revert_delay(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            cards: Vec::new(),
            flipped: Vec::new(),
            matched: Vec::new(),
            moves: 0,
            clock: Duration::ZERO,
            revert: Deferred::new(),
            phase: MatchPhase::Playing,
        };
        game.initialize();
        Ok(game)
    }

    /// Deals a freshly shuffled deck and clears all progress.
    pub fn initialize(&mut self) {
        self.revert.cancel();
        self.flipped.clear();
        self.matched.clear();
        self.moves = 0;
        self.phase = MatchPhase::Playing;

        let mut cards: Vec<Card> = self
            .symbols
            .iter()
            .flat_map(|pattern| {
                (1..=2).map(move |copy| Card {
                    id: format!("{pattern}-{copy}"),
                    pattern: pattern.clone(),
                })
            })
            .collect();
        cards.shuffle(&mut self.rng);
        self.cards = cards;
        debug!("dealt {} cards", self.cards.len());
    }

    pub fn reset_game(&mut self) -> Vec<MatchNotice> {
        self.initialize();
        vec![MatchNotice::Shuffled]
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn flipped(&self) -> &[usize] {
        &self.flipped
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched.len()
    }

    pub fn total_pairs(&self) -> usize {
        self.symbols.len()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == MatchPhase::Complete
    }

    pub fn is_matched(&self, index: usize) -> bool {
        self.cards
            .get(index)
            .is_some_and(|card| self.matched.contains(&card.pattern))
    }

    pub fn revert_pending(&self) -> bool {
        self.revert.is_pending()
    }

    pub fn on_card_click(&mut self, index: usize) -> Vec<MatchNotice> {
        if index >= self.cards.len()
            || self.is_matched(index)
            || self.flipped.contains(&index)
            || self.flipped.len() >= 2
        {
            trace!("card click {index} rejected");
            return Vec::new();
        }

        self.flipped.push(index);
        let mut notices = vec![MatchNotice::Flipped { index }];
        if let &[first, second] = self.flipped.as_slice() {
            notices.extend(self.resolve_pair(first, second));
        }
        notices
    }

    fn resolve_pair(&mut self, first: usize, second: usize) -> Vec<MatchNotice> {
        self.moves += 1;
        let pattern = self.cards[first].pattern.clone();
        if pattern != self.cards[second].pattern {
            self.revert
                .schedule(self.clock, self.revert_delay, [first, second]);
            return vec![MatchNotice::Mismatched {
                first,
                second,
                moves: self.moves,
            }];
        }

        self.matched.push(pattern.clone());
        self.flipped.clear();
        let mut notices = vec![MatchNotice::Matched {
            pattern,
            moves: self.moves,
        }];
        if self.matched.len() == self.symbols.len() && self.phase == MatchPhase::Playing {
            self.phase = MatchPhase::Complete;
            info!("snowflakes matched in {} moves", self.moves);
            notices.push(MatchNotice::Completed { moves: self.moves });
        }
        notices
    }
}

impl MiniGame for MatchGame {
    type Event = MatchEvent;
    type Notice = MatchNotice;
    type Snapshot = MatchSnapshot;

    fn kind(&self) -> GameKind {
        GameKind::Match
    }

    fn update(&mut self, event: MatchEvent) -> Vec<MatchNotice> {
        match event {
            MatchEvent::Click(index) => self.on_card_click(index),
            MatchEvent::Reset => self.reset_game(),
        }
    }

    fn advance(&mut self, elapsed: Duration) -> Vec<MatchNotice> {
        self.clock = self.clock.saturating_add(elapsed);
        match self.revert.poll(self.clock) {
            Some([first, second]) => {
                self.flipped.clear();
                vec![MatchNotice::Reverted { first, second }]
            }
            None => Vec::new(),
        }
    }

    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            cards: self
                .cards
                .iter()
                .enumerate()
                .map(|(index, card)| {
                    let matched = self.matched.contains(&card.pattern);
                    CardView {
                        id: card.id.clone(),
                        pattern: card.pattern.clone(),
                        face_up: matched || self.flipped.contains(&index),
                        matched,
                    }
                })
                .collect(),
            flipped: self.flipped.clone(),
            matched_pairs: self.matched.len(),
            total_pairs: self.symbols.len(),
            moves: self.moves,
            revert_pending: self.revert.is_pending(),
        }
    }

    fn reset(&mut self) {
        self.initialize();
    }

    fn teardown(&mut self) {
        self.revert.cancel();
    }

    fn is_finished(&self) -> bool {
        self.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn game(seed: u64) -> MatchGame {
        MatchGame::new(&MatchConfig::default(), seed).unwrap()
    }

    fn pairs(game: &MatchGame) -> Vec<(usize, usize)> {
        let mut by_pattern: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, card) in game.cards().iter().enumerate() {
            by_pattern.entry(&card.pattern).or_default().push(index);
        }
        let mut pairs: Vec<_> = by_pattern.values().map(|v| (v[0], v[1])).collect();
        pairs.sort();
        pairs
    }

    fn mismatch(game: &MatchGame) -> (usize, usize) {
        let first = 0;
        let second = (1..game.cards().len())
            .find(|&i| game.cards()[i].pattern != game.cards()[first].pattern)
            .unwrap();
        (first, second)
    }

    #[test]
    fn every_deck_holds_each_symbol_twice() {
        for seed in 0..50 {
            let game = game(seed);
            assert_eq!(game.cards().len(), 16);
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for card in game.cards() {
                *counts.entry(&card.pattern).or_default() += 1;
            }
            assert_eq!(counts.len(), 8);
            assert!(counts.values().all(|&count| count == 2));
        }
    }

    #[test]
    fn matching_pair_stays_face_up() {
        let mut game = game(1);
        let (a, b) = pairs(&game)[0];
        game.on_card_click(a);
        let notices = game.on_card_click(b);
        assert!(matches!(notices.last(), Some(MatchNotice::Matched { moves: 1, .. })));
        assert!(game.flipped().is_empty());
        assert_eq!(game.matched_pairs(), 1);
        let snapshot = game.snapshot();
        assert!(snapshot.cards[a].face_up && snapshot.cards[a].matched);
        assert!(snapshot.cards[b].face_up && snapshot.cards[b].matched);
    }

    #[test]
    fn mismatch_reverts_after_delay() {
        let mut game = game(2);
        let (a, b) = mismatch(&game);
        game.on_card_click(a);
        game.on_card_click(b);
        assert_eq!(game.moves(), 1);
        assert_eq!(game.flipped(), &[a, b]);

        assert!(game.advance(Duration::from_millis(999)).is_empty());
        assert_eq!(game.flipped().len(), 2);
        assert_eq!(
            game.advance(Duration::from_millis(1)),
            vec![MatchNotice::Reverted { first: a, second: b }]
        );
        assert!(game.flipped().is_empty());
        assert_eq!(game.moves(), 1);
        assert_eq!(game.matched_pairs(), 0);
    }

    #[test]
    fn third_click_is_rejected_while_pair_pending() {
        let mut game = game(3);
        let (a, b) = mismatch(&game);
        let third = (0..16).find(|i| *i != a && *i != b).unwrap();
        game.on_card_click(a);
        game.on_card_click(b);
        assert!(game.on_card_click(third).is_empty());
        assert_eq!(game.flipped().len(), 2);
        assert_eq!(game.moves(), 1);
    }

    #[test]
    fn same_card_twice_is_rejected() {
        let mut game = game(4);
        game.on_card_click(5);
        assert!(game.on_card_click(5).is_empty());
        assert_eq!(game.flipped(), &[5]);
        assert_eq!(game.moves(), 0);
    }

    #[test]
    fn matched_and_out_of_range_cards_are_rejected() {
        let mut game = game(5);
        let (a, b) = pairs(&game)[3];
        game.on_card_click(a);
        game.on_card_click(b);
        assert!(game.on_card_click(a).is_empty());
        assert!(game.on_card_click(99).is_empty());
        assert!(game.flipped().is_empty());
    }

    #[test]
    fn completes_once_with_final_moves() {
        let mut game = game(6);
        let (a, b) = mismatch(&game);
        game.on_card_click(a);
        game.on_card_click(b);
        game.advance(Duration::from_secs(1));

        let mut completions = Vec::new();
        for (x, y) in pairs(&game) {
            game.on_card_click(x);
            for notice in game.on_card_click(y) {
                if let MatchNotice::Completed { moves } = notice {
                    completions.push(moves);
                }
            }
        }
        assert_eq!(completions, vec![9]);
        assert!(game.is_complete());
        assert!(game.on_card_click(0).is_empty());
    }

    #[test]
    fn reset_cancels_pending_revert() {
        let mut game = game(7);
        let (a, b) = mismatch(&game);
        game.on_card_click(a);
        game.on_card_click(b);
        assert!(game.revert_pending());

        game.reset_game();
        assert!(!game.revert_pending());
        game.on_card_click(3);
        assert!(game.advance(Duration::from_secs(5)).is_empty());
        assert_eq!(game.flipped(), &[3]);
        assert_eq!(game.moves(), 0);
    }

    #[test]
    fn reset_reshuffles_and_clears_progress() {
        let mut game = game(8);
        let before: Vec<Card> = game.cards().to_vec();
        let (a, b) = pairs(&game)[0];
        game.on_card_click(a);
        game.on_card_click(b);
        game.reset_game();

        assert_eq!(game.moves(), 0);
        assert_eq!(game.matched_pairs(), 0);
        assert!(game.flipped().is_empty());
        assert_eq!(game.phase(), MatchPhase::Playing);
        assert_eq!(game.cards().len(), 16);
        assert_ne!(game.cards(), &before[..]);
    }

    #[test]
    fn teardown_drops_pending_revert() {
        let mut game = game(9);
        let (a, b) = mismatch(&game);
        game.on_card_click(a);
        game.on_card_click(b);
        game.teardown();
        assert!(game.advance(Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn repeated_symbols_are_rejected() {
        let config = MatchConfig {
            symbols: vec!["❄".into(), "❅".into(), "❄".into()],
            ..MatchConfig::default()
        };
        assert!(matches!(
            MatchGame::new(&config, 1),
            Err(GameError::InvalidConfig(_))
        ));
        let empty = MatchConfig {
            symbols: Vec::new(),
            ..MatchConfig::default()
        };
        assert!(MatchGame::new(&empty, 1).is_err());
    }

    #[test]
    fn huge_elapsed_times_do_not_overflow_the_clock() {
        let mut game = game(8);
        let (a, b) = mismatch(&game);
        game.on_card_click(a);
        game.on_card_click(b);
        assert_eq!(
            game.advance(Duration::MAX),
            vec![MatchNotice::Reverted { first: a, second: b }]
        );
        assert!(game.advance(Duration::MAX).is_empty());
        assert!(game.flipped().is_empty());
        assert_eq!(game.moves(), 1);
    }
}
