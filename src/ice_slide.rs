//! Ice Slide: steer a sleigh left and right to dodge falling obstacles.
//!
//! The simulation runs in fixed steps fed by [`FixedTimestep`], so physics
//! does not depend on the host's frame rate. Each step runs, in order:
//! input, spawn, move, collision, cleanup and speed-up.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::IceSlideConfig;
use crate::error::GameError;
use crate::game::{GameKind, MiniGame};
use crate::geometry::Rect;
use crate::input::{InputState, KeyCode};
use crate::timing::FixedTimestep;

/// Picks the horizontal position of each new obstacle.
pub trait ObstacleSpawner: Send {
    /// Returns a left edge in `0.0..=max_x`.
    fn next_x(&mut self, max_x: f32) -> f32;
}

/// Uniformly random spawn positions.
#[derive(Debug, Clone)]
pub struct RandomSpawner {
    rng: ChaCha8Rng,
}

impl RandomSpawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl ObstacleSpawner for RandomSpawner {
    fn next_x(&mut self, max_x: f32) -> f32 {
        if max_x <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(0.0..=max_x)
    }
}

/// Starting speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    #[default]
    Normal,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideState {
    Idle,
    Running,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IceSlideEvent {
    Start(Pace),
    Reset,
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    TouchStart { x: f32 },
    TouchMove { x: f32 },
    TouchEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IceSlideNotice {
    Started { pace: Pace, speed: f32 },
    Spawned { x: f32 },
    Scored { score: u32 },
    SpeedUp { speed: f32 },
    GameOver { final_score: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IceSlideSnapshot {
    pub state: SlideState,
    pub pace: Pace,
    pub score: u32,
    pub speed: f32,
    pub steps: u64,
    pub field: Vec2,
    pub sleigh: Rect,
    pub obstacles: Vec<Rect>,
    pub final_score: Option<u32>,
}

pub struct IceSlide {
    config: IceSlideConfig,
    spawner: Box<dyn ObstacleSpawner>,
    timestep: FixedTimestep,
    state: SlideState,
    pace: Pace,
    score: u32,
    speed: f32,
    thresholds_applied: u32,
    steps: u64,
    sleigh: Rect,
    obstacles: Vec<Rect>,
    input: Option<Arc<InputState>>,
}

impl std::fmt::Debug for IceSlide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IceSlide")
            .field("state", &self.state)
            .field("score", &self.score)
            .field("speed", &self.speed)
            .field("steps", &self.steps)
            .field("obstacles", &self.obstacles.len())
            .finish_non_exhaustive()
    }
}

impl IceSlide {
    pub fn new(config: IceSlideConfig, seed: u64) -> Result<Self, GameError> {
        Self::with_spawner(config, Box::new(RandomSpawner::new(seed)))
    }

    pub fn with_spawner(
        config: IceSlideConfig,
        spawner: Box<dyn ObstacleSpawner>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let timestep = FixedTimestep::new(config.steps_per_second, config.max_catch_up_steps);
        let mut slide = Self {
            sleigh: Rect::default(),
            speed: config.normal_speed,
            config,
            spawner,
            timestep,
            state: SlideState::Idle,
            pace: Pace::Normal,
            score: 0,
            thresholds_applied: 0,
            steps: 0,
            obstacles: Vec::new(),
            input: None,
        };
        slide.sleigh = slide.home_sleigh();
        Ok(slide)
    }

    /// The sleigh starts with its left edge at the middle of the field.
    fn home_sleigh(&self) -> Rect {
        let field = self.config.field;
        let size = self.config.sleigh_size;
        Rect::new(
            (field.x / 2.0).min(field.x - size.x),
            field.y - self.config.sleigh_bottom_gap,
            size.x,
            size.y,
        )
    }

    fn base_speed(&self, pace: Pace) -> f32 {
        match pace {
            Pace::Normal => self.config.normal_speed,
            Pace::Run => self.config.run_speed,
        }
    }

    pub fn state(&self) -> SlideState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn sleigh(&self) -> Rect {
        self.sleigh
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &IceSlideConfig {
        &self.config
    }

    /// Input handle of the current run, if one is running.
    pub fn controls(&self) -> Option<Arc<InputState>> {
        self.input.clone()
    }

    /// Starts a fresh run, discarding the previous run and its input handle.
    pub fn start_game(&mut self, pace: Pace) -> Vec<IceSlideNotice> {
        self.detach_input();
        self.clear_run(pace);
        self.state = SlideState::Running;
        self.input = Some(Arc::new(InputState::new()));
        debug!("ice slide started at {pace:?} pace");
        vec![IceSlideNotice::Started {
            pace,
            speed: self.speed,
        }]
    }

    fn clear_run(&mut self, pace: Pace) {
        self.pace = pace;
        self.speed = self.base_speed(pace);
        self.score = 0;
        self.thresholds_applied = 0;
        self.steps = 0;
        self.obstacles.clear();
        self.sleigh = self.home_sleigh();
        self.timestep.reset();
    }

    fn detach_input(&mut self) {
        if let Some(input) = self.input.take() {
            input.detach();
        }
    }

    /// Runs one simulation step. Does nothing unless a run is in progress.
    pub fn step(&mut self) -> Vec<IceSlideNotice> {
        let mut notices = Vec::new();
        if self.state != SlideState::Running {
            return notices;
        }

        self.apply_input();

        if self.steps % self.config.spawn_interval == 0 {
            let size = self.config.obstacle_size;
            let x = self.spawner.next_x(self.config.field.x - size.x);
            self.obstacles.push(Rect::new(x, -size.y, size.x, size.y));
            notices.push(IceSlideNotice::Spawned { x });
        }

        for obstacle in &mut self.obstacles {
            obstacle.min.y += self.speed;
        }

        if self.obstacles.iter().any(|o| o.intersects(&self.sleigh)) {
            self.state = SlideState::Over;
            self.detach_input();
            self.timestep.reset();
            info!("ice slide over with score {}", self.score);
            notices.push(IceSlideNotice::GameOver {
                final_score: self.score,
            });
            return notices;
        }

        let bottom = self.config.field.y;
        let before = self.obstacles.len();
        self.obstacles.retain(|o| o.top() <= bottom);
        for _ in self.obstacles.len()..before {
            self.score += 1;
            notices.push(IceSlideNotice::Scored { score: self.score });
        }

        let reached = self.score / self.config.speed_threshold;
        while self.thresholds_applied < reached {
            self.thresholds_applied += 1;
            self.speed += self.config.speed_increment;
            debug!("ice slide speed now {}", self.speed);
            notices.push(IceSlideNotice::SpeedUp { speed: self.speed });
        }

        self.steps += 1;
        notices
    }

    fn apply_input(&mut self) {
        let Some(input) = &self.input else {
            return;
        };
        let mut x = self.sleigh.min.x;
        x += input.horizontal_axis() * self.config.sleigh_step;
        x += input.take_drag_delta() * self.config.touch_scale;
        self.sleigh.min.x = x.clamp(0.0, self.config.field.x - self.sleigh.size.x);
    }

    fn route_input(&self, event: IceSlideEvent) {
        let Some(input) = &self.input else {
            trace!("ignoring {event:?} outside a run");
            return;
        };
        match event {
            IceSlideEvent::KeyDown(key) => input.set_key_down(key),
            IceSlideEvent::KeyUp(key) => input.set_key_up(key),
            IceSlideEvent::TouchStart { x } => input.touch_start(x),
            IceSlideEvent::TouchMove { x } => input.touch_move(x),
            IceSlideEvent::TouchEnd => input.touch_end(),
            IceSlideEvent::Start(_) | IceSlideEvent::Reset => {}
        }
    }
}

impl MiniGame for IceSlide {
    type Event = IceSlideEvent;
    type Notice = IceSlideNotice;
    type Snapshot = IceSlideSnapshot;

    fn kind(&self) -> GameKind {
        GameKind::IceSlide
    }

    fn update(&mut self, event: IceSlideEvent) -> Vec<IceSlideNotice> {
        match event {
            IceSlideEvent::Start(pace) => self.start_game(pace),
            IceSlideEvent::Reset => {
                self.reset();
                Vec::new()
            }
            other => {
                self.route_input(other);
                Vec::new()
            }
        }
    }

    fn advance(&mut self, elapsed: Duration) -> Vec<IceSlideNotice> {
        if self.state != SlideState::Running {
            return Vec::new();
        }
        let mut notices = Vec::new();
        for _ in 0..self.timestep.advance(elapsed) {
            notices.extend(self.step());
            if self.state != SlideState::Running {
                break;
            }
        }
        notices
    }

    fn snapshot(&self) -> IceSlideSnapshot {
        IceSlideSnapshot {
            state: self.state,
            pace: self.pace,
            score: self.score,
            speed: self.speed,
            steps: self.steps,
            field: self.config.field,
            sleigh: self.sleigh,
            obstacles: self.obstacles.clone(),
            final_score: (self.state == SlideState::Over).then_some(self.score),
        }
    }

    fn reset(&mut self) {
        self.detach_input();
        self.clear_run(Pace::Normal);
        self.state = SlideState::Idle;
    }

    fn teardown(&mut self) {
        self.detach_input();
        if self.state == SlideState::Running {
            self.state = SlideState::Idle;
        }
    }

    fn is_finished(&self) -> bool {
        self.state == SlideState::Over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;

    /// Always spawns in the same lane.
    struct Lane(f32);

    impl ObstacleSpawner for Lane {
        fn next_x(&mut self, max_x: f32) -> f32 {
            self.0.min(max_x)
        }
    }

    fn slide_in_lane(x: f32) -> IceSlide {
        IceSlide::with_spawner(IceSlideConfig::default(), Box::new(Lane(x))).unwrap()
    }

    fn run_until_score(slide: &mut IceSlide, score: u32) {
        for _ in 0..100_000 {
            if slide.score() >= score || slide.state() != SlideState::Running {
                return;
            }
            slide.step();
        }
        panic!("score {score} never reached");
    }

    #[test]
    fn starts_idle_and_ignores_steps() {
        let mut slide = slide_in_lane(0.0);
        assert_eq!(slide.state(), SlideState::Idle);
        assert!(slide.step().is_empty());
        assert!(slide.obstacles().is_empty());
        assert!(slide.controls().is_none());
    }

    #[test]
    fn sleigh_starts_at_the_middle_of_the_field() {
        let slide = slide_in_lane(0.0);
        assert_eq!(slide.sleigh(), Rect::new(224.0, 350.0, 40.0, 30.0));

        let narrow = IceSlideConfig {
            field: Vec2::new(60.0, 400.0),
            obstacle_size: Vec2::splat(20.0),
            ..IceSlideConfig::default()
        };
        let slide = IceSlide::new(narrow, 1).unwrap();
        assert_eq!(slide.sleigh().left(), 20.0);
    }

    #[test]
    fn constructors_reject_unplayable_configs() {
        let no_spawns = IceSlideConfig {
            spawn_interval: 0,
            ..IceSlideConfig::default()
        };
        assert!(matches!(
            IceSlide::new(no_spawns, 1),
            Err(GameError::InvalidConfig(_))
        ));
        let no_threshold = IceSlideConfig {
            speed_threshold: 0,
            ..IceSlideConfig::default()
        };
        assert!(IceSlide::with_spawner(no_threshold, Box::new(Lane(0.0))).is_err());
        let nan_speed = IceSlideConfig {
            normal_speed: f32::NAN,
            ..IceSlideConfig::default()
        };
        assert!(IceSlide::new(nan_speed, 1).is_err());
    }

    #[test]
    fn pace_selects_base_speed() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        assert_eq!(slide.speed(), 8.0);
        slide.start_game(Pace::Run);
        assert_eq!(slide.speed(), 15.0);
    }

    #[test]
    fn first_step_spawns_above_the_field() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        let notices = slide.step();
        assert_eq!(notices, vec![IceSlideNotice::Spawned { x: 0.0 }]);
        assert_eq!(slide.obstacles(), &[Rect::new(0.0, -22.0, 30.0, 30.0)]);
    }

    #[test]
    fn spawns_every_sixty_steps() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        let spawned = (0..180)
            .flat_map(|_| slide.step())
            .filter(|notice| matches!(notice, IceSlideNotice::Spawned { .. }))
            .count();
        assert_eq!(spawned, 3);
    }

    #[test]
    fn speed_rises_once_per_ten_points() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        run_until_score(&mut slide, 9);
        assert_eq!(slide.speed(), 8.0);
        run_until_score(&mut slide, 10);
        assert_eq!(slide.score(), 10);
        assert_eq!(slide.speed(), 8.5);
        run_until_score(&mut slide, 19);
        assert_eq!(slide.speed(), 8.5);
        run_until_score(&mut slide, 20);
        assert_eq!(slide.speed(), 9.0);
        assert_eq!(slide.state(), SlideState::Running);
    }

    #[test]
    fn collision_ends_the_run_and_freezes_state() {
        let mut slide = slide_in_lane(224.0);
        slide.start_game(Pace::Normal);
        let controls = slide.controls().unwrap();
        let mut over = None;
        for _ in 0..200 {
            for notice in slide.step() {
                if let IceSlideNotice::GameOver { final_score } = notice {
                    over = Some(final_score);
                }
            }
        }
        assert_eq!(over, Some(0));
        assert_eq!(slide.state(), SlideState::Over);
        assert!(!controls.is_attached());
        assert!(slide.controls().is_none());

        let frozen = slide.snapshot();
        controls.set_key_down(KeyCode::Named(NamedKey::Left));
        slide.update(IceSlideEvent::KeyDown(KeyCode::Named(NamedKey::Right)));
        slide.update(IceSlideEvent::TouchStart { x: 0.0 });
        assert!(slide.step().is_empty());
        assert!(slide.advance(Duration::from_secs(2)).is_empty());
        assert_eq!(slide.snapshot(), frozen);
        assert_eq!(frozen.final_score, Some(0));
    }

    #[test]
    fn keys_move_and_clamp_the_sleigh() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        let start = slide.sleigh().left();
        slide.update(IceSlideEvent::KeyDown(KeyCode::Named(NamedKey::Right)));
        slide.step();
        assert_eq!(slide.sleigh().left(), start + 5.0);
        for _ in 0..200 {
            slide.step();
        }
        assert_eq!(slide.sleigh().left(), 448.0 - 40.0);
        slide.update(IceSlideEvent::KeyUp(KeyCode::Named(NamedKey::Right)));
        let parked = slide.sleigh().left();
        slide.step();
        assert_eq!(slide.sleigh().left(), parked);
    }

    #[test]
    fn touch_drag_is_scaled() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        let start = slide.sleigh().left();
        slide.update(IceSlideEvent::TouchStart { x: 100.0 });
        slide.update(IceSlideEvent::TouchMove { x: 80.0 });
        slide.step();
        assert_eq!(slide.sleigh().left(), start - 10.0);
    }

    #[test]
    fn restart_detaches_previous_controls() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        let stale = slide.controls().unwrap();
        for _ in 0..30 {
            slide.step();
        }
        slide.start_game(Pace::Run);
        assert!(!stale.is_attached());
        stale.set_key_down(KeyCode::Named(NamedKey::Left));
        let start = slide.sleigh().left();
        slide.step();
        assert_eq!(slide.sleigh().left(), start);
        assert_eq!(slide.score(), 0);
        assert_eq!(slide.obstacles().len(), 1);
    }

    #[test]
    fn advance_runs_fixed_steps() {
        let mut slide = slide_in_lane(0.0);
        slide.start_game(Pace::Normal);
        slide.advance(Duration::from_millis(100));
        assert_eq!(slide.steps(), 6);
        slide.advance(Duration::from_millis(5));
        assert_eq!(slide.steps(), 6);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut slide = slide_in_lane(0.0);
        let fresh = slide.snapshot();
        slide.start_game(Pace::Run);
        run_until_score(&mut slide, 3);
        slide.reset();
        assert_eq!(slide.snapshot(), fresh);
    }

    #[test]
    fn random_spawner_stays_in_bounds() {
        let mut spawner = RandomSpawner::new(7);
        for _ in 0..1000 {
            let x = spawner.next_x(418.0);
            assert!((0.0..=418.0).contains(&x));
        }
    }
}
