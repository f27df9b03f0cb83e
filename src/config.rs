use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::snowman::{PartId, PlacementRule};

/// Tunables for all three games.
///
/// Defaults reproduce the reference behaviour of the site; every value can be
/// overridden from an XML document (see [`GameConfig::from_xml`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub snowman: SnowmanConfig,
    pub ice_slide: IceSlideConfig,
    pub matching: MatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowmanConfig {
    /// Pixels added on every side of a target zone before the placement test.
    pub tolerance: f32,
    pub rule: PlacementRule,
    pub board: Vec2,
    pub targets: Vec<TargetSpec>,
}

/// Target zone and draggable size for one snowman part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub part: PartId,
    pub center: Vec2,
    pub size: Vec2,
    pub part_size: Vec2,
}

impl Default for SnowmanConfig {
    fn default() -> Self {
        let board = Vec2::new(672.0, 500.0);
        let zone = |part, (left, top): (f32, f32), size: f32, part_size: Vec2| TargetSpec {
            part,
            center: Vec2::new(board.x * left, board.y * top),
            size: Vec2::splat(size),
            part_size,
        };
        Self {
            tolerance: 30.0,
            rule: PlacementRule::Overlap,
            board,
            targets: vec![
                zone(PartId::Head, (0.50, 0.10), 50.0, Vec2::splat(70.0)),
                zone(PartId::Body, (0.50, 0.30), 60.0, Vec2::splat(80.0)),
                zone(PartId::Bottom, (0.50, 0.60), 80.0, Vec2::splat(100.0)),
                zone(PartId::Arms, (0.25, 0.30), 40.0, Vec2::new(100.0, 40.0)),
                zone(PartId::Nose, (0.55, 0.15), 20.0, Vec2::splat(40.0)),
                zone(PartId::Eyes, (0.45, 0.15), 30.0, Vec2::new(50.0, 30.0)),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceSlideConfig {
    pub field: Vec2,
    pub sleigh_size: Vec2,
    /// Distance from the sleigh's top edge to the bottom of the field.
    pub sleigh_bottom_gap: f32,
    pub obstacle_size: Vec2,
    pub normal_speed: f32,
    pub run_speed: f32,
    pub speed_increment: f32,
    /// Score interval between speed increases.
    pub speed_threshold: u32,
    /// Steps between obstacle spawns.
    pub spawn_interval: u64,
    /// Horizontal distance a held key moves the sleigh per step.
    pub sleigh_step: f32,
    pub touch_scale: f32,
    pub steps_per_second: u32,
    pub max_catch_up_steps: u32,
}

impl Default for IceSlideConfig {
    fn default() -> Self {
        Self {
            field: Vec2::new(448.0, 400.0),
            sleigh_size: Vec2::new(40.0, 30.0),
            sleigh_bottom_gap: 50.0,
            obstacle_size: Vec2::splat(30.0),
            normal_speed: 8.0,
            run_speed: 15.0,
            speed_increment: 0.5,
            speed_threshold: 10,
            spawn_interval: 60,
            sleigh_step: 5.0,
            touch_scale: 0.5,
            steps_per_second: 60,
            max_catch_up_steps: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub revert_delay_ms: u64,
    pub symbols: Vec<String>,
}

pub const SNOWFLAKE_PATTERNS: [&str; 8] = ["❄️", "❅", "❆", "✻", "✼", "✽", "✾", "✿"];

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            revert_delay_ms: 1000,
            symbols: SNOWFLAKE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GameConfig {
    /// Reads and validates a config document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parses a `<games>` document. Missing elements keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid config XML")?;
        let root = document.root_element();
        if !root.has_tag_name("games") {
            return Err(anyhow!(
                "expected <games> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut config = Self::default();
        if let Some(node) = child(&root, "snowman") {
            apply_snowman(&node, &mut config.snowman)?;
        }
        if let Some(node) = child(&root, "ice-slide") {
            apply_ice_slide(&node, &mut config.ice_slide)?;
        }
        if let Some(node) = child(&root, "match") {
            apply_match(&node, &mut config.matching)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        self.snowman.validate()?;
        self.ice_slide.validate()?;
        self.matching.validate()
    }
}

impl SnowmanConfig {
    /// Every part needs exactly one target.
    pub fn validate(&self) -> Result<(), GameError> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(invalid("snowman tolerance must be non-negative"));
        }
        if !positive_size(self.board) {
            return Err(invalid("snowman board must have a positive size"));
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.part) {
                return Err(GameError::DuplicateTarget(target.part));
            }
            if !target.center.is_finite()
                || !positive_size(target.size)
                || !positive_size(target.part_size)
            {
                return Err(invalid("snowman targets need finite positions and positive sizes"));
            }
        }
        if let Some(part) = PartId::ALL.into_iter().find(|part| !seen.contains(part)) {
            return Err(GameError::MissingTarget(part));
        }
        Ok(())
    }
}

impl IceSlideConfig {
    /// Rejects values the step loop cannot run with.
    pub fn validate(&self) -> Result<(), GameError> {
        if !positive_size(self.field)
            || !positive_size(self.sleigh_size)
            || !positive_size(self.obstacle_size)
        {
            return Err(invalid("ice slide sizes must be positive and finite"));
        }
        if self.field.x < self.sleigh_size.x || self.field.x < self.obstacle_size.x {
            return Err(invalid("ice slide field is narrower than its sprites"));
        }
        if !(0.0..=self.field.y).contains(&self.sleigh_bottom_gap) {
            return Err(invalid("ice slide sleigh does not fit in the field"));
        }
        if !positive(self.normal_speed) || !positive(self.run_speed) {
            return Err(invalid("ice slide speeds must be positive"));
        }
        if !(self.speed_increment.is_finite() && self.speed_increment >= 0.0) {
            return Err(invalid("ice slide speed increment must be non-negative"));
        }
        if !positive(self.sleigh_step) || !positive(self.touch_scale) {
            return Err(invalid("ice slide steering must be positive"));
        }
        if self.spawn_interval == 0
            || self.speed_threshold == 0
            || self.steps_per_second == 0
            || self.max_catch_up_steps == 0
        {
            return Err(invalid("ice slide intervals must be positive"));
        }
        Ok(())
    }
}

impl MatchConfig {
    pub fn revert_delay(&self) -> Duration {
        Duration::from_millis(self.revert_delay_ms)
    }

    /// A deck needs at least one symbol and no symbol twice.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.symbols.is_empty() {
            return Err(invalid("match needs at least one symbol"));
        }
        let unique: HashSet<&String> = self.symbols.iter().collect();
        if unique.len() != self.symbols.len() {
            return Err(invalid("match symbols must be unique"));
        }
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn positive_size(size: Vec2) -> bool {
    positive(size.x) && positive(size.y)
}

fn invalid(message: &str) -> GameError {
    GameError::InvalidConfig(message.to_string())
}

fn apply_snowman(node: &Node<'_, '_>, config: &mut SnowmanConfig) -> Result<()> {
    config.tolerance = parse_f32(optional_text(node, "tolerance"), config.tolerance)?;
    if let Some(rule) = optional_text(node, "rule") {
        config.rule = match rule.as_str() {
            "overlap" => PlacementRule::Overlap,
            "contain" => PlacementRule::Contain,
            other => return Err(anyhow!("unknown placement rule: {other}")),
        };
    }
    config.board = parse_vec2(optional_text(node, "board"), config.board)?;

    let mut overridden = HashSet::new();
    for target in node.children().filter(|n| n.has_tag_name("target")) {
        let name = target
            .attribute("part")
            .ok_or_else(|| anyhow!("<target> is missing its part attribute"))?;
        let part: PartId = name.parse()?;
        if !overridden.insert(part) {
            return Err(GameError::DuplicateTarget(part).into());
        }
        let entry = config
            .targets
            .iter_mut()
            .find(|entry| entry.part == part)
            .ok_or(GameError::MissingTarget(part))?;
        entry.center = parse_vec2(optional_text(&target, "center"), entry.center)?;
        entry.size = parse_vec2(optional_text(&target, "size"), entry.size)?;
        entry.part_size = parse_vec2(optional_text(&target, "part-size"), entry.part_size)?;
    }
    Ok(())
}

fn apply_ice_slide(node: &Node<'_, '_>, config: &mut IceSlideConfig) -> Result<()> {
    config.field = parse_vec2(optional_text(node, "field"), config.field)?;
    config.sleigh_size = parse_vec2(optional_text(node, "sleigh-size"), config.sleigh_size)?;
    config.sleigh_bottom_gap = parse_f32(
        optional_text(node, "sleigh-bottom-gap"),
        config.sleigh_bottom_gap,
    )?;
    config.obstacle_size = parse_vec2(optional_text(node, "obstacle-size"), config.obstacle_size)?;
    config.normal_speed = parse_f32(optional_text(node, "normal-speed"), config.normal_speed)?;
    config.run_speed = parse_f32(optional_text(node, "run-speed"), config.run_speed)?;
    config.speed_increment =
        parse_f32(optional_text(node, "speed-increment"), config.speed_increment)?;
    config.speed_threshold =
        parse_int(optional_text(node, "speed-threshold"), config.speed_threshold)?;
    config.spawn_interval = parse_int(optional_text(node, "spawn-interval"), config.spawn_interval)?;
    config.sleigh_step = parse_f32(optional_text(node, "sleigh-step"), config.sleigh_step)?;
    config.touch_scale = parse_f32(optional_text(node, "touch-scale"), config.touch_scale)?;
    config.steps_per_second =
        parse_int(optional_text(node, "steps-per-second"), config.steps_per_second)?;
    config.max_catch_up_steps = parse_int(
        optional_text(node, "max-catch-up-steps"),
        config.max_catch_up_steps,
    )?;
    Ok(())
}

fn apply_match(node: &Node<'_, '_>, config: &mut MatchConfig) -> Result<()> {
    config.revert_delay_ms = parse_int(optional_text(node, "revert-delay-ms"), config.revert_delay_ms)?;
    if let Some(symbols) = optional_text(node, "symbols") {
        config.symbols = symbols.split_whitespace().map(str::to_string).collect();
    }
    Ok(())
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec2(value: Option<String>, default: Vec2) -> Result<Vec2> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value.split_whitespace().map(|component| {
        component
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse {component:?}: {err}"))
    });
    let x = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))??;
    let y = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))??;
    Ok(Vec2::new(x, y))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}

fn parse_int<T>(value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow!("failed to parse integer {value:?}: {err}")),
        None => Ok(default),
    }
}
