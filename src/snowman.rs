//! Build a Snowman: drag six parts onto their target zones.
//!
//! The host reports drags with the part's on-screen bounding box; the
//! builder decides whether the drop lands inside the tolerance window and,
//! if so, snaps the part onto its target and locks it there for good.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use glam::Vec2;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::config::{SnowmanConfig, TargetSpec};
use crate::error::GameError;
use crate::game::{GameKind, MiniGame};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartId {
    Head,
    Body,
    Bottom,
    Arms,
    Nose,
    Eyes,
}

impl PartId {
    pub const ALL: [PartId; 6] = [
        PartId::Head,
        PartId::Body,
        PartId::Bottom,
        PartId::Arms,
        PartId::Nose,
        PartId::Eyes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PartId::Head => "head",
            PartId::Body => "body",
            PartId::Bottom => "bottom",
            PartId::Arms => "arms",
            PartId::Nose => "nose",
            PartId::Eyes => "eyes",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartId {
    type Err = GameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        PartId::ALL
            .into_iter()
            .find(|part| part.as_str() == name)
            .ok_or_else(|| GameError::UnknownPart(name.to_string()))
    }
}

/// How a dropped part is compared against its tolerance-expanded target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementRule {
    /// Any overlap with the expanded target counts.
    #[default]
    Overlap,
    /// The part must lie fully inside the expanded target.
    Contain,
}

impl PlacementRule {
    pub fn accepts(self, part: &Rect, zone: &Rect) -> bool {
        match self {
            PlacementRule::Overlap => zone.intersects(part),
            PlacementRule::Contain => zone.contains_rect(part),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetZone {
    pub part: PartId,
    pub bounds: Rect,
}

/// Validated target zones, one per part.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    zones: [TargetZone; 6],
    part_sizes: [Vec2; 6],
}

impl Layout {
    pub fn from_config(config: &SnowmanConfig) -> Result<Self, GameError> {
        let mut entries: [Option<TargetSpec>; 6] = [None; 6];
        for entry in &config.targets {
            let slot = &mut entries[entry.part.index()];
            if slot.is_some() {
                return Err(GameError::DuplicateTarget(entry.part));
            }
            *slot = Some(*entry);
        }

        let mut zones = [TargetZone {
            part: PartId::Head,
            bounds: Rect::default(),
        }; 6];
        let mut part_sizes = [Vec2::ZERO; 6];
        for part in PartId::ALL {
            let entry = entries[part.index()].ok_or(GameError::MissingTarget(part))?;
            zones[part.index()] = TargetZone {
                part,
                bounds: Rect::from_center(entry.center, entry.size),
            };
            part_sizes[part.index()] = entry.part_size;
        }
        Ok(Self {
            zones,
            part_sizes,
        })
    }

    pub fn zone(&self, part: PartId) -> &TargetZone {
        &self.zones[part.index()]
    }

    /// Size of the draggable element for `part`.
    pub fn part_size(&self, part: PartId) -> Vec2 {
        self.part_sizes[part.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub placed: bool,
    /// Translation applied by dragging and snapping, relative to the
    /// part's layout position.
    pub offset: Vec2,
}

impl Part {
    fn new(id: PartId) -> Self {
        Self {
            id,
            placed: false,
            offset: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnowmanEvent {
    DragStart { part: PartId },
    DragMove { part: PartId, delta: Vec2 },
    DragEnd { part: PartId, bounds: Rect },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SnowmanNotice {
    Lifted { part: PartId },
    Placed { part: PartId, snap: Vec2 },
    Missed { part: PartId },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnowmanPhase {
    Building,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartView {
    pub id: PartId,
    pub placed: bool,
    pub offset: Vec2,
    pub target: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnowmanSnapshot {
    pub phase: SnowmanPhase,
    pub parts: Vec<PartView>,
    pub placed: usize,
    pub dragging: Option<PartId>,
}

#[derive(Debug, Clone)]
pub struct SnowmanBuilder {
    layout: Layout,
    tolerance: f32,
    rule: PlacementRule,
    parts: [Part; 6],
    dragging: Option<PartId>,
    phase: SnowmanPhase,
}

impl SnowmanBuilder {
    pub fn new(config: &SnowmanConfig) -> Result<Self, GameError> {
        config.validate()?;
        let layout = Layout::from_config(config)?;
        Ok(Self::with_layout(layout, config.tolerance, config.rule))
    }

    pub(crate) fn with_layout(layout: Layout, tolerance: f32, rule: PlacementRule) -> Self {
        Self {
            layout,
            tolerance,
            rule,
            parts: PartId::ALL.map(Part::new),
            dragging: None,
            phase: SnowmanPhase::Building,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn part(&self, id: PartId) -> &Part {
        &self.parts[id.index()]
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn placed_count(&self) -> usize {
        self.parts.iter().filter(|part| part.placed).count()
    }

    pub fn phase(&self) -> SnowmanPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SnowmanPhase::Completed
    }

    pub fn on_drag_start(&mut self, id: PartId) -> Vec<SnowmanNotice> {
        if self.part(id).placed {
            trace!("ignoring drag of placed part {id}");
            return Vec::new();
        }
        self.dragging = Some(id);
        vec![SnowmanNotice::Lifted { part: id }]
    }

    pub fn on_drag_move(&mut self, id: PartId, delta: Vec2) -> Vec<SnowmanNotice> {
        let part = &mut self.parts[id.index()];
        if part.placed {
            trace!("ignoring move of placed part {id}");
            return Vec::new();
        }
        part.offset += delta;
        Vec::new()
    }

    /// Tests the dropped part's bounding box against its expanded target.
    pub fn on_drag_end(&mut self, id: PartId, bounds: Rect) -> Vec<SnowmanNotice> {
        if self.dragging == Some(id) {
            self.dragging = None;
        }
        if self.part(id).placed {
            trace!("ignoring drop of placed part {id}");
            return Vec::new();
        }

        let target = self.layout.zone(id).bounds;
        if !self.rule.accepts(&bounds, &target.expand(self.tolerance)) {
            debug!("{id} dropped outside its target");
            return vec![SnowmanNotice::Missed { part: id }];
        }

        let snap = target.center() - bounds.center();
        let part = &mut self.parts[id.index()];
        part.offset += snap;
        part.placed = true;
        debug!("{id} placed ({}/6)", self.placed_count());

        let mut notices = vec![SnowmanNotice::Placed { part: id, snap }];
        notices.extend(self.check_completion());
        notices
    }

    /// Moves to the completed phase the first time every part is placed.
    pub fn check_completion(&mut self) -> Option<SnowmanNotice> {
        if self.phase == SnowmanPhase::Completed || self.parts.iter().any(|part| !part.placed) {
            return None;
        }
        self.phase = SnowmanPhase::Completed;
        info!("snowman complete");
        Some(SnowmanNotice::Completed)
    }
}

impl MiniGame for SnowmanBuilder {
    type Event = SnowmanEvent;
    type Notice = SnowmanNotice;
    type Snapshot = SnowmanSnapshot;

    fn kind(&self) -> GameKind {
        GameKind::Snowman
    }

    fn update(&mut self, event: SnowmanEvent) -> Vec<SnowmanNotice> {
        match event {
            SnowmanEvent::DragStart { part } => self.on_drag_start(part),
            SnowmanEvent::DragMove { part, delta } => self.on_drag_move(part, delta),
            SnowmanEvent::DragEnd { part, bounds } => self.on_drag_end(part, bounds),
        }
    }

    fn advance(&mut self, _elapsed: Duration) -> Vec<SnowmanNotice> {
        Vec::new()
    }

    fn snapshot(&self) -> SnowmanSnapshot {
        SnowmanSnapshot {
            phase: self.phase,
            parts: self
                .parts
                .iter()
                .map(|part| PartView {
                    id: part.id,
                    placed: part.placed,
                    offset: part.offset,
                    target: self.layout.zone(part.id).bounds,
                })
                .collect(),
            placed: self.placed_count(),
            dragging: self.dragging,
        }
    }

    fn reset(&mut self) {
        self.parts = PartId::ALL.map(Part::new);
        self.dragging = None;
        self.phase = SnowmanPhase::Building;
    }

    fn teardown(&mut self) {
        self.dragging = None;
    }

    fn is_finished(&self) -> bool {
        self.is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SnowmanBuilder {
        SnowmanBuilder::new(&SnowmanConfig::default()).unwrap()
    }

    fn drop_on_target(builder: &SnowmanBuilder, id: PartId, nudge: Vec2) -> Rect {
        let zone = builder.layout().zone(id).bounds;
        Rect::from_center(zone.center() + nudge, builder.layout().part_size(id))
    }

    #[test]
    fn starts_with_six_unplaced_parts() {
        let builder = builder();
        assert_eq!(builder.parts().len(), 6);
        assert_eq!(builder.placed_count(), 0);
        assert_eq!(builder.phase(), SnowmanPhase::Building);
    }

    #[test]
    fn nan_tolerance_is_rejected() {
        let config = SnowmanConfig {
            tolerance: f32::NAN,
            ..SnowmanConfig::default()
        };
        assert!(matches!(
            SnowmanBuilder::new(&config),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn drop_near_target_snaps_to_center() {
        let mut builder = builder();
        let bounds = drop_on_target(&builder, PartId::Head, Vec2::new(12.0, -7.0));
        let notices = builder.on_drag_end(PartId::Head, bounds);
        assert_eq!(
            notices,
            vec![SnowmanNotice::Placed {
                part: PartId::Head,
                snap: Vec2::new(-12.0, 7.0)
            }]
        );
        let head = builder.part(PartId::Head);
        assert!(head.placed);
        assert_eq!(head.offset, Vec2::new(-12.0, 7.0));
    }

    #[test]
    fn drop_far_away_is_a_miss() {
        let mut builder = builder();
        let bounds = Rect::new(600.0, 450.0, 20.0, 20.0);
        let notices = builder.on_drag_end(PartId::Nose, bounds);
        assert_eq!(notices, vec![SnowmanNotice::Missed { part: PartId::Nose }]);
        assert!(!builder.part(PartId::Nose).placed);
        assert_eq!(builder.part(PartId::Nose).offset, Vec2::ZERO);
    }

    #[test]
    fn tolerance_margin_is_respected() {
        let mut builder = builder();
        let zone = builder.layout().zone(PartId::Bottom).bounds;
        let just_inside = Rect::new(zone.right() + 29.0, zone.top(), 10.0, 10.0);
        let just_outside = Rect::new(zone.right() + 30.0, zone.top(), 10.0, 10.0);
        assert_eq!(
            builder.on_drag_end(PartId::Bottom, just_outside),
            vec![SnowmanNotice::Missed {
                part: PartId::Bottom
            }]
        );
        assert!(builder.on_drag_end(PartId::Bottom, just_inside)[0]
            != SnowmanNotice::Missed {
                part: PartId::Bottom
            });
        assert!(builder.part(PartId::Bottom).placed);
    }

    #[test]
    fn contain_rule_requires_whole_part_inside() {
        let mut config = SnowmanConfig::default();
        config.rule = PlacementRule::Contain;
        let mut builder = SnowmanBuilder::new(&config).unwrap();
        let zone = builder.layout().zone(PartId::Head).bounds;
        let straddling = Rect::from_center(zone.center() + Vec2::new(60.0, 0.0), zone.size);
        assert_eq!(
            builder.on_drag_end(PartId::Head, straddling),
            vec![SnowmanNotice::Missed { part: PartId::Head }]
        );
        let inside = Rect::from_center(zone.center() + Vec2::new(20.0, 0.0), zone.size);
        assert!(matches!(
            builder.on_drag_end(PartId::Head, inside).as_slice(),
            [SnowmanNotice::Placed { .. }]
        ));
    }

    #[test]
    fn placed_parts_are_locked() {
        let mut builder = builder();
        let bounds = drop_on_target(&builder, PartId::Arms, Vec2::ZERO);
        builder.on_drag_end(PartId::Arms, bounds);
        let offset = builder.part(PartId::Arms).offset;

        assert!(builder.on_drag_start(PartId::Arms).is_empty());
        assert!(builder
            .on_drag_move(PartId::Arms, Vec2::new(100.0, 100.0))
            .is_empty());
        assert!(builder
            .on_drag_end(PartId::Arms, Rect::new(0.0, 0.0, 1.0, 1.0))
            .is_empty());
        assert!(builder.part(PartId::Arms).placed);
        assert_eq!(builder.part(PartId::Arms).offset, offset);
    }

    #[test]
    fn drag_moves_accumulate_offset() {
        let mut builder = builder();
        assert_eq!(
            builder.on_drag_start(PartId::Eyes),
            vec![SnowmanNotice::Lifted { part: PartId::Eyes }]
        );
        builder.on_drag_move(PartId::Eyes, Vec2::new(10.0, 5.0));
        builder.on_drag_move(PartId::Eyes, Vec2::new(-4.0, 1.0));
        assert_eq!(builder.part(PartId::Eyes).offset, Vec2::new(6.0, 6.0));
        assert_eq!(builder.snapshot().dragging, Some(PartId::Eyes));
    }

    #[test]
    fn completion_fires_once_after_last_part() {
        let mut builder = builder();
        let mut completions = 0;
        for id in [
            PartId::Eyes,
            PartId::Bottom,
            PartId::Nose,
            PartId::Head,
            PartId::Arms,
            PartId::Body,
        ] {
            assert!(!builder.is_completed());
            let bounds = drop_on_target(&builder, id, Vec2::new(3.0, 3.0));
            completions += builder
                .on_drag_end(id, bounds)
                .iter()
                .filter(|notice| **notice == SnowmanNotice::Completed)
                .count();
        }
        assert_eq!(completions, 1);
        assert!(builder.is_completed());
        assert_eq!(builder.check_completion(), None);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut builder = builder();
        let fresh = builder.snapshot();
        for id in PartId::ALL {
            let bounds = drop_on_target(&builder, id, Vec2::ZERO);
            builder.on_drag_end(id, bounds);
        }
        builder.reset();
        assert_eq!(builder.snapshot(), fresh);
    }

    #[test]
    fn layout_rejects_duplicate_targets() {
        let mut config = SnowmanConfig::default();
        let head = config.targets[0];
        config.targets.push(head);
        assert_eq!(
            SnowmanBuilder::new(&config).unwrap_err(),
            GameError::DuplicateTarget(PartId::Head)
        );
    }
}
