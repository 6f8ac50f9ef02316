use cq_core::Value;
use serde::Serialize;
use tracing::{debug, warn};

use crate::registry::Mechanism;

/// Preset movement configurations a lesson can pick by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementPattern {
    VerticalLoop = 1,
    VerticalPaused = 2,
    VerticalHoldTop = 3,
    HorizontalLoop = 4,
    HorizontalPaused = 5,
    HorizontalHoldRight = 6,
}

impl MovementPattern {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Self::VerticalLoop),
            2 => Some(Self::VerticalPaused),
            3 => Some(Self::VerticalHoldTop),
            4 => Some(Self::HorizontalLoop),
            5 => Some(Self::HorizontalPaused),
            6 => Some(Self::HorizontalHoldRight),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn offset(self) -> (f32, f32) {
        match self {
            Self::VerticalLoop | Self::VerticalPaused | Self::VerticalHoldTop => (0.0, -75.0),
            Self::HorizontalLoop | Self::HorizontalPaused | Self::HorizontalHoldRight => {
                (75.0, 0.0)
            }
        }
    }

    /// Seconds to wait after reaching the far end and after coming back.
    pub fn pauses(self) -> (f32, f32) {
        match self {
            Self::VerticalLoop | Self::HorizontalLoop => (0.0, 0.0),
            Self::VerticalPaused | Self::HorizontalPaused => (1.0, 1.0),
            Self::VerticalHoldTop | Self::HorizontalHoldRight => (2.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformMechanism {
    pub id: String,
    pub pattern: Option<MovementPattern>,
    pub offset: (f32, f32),
    pub pause_at_target: f32,
    pub pause_at_start: f32,
    pub looping: bool,
    pub moving: bool,
    pub heading_to_target: bool,
}

impl PlatformMechanism {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: None,
            offset: (0.0, -75.0),
            pause_at_target: 0.0,
            pause_at_start: 0.0,
            looping: true,
            moving: false,
            heading_to_target: true,
        }
    }

    pub fn with_pattern(id: impl Into<String>, index: i64) -> Self {
        let mut platform = Self::new(id);
        if platform.set_pattern(index) {
            platform.moving = true;
        }
        platform
    }

    pub fn set_pattern(&mut self, index: i64) -> bool {
        let Some(pattern) = MovementPattern::from_index(index) else {
            warn!(mechanism_id = %self.id, index, "movement pattern must be between 1 and 6");
            return false;
        };
        let (pause_at_target, pause_at_start) = pattern.pauses();
        self.pattern = Some(pattern);
        self.offset = pattern.offset();
        self.pause_at_target = pause_at_target;
        self.pause_at_start = pause_at_start;
        self.looping = true;
        self.heading_to_target = true;
        self.moving = true;
        true
    }

    pub fn set_offset(&mut self, offset: (f32, f32)) {
        self.offset = offset;
        self.heading_to_target = true;
        self.moving = true;
    }

    pub fn return_to_start(&mut self) {
        self.heading_to_target = false;
        self.moving = true;
    }

    pub fn stop(&mut self) {
        self.moving = false;
    }

    pub fn activate(&mut self) {
        self.moving = true;
    }
}

fn parse_offset(raw: &str) -> Option<(f32, f32)> {
    let (x, y) = raw.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

impl Mechanism for PlatformMechanism {
    fn apply_effect(&mut self, effect: &str, value: Option<&Value>) {
        match effect {
            "set_pattern" => match value.and_then(Value::as_number) {
                Some(index) if index.is_finite() => {
                    self.set_pattern(index.trunc() as i64);
                }
                _ => warn!(mechanism_id = %self.id, "set_pattern needs a numeric value"),
            },
            "set_offset" => match value.and_then(Value::as_string).and_then(parse_offset) {
                Some(offset) => self.set_offset(offset),
                None => warn!(mechanism_id = %self.id, "set_offset needs an \"x,y\" value"),
            },
            "activate" => self.activate(),
            "stop" => self.stop(),
            "return_to_start" => self.return_to_start(),
            other => debug!(mechanism_id = %self.id, effect = other, "effect ignored"),
        }
    }
}
