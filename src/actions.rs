use std::fmt;

use serde::Serialize;

use crate::spatial::{Direction, Pos};

/// One command for the game, in the order it was issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Move { unit: String, direction: Direction },
    BuildCity { unit: String },
    BuildWorker { tile: Pos },
    Research { tile: Pos },
}

impl Action {
    pub fn unit(&self) -> Option<&str> {
        match self {
            Action::Move { unit, .. } | Action::BuildCity { unit } => Some(unit),
            Action::BuildWorker { .. } | Action::Research { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { unit, direction } => write!(f, "m {unit} {}", direction.code()),
            Action::BuildCity { unit } => write!(f, "bcity {unit}"),
            Action::BuildWorker { tile } => write!(f, "bw {} {}", tile.x, tile.y),
            Action::Research { tile } => write!(f, "r {} {}", tile.x, tile.y),
        }
    }
}
