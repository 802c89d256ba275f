//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Per-millisecond constants, scaled by the frame delta
//! - Seeded RNG only
//! - Stable entity order (map parse order)
//! - No rendering or platform dependencies beyond injected capabilities

pub mod entity;
pub mod game;
pub mod level;
pub mod rect;
pub mod time;

pub use entity::{Entity, EntityKind, Player, UpdateCtx};
pub use game::{Game, GameError};
pub use level::{Level, default_level_maps};
pub use rect::Rect;
pub use time::TimeFactor;
