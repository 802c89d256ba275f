//! Chrono Hop - a side-scrolling platformer built around stopping time
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collision, level/game state)
//! - `snapshot`: Save-game wire format (tagged JSON records)
//! - `render`: Renderer capability consumed by the read-only render pass
//! - `audio`: Sound playback capability (fire-and-forget cues)
//! - `input`: Raw key state to discrete command translation
//! - `persistence`: Snapshot storage with a background writer

pub mod audio;
pub mod input;
pub mod persistence;
pub mod render;
pub mod sim;
pub mod snapshot;

pub use audio::{SoundId, SoundPlayer};
pub use input::{Command, InputMap};
pub use sim::{Game, GameError, Level, Player, TimeFactor};
pub use snapshot::SnapshotError;

/// Gameplay constants
///
/// All speeds and accelerations are per millisecond so a variable frame
/// delta scales correctly. No fixed-timestep accumulator is used; a very
/// large delta can tunnel through thin colliders, which is accepted.
pub mod consts {
    /// Grid cell edge length in world units; every tile is one cell
    pub const BLOCK_SIZE: f32 = 20.0;

    /// Player bounding box
    pub const PLAYER_WIDTH: f32 = 16.0;
    pub const PLAYER_HEIGHT: f32 = 30.0;
    /// Downward acceleration while airborne (units/ms^2)
    pub const GRAVITY: f32 = 0.0005;
    /// Horizontal speed gained per millisecond of held input
    pub const PLAYER_STEP: f32 = 0.01;
    /// Grace window between a death/win and it becoming terminal (ms)
    pub const FINALIZATION_TIME: f32 = 3000.0;

    /// Lava tiles are slightly smaller than a cell, centered in it
    pub const LAVA_SCALE: f32 = 0.9;
    /// Patrolling lava speed (units/ms, scaled by the level speed factor)
    pub const LAVA_SPEED: f32 = 0.1;

    /// Coin wobble phase speed (radians per second of scaled time)
    pub const COIN_WOBBLE_SPEED: f32 = 6.0;
    /// Coin wobble amplitude in world units
    pub const COIN_WOBBLE_DIST: f32 = 2.0;

    /// Auto-targeting monster walk speed (units/ms)
    pub const MONSTER_SPEED: f32 = 0.05;

    /// Full-stop phase duration (ms)
    pub const TIME_STOP: f32 = 5000.0;
    /// Ramp-back-in phase duration (ms)
    pub const TIME_FREEZE: f32 = 1000.0;
    /// Cooldown before the ability can fire again (ms)
    pub const TIME_STOP_IDLE: f32 = TIME_STOP + TIME_FREEZE;
    /// Gain of the logistic time-acceleration curve
    pub const TIME_ACCELERATION_SCALE: f32 = 50.0;

    /// Play time between autosaves (ms)
    pub const SAVE_GAME_DELAY: f32 = 1000.0;
    /// Length of the accelerating ramp before a world reset (ms)
    pub const GAME_RESET_DELAY: f32 = 10000.0;
    /// World-reset time budget armed by the reset command (ms)
    pub const WORLD_RESET_TIME: f32 = 60000.0;
    /// HUD countdown turns red below this remainder (ms)
    pub const WARNING_TIME: f32 = 30000.0;
}

/// Logistic curve, the smooth step behind `time_acceleration`
#[inline]
pub fn sigmoid(t: f32) -> f32 {
    1.0 / (1.0 + (-t).exp())
}
