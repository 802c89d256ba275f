//! Game: the ordered level set, world reset pressure, autosave and the
//! terminal screens
//!
//! The game advances its current level every frame, promotes completion to
//! the next level, retries failure in place, and keeps a doomsday clock:
//! once the world-reset countdown is armed, running out of time speeds the
//! whole world up over ten seconds and then starts the game over.

use glam::Vec2;
use thiserror::Error;

use super::level::Level;
use super::time::TimeFactor;
use crate::audio::{SoundId, SoundPlayer};
use crate::consts::*;
use crate::input::Command;
use crate::persistence::SnapshotStore;
use crate::render::{Color, Renderer};
use crate::snapshot;

/// Errors surfaced by level sequencing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Advancing past the last level; the caller transitions to the
    /// victory screen
    #[error("all levels complete")]
    AllLevelsComplete,
}

/// The whole run: levels, world-reset clock, autosave schedule
#[derive(Debug, Clone)]
pub struct Game {
    pub level_maps: Vec<Vec<String>>,
    /// `None` once every level is beaten (the terminal won screen)
    pub level: Option<Level>,

    /// Remaining world-reset budget; inactive until the reset command
    pub(crate) time_to_reset: TimeFactor,
    /// Remaining portion of the accelerating ramp that ends in a reset
    reset_ramp_left: TimeFactor,

    save_countdown: TimeFactor,
}

impl Game {
    /// Start a fresh run on the first level and the main soundtrack
    pub fn new(
        level_maps: Vec<Vec<String>>,
        audio: &mut dyn SoundPlayer,
    ) -> Result<Self, GameError> {
        let mut game = Self {
            level_maps,
            level: None,
            time_to_reset: TimeFactor::default(),
            reset_ramp_left: TimeFactor::default(),
            save_countdown: TimeFactor::new(SAVE_GAME_DELAY),
        };
        game.next_level()?;
        if let Some(level) = game.level.as_mut() {
            level.reset();
        }
        audio.play_track("soundtrack");
        Ok(game)
    }

    /// Restore a run from a persisted snapshot
    pub fn from_snapshot(
        json: &str,
        audio: &mut dyn SoundPlayer,
    ) -> Result<Self, snapshot::SnapshotError> {
        let game = snapshot::decode_game(json)?;
        audio.play_track("soundtrack");
        Ok(game)
    }

    pub(crate) fn restored(
        level_maps: Vec<Vec<String>>,
        level: Option<Level>,
        time_to_reset: TimeFactor,
    ) -> Self {
        Self {
            level_maps,
            level,
            time_to_reset,
            reset_ramp_left: TimeFactor::default(),
            save_countdown: TimeFactor::new(SAVE_GAME_DELAY),
        }
    }

    /// Swap in the level after the current one (the first if there is no
    /// current). The new level still needs a `reset()`.
    pub fn next_level(&mut self) -> Result<(), GameError> {
        let index = self.level.as_ref().map_or(0, |level| level.number + 1);
        if index >= self.level_maps.len() {
            return Err(GameError::AllLevelsComplete);
        }
        let is_final = index == self.level_maps.len() - 1;
        self.level = Some(Level::new(self.level_maps[index].clone(), index, is_final));
        Ok(())
    }

    /// Dispatch one translated input command
    pub fn handle(&mut self, command: Command, dt: f32, audio: &mut dyn SoundPlayer) {
        match command {
            Command::MoveLeft => {
                if let Some(player) = self.player_mut() {
                    player.move_left(dt);
                }
            }
            Command::MoveRight => {
                if let Some(player) = self.player_mut() {
                    player.move_right(dt);
                }
            }
            Command::Jump => {
                if let Some(player) = self.player_mut() {
                    player.jump(dt, audio);
                }
            }
            Command::TimeStop => {
                if let Some(level) = self.level.as_mut() {
                    level.set_time_stop(audio);
                }
            }
            Command::WorldReset => self.start_world_reset(audio),
        }
    }

    fn player_mut(&mut self) -> Option<&mut super::entity::Player> {
        self.level.as_mut().and_then(|level| level.player.as_mut())
    }

    /// Arm the world-reset countdown. Refused while time is stopped and
    /// while a reset is already under way.
    pub fn start_world_reset(&mut self, audio: &mut dyn SoundPlayer) {
        let Some(level) = self.level.as_ref() else {
            return;
        };
        if level.is_time_stopped() || self.reset_engaged() {
            return;
        }
        log::info!("World reset armed.");
        self.time_to_reset.set(WORLD_RESET_TIME);
        audio.play(SoundId::WorldReset);
    }

    fn reset_engaged(&self) -> bool {
        self.time_to_reset.is_active() || self.reset_ramp_left.is_active()
    }

    /// Advance the whole game one frame
    pub fn update(&mut self, dt: f32, audio: &mut dyn SoundPlayer, store: &mut dyn SnapshotStore) {
        if self.level.is_none() {
            return;
        }

        self.advance_world_reset(dt, audio);

        let mut completed = None;
        if let Some(level) = self.level.as_mut() {
            level.update(dt, audio);
            if !level.is_running() {
                completed = Some(level.is_complete());
            }
        }

        match completed {
            // Won: move on, or end the run on the last level
            Some(true) => match self.next_level() {
                Ok(()) => {
                    if let Some(level) = self.level.as_mut() {
                        level.reset();
                    }
                }
                Err(GameError::AllLevelsComplete) => {
                    log::info!("All levels complete, deleting the save.");
                    self.level = None;
                    store.clear();
                    audio.play_track("ending");
                    return;
                }
            },
            // Failed: retry the same level from scratch
            Some(false) => {
                if let Some(level) = self.level.as_mut() {
                    level.reset();
                }
            }
            None => {}
        }

        self.autosave(dt, store);
    }

    /// World-reset clockwork: the budget ticks while time is not stopped;
    /// an exhausted budget runs the acceleration ramp, and a finished ramp
    /// starts the game over with a full budget.
    fn advance_world_reset(&mut self, dt: f32, audio: &mut dyn SoundPlayer) {
        let time_stopped = self.level.as_ref().is_some_and(Level::is_time_stopped);

        if self.time_to_reset.is_active() {
            if !time_stopped {
                self.time_to_reset.decr(dt);
                if !self.time_to_reset.is_active() {
                    log::info!("Time is up, the world unwinds ...");
                    self.reset_ramp_left.set(GAME_RESET_DELAY);
                }
            }
        } else if self.reset_ramp_left.is_active() && !time_stopped {
            self.reset_ramp_left.decr(dt);
            let t = 1.0 - self.reset_ramp_left.value().max(0.0) / GAME_RESET_DELAY;
            if let Some(level) = self.level.as_mut() {
                level.set_reset_ramp(t);
            }
            if !self.reset_ramp_left.is_active() {
                self.restart(audio);
            }
        }

        let pressure = self.reset_engaged().then_some(self.time_to_reset);
        if let Some(level) = self.level.as_mut() {
            level.set_reset_pressure(pressure);
        }
    }

    /// Hard reset: level 0 with a full time budget
    fn restart(&mut self, audio: &mut dyn SoundPlayer) {
        log::info!("World reset: starting over from level 0.");
        self.level = None;
        if self.next_level().is_ok() {
            if let Some(level) = self.level.as_mut() {
                level.reset();
            }
        }
        self.time_to_reset.set(WORLD_RESET_TIME);
        // A fresh cycle of the countdown cue
        audio.stop(SoundId::WorldReset);
        audio.play(SoundId::WorldReset);
    }

    /// Count down play time and hand a fresh snapshot to the store every
    /// `SAVE_GAME_DELAY`; encoding happens here, writing is the store's
    /// business (and may be backgrounded).
    fn autosave(&mut self, dt: f32, store: &mut dyn SnapshotStore) {
        if self.level.is_none() {
            return;
        }
        self.save_countdown.decr(dt);
        if self.save_countdown.is_active() {
            return;
        }
        self.save_countdown.set(SAVE_GAME_DELAY);
        match snapshot::encode_game(self) {
            Ok(json) => store.write(json),
            // Play continues even if persistence misbehaves
            Err(error) => log::error!("Failed to encode autosave: {error}"),
        }
    }

    /// Read-only render pass: the current level, or the victory screen
    pub fn render(&self, renderer: &mut dyn Renderer, view: Vec2) {
        match &self.level {
            Some(level) => level.render(renderer, view),
            None => {
                renderer.draw_text(
                    Vec2::new(view.x * 0.5, view.y * 0.5),
                    "Congratulations, You Won!",
                    Color::BLACK,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Cue, MemorySounds};
    use crate::persistence::MemoryStore;

    fn tiny_maps() -> Vec<Vec<String>> {
        // One coin each; collecting it wins the level
        vec![
            vec![
                "#####".to_string(),
                "#@.o#".to_string(),
                "#...#".to_string(),
                "#####".to_string(),
            ],
            vec![
                "#####".to_string(),
                "#o.@#".to_string(),
                "#...#".to_string(),
                "#####".to_string(),
            ],
        ]
    }

    fn new_game(audio: &mut MemorySounds) -> Game {
        Game::new(tiny_maps(), audio).unwrap()
    }

    /// Drive the level to a win and through the finalization window
    fn win_current_level(game: &mut Game, audio: &mut MemorySounds, store: &mut MemoryStore) {
        let going_right = game
            .level
            .as_ref()
            .and_then(|l| l.player.as_ref())
            .map(|p| p.location.x < 40.0)
            .unwrap_or(true);
        let number = game.level.as_ref().unwrap().number;
        for _ in 0..400 {
            let command = if going_right {
                Command::MoveRight
            } else {
                Command::MoveLeft
            };
            game.handle(command, 16.0, audio);
            game.update(16.0, audio, store);
            if game.level.as_ref().map(|l| l.number) != Some(number) || game.level.is_none() {
                return;
            }
        }
        panic!("level {number} not beaten in time");
    }

    #[test]
    fn test_new_game_starts_level_zero() {
        let mut audio = MemorySounds::new();
        let game = new_game(&mut audio);
        let level = game.level.as_ref().unwrap();
        assert_eq!(level.number, 0);
        assert!(!level.is_final);
        assert!(level.player.is_some());
        assert!(audio.cues.contains(&Cue::Track("soundtrack".to_string())));
    }

    #[test]
    fn test_no_levels_is_immediately_complete() {
        let mut audio = MemorySounds::new();
        assert_eq!(
            Game::new(Vec::new(), &mut audio).unwrap_err(),
            GameError::AllLevelsComplete
        );
    }

    #[test]
    fn test_completion_advances_then_ends_run() {
        let mut audio = MemorySounds::new();
        let mut store = MemoryStore::new();
        let mut game = new_game(&mut audio);

        win_current_level(&mut game, &mut audio, &mut store);
        let level = game.level.as_ref().expect("second level loaded");
        assert_eq!(level.number, 1);
        assert!(level.is_final);
        assert!(level.has_free_coins(), "next level arrives reset");

        store.write("stale".to_string());
        win_current_level(&mut game, &mut audio, &mut store);
        assert!(game.level.is_none(), "terminal won screen");
        assert!(store.saved.is_none(), "save deleted on completion");
        assert!(audio.cues.contains(&Cue::Track("ending".to_string())));
    }

    #[test]
    fn test_failure_resets_level_in_place() {
        let mut audio = MemorySounds::new();
        let mut store = MemoryStore::new();
        // The coin sits in a sealed pocket so the walk left can only end
        // in the lava, and the retry leaves it uncollected
        let maps = vec![vec![
            "#####".to_string(),
            "#+.@#".to_string(),
            "#...#".to_string(),
            "#o###".to_string(),
            "#####".to_string(),
        ]];
        let mut game = Game::new(maps, &mut audio).unwrap();

        // Walk left into the lava
        let mut frames = 0;
        while !game.level.as_ref().unwrap().player.as_ref().unwrap().dead {
            game.handle(Command::MoveLeft, 16.0, &mut audio);
            game.update(16.0, &mut audio, &mut store);
            frames += 1;
            assert!(frames < 100, "player never reached the lava");
        }
        assert_eq!(audio.played(SoundId::Fail), 1);

        // Wait out finalization with no further input; the level retries
        for _ in 0..220 {
            game.update(16.0, &mut audio, &mut store);
        }

        let level = game.level.as_ref().unwrap();
        assert_eq!(level.number, 0);
        assert_eq!(audio.played(SoundId::Fail), 1);
        assert!(level.has_free_coins(), "coin restored by the retry reset");
        let player = level.player.as_ref().unwrap();
        assert!(player.is_alive(), "fresh player after the retry reset");
        assert_eq!(player.location, Vec2::new(60.0, 20.0));
    }

    #[test]
    fn test_autosave_cadence_and_coalescing() {
        let mut audio = MemorySounds::new();
        let mut store = MemoryStore::new();
        let mut game = new_game(&mut audio);

        // 990 ms: not yet
        for _ in 0..33 {
            game.update(30.0, &mut audio, &mut store);
        }
        assert_eq!(store.writes, 0);

        game.update(30.0, &mut audio, &mut store);
        assert_eq!(store.writes, 1);

        // Another full second for the second write
        for _ in 0..34 {
            game.update(30.0, &mut audio, &mut store);
        }
        assert_eq!(store.writes, 2);
        assert!(store.saved.as_deref().unwrap().contains("\"type\":\"game\""));
    }

    #[test]
    fn test_world_reset_command_and_suppression() {
        let mut audio = MemorySounds::new();
        let mut game = new_game(&mut audio);

        game.level.as_mut().unwrap().set_time_stop(&mut audio);
        game.handle(Command::WorldReset, 16.0, &mut audio);
        assert!(!game.time_to_reset.is_active(), "suppressed while stopped");

        // Let the stop and freeze phases drain
        let mut store = MemoryStore::new();
        let mut elapsed = 0.0;
        while elapsed <= TIME_STOP + TIME_FREEZE + 40.0 {
            game.update(20.0, &mut audio, &mut store);
            elapsed += 20.0;
        }

        game.handle(Command::WorldReset, 16.0, &mut audio);
        assert!(game.time_to_reset.is_active());
        assert_eq!(audio.played(SoundId::WorldReset), 1);

        // Re-arming while engaged is a no-op
        game.handle(Command::WorldReset, 16.0, &mut audio);
        assert_eq!(audio.played(SoundId::WorldReset), 1);
    }

    #[test]
    fn test_world_reset_countdown_pauses_while_time_stopped() {
        let mut audio = MemorySounds::new();
        let mut store = MemoryStore::new();
        let mut game = new_game(&mut audio);

        game.handle(Command::WorldReset, 16.0, &mut audio);
        game.update(16.0, &mut audio, &mut store);
        let before = game.time_to_reset.value();

        game.handle(Command::TimeStop, 16.0, &mut audio);
        game.update(16.0, &mut audio, &mut store);
        assert_eq!(game.time_to_reset.value(), before, "clock held still");
    }

    #[test]
    fn test_world_reset_ramp_accelerates_then_restarts() {
        let mut audio = MemorySounds::new();
        let mut store = MemoryStore::new();
        let mut game = new_game(&mut audio);

        game.handle(Command::WorldReset, 16.0, &mut audio);
        // Exhaust the budget
        let mut elapsed = 0.0;
        while elapsed <= WORLD_RESET_TIME {
            game.update(100.0, &mut audio, &mut store);
            elapsed += 100.0;
        }

        // Mid-ramp the level runs faster than real time
        for _ in 0..20 {
            game.update(100.0, &mut audio, &mut store);
        }
        let accel = game.level.as_ref().unwrap().time_acceleration();
        assert!(accel > 1.0, "ramp speeds the world up, got {accel}");

        // Finish the ramp: back on level 0 with a full budget
        for _ in 0..90 {
            game.update(100.0, &mut audio, &mut store);
        }
        let level = game.level.as_ref().unwrap();
        assert_eq!(level.number, 0);
        assert_eq!(level.time_acceleration(), 1.0);
        // Budget refilled on restart (minus the frames since)
        assert!(game.time_to_reset.value() > WORLD_RESET_TIME - 2000.0);
    }

    #[test]
    fn test_render_terminal_screen() {
        use crate::render::{DrawCmd, DrawList};

        let mut audio = MemorySounds::new();
        let mut game = new_game(&mut audio);
        game.level = None;

        let mut list = DrawList::new();
        game.render(&mut list, Vec2::new(800.0, 600.0));
        assert!(matches!(
            &list.commands[..],
            [DrawCmd::Text { text, .. }] if text.contains("You Won")
        ));
    }
}
