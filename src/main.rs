//! Chrono Hop entry point
//!
//! Headless demo driver: runs the simulation for a few seconds of
//! scripted input and logs what happens. Wire a real windowing layer to
//! `Game::handle`/`Game::update`/`Game::render` for the playable thing.

use glam::Vec2;

use chrono_hop::audio::MemorySounds;
use chrono_hop::persistence::{FileStore, SnapshotStore};
use chrono_hop::render::DrawList;
use chrono_hop::sim::{Game, default_level_maps};
use chrono_hop::{Command, InputMap};

fn main() {
    env_logger::init();

    let save_path =
        std::env::var("CHRONO_HOP_SAVE").unwrap_or_else(|_| "chrono_hop_save.json".to_string());
    let mut store = FileStore::new(save_path);
    let mut audio = MemorySounds::new();

    // Resume from the save if there is a readable one, else start fresh
    let mut game = match store.read() {
        Some(json) => match Game::from_snapshot(&json, &mut audio) {
            Ok(game) => {
                log::info!("Resumed from save.");
                game
            }
            Err(error) => {
                log::warn!("Ignoring saved game: {error}");
                Game::new(default_level_maps(), &mut audio).expect("built-in levels exist")
            }
        },
        None => Game::new(default_level_maps(), &mut audio).expect("built-in levels exist"),
    };

    // The key bindings a windowing layer would feed from its key-down state
    let input = InputMap::new(vec![
        ('a', Command::MoveLeft),
        ('d', Command::MoveRight),
        ('w', Command::Jump),
        ('s', Command::TimeStop),
        ('r', Command::WorldReset),
    ]);

    let dt = 16.0;
    for frame in 0..600u32 {
        // Scripted "keyboard": run right, hop periodically, stop time once
        let mut pressed = vec!['d'];
        if frame % 45 == 0 {
            pressed.push('w');
        }
        if frame == 150 {
            pressed.push('s');
        }

        for command in input.translate(&pressed) {
            game.handle(command, dt, &mut audio);
        }
        game.update(dt, &mut audio, &mut store);

        if game.level.is_none() {
            log::info!("Run complete after {frame} frames.");
            break;
        }
    }

    if let Some(level) = &game.level {
        let player = level.player.as_ref();
        log::info!(
            "Stopped on level {} at {:?}, {} coins collected, {} cues fired.",
            level.number,
            player.map(|p| p.location),
            level.collected_coins_number(),
            audio.cues.len(),
        );
    }

    // One read-only render pass, as a frame of draw commands
    let mut frame = DrawList::new();
    game.render(&mut frame, Vec2::new(800.0, 600.0));
    log::info!("Final frame: {} draw commands.", frame.commands.len());

    store.flush();
}
