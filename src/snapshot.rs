//! Save-game wire format
//!
//! One tagged record per simulated thing; the `type` tag selects the
//! decoder. Decoding tolerates unknown keys and fails on missing or
//! mistyped ones, and a decoded game continues play exactly where the
//! encoded one stopped: positions, velocities, timers and collected or
//! defeated flags all round-trip.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::entity::{Entity, EntityKind, Player};
use crate::sim::{Game, Level, TimeFactor};

/// Snapshot decode failures; not recoverable, the caller falls back to a
/// fresh game
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("malformed snapshot: expected a {expected} record")]
    WrongRecord { expected: &'static str },
}

/// A serialized record; the closed set of everything that persists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Snapshot {
    Game {
        level_maps: Vec<Vec<String>>,
        level: Option<Box<Snapshot>>,
        #[serde(rename = "_time_to_reset_factor")]
        time_to_reset_factor: f32,
    },
    Level {
        player: Option<Box<Snapshot>>,
        #[serde(rename = "_entities")]
        entities: Vec<Snapshot>,
        level_map: Vec<String>,
        number: usize,
        is_final: bool,
        #[serde(rename = "_time_stop_left")]
        time_stop_left: f32,
        #[serde(rename = "_time_stop_freeze")]
        time_stop_freeze: f32,
        #[serde(rename = "_time_stop_idle")]
        time_stop_idle: f32,
    },
    Player {
        location: [f32; 2],
        dx: f32,
        dy: f32,
        is_on_ground: bool,
        #[serde(rename = "_is_won")]
        is_won: bool,
        #[serde(rename = "_is_dead")]
        is_dead: bool,
        #[serde(rename = "_finalization_time")]
        finalization_time: f32,
    },
    Lava {
        location: [f32; 2],
        init_location: [f32; 2],
        direction: [f32; 2],
        is_repeatable: bool,
    },
    Coin {
        location: [f32; 2],
        init_location: [f32; 2],
        timeline: f32,
        is_free: bool,
    },
    Block {
        location: [f32; 2],
    },
    Monster {
        location: [f32; 2],
        targets_player: bool,
        is_active: bool,
    },
}

fn pack(v: Vec2) -> [f32; 2] {
    [v.x, v.y]
}

fn unpack(v: [f32; 2]) -> Vec2 {
    Vec2::new(v[0], v[1])
}

impl Snapshot {
    pub fn from_game(game: &Game) -> Self {
        Snapshot::Game {
            level_maps: game.level_maps.clone(),
            level: game.level.as_ref().map(|l| Box::new(Snapshot::from_level(l))),
            time_to_reset_factor: game.time_to_reset.value(),
        }
    }

    pub fn from_level(level: &Level) -> Self {
        Snapshot::Level {
            player: level.player.as_ref().map(|p| Box::new(Snapshot::from_player(p))),
            entities: level.entities.iter().map(Snapshot::from_entity).collect(),
            level_map: level.level_map.clone(),
            number: level.number,
            is_final: level.is_final,
            time_stop_left: level.stop_left.value(),
            time_stop_freeze: level.stop_freeze.value(),
            time_stop_idle: level.stop_idle.value(),
        }
    }

    pub fn from_player(player: &Player) -> Self {
        Snapshot::Player {
            location: pack(player.location),
            dx: player.velocity.x,
            dy: player.velocity.y,
            is_on_ground: player.is_on_ground,
            is_won: player.won,
            is_dead: player.dead,
            finalization_time: player.finalization_time,
        }
    }

    pub fn from_entity(entity: &Entity) -> Self {
        match &entity.kind {
            EntityKind::Block => Snapshot::Block {
                location: pack(entity.location),
            },
            // Lava stores its cell coordinate, not the margin-inset
            // rectangle corner it lives at
            EntityKind::Lava {
                direction,
                is_repeatable,
                init_location,
            } => Snapshot::Lava {
                location: pack(entity.location - Entity::lava_margin()),
                init_location: pack(*init_location),
                direction: pack(*direction),
                is_repeatable: *is_repeatable,
            },
            EntityKind::Coin {
                timeline,
                init_location,
                is_free,
            } => Snapshot::Coin {
                location: pack(entity.location),
                init_location: pack(*init_location),
                timeline: *timeline,
                is_free: *is_free,
            },
            EntityKind::Monster { targets_player } => Snapshot::Monster {
                location: pack(entity.location),
                targets_player: *targets_player,
                is_active: entity.is_active,
            },
        }
    }
}

/// Serialize a whole game
pub fn encode_game(game: &Game) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&Snapshot::from_game(game))?)
}

/// Restore a whole game
pub fn decode_game(json: &str) -> Result<Game, SnapshotError> {
    game_from(serde_json::from_str(json)?)
}

/// Serialize a single level
pub fn encode_level(level: &Level) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&Snapshot::from_level(level))?)
}

/// Restore a single level
pub fn decode_level(json: &str) -> Result<Level, SnapshotError> {
    level_from(serde_json::from_str(json)?)
}

fn game_from(snapshot: Snapshot) -> Result<Game, SnapshotError> {
    let Snapshot::Game {
        level_maps,
        level,
        time_to_reset_factor,
    } = snapshot
    else {
        return Err(SnapshotError::WrongRecord { expected: "game" });
    };
    let level = level.map(|boxed| level_from(*boxed)).transpose()?;
    Ok(Game::restored(
        level_maps,
        level,
        TimeFactor::new(time_to_reset_factor),
    ))
}

fn level_from(snapshot: Snapshot) -> Result<Level, SnapshotError> {
    let Snapshot::Level {
        player,
        entities,
        level_map,
        number,
        is_final,
        time_stop_left,
        time_stop_freeze,
        time_stop_idle,
    } = snapshot
    else {
        return Err(SnapshotError::WrongRecord { expected: "level" });
    };

    let mut level = Level::new(level_map, number, is_final);
    level.player = player.map(|boxed| player_from(*boxed)).transpose()?;
    level.entities = entities
        .into_iter()
        .map(entity_from)
        .collect::<Result<_, _>>()?;
    level.stop_left.set(time_stop_left);
    level.stop_freeze.set(time_stop_freeze);
    level.stop_idle.set(time_stop_idle);
    level.refresh_coins_text();
    Ok(level)
}

fn player_from(snapshot: Snapshot) -> Result<Player, SnapshotError> {
    let Snapshot::Player {
        location,
        dx,
        dy,
        is_on_ground,
        is_won,
        is_dead,
        finalization_time,
    } = snapshot
    else {
        return Err(SnapshotError::WrongRecord { expected: "player" });
    };
    Ok(Player {
        location: unpack(location),
        velocity: Vec2::new(dx, dy),
        is_on_ground,
        won: is_won,
        dead: is_dead,
        finalization_time,
    })
}

fn entity_from(snapshot: Snapshot) -> Result<Entity, SnapshotError> {
    match snapshot {
        Snapshot::Block { location } => Ok(Entity {
            location: unpack(location),
            is_active: true,
            kind: EntityKind::Block,
        }),
        Snapshot::Lava {
            location,
            init_location,
            direction,
            is_repeatable,
        } => Ok(Entity {
            location: unpack(location) + Entity::lava_margin(),
            is_active: true,
            kind: EntityKind::Lava {
                direction: unpack(direction),
                is_repeatable,
                init_location: unpack(init_location),
            },
        }),
        Snapshot::Coin {
            location,
            init_location,
            timeline,
            is_free,
        } => Ok(Entity {
            location: unpack(location),
            is_active: is_free,
            kind: EntityKind::Coin {
                timeline,
                init_location: unpack(init_location),
                is_free,
            },
        }),
        Snapshot::Monster {
            location,
            targets_player,
            is_active,
        } => Ok(Entity {
            location: unpack(location),
            is_active,
            kind: EntityKind::Monster { targets_player },
        }),
        _ => Err(SnapshotError::WrongRecord { expected: "entity" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MemorySounds;
    use crate::sim::default_level_maps;

    fn sample_level() -> Level {
        let mut level = Level::new(default_level_maps().remove(1), 1, true);
        level.reset();
        let mut audio = MemorySounds::new();
        // Bake in some mid-play state: a few frames plus an armed time stop
        level.set_time_stop(&mut audio);
        for _ in 0..30 {
            level.update(16.0, &mut audio);
        }
        level
    }

    #[test]
    fn test_level_round_trip_is_identical() {
        let level = sample_level();
        let json = encode_level(&level).unwrap();
        let restored = decode_level(&json).unwrap();

        let a = serde_json::to_value(Snapshot::from_level(&level)).unwrap();
        let b = serde_json::to_value(Snapshot::from_level(&restored)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_preserves_play_state() {
        let mut level = sample_level();
        // Collect one coin by hand
        let coin = level
            .entities
            .iter_mut()
            .find(|e| matches!(e.kind, EntityKind::Coin { .. }))
            .unwrap();
        coin.is_active = false;
        if let EntityKind::Coin { is_free, .. } = &mut coin.kind {
            *is_free = false;
        }
        level.refresh_coins_text();

        let restored = decode_level(&encode_level(&level).unwrap()).unwrap();
        assert_eq!(restored.collected_coins_number(), 1);
        assert_eq!(restored.number, 1);
        assert!(restored.is_final);
        assert_eq!(restored.stop_left.value(), level.stop_left.value());
        assert_eq!(restored.player, level.player);
        assert_eq!(restored.entities, level.entities);
    }

    #[test]
    fn test_game_round_trip() {
        let mut audio = MemorySounds::new();
        let mut game = Game::new(default_level_maps(), &mut audio).unwrap();
        game.time_to_reset.set(42000.0);

        let json = encode_game(&game).unwrap();
        assert!(json.contains("\"type\":\"game\""));
        assert!(json.contains("\"_time_to_reset_factor\":42000.0"));

        let restored = decode_game(&json).unwrap();
        assert_eq!(restored.level_maps, game.level_maps);
        assert_eq!(restored.time_to_reset.value(), 42000.0);
        assert_eq!(
            restored.level.as_ref().map(|l| l.number),
            game.level.as_ref().map(|l| l.number)
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = r##"{
            "type": "game",
            "level_maps": [["#@#"]],
            "level": null,
            "_time_to_reset_factor": 0.0,
            "editor_note": "left over from a newer build"
        }"##;
        let game = decode_game(json).unwrap();
        assert!(game.level.is_none());
    }

    #[test]
    fn test_missing_key_is_malformed() {
        // No _time_to_reset_factor
        let json = r#"{"type": "game", "level_maps": [], "level": null}"#;
        assert!(matches!(
            decode_game(json),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn test_mistyped_key_is_malformed() {
        let json = r#"{
            "type": "game",
            "level_maps": "not a list",
            "level": null,
            "_time_to_reset_factor": 0.0
        }"#;
        assert!(matches!(
            decode_game(json),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_type_tag_is_malformed() {
        let json = r#"{"type": "dragon", "location": [0.0, 0.0]}"#;
        assert!(matches!(
            decode_level(json),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn test_player_record_in_entity_list_is_rejected() {
        let level = sample_level();
        let player_record = Snapshot::from_player(level.player.as_ref().unwrap());

        // A level record whose entity list holds a player
        let snap = Snapshot::Level {
            player: None,
            entities: vec![player_record],
            level_map: vec!["#".to_string()],
            number: 0,
            is_final: false,
            time_stop_left: 0.0,
            time_stop_freeze: 0.0,
            time_stop_idle: 0.0,
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(matches!(
            decode_level(&json),
            Err(SnapshotError::WrongRecord { expected: "entity" })
        ));
    }

    #[test]
    fn test_lava_location_stores_the_cell() {
        let lava = Entity::lava(Vec2::new(40.0, 60.0), Vec2::new(1.0, 0.0), false);
        let Snapshot::Lava { location, .. } = Snapshot::from_entity(&lava) else {
            unreachable!()
        };
        assert_eq!(location, [40.0, 60.0]);

        let back = entity_from(Snapshot::from_entity(&lava)).unwrap();
        assert_eq!(back, lava);
    }

    #[test]
    fn test_defeated_monster_round_trips() {
        let mut monster = Entity::monster(Vec2::new(80.0, 20.0), true);
        monster.is_active = false;

        let back = entity_from(Snapshot::from_entity(&monster)).unwrap();
        assert_eq!(back, monster);
        assert!(!back.is_active, "defeated monsters persist as defeated");
    }
}
