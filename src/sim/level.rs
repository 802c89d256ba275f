//! One level: its entities, the time-stop state machine, win/lose
//! detection and the per-frame update/render orchestration
//!
//! A level is rebuilt from its tile map by `reset()` - on entry, and again
//! in place whenever the player fails. The time-stop ability is three
//! countdowns forming one linear ladder: full stop, ramp back in, cooldown.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::entity::{Entity, EntityKind, Player, UpdateCtx};
use super::rect::Rect;
use super::time::TimeFactor;
use crate::audio::{SoundId, SoundPlayer};
use crate::consts::*;
use crate::render::{Color, RenderContext, Renderer};
use crate::sigmoid;

/// HUD time-stop bar width at full charge
const BAR_WIDTH: f32 = 100.0;
/// HUD bar frame padding
const BAR_MARGIN: f32 = 5.0;
/// HUD bar height
const BAR_HEIGHT: f32 = 20.0;
/// HUD inset from the window corner, as a fraction of the view
const INFO_MARGIN: f32 = 0.01;

/// One playable level
#[derive(Debug, Clone)]
pub struct Level {
    /// Tile grid this level is parsed from; kept for resets and snapshots
    pub level_map: Vec<String>,
    pub number: usize,
    pub is_final: bool,
    pub player: Option<Player>,
    /// All non-player entities, in map parse order
    pub entities: Vec<Entity>,

    // The time-stop ladder; exactly one decrements per frame
    pub(crate) stop_left: TimeFactor,
    pub(crate) stop_freeze: TimeFactor,
    pub(crate) stop_idle: TimeFactor,

    /// World-reset acceleration ramp input in [0, 1], pushed in by the
    /// game during the final seconds before a reset; doubles as the
    /// whiteout flash alpha
    reset_ramp: TimeFactor,
    /// Copy of the game's reset countdown, refreshed every frame; `None`
    /// until a world reset has been armed
    reset_pressure: Option<TimeFactor>,

    /// Time-stop HUD bar width (charge left, then recharge progress)
    bar_width: f32,
    coins_text: String,
}

impl Level {
    pub fn new(level_map: Vec<String>, number: usize, is_final: bool) -> Self {
        let mut level = Self {
            level_map,
            number,
            is_final,
            player: None,
            entities: Vec::new(),
            stop_left: TimeFactor::default(),
            stop_freeze: TimeFactor::default(),
            stop_idle: TimeFactor::default(),
            reset_ramp: TimeFactor::default(),
            reset_pressure: None,
            bar_width: BAR_WIDTH,
            coins_text: String::new(),
        };
        level.refresh_coins_text();
        level
    }

    /// Re-parse the tile map into fresh entities and zero every timer.
    ///
    /// Coin wobble phases are drawn from an RNG seeded with the level
    /// number, so a retry produces the identical level.
    pub fn reset(&mut self) {
        self.player = None;
        self.entities.clear();
        self.stop_left.set(0.0);
        self.stop_freeze.set(0.0);
        self.stop_idle.set(0.0);
        self.reset_ramp.set(0.0);
        self.bar_width = BAR_WIDTH;

        let mut rng = Pcg32::seed_from_u64(self.number as u64);

        let map = std::mem::take(&mut self.level_map);
        for (row, line) in map.iter().enumerate() {
            for (col, tile) in line.chars().enumerate() {
                let location = Vec2::new(col as f32 * BLOCK_SIZE, row as f32 * BLOCK_SIZE);
                match tile {
                    '#' => self.entities.push(Entity::block(location)),
                    'o' => {
                        let phase = rng.random_range(0.0..std::f32::consts::TAU);
                        self.entities.push(Entity::coin(location, phase));
                    }
                    '@' => self.player = Some(Player::new(location)),
                    '+' | 'v' | '|' | '=' => {
                        let direction = Vec2::new(
                            (tile == '=') as u8 as f32,
                            (tile == 'v' || tile == '|') as u8 as f32,
                        );
                        self.entities
                            .push(Entity::lava(location, direction, tile == 'v'));
                    }
                    'm' => self.entities.push(Entity::monster(location, false)),
                    'M' => self.entities.push(Entity::monster(location, true)),
                    _ => {}
                }
            }
        }
        self.level_map = map;

        self.refresh_coins_text();
    }

    /// Advance the level one frame: player first, then every active
    /// entity, then win detection or the time-stop ladder.
    pub fn update(&mut self, dt: f32, audio: &mut dyn SoundPlayer) {
        let Some(mut player) = self.player.take() else {
            return;
        };
        player.update(dt, self, audio);
        let player_rect = player.rect();
        self.player = Some(player);

        let speed_factor = self.speed_factor();
        let blocks = self.block_rects();
        let ctx = UpdateCtx {
            speed_factor,
            blocks: &blocks,
            player: Some(player_rect),
        };
        for entity in self.entities.iter_mut() {
            if entity.is_active {
                entity.update(dt, &ctx);
            }
        }

        if self.has_win_condition() {
            let (number, is_final) = (self.number, self.is_final);
            if let Some(player) = self.player.as_mut() {
                player.set_won(number, is_final, audio);
            }
        } else if self.player.as_ref().is_some_and(|p| p.is_alive()) {
            self.handle_time_stop(dt, audio);
        }
    }

    /// Rectangles of every block, the static collision set
    pub fn block_rects(&self) -> Vec<Rect> {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Block))
            .map(Entity::rect)
            .collect()
    }

    pub fn coins_number(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Coin { .. }))
            .count()
    }

    pub fn free_coins_number(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Coin { is_free: true, .. }))
            .count()
    }

    pub fn collected_coins_number(&self) -> usize {
        self.coins_number() - self.free_coins_number()
    }

    pub fn has_free_coins(&self) -> bool {
        self.free_coins_number() > 0
    }

    pub fn has_active_monsters(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.is_active && matches!(e.kind, EntityKind::Monster { .. }))
    }

    /// Every coin collected and every monster defeated
    pub fn has_win_condition(&self) -> bool {
        !self.has_free_coins() && !self.has_active_monsters()
    }

    /// The level keeps running until the player's outcome is final
    pub fn is_running(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|p| !(p.is_dead() || p.is_winner()))
    }

    pub fn is_complete(&self) -> bool {
        self.player.as_ref().is_some_and(Player::is_winner)
    }

    pub fn is_time_stopped(&self) -> bool {
        self.stop_left.is_active() || self.stop_freeze.is_active()
    }

    /// Motion multiplier for every non-player entity this frame
    pub fn speed_factor(&self) -> f32 {
        if self.stop_left.is_active() {
            return 0.0;
        }
        if self.stop_freeze.is_active() {
            return (TIME_FREEZE - self.stop_freeze.value()) / TIME_FREEZE;
        }
        if self.reset_ramp.is_active() {
            return self.time_acceleration();
        }
        1.0
    }

    /// Desaturation factor fed into the render context
    pub fn color_factor(&self) -> f32 {
        if self.stop_left.is_active() {
            return 0.0;
        }
        if self.stop_freeze.is_active() {
            return 1.0 - self.stop_freeze.value() / TIME_FREEZE;
        }
        1.0
    }

    /// Multiplier on time itself while the world-reset ramp runs; a
    /// bounded logistic curve so the speed-up is perceptible but smooth
    pub fn time_acceleration(&self) -> f32 {
        if !self.reset_ramp.is_active() {
            return 1.0;
        }
        let t = self.reset_ramp.value();
        1.0 + TIME_ACCELERATION_SCALE * (sigmoid(t) - 0.5)
    }

    /// Game-side input: ramp progress in [0, 1] toward the hard reset
    pub fn set_reset_ramp(&mut self, t: f32) {
        self.reset_ramp.set(t);
    }

    /// Game-side input: remaining world-reset budget for the HUD
    pub fn set_reset_pressure(&mut self, pressure: Option<TimeFactor>) {
        self.reset_pressure = pressure;
    }

    fn reset_engaged(&self) -> bool {
        self.reset_pressure.is_some_and(|p| p.is_active()) || self.reset_ramp.is_active()
    }

    /// Arm the time-stop ability. Refused while any phase of a previous
    /// activation is still running.
    pub fn set_time_stop(&mut self, audio: &mut dyn SoundPlayer) {
        if self.stop_left.is_active() || self.stop_freeze.is_active() || self.stop_idle.is_active()
        {
            return;
        }
        log::info!("Stopping time ...");
        self.stop_left.set(TIME_STOP);
        self.stop_freeze.set(TIME_FREEZE);
        self.stop_idle.set(TIME_STOP_IDLE);
        if self.reset_engaged() {
            audio.pause(SoundId::WorldReset);
        }
        audio.play(SoundId::TimeStop);
    }

    /// Advance the time-stop ladder: only the first still-active phase
    /// moves, so the three countdowns behave as one split in three.
    fn handle_time_stop(&mut self, dt: f32, audio: &mut dyn SoundPlayer) {
        let was_frozen = self.stop_freeze.is_active();
        let step = dt * self.time_acceleration();

        for factor in [
            &mut self.stop_left,
            &mut self.stop_freeze,
            &mut self.stop_idle,
        ] {
            if factor.is_active() {
                factor.decr(step);
                break;
            }
        }

        if self.stop_left.is_active() || self.stop_freeze.is_active() {
            let charge = self.stop_left.value().max(0.0) + self.stop_freeze.value().max(0.0);
            self.bar_width = BAR_WIDTH * (charge / (TIME_STOP + TIME_FREEZE));
        } else if self.stop_idle.is_active() {
            let recharge = (TIME_STOP_IDLE - self.stop_idle.value()) / TIME_STOP_IDLE;
            self.bar_width = BAR_WIDTH * recharge;
        }

        if was_frozen && !self.stop_freeze.is_active() {
            audio.stop(SoundId::TimeStop);
            audio.unpause(SoundId::WorldReset);
        }
    }

    pub fn refresh_coins_text(&mut self) {
        self.coins_text = format!(
            "Coins: {} / {}",
            self.collected_coins_number(),
            self.coins_number()
        );
    }

    /// Build the per-frame render context: camera centered on the player,
    /// colors desaturated while time is stopped (neutral again once the
    /// player is dead or has won).
    pub fn render_context(&self, view: Vec2) -> RenderContext {
        let (offset, color_factor) = match &self.player {
            Some(player) => {
                let rect = player.rect();
                let offset = Vec2::new(rect.x - view.x / 2.0, rect.y - view.y / 2.0);
                let factor = if player.dead || player.won {
                    1.0
                } else {
                    self.color_factor()
                };
                (offset, factor)
            }
            None => (Vec2::ZERO, 1.0),
        };
        RenderContext {
            offset,
            color_factor,
        }
    }

    /// Read-only render pass, mirroring the update pass
    pub fn render(&self, renderer: &mut dyn Renderer, view: Vec2) {
        let ctx = self.render_context(view);

        if let Some(player) = &self.player {
            let color = if player.dead {
                Color::RED
            } else if player.won {
                Color::rgb(255, 255, 0)
            } else {
                Color::rgb(50, 200, 100)
            };
            renderer.draw_rect(ctx.to_screen(player.rect()), color.adjust(ctx.color_factor));
        }

        for entity in &self.entities {
            if !entity.is_active {
                continue;
            }
            let rect = ctx.to_screen(entity.rect());
            match entity.kind {
                EntityKind::Block => {
                    // Terrain keeps its color while the world fades
                    renderer.draw_rect(rect, Color::rgb(60, 60, 60));
                }
                EntityKind::Lava { .. } => {
                    renderer.draw_rect(rect, Color::rgb(255, 100, 100).adjust(ctx.color_factor));
                }
                EntityKind::Coin { .. } => {
                    let color = Color::rgb(255, 215, 0).adjust(ctx.color_factor);
                    renderer.draw_circle(rect.center(), BLOCK_SIZE / 3.0, color);
                }
                EntityKind::Monster { .. } => {
                    renderer.draw_rect(rect, Color::rgb(150, 60, 160).adjust(ctx.color_factor));
                }
            }
        }

        if self.reset_ramp.is_active() {
            let alpha = (self.reset_ramp.value() * 255.0).clamp(0.0, 255.0) as u8;
            renderer.draw_rect(
                Rect::new(0.0, 0.0, view.x, view.y),
                Color::rgba(255, 255, 255, alpha),
            );
        }

        self.draw_infographics(renderer, view);
    }

    fn draw_infographics(&self, renderer: &mut dyn Renderer, view: Vec2) {
        let corner = Vec2::new(view.x * INFO_MARGIN, view.y * INFO_MARGIN);
        let back_bar = Rect::new(
            corner.x,
            corner.y,
            BAR_WIDTH + BAR_MARGIN * 2.0,
            BAR_HEIGHT + BAR_MARGIN * 2.0,
        );
        renderer.draw_rect(back_bar, Color::GRAY);

        let bar_color = if self.stop_left.is_active() || self.stop_freeze.is_active() {
            Color::rgb(0, 255, 0).adjust(self.color_factor())
        } else if self.stop_idle.is_active() {
            Color::rgb(0, 125, 0)
        } else {
            Color::rgb(0, 255, 0)
        };
        renderer.draw_rect(
            Rect::new(
                corner.x + BAR_MARGIN,
                corner.y + BAR_MARGIN,
                self.bar_width,
                BAR_HEIGHT,
            ),
            bar_color,
        );

        let text_margin = 10.0;
        let coins_pos = Vec2::new(back_bar.left(), back_bar.bottom() + text_margin);
        renderer.draw_text(coins_pos, &self.coins_text, Color::BLACK);

        if let Some(pressure) = self.reset_pressure {
            let (text, color) = if self.is_time_stopped() {
                ("ZA WARUDO!".to_string(), Color::GOLDENROD)
            } else if pressure.is_active() {
                let seconds = (pressure.value() / 1000.0) as u32;
                let color = if pressure.value() >= WARNING_TIME {
                    Color::BLACK
                } else {
                    Color::RED
                };
                (format!("Time left: {seconds}"), color)
            } else {
                ("MADE IN HEAVEN!".to_string(), Color::BLUE_VIOLET)
            };
            let pos = Vec2::new(coins_pos.x, coins_pos.y + BAR_HEIGHT + text_margin);
            renderer.draw_text(pos, &text, color);
        }
    }
}

/// The built-in level set, in play order
pub fn default_level_maps() -> Vec<Vec<String>> {
    let maps: [&[&str]; 2] = [
        &[
            "####################",
            "#..................#",
            "#..................#",
            "#...o..........o...#",
            "#..###........###..#",
            "#..................#",
            "#.@......+.........#",
            "####....####....####",
            "#..................#",
            "#...=..........o...#",
            "#..............##..#",
            "#..................#",
            "####################",
        ],
        &[
            "########################",
            "#......................#",
            "#..o.....M.........o...#",
            "#..##...........####...#",
            "#......................#",
            "#.@....v......m........#",
            "########....############",
            "#......#....#..........#",
            "#..o...#....#....o.....#",
            "#..##..#....#...###....#",
            "#......+....=..........#",
            "#......................#",
            "########################",
        ],
    ];
    maps.iter()
        .map(|map| map.iter().map(|line| line.to_string()).collect())
        .collect()
}
