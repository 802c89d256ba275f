//! Simulated objects: blocks, lava, coins, monsters and the player
//!
//! Non-player entities are one struct with a variant payload; the closed
//! set is matched exhaustively wherever a reaction depends on the kind.
//! The player is its own type - a level owns exactly one and it never
//! sits in the entity list.

use glam::Vec2;

use super::level::Level;
use super::rect::Rect;
use crate::audio::{SoundId, SoundPlayer};
use crate::consts::*;

/// Variant-specific entity state
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// Static terrain tile
    Block,
    /// Hazard; patrols and bounces, or sweeps one way and snaps back
    Lava {
        /// Unit axis vector of travel; zero for static lava
        direction: Vec2,
        is_repeatable: bool,
        /// Spawn cell (unscaled); return point for the repeatable variant
        init_location: Vec2,
    },
    /// Collectible with a vertical wobble
    Coin {
        /// Wobble phase accumulator (radians)
        timeline: f32,
        init_location: Vec2,
        is_free: bool,
    },
    /// Stationary or player-chasing enemy, defeated by stomping
    Monster { targets_player: bool },
}

/// A non-player entity: shared fields plus the variant payload
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Top-left corner, world space
    pub location: Vec2,
    /// Participates in collision and rendering until consumed/defeated
    pub is_active: bool,
    pub kind: EntityKind,
}

/// Read-only view of the level passed into non-player entity updates
pub struct UpdateCtx<'a> {
    pub speed_factor: f32,
    pub blocks: &'a [Rect],
    pub player: Option<Rect>,
}

impl Entity {
    pub fn block(location: Vec2) -> Self {
        Self {
            location,
            is_active: true,
            kind: EntityKind::Block,
        }
    }

    /// Lava occupies a slightly smaller rectangle centered in its cell
    pub fn lava(cell: Vec2, direction: Vec2, is_repeatable: bool) -> Self {
        Self {
            location: cell + Self::lava_margin(),
            is_active: true,
            kind: EntityKind::Lava {
                direction,
                is_repeatable,
                init_location: cell,
            },
        }
    }

    pub fn coin(cell: Vec2, phase: f32) -> Self {
        Self {
            location: cell,
            is_active: true,
            kind: EntityKind::Coin {
                timeline: phase,
                init_location: cell,
                is_free: true,
            },
        }
    }

    pub fn monster(cell: Vec2, targets_player: bool) -> Self {
        Self {
            location: cell,
            is_active: true,
            kind: EntityKind::Monster { targets_player },
        }
    }

    pub(crate) fn lava_margin() -> Vec2 {
        let margin = BLOCK_SIZE * (1.0 - LAVA_SCALE) * 0.5;
        Vec2::splat(margin)
    }

    /// Bounding rectangle derived from location and kind-specific size
    pub fn rect(&self) -> Rect {
        let size = match self.kind {
            EntityKind::Lava { .. } => BLOCK_SIZE * LAVA_SCALE,
            _ => BLOCK_SIZE,
        };
        Rect::at(self.location, size, size)
    }

    /// Advance one frame; blocks are immutable so their update is a no-op
    pub fn update(&mut self, dt: f32, ctx: &UpdateCtx<'_>) {
        match self.kind {
            EntityKind::Block => {}
            EntityKind::Lava { .. } => self.update_lava(dt, ctx),
            EntityKind::Coin { .. } => self.update_coin(dt, ctx),
            EntityKind::Monster { .. } => self.update_monster(dt, ctx),
        }
    }

    fn update_lava(&mut self, dt: f32, ctx: &UpdateCtx<'_>) {
        let EntityKind::Lava {
            ref mut direction,
            is_repeatable,
            init_location,
        } = self.kind
        else {
            return;
        };

        let step = LAVA_SPEED * ctx.speed_factor * dt;
        self.location += *direction * step;

        let rect = Rect::at(self.location, BLOCK_SIZE * LAVA_SCALE, BLOCK_SIZE * LAVA_SCALE);
        for block in ctx.blocks {
            if !rect.collides(block) {
                continue;
            }
            if is_repeatable {
                self.location = init_location + Self::lava_margin();
            } else {
                // Push out along the axis of travel, then turn around
                if direction.x > 0.0 {
                    self.location.x = block.left() - rect.w;
                } else if direction.x < 0.0 {
                    self.location.x = block.right();
                }
                if direction.y > 0.0 {
                    self.location.y = block.top() - rect.h;
                } else if direction.y < 0.0 {
                    self.location.y = block.bottom();
                }
                *direction = -*direction;
            }
            break;
        }
    }

    fn update_coin(&mut self, dt: f32, ctx: &UpdateCtx<'_>) {
        let EntityKind::Coin {
            ref mut timeline,
            init_location,
            ..
        } = self.kind
        else {
            return;
        };

        *timeline += dt * 1e-3 * COIN_WOBBLE_SPEED * ctx.speed_factor;
        let wobble = COIN_WOBBLE_DIST * timeline.sin();
        self.location.y = init_location.y + wobble;

        // Clamp to the block surface on whichever side the wobble entered
        let rect = Rect::at(self.location, BLOCK_SIZE, BLOCK_SIZE);
        for block in ctx.blocks {
            if !rect.collides(block) {
                continue;
            }
            if wobble > 0.0 {
                self.location.y = block.top() - BLOCK_SIZE;
            } else if wobble < 0.0 {
                self.location.y = block.bottom();
            }
        }
    }

    fn update_monster(&mut self, dt: f32, ctx: &UpdateCtx<'_>) {
        let EntityKind::Monster { targets_player } = self.kind else {
            return;
        };
        if !targets_player || ctx.speed_factor <= 0.0 {
            return;
        }
        let Some(player) = ctx.player else { return };

        let here = self.rect().center().x;
        let there = player.center().x;
        if (there - here).abs() < f32::EPSILON {
            return;
        }
        let dir = (there - here).signum();
        self.location.x += dir * MONSTER_SPEED * ctx.speed_factor * dt;

        let rect = Rect::at(self.location, BLOCK_SIZE, BLOCK_SIZE);
        for block in ctx.blocks {
            if !rect.collides(block) {
                continue;
            }
            if dir > 0.0 {
                self.location.x = block.left() - BLOCK_SIZE;
            } else {
                self.location.x = block.right();
            }
        }
    }
}

/// The player character
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub location: Vec2,
    /// (dx, dy) in units/ms; dx is re-issued by input every frame
    pub velocity: Vec2,
    pub is_on_ground: bool,
    pub won: bool,
    pub dead: bool,
    /// Grace countdown before a death/win becomes terminal (ms)
    pub finalization_time: f32,
}

impl Player {
    pub fn new(location: Vec2) -> Self {
        Self {
            location,
            velocity: Vec2::ZERO,
            is_on_ground: false,
            won: false,
            dead: false,
            finalization_time: FINALIZATION_TIME,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::at(self.location, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    /// Advance one frame: integrate gravity, resolve the vertical axis,
    /// then the horizontal axis. The strict ordering keeps corner hits
    /// unambiguous.
    pub fn update(&mut self, dt: f32, level: &mut Level, audio: &mut dyn SoundPlayer) {
        if !self.is_on_ground {
            self.velocity.y += GRAVITY * dt;
        }
        self.is_on_ground = false;

        self.location.y += self.velocity.y * dt;
        self.resolve_collisions(dt, level, Axis::Vertical, audio);
        if !self.is_on_ground && self.velocity.y >= 0.0 {
            // Resting exactly on a surface produces no overlap to resolve,
            // so probe a hair below to keep the grounded flag steady
            self.is_on_ground = self.touches_ground(level);
        }

        self.location.x += self.velocity.x * dt;
        self.resolve_collisions(dt, level, Axis::Horizontal, audio);

        if self.dead || self.won {
            self.finalization_time -= dt * level.time_acceleration();
        }

        // Horizontal speed must be re-issued by input each frame
        self.velocity.x = 0.0;
    }

    pub fn move_left(&mut self, dt: f32) {
        self.velocity.x = -PLAYER_STEP * dt;
    }

    pub fn move_right(&mut self, dt: f32) {
        self.velocity.x = PLAYER_STEP * dt;
    }

    pub fn jump(&mut self, dt: f32, audio: &mut dyn SoundPlayer) {
        if self.is_on_ground {
            self.velocity.y -= PLAYER_STEP * 2.0 * dt;
            audio.play(SoundId::Jump);
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Death is only observable once the finalization window has elapsed
    pub fn is_dead(&self) -> bool {
        !self.won && self.dead && self.finalization_time <= 0.0
    }

    /// Likewise for winning
    pub fn is_winner(&self) -> bool {
        !self.dead && self.won && self.finalization_time <= 0.0
    }

    /// Idempotent: a player already dead or won stays as-is
    pub fn set_dead(&mut self, audio: &mut dyn SoundPlayer) {
        if !(self.won || self.dead) {
            log::info!("Player has died.");
            self.dead = true;
            audio.play(SoundId::Fail);
        }
    }

    /// Idempotent; on the final level the soundtrack fades out over the
    /// finalization window
    pub fn set_won(
        &mut self,
        level_number: usize,
        is_final: bool,
        audio: &mut dyn SoundPlayer,
    ) {
        if !(self.won || self.dead) {
            log::info!("Winning level {level_number} ...");
            self.won = true;
            audio.play(SoundId::Victory);
            if is_final {
                audio.fade_track(self.finalization_time);
            }
        }
    }

    fn resolve_collisions(
        &mut self,
        dt: f32,
        level: &mut Level,
        axis: Axis,
        audio: &mut dyn SoundPlayer,
    ) {
        let mut took_coin = false;

        for entity in level.entities.iter_mut() {
            if !entity.is_active {
                continue;
            }
            let other = entity.rect();
            if !self.rect().collides(&other) {
                continue;
            }
            match &mut entity.kind {
                EntityKind::Block => self.resolve_block(&other, axis),
                EntityKind::Lava { .. } => self.set_dead(audio),
                EntityKind::Coin { is_free, .. } => {
                    if *is_free {
                        *is_free = false;
                        entity.is_active = false;
                        took_coin = true;
                        audio.play(SoundId::Coin);
                    }
                }
                EntityKind::Monster { .. } => {
                    if axis == Axis::Vertical && self.velocity.y > 0.0 {
                        // Stomp: defeat the monster and bounce off it
                        entity.is_active = false;
                        self.location.y = other.top() - PLAYER_HEIGHT;
                        self.velocity.y = -PLAYER_STEP * 2.0 * dt;
                        audio.play(SoundId::Stomp);
                    } else {
                        self.set_dead(audio);
                    }
                }
            }
        }

        if took_coin {
            level.refresh_coins_text();
        }
    }

    fn touches_ground(&self, level: &Level) -> bool {
        let probe = Rect::at(
            self.location + Vec2::new(0.0, 0.1),
            PLAYER_WIDTH,
            PLAYER_HEIGHT,
        );
        level.entities.iter().any(|e| {
            e.is_active && matches!(e.kind, EntityKind::Block) && probe.collides(&e.rect())
        })
    }

    fn resolve_block(&mut self, block: &Rect, axis: Axis) {
        match axis {
            Axis::Horizontal if self.velocity.x != 0.0 => {
                if self.velocity.x > 0.0 {
                    self.location.x = block.left() - PLAYER_WIDTH;
                } else {
                    self.location.x = block.right();
                }
                self.velocity.x = 0.0;
            }
            Axis::Vertical if self.velocity.y != 0.0 => {
                if self.velocity.y > 0.0 {
                    self.location.y = block.top() - PLAYER_HEIGHT;
                    self.is_on_ground = true;
                } else {
                    self.location.y = block.bottom();
                }
                self.velocity.y = 0.0;
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(blocks: &'a [Rect], speed_factor: f32) -> UpdateCtx<'a> {
        UpdateCtx {
            speed_factor,
            blocks,
            player: None,
        }
    }

    #[test]
    fn test_lava_rect_is_scaled_and_centered() {
        let lava = Entity::lava(Vec2::new(40.0, 40.0), Vec2::ZERO, false);
        let rect = lava.rect();
        assert_eq!(rect.w, 18.0);
        assert_eq!(rect.h, 18.0);
        assert_eq!(rect.left(), 41.0);
        assert_eq!(rect.top(), 41.0);
    }

    #[test]
    fn test_patrolling_lava_bounces_off_block() {
        // Lava heading right into a block one cell over
        let mut lava = Entity::lava(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), false);
        let blocks = [Rect::new(20.0, 0.0, 20.0, 20.0)];

        // A large scaled step pushes it into the block
        lava.update(100.0, &ctx(&blocks, 1.0));

        let EntityKind::Lava { direction, .. } = lava.kind else {
            unreachable!()
        };
        assert_eq!(direction, Vec2::new(-1.0, 0.0));
        assert!(lava.rect().right() <= 20.0);
    }

    #[test]
    fn test_repeatable_lava_snaps_back() {
        let mut lava = Entity::lava(Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), true);
        let blocks = [Rect::new(0.0, 40.0, 20.0, 20.0)];

        lava.update(300.0, &ctx(&blocks, 1.0));

        assert_eq!(lava.location, Vec2::ZERO + Entity::lava_margin());
    }

    #[test]
    fn test_stopped_lava_holds_still() {
        let mut lava = Entity::lava(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), false);
        let before = lava.location;
        lava.update(100.0, &ctx(&[], 0.0));
        assert_eq!(lava.location, before);
    }

    #[test]
    fn test_coin_wobbles_around_spawn() {
        let mut coin = Entity::coin(Vec2::new(0.0, 100.0), 0.0);
        let blocks: [Rect; 0] = [];

        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for _ in 0..200 {
            coin.update(16.0, &ctx(&blocks, 1.0));
            min_y = min_y.min(coin.location.y);
            max_y = max_y.max(coin.location.y);
        }

        assert!(min_y >= 100.0 - COIN_WOBBLE_DIST - 1e-3);
        assert!(max_y <= 100.0 + COIN_WOBBLE_DIST + 1e-3);
        assert!(max_y - min_y > COIN_WOBBLE_DIST);
    }

    #[test]
    fn test_coin_clamps_to_floor() {
        // Floor directly below; downward wobble must rest on its top
        let mut coin = Entity::coin(Vec2::new(0.0, 0.0), 0.0);
        let blocks = [Rect::new(0.0, 19.0, 20.0, 20.0)];

        // Quarter period of downward wobble
        for _ in 0..20 {
            coin.update(16.0, &ctx(&blocks, 1.0));
        }

        assert!(coin.rect().bottom() <= blocks[0].top() + 1e-3);
    }

    #[test]
    fn test_targeting_monster_walks_toward_player() {
        let mut monster = Entity::monster(Vec2::new(100.0, 0.0), true);
        let player = Rect::new(0.0, 0.0, PLAYER_WIDTH, PLAYER_HEIGHT);
        let blocks: [Rect; 0] = [];

        monster.update(
            16.0,
            &UpdateCtx {
                speed_factor: 1.0,
                blocks: &blocks,
                player: Some(player),
            },
        );
        assert!(monster.location.x < 100.0);

        // Time stopped: no pursuit
        let frozen = monster.location;
        monster.update(
            16.0,
            &UpdateCtx {
                speed_factor: 0.0,
                blocks: &blocks,
                player: Some(player),
            },
        );
        assert_eq!(monster.location, frozen);
    }

    #[test]
    fn test_stationary_monster_ignores_player() {
        let mut monster = Entity::monster(Vec2::new(100.0, 0.0), false);
        let player = Rect::new(0.0, 0.0, PLAYER_WIDTH, PLAYER_HEIGHT);

        monster.update(
            16.0,
            &UpdateCtx {
                speed_factor: 1.0,
                blocks: &[],
                player: Some(player),
            },
        );
        assert_eq!(monster.location.x, 100.0);
    }
}
