//! Renderer capability and per-frame render context
//!
//! The core never paints: it computes screen-space rectangles, circles and
//! text and hands them to whatever `Renderer` the caller injects. The
//! render pass is read-only over simulation state.

use glam::Vec2;

use crate::sim::Rect;

/// An RGBA color, 0-255 per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const GOLDENROD: Color = Color::rgb(218, 165, 32);
    pub const BLUE_VIOLET: Color = Color::rgb(138, 43, 226);

    /// Desaturate toward a washed-out mid-tone as `factor` drops below 1.
    ///
    /// `factor == 1` is the identity; at 0 every channel lands on the same
    /// halfway gray, which is what makes the whole scene fade in lockstep
    /// while time is stopped.
    pub fn adjust(self, factor: f32) -> Color {
        if factor == 1.0 {
            return self;
        }
        let blend = |p: u8| -> u8 {
            let p = p as f32;
            (((255.0 - p) * (1.0 - factor) + p * factor) / 2.0).round() as u8
        };
        Color {
            r: blend(self.r),
            g: blend(self.g),
            b: blend(self.b),
            a: self.a,
        }
    }
}

/// Everything the render pass needs beyond entity state, computed once per
/// frame by the level
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// World coordinate of the screen's top-left corner
    pub offset: Vec2,
    /// Global desaturation driven by the time-stop state, 0..=1
    pub color_factor: f32,
}

impl RenderContext {
    /// Map a world rectangle into screen space
    pub fn to_screen(&self, rect: Rect) -> Rect {
        rect.translated(-self.offset)
    }
}

/// The drawing surface the caller injects; consumes screen-space shapes
pub trait Renderer {
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn draw_text(&mut self, position: Vec2, text: &str, color: Color);
}

/// A draw command, as recorded by [`DrawList`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect { rect: Rect, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
    Text { position: Vec2, text: String, color: Color },
}

/// Renderer that records commands; used by tests and the headless demo
#[derive(Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Renderer for DrawList {
    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCmd::Rect { rect, color });
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCmd::Circle {
            center,
            radius,
            color,
        });
    }

    fn draw_text(&mut self, position: Vec2, text: &str, color: Color) {
        self.commands.push(DrawCmd::Text {
            position,
            text: text.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_identity_at_full_factor() {
        let color = Color::rgb(50, 200, 100);
        assert_eq!(color.adjust(1.0), color);
    }

    #[test]
    fn test_adjust_collapses_to_gray_at_zero() {
        let a = Color::rgb(255, 0, 0).adjust(0.0);
        let b = Color::rgb(0, 255, 0).adjust(0.0);
        assert_eq!((a.r, a.g, a.b), (b.r, b.g, b.b));
    }

    #[test]
    fn test_adjust_preserves_alpha() {
        let color = Color::rgba(10, 20, 30, 77).adjust(0.5);
        assert_eq!(color.a, 77);
    }

    #[test]
    fn test_to_screen_applies_camera_offset() {
        let ctx = RenderContext {
            offset: Vec2::new(100.0, 50.0),
            color_factor: 1.0,
        };
        let screen = ctx.to_screen(Rect::new(120.0, 60.0, 20.0, 20.0));
        assert_eq!(screen, Rect::new(20.0, 10.0, 20.0, 20.0));
    }
}
