//! Raw input to discrete command translation
//!
//! The caller samples its key-down state once per frame and runs it
//! through an [`InputMap`]; only the resulting [`Command`]s ever reach the
//! simulation. The key type is whatever the windowing layer uses.

/// The discrete things a player can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    Jump,
    TimeStop,
    /// Arm the world-reset countdown
    WorldReset,
}

/// Ordered key-to-command bindings
#[derive(Debug, Clone)]
pub struct InputMap<K> {
    bindings: Vec<(K, Command)>,
}

impl<K: PartialEq> InputMap<K> {
    pub fn new(bindings: Vec<(K, Command)>) -> Self {
        Self { bindings }
    }

    /// Commands for every bound key currently held down, in binding order
    pub fn translate<'a>(&'a self, pressed: &'a [K]) -> impl Iterator<Item = Command> + 'a {
        self.bindings
            .iter()
            .filter(|(key, _)| pressed.contains(key))
            .map(|(_, command)| *command)
    }
}
