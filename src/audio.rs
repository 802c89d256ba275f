//! Sound playback capability
//!
//! The core fires cues; an injected `SoundPlayer` turns them into actual
//! playback. Calls are fire-and-forget and non-blocking, and playing a cue
//! whose channel is already busy is expected to be a no-op on the player's
//! side.

/// The game's sound cues
///
/// Each cue carries the mixer channel it claims and its asset file name,
/// so a player implementation needs no table of its own. Cues sharing a
/// channel displace each other (a victory and a failure can't overlap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundId {
    Victory,
    Fail,
    Jump,
    Coin,
    Stomp,
    TimeStop,
    WorldReset,
}

impl SoundId {
    /// Mixer channel the cue plays on
    pub fn channel(&self) -> u8 {
        match self {
            SoundId::Victory | SoundId::Fail => 1,
            SoundId::Jump => 2,
            SoundId::Coin | SoundId::Stomp => 3,
            SoundId::TimeStop | SoundId::WorldReset => 4,
        }
    }

    /// Asset file the cue is loaded from
    pub fn file_name(&self) -> &'static str {
        match self {
            SoundId::Victory => "victory.wav",
            SoundId::Fail => "fail.wav",
            SoundId::Jump => "jump.wav",
            SoundId::Coin => "coin.wav",
            SoundId::Stomp => "stomp.wav",
            SoundId::TimeStop => "time_stop.wav",
            SoundId::WorldReset => "world_reset.wav",
        }
    }
}

/// Playback capability injected by the caller
pub trait SoundPlayer {
    /// Start a cue (no-op if its channel is already playing it)
    fn play(&mut self, id: SoundId);
    fn pause(&mut self, id: SoundId);
    fn unpause(&mut self, id: SoundId);
    fn stop(&mut self, id: SoundId);
    /// Switch the looping soundtrack
    fn play_track(&mut self, name: &str);
    /// Fade the current soundtrack out over `ms`
    fn fade_track(&mut self, ms: f32);
}

/// A cue as observed by [`MemorySounds`]
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Play(SoundId),
    Pause(SoundId),
    Unpause(SoundId),
    Stop(SoundId),
    Track(String),
    FadeTrack(f32),
}

/// Records cues instead of playing them; used by tests and the headless
/// demo
#[derive(Debug, Default)]
pub struct MemorySounds {
    pub cues: Vec<Cue>,
}

impl MemorySounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a given cue was played
    pub fn played(&self, id: SoundId) -> usize {
        self.cues
            .iter()
            .filter(|cue| matches!(cue, Cue::Play(x) if *x == id))
            .count()
    }
}

impl SoundPlayer for MemorySounds {
    fn play(&mut self, id: SoundId) {
        self.cues.push(Cue::Play(id));
    }

    fn pause(&mut self, id: SoundId) {
        self.cues.push(Cue::Pause(id));
    }

    fn unpause(&mut self, id: SoundId) {
        self.cues.push(Cue::Unpause(id));
    }

    fn stop(&mut self, id: SoundId) {
        self.cues.push(Cue::Stop(id));
    }

    fn play_track(&mut self, name: &str) {
        self.cues.push(Cue::Track(name.to_string()));
    }

    fn fade_track(&mut self, ms: f32) {
        self.cues.push(Cue::FadeTrack(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_table() {
        // Terminal cues share a channel so they can't overlap
        assert_eq!(SoundId::Victory.channel(), SoundId::Fail.channel());
        assert_ne!(SoundId::Jump.channel(), SoundId::Victory.channel());
    }

    #[test]
    fn test_memory_sounds_counts_plays() {
        let mut sounds = MemorySounds::new();
        sounds.play(SoundId::Coin);
        sounds.play(SoundId::Coin);
        sounds.stop(SoundId::TimeStop);
        assert_eq!(sounds.played(SoundId::Coin), 2);
        assert_eq!(sounds.played(SoundId::TimeStop), 0);
    }
}
