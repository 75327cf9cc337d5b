//! Event identifiers and payloads for the [`EventBus`](crate::resources::eventbus::EventBus).
//!
//! [`GameEvent`] is a closed set of event categories. Each variant carries a
//! stable numeric id so it can be logged or persisted without depending on
//! declaration order at the call site. Two keys for the same logical event are
//! the same enum value, so equality and hashing always agree.
//!
//! Payloads are optional and type-erased. Listeners downcast the payload to
//! whatever type the publisher documents for that event:
//!
//! ```ignore
//! bus.add_listener(GameEvent::ScoreChanged, Listener::new(|payload| {
//!     if let Some(score) = payload.and_then(|p| p.downcast_ref::<u32>()) {
//!         log::info!("score is now {}", score);
//!     }
//! }));
//! bus.invoke_event(GameEvent::ScoreChanged, Some(payload(120u32)));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, shareable event payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an event [`Payload`].
pub fn payload<T: Any + Send + Sync>(value: T) -> Payload {
    Arc::new(value)
}

/// Logical event categories dispatched through the bus.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameEvent {
    GameStarted = 0,
    GamePaused = 1,
    GameResumed = 2,
    GameOver = 3,
    LevelLoaded = 10,
    LevelCompleted = 11,
    ScoreChanged = 20,
    CoinCollected = 21,
    PlayerDamaged = 30,
    PlayerDied = 31,
    PlayerRespawned = 32,
    EnemySpawned = 40,
    EnemyDefeated = 41,
    SettingsChanged = 50,
}

impl GameEvent {
    /// Every variant, in discriminator order.
    pub const ALL: [GameEvent; 14] = [
        GameEvent::GameStarted,
        GameEvent::GamePaused,
        GameEvent::GameResumed,
        GameEvent::GameOver,
        GameEvent::LevelLoaded,
        GameEvent::LevelCompleted,
        GameEvent::ScoreChanged,
        GameEvent::CoinCollected,
        GameEvent::PlayerDamaged,
        GameEvent::PlayerDied,
        GameEvent::PlayerRespawned,
        GameEvent::EnemySpawned,
        GameEvent::EnemyDefeated,
        GameEvent::SettingsChanged,
    ];

    /// Stable integer discriminator.
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Look up an event by its discriminator.
    pub fn from_id(id: u16) -> Option<GameEvent> {
        Self::ALL.iter().copied().find(|e| e.id() == id)
    }

    /// Snake-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            GameEvent::GameStarted => "game_started",
            GameEvent::GamePaused => "game_paused",
            GameEvent::GameResumed => "game_resumed",
            GameEvent::GameOver => "game_over",
            GameEvent::LevelLoaded => "level_loaded",
            GameEvent::LevelCompleted => "level_completed",
            GameEvent::ScoreChanged => "score_changed",
            GameEvent::CoinCollected => "coin_collected",
            GameEvent::PlayerDamaged => "player_damaged",
            GameEvent::PlayerDied => "player_died",
            GameEvent::PlayerRespawned => "player_respawned",
            GameEvent::EnemySpawned => "enemy_spawned",
            GameEvent::EnemyDefeated => "enemy_defeated",
            GameEvent::SettingsChanged => "settings_changed",
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_ids_are_unique_and_round_trip() {
        let mut seen = FxHashSet::default();
        for event in GameEvent::ALL {
            assert!(seen.insert(event.id()), "duplicate id for {:?}", event);
            assert_eq!(GameEvent::from_id(event.id()), Some(event));
        }
        assert_eq!(GameEvent::from_id(9999), None);
    }

    #[test]
    fn test_same_event_hashes_identically() {
        let mut set = FxHashSet::default();
        set.insert(GameEvent::CoinCollected);
        assert!(set.contains(&GameEvent::from_id(21).unwrap()));
    }

    #[test]
    fn test_payload_downcasts() {
        let p = payload(42u32);
        assert_eq!(p.downcast_ref::<u32>(), Some(&42));
        assert!(p.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_display_includes_name_and_id() {
        assert_eq!(GameEvent::PlayerDied.to_string(), "player_died#31");
    }
}
