//! Transit configuration and change notification
//!
//! `ConfigService` owns the live values. Every setter that actually changes a
//! value broadcasts a typed [`ConfigChange`] to all current subscribers.

use log::debug;
use std::sync::mpsc::{self, Receiver, Sender};

/// Default hub map resource path
pub const DEFAULT_HUB_MAP_PATH: &str = "/Maps/Misc/arrivals.yml";

/// Live transit settings
#[derive(Debug, Clone, PartialEq)]
pub struct TransitConfig {
    /// Whether the hub and shuttles exist at all
    pub enabled: bool,
    /// Dwell time between shuttle decisions
    pub cooldown_secs: f32,
    /// Resource path of the hub map
    pub hub_map_path: String,
    /// Time spent in transit space per jump
    pub travel_secs: f32,
    /// Time a shuttle stays docked after a jump is issued
    pub startup_secs: f32,
    /// When set, passengers are not dumped when the shuttle leaves a destination
    pub returns_allowed: bool,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown_secs: 50.0,
            hub_map_path: DEFAULT_HUB_MAP_PATH.to_string(),
            travel_secs: 20.0,
            startup_secs: 5.5,
            returns_allowed: false,
        }
    }
}

impl TransitConfig {
    /// Full trip length: startup plus time in transit space
    pub fn trip_secs(&self) -> f32 {
        self.startup_secs + self.travel_secs
    }
}

/// A single setting that changed
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    Enabled(bool),
    CooldownSecs(f32),
    HubMapPath(String),
    TravelSecs(f32),
    StartupSecs(f32),
    ReturnsAllowed(bool),
}

/// Receiving end of a subscription
pub struct ConfigSubscription {
    pub id: usize,
    receiver: Receiver<ConfigChange>,
}

impl ConfigSubscription {
    /// Drain every change received so far, oldest first
    pub fn drain(&self) -> Vec<ConfigChange> {
        self.receiver.try_iter().collect()
    }
}

/// Holder of the live configuration
#[derive(Default)]
pub struct ConfigService {
    current: TransitConfig,
    subscribers: Vec<(usize, Sender<ConfigChange>)>,
    next_subscriber: usize,
}

impl ConfigService {
    pub fn new(config: TransitConfig) -> Self {
        Self {
            current: config,
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    pub fn current(&self) -> &TransitConfig {
        &self.current
    }

    pub fn subscribe(&mut self) -> ConfigSubscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.push((id, sender));
        ConfigSubscription { id, receiver }
    }

    pub fn unsubscribe(&mut self, id: usize) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn broadcast(&mut self, change: ConfigChange) {
        debug!("Config changed: {:?}", change);
        // Receivers that were dropped without unsubscribing are pruned here
        self.subscribers
            .retain(|(_, sender)| sender.send(change.clone()).is_ok());
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.current.enabled != enabled {
            self.current.enabled = enabled;
            self.broadcast(ConfigChange::Enabled(enabled));
        }
    }

    pub fn set_cooldown_secs(&mut self, secs: f32) {
        if self.current.cooldown_secs != secs {
            self.current.cooldown_secs = secs;
            self.broadcast(ConfigChange::CooldownSecs(secs));
        }
    }

    pub fn set_hub_map_path(&mut self, path: &str) {
        if self.current.hub_map_path != path {
            self.current.hub_map_path = path.to_string();
            self.broadcast(ConfigChange::HubMapPath(path.to_string()));
        }
    }

    pub fn set_travel_secs(&mut self, secs: f32) {
        if self.current.travel_secs != secs {
            self.current.travel_secs = secs;
            self.broadcast(ConfigChange::TravelSecs(secs));
        }
    }

    pub fn set_startup_secs(&mut self, secs: f32) {
        if self.current.startup_secs != secs {
            self.current.startup_secs = secs;
            self.broadcast(ConfigChange::StartupSecs(secs));
        }
    }

    pub fn set_returns_allowed(&mut self, allowed: bool) {
        if self.current.returns_allowed != allowed {
            self.current.returns_allowed = allowed;
            self.broadcast(ConfigChange::ReturnsAllowed(allowed));
        }
    }
}
