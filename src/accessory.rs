//! Television accessory state machine
//!
//! Power and the active input are independent. Switching power off reports
//! Off, then flips itself back On after [`RESTORE_DELAY`]; the blip is what
//! tells the integration layer to restart Steam.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::constants::accessory::{RESTORE_DELAY, UNKNOWN_LABEL, UNKNOWN_SLUG};
use crate::inputs::Input;
use crate::scheduler::{self, TimerHandle};

/// Side effects of state changes. Errors are logged by the accessory and never
/// reach the caller of a setter.
pub trait AccessoryHooks: Send + Sync + 'static {
    fn on_power_changed(&self, is_on: bool) -> Result<()>;
    fn on_input_changed(&self, identifier: u32, label: &str, slug: &str) -> Result<()>;
}

/// The two writable characteristics, as seen by whatever drives the accessory
pub trait TelevisionControl {
    fn set_power(&self, on: bool);
    fn set_active_identifier(&self, identifier: u32);
}

/// Characteristic values mirrored to the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorySnapshot {
    pub name: String,
    pub active: bool,
    pub active_identifier: u32,
    pub active_label: Option<String>,
    pub restore_pending: bool,
}

struct PendingRestore {
    generation: u64,
    handle: TimerHandle,
}

struct State {
    active: bool,
    active_identifier: u32,
    restore: Option<PendingRestore>,
    generation: u64,
}

impl State {
    fn cancel_restore(&mut self) {
        if let Some(pending) = self.restore.take() {
            pending.handle.cancel();
            debug!(generation = pending.generation, "Cancelled pending auto-restore");
        }
    }
}

struct Shared {
    name: String,
    inputs: Vec<Input>,
    hooks: Arc<dyn AccessoryHooks>,
    state: Mutex<State>,
}

/// Cheap to clone; all clones drive the same accessory
#[derive(Clone)]
pub struct TelevisionAccessory {
    shared: Arc<Shared>,
}

impl TelevisionAccessory {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Input>,
        initial_identifier: Option<u32>,
        hooks: Arc<dyn AccessoryHooks>,
    ) -> Self {
        let active_identifier = initial_identifier
            .or_else(|| inputs.first().map(|input| input.identifier))
            .unwrap_or(0);
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                inputs,
                hooks,
                state: Mutex::new(State {
                    active: false,
                    active_identifier,
                    restore: None,
                    generation: 0,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn inputs(&self) -> &[Input] {
        &self.shared.inputs
    }

    pub fn input(&self, identifier: u32) -> Option<&Input> {
        self.shared
            .inputs
            .iter()
            .find(|input| input.identifier == identifier)
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn active_identifier(&self) -> u32 {
        self.state().active_identifier
    }

    pub fn snapshot(&self) -> AccessorySnapshot {
        let state = self.state();
        AccessorySnapshot {
            name: self.shared.name.clone(),
            active: state.active,
            active_identifier: state.active_identifier,
            active_label: self
                .input(state.active_identifier)
                .map(|input| input.label.clone()),
            restore_pending: state
                .restore
                .as_ref()
                .is_some_and(|pending| !pending.handle.is_finished()),
        }
    }

    fn notify_power(&self, is_on: bool) {
        if let Err(e) = self.shared.hooks.on_power_changed(is_on) {
            error!(power = is_on, error = ?e, "Power change handler failed");
        }
    }

    /// Replace any pending restore with a fresh one
    fn schedule_restore(&self) {
        let mut state = self.state();
        state.cancel_restore();
        state.generation += 1;
        let generation = state.generation;

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let handle = scheduler::schedule(RESTORE_DELAY, move || {
            if let Some(shared) = weak.upgrade() {
                TelevisionAccessory { shared }.restore_power(generation);
            }
        });
        state.restore = Some(PendingRestore { generation, handle });
        debug!(generation, delay = ?RESTORE_DELAY, "Scheduled auto-restore");
    }

    fn restore_power(&self, generation: u64) {
        {
            let mut state = self.state();
            match &state.restore {
                Some(pending) if pending.generation == generation => {}
                _ => {
                    debug!(generation, "Ignoring stale auto-restore");
                    return;
                }
            }
            state.restore = None;
            state.active = true;
        }
        info!("Auto-restored power to On after delay");
        self.notify_power(true);
    }
}

impl TelevisionControl for TelevisionAccessory {
    fn set_power(&self, on: bool) {
        {
            let mut state = self.state();
            if on {
                state.cancel_restore();
            }
            state.active = on;
        }
        info!("Power {}", if on { "On" } else { "Off" });
        self.notify_power(on);
        if !on {
            self.schedule_restore();
        }
    }

    fn set_active_identifier(&self, identifier: u32) {
        let (label, slug) = match self.input(identifier) {
            Some(input) => (input.label.as_str(), input.slug.as_str()),
            None => {
                warn!(identifier, "Selected identifier is not in the catalog");
                (UNKNOWN_LABEL, UNKNOWN_SLUG)
            }
        };
        self.state().active_identifier = identifier;
        info!(identifier, label, slug, "Input selected");
        if let Err(e) = self.shared.hooks.on_input_changed(identifier, label, slug) {
            error!(identifier, slug, error = ?e, "Input change handler failed");
        }
    }
}
