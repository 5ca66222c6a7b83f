//! Configuration and command table shared by the frame loop and the link
//!
//! The link task writes decoded commands, the frame loop reads a snapshot
//! every frame and the calibration workflow replaces the configuration.
//! Everything goes through one lock so a reload from disk can never
//! interleave with a decode.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::commands::CommandTable;
use crate::config::StationConfig;
use crate::protocol::{decode_commands, EncodeContext};

/// Everything behind the lock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    pub config: StationConfig,
    pub commands: CommandTable,
}

/// Cloneable handle to the shared [`LiveState`]
#[derive(Debug, Clone, Default)]
pub struct LiveConfig {
    inner: Arc<RwLock<LiveState>>,
}

impl LiveConfig {
    pub fn new(config: StationConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LiveState {
                config,
                commands: CommandTable::new(),
            })),
        }
    }

    // A panic while holding the lock leaves plain data behind, still usable
    fn read_guard(&self) -> RwLockReadGuard<'_, LiveState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read<R>(&self, f: impl FnOnce(&LiveState) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut LiveState) -> R) -> R {
        f(&mut self.write_guard())
    }

    /// Copy of the whole state for one frame
    pub fn snapshot(&self) -> LiveState {
        self.read_guard().clone()
    }

    pub fn config(&self) -> StationConfig {
        self.read_guard().config.clone()
    }

    pub fn commands(&self) -> CommandTable {
        self.read_guard().commands.clone()
    }

    pub fn replace_config(&self, config: StationConfig) {
        self.write_guard().config = config;
    }

    pub fn update_config(&self, f: impl FnOnce(&mut StationConfig)) {
        f(&mut self.write_guard().config);
    }

    /// Merge an inbound message into the command table.
    pub fn apply_message(&self, message: &str) -> usize {
        let mut state = self.write_guard();
        let y_calib_m = state.config.calibration.y_calib_m;
        decode_commands(message, &mut state.commands, y_calib_m)
    }

    /// Units and calibration for encoding the next outbound message
    pub fn encode_context(&self) -> EncodeContext {
        let state = self.read_guard();
        EncodeContext::new(&state.config, &state.commands)
    }
}
