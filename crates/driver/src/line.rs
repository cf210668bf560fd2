//! Line state store
//!
//! Holds the serial configuration under one mutex. Getters copy out under
//! the lock; setters mutate under the lock, snapshot the whole configuration,
//! release the lock, and only then push to hardware. The push therefore
//! happens outside the lock, so a concurrent setter can interleave between a
//! writer's unlock and its push; each push carries the full current line
//! configuration, which keeps the window harmless. The guard type is not
//! held across any await point.

use crate::usb::bridge::TransferBridge;
use common::Result;
use protocol::{BaudRate, DtrRts, Handflow, LineControl, SerialChars};
use std::sync::Mutex;

/// The field group guarded by the line-state lock
#[derive(Debug, Clone, Copy)]
pub struct LineState {
    pub baud: BaudRate,
    pub line_control: LineControl,
    pub chars: SerialChars,
    pub handflow: Handflow,
    pub dtr_rts: DtrRts,
}

impl Default for LineState {
    /// 9600 8N1 with both control lines deasserted
    fn default() -> Self {
        LineState {
            baud: BaudRate(9600),
            line_control: LineControl::default(),
            chars: SerialChars::default(),
            handflow: Handflow::default(),
            dtr_rts: DtrRts::default(),
        }
    }
}

/// Mutex-guarded serial line configuration
#[derive(Debug, Default)]
pub struct LineStateStore {
    inner: Mutex<LineState>,
}

impl LineStateStore {
    pub fn new() -> Self {
        LineStateStore::default()
    }

    /// Copy of the whole configuration, for the initial bring-up push
    pub fn snapshot(&self) -> LineState {
        *self.inner.lock().unwrap()
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.inner.lock().unwrap().baud
    }

    pub fn line_control(&self) -> LineControl {
        self.inner.lock().unwrap().line_control
    }

    pub fn chars(&self) -> SerialChars {
        self.inner.lock().unwrap().chars
    }

    pub fn handflow(&self) -> Handflow {
        self.inner.lock().unwrap().handflow
    }

    /// DTR/RTS shadow state; no hardware round-trip
    pub fn dtr_rts(&self) -> DtrRts {
        self.inner.lock().unwrap().dtr_rts
    }

    /// Set the baud rate and push the full line coding to the device
    pub async fn set_baud_rate(&self, bridge: &TransferBridge, baud: BaudRate) -> Result<()> {
        let (baud, line_control) = {
            let mut state = self.inner.lock().unwrap();
            state.baud = baud;
            (state.baud, state.line_control)
        };
        bridge.set_line(baud, line_control).await
    }

    /// Set the line-control triple and push the full line coding
    pub async fn set_line_control(
        &self,
        bridge: &TransferBridge,
        line_control: LineControl,
    ) -> Result<()> {
        let (baud, line_control) = {
            let mut state = self.inner.lock().unwrap();
            state.line_control = line_control;
            (state.baud, state.line_control)
        };
        bridge.set_line(baud, line_control).await
    }

    /// Special characters are host-side state only; no hardware push
    pub fn set_chars(&self, chars: SerialChars) {
        self.inner.lock().unwrap().chars = chars;
    }

    /// The handshake flow descriptor is host-side state only
    pub fn set_handflow(&self, handflow: Handflow) {
        self.inner.lock().unwrap().handflow = handflow;
    }

    /// OR bits into the DTR/RTS mask and push the control lines
    pub async fn set_control_bits(&self, bridge: &TransferBridge, mask: u32) -> Result<()> {
        let lines = {
            let mut state = self.inner.lock().unwrap();
            state.dtr_rts = state.dtr_rts.with_set(mask);
            state.dtr_rts
        };
        bridge.set_control_lines(lines).await
    }

    /// Clear bits from the DTR/RTS mask and push the control lines
    pub async fn clear_control_bits(&self, bridge: &TransferBridge, mask: u32) -> Result<()> {
        let lines = {
            let mut state = self.inner.lock().unwrap();
            state.dtr_rts = state.dtr_rts.with_cleared(mask);
            state.dtr_rts
        };
        bridge.set_control_lines(lines).await
    }
}
