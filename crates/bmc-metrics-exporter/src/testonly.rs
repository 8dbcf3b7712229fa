//! Test doubles shared by unit tests.

use std::sync::Mutex;

use crate::transport::{Payload, Transport};

/// Transport recording all submitted payloads.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    payloads: Mutex<Vec<Payload>>,
}

impl RecordingTransport {
    pub(crate) fn payloads(&self) -> Vec<Payload> {
        self.payloads.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send_event(&self, payload: Payload) {
        self.payloads.lock().unwrap().push(payload);
    }
}
