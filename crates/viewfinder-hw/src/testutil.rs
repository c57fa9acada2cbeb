//! Shared fakes for resolver and session tests.

use crate::capture::{CaptureBackend, CaptureError, CaptureHandle};
use crate::registry::{DeviceRegistry, ImagingDevice};
use std::cell::RefCell;
use std::rc::Rc;
use viewfinder_core::FrameBuffer;

/// Open/close bookkeeping shared between a backend and its handles.
#[derive(Debug, Default)]
pub struct Counters {
    pub opened: usize,
    pub closed: usize,
}

/// Registry returning a fixed device list.
pub struct FakeRegistry {
    pub devices: Vec<ImagingDevice>,
}

impl FakeRegistry {
    pub fn with_names(names: &[&str]) -> Self {
        let devices = names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| ImagingDevice {
                name: name.to_string(),
                device_id: format!("fake:{ordinal}"),
                ordinal,
            })
            .collect();
        Self { devices }
    }
}

impl DeviceRegistry for FakeRegistry {
    fn list_imaging_devices(&self) -> Vec<ImagingDevice> {
        self.devices.clone()
    }
}

/// Backend where openability and readability are scripted per index.
pub struct FakeBackend {
    openable: Vec<u32>,
    readable: Vec<u32>,
    pub counters: Rc<RefCell<Counters>>,
}

impl FakeBackend {
    pub fn new(openable: &[u32], readable: &[u32]) -> Self {
        Self {
            openable: openable.to_vec(),
            readable: readable.to_vec(),
            counters: Rc::new(RefCell::new(Counters::default())),
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.borrow().opened
    }

    pub fn closed(&self) -> usize {
        self.counters.borrow().closed
    }
}

impl CaptureBackend for FakeBackend {
    type Handle = FakeHandle;

    fn open(&self, index: u32) -> Result<FakeHandle, CaptureError> {
        if !self.openable.contains(&index) {
            return Err(CaptureError::OpenFailed {
                index,
                reason: "scripted as unopenable".into(),
            });
        }
        self.counters.borrow_mut().opened += 1;
        Ok(FakeHandle {
            readable: self.readable.contains(&index),
            counters: Rc::clone(&self.counters),
        })
    }
}

pub struct FakeHandle {
    readable: bool,
    counters: Rc<RefCell<Counters>>,
}

impl CaptureHandle for FakeHandle {
    fn read_frame(&mut self) -> Result<FrameBuffer, CaptureError> {
        if self.readable {
            Ok(FrameBuffer::flat(4, 4, 1, 128).expect("fake frame"))
        } else {
            Err(CaptureError::ReadFailed("scripted as frameless".into()))
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.counters.borrow_mut().closed += 1;
    }
}
