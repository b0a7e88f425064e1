//! Process-wide registry of open ADC devices
//!
//! A device can back at most one live [`AdcController`](crate::AdcController).
//! Controllers hold a [`DeviceLease`] that returns the device to the registry
//! when dropped.

use core::cell::RefCell;
use std::collections::BTreeMap;

use critical_section::Mutex;
use hal::DeviceId;

use crate::error::{AdcError, AdcResult};

/// Devices that currently have a live controller
///
/// Each claim carries a token; only the matching token releases it, so a
/// stale claim can never free a device that was handed to someone else.
pub struct DeviceRegistry {
    open: BTreeMap<DeviceId, u32>,
    next_token: u32,
}

impl DeviceRegistry {
    /// Create a new empty registry
    pub const fn new() -> Self {
        Self {
            open: BTreeMap::new(),
            next_token: 0,
        }
    }

    /// Mark `device` as open and return the token of the claim
    ///
    /// Returns [`AdcError::AlreadyOpen`] if it is already held.
    pub fn acquire(&mut self, device: DeviceId) -> AdcResult<u32> {
        if self.open.contains_key(&device) {
            return Err(AdcError::AlreadyOpen(device));
        }
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        self.open.insert(device, token);
        Ok(token)
    }

    /// Drop the claim on `device` if it is still held under `token`
    pub fn release(&mut self, device: DeviceId, token: u32) -> bool {
        if self.open.get(&device) == Some(&token) {
            self.open.remove(&device);
            true
        } else {
            false
        }
    }

    pub fn is_open(&self, device: DeviceId) -> bool {
        self.open.contains_key(&device)
    }

    /// Iterate over all open devices
    pub fn iter(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.open.keys().copied()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global static registry instance
static REGISTRY: Mutex<RefCell<DeviceRegistry>> = Mutex::new(RefCell::new(DeviceRegistry::new()));

/// Get access to the global device registry
pub(crate) fn with_registry<F, R>(f: F) -> R
where
    F: FnOnce(&mut DeviceRegistry) -> R,
{
    critical_section::with(|cs| {
        let mut registry = REGISTRY.borrow_ref_mut(cs);
        f(&mut registry)
    })
}

/// Claim `device` in the global registry
///
/// The claim ends when the returned lease is dropped.
pub fn acquire(device: DeviceId) -> AdcResult<DeviceLease> {
    let token = with_registry(|registry| registry.acquire(device))?;
    Ok(DeviceLease { device, token })
}

/// Check whether `device` currently has a live controller
pub fn is_open(device: DeviceId) -> bool {
    with_registry(|registry| registry.is_open(device))
}

/// Exclusive claim on a device, released on drop
#[derive(Debug)]
pub struct DeviceLease {
    device: DeviceId,
    token: u32,
}

impl DeviceLease {
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub(crate) fn token(&self) -> u32 {
        self.token
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        with_registry(|registry| registry.release(self.device, self.token));
    }
}
