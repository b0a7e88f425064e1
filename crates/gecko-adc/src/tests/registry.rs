use hal::DeviceId;

use crate::error::AdcError;
use crate::registry::{self, DeviceRegistry};

#[test]
fn local_registry_rejects_duplicate_acquire() {
    let mut registry = DeviceRegistry::new();

    registry.acquire(DeviceId(0)).unwrap();
    assert_eq!(
        registry.acquire(DeviceId(0)),
        Err(AdcError::AlreadyOpen(DeviceId(0)))
    );
    registry.acquire(DeviceId(1)).unwrap();

    assert_eq!(registry.iter().collect::<Vec<_>>(), vec![DeviceId(0), DeviceId(1)]);
}

#[test]
fn local_registry_release_is_idempotent() {
    let mut registry = DeviceRegistry::default();
    let token = registry.acquire(DeviceId(4)).unwrap();

    assert!(registry.release(DeviceId(4), token));
    assert!(!registry.release(DeviceId(4), token));
    assert!(!registry.is_open(DeviceId(4)));
}

#[test]
fn local_registry_ignores_stale_token() {
    let mut registry = DeviceRegistry::new();
    let first = registry.acquire(DeviceId(5)).unwrap();
    assert!(registry.release(DeviceId(5), first));

    let second = registry.acquire(DeviceId(5)).unwrap();
    assert_ne!(first, second);
    assert!(!registry.release(DeviceId(5), first));
    assert!(registry.is_open(DeviceId(5)));
    assert_eq!(registry.acquire(DeviceId(5)), Err(AdcError::AlreadyOpen(DeviceId(5))));
}

#[test]
fn lease_releases_device_on_drop() {
    let device = DeviceId(0x7100);
    let lease = registry::acquire(device).unwrap();
    assert_eq!(lease.device(), device);
    assert!(registry::is_open(device));
    assert!(matches!(registry::acquire(device), Err(AdcError::AlreadyOpen(_))));

    drop(lease);
    assert!(!registry::is_open(device));
    let _again = registry::acquire(device).unwrap();
}

#[test]
fn stale_lease_does_not_evict_new_owner() {
    let device = DeviceId(0x7101);
    let stale = registry::acquire(device).unwrap();

    // Claim taken away from under the first lease.
    assert!(registry::with_registry(|r| r.release(device, stale.token())));
    let owner = registry::acquire(device).unwrap();

    drop(stale);
    assert!(registry::is_open(device));
    assert!(matches!(registry::acquire(device), Err(AdcError::AlreadyOpen(_))));

    drop(owner);
    assert!(!registry::is_open(device));
}
