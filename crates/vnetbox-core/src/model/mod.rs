// ── Domain model ──
//
// `discovered` is what the cloud side reports (read-only to the engine),
// `target` is what the inventory holds. Neither carries HTTP details.

pub mod discovered;
pub mod mac;
pub mod target;

pub use discovered::{
    DeviceKind, DiscoveredDevice, DiscoveredNetwork, DiscoveredSubnet, Subscription,
};
pub use mac::MacAddress;
pub use target::{ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};
