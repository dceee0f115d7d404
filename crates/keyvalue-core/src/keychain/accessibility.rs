//! Item accessibility tiers

use serde::{Deserialize, Serialize};

/// When a secure item may be read, relative to device lock state, and
/// whether it travels with backups to another device.
///
/// Tiers never affect key resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Accessibility {
    /// Readable once the device has been unlocked after a restart, until the
    /// next restart. Suits background work. Migrates with encrypted backups.
    AfterFirstUnlock,

    /// Like [`Accessibility::AfterFirstUnlock`], but never leaves this device.
    AfterFirstUnlockThisDeviceOnly,

    /// Readable only while unlocked, and only on a device with a passcode.
    /// Cannot be stored without a passcode; removing the passcode deletes
    /// every item in this tier. Never migrates.
    WhenPasscodeSetThisDeviceOnly,

    /// Readable only while the device is unlocked. Migrates with encrypted
    /// backups. This is the platform default for items stored without a tier.
    #[default]
    WhenUnlocked,

    /// Like [`Accessibility::WhenUnlocked`], but never leaves this device.
    WhenUnlockedThisDeviceOnly,
}

impl Accessibility {
    /// Whether storing items in this tier needs a device passcode
    pub fn requires_passcode(&self) -> bool {
        matches!(self, Accessibility::WhenPasscodeSetThisDeviceOnly)
    }
}
