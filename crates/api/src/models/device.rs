//! Mobile client bookkeeping: published app versions and registered devices.

use chef_core::{AccountId, AppVersionId, DeviceId};

define_entity! {
    /// A released mobile app version, used for update prompts.
    AppVersion / AppVersionInput {
        id: AppVersionId,
        kind: AppVersion,
        table: "app_version",
        path: "/api/app-versions",
        tag: "Devices",
        read: Public,
        write: Admin,
    }
    {
        /// `android` or `ios`.
        platform: String,
        version: String,
        /// Clients below this version must update before continuing.
        force_update: bool,
        release_notes: Option<String>,
    }
}

define_entity! {
    /// A push-notification target.
    Device / DeviceInput {
        id: DeviceId,
        kind: Device,
        table: "device",
        path: "/api/devices",
        tag: "Devices",
        read: Authenticated,
        write: Authenticated,
    }
    {
        account_id: Option<AccountId>,
        device_token: String,
        platform: String,
        app_version: Option<String>,
    }
}
