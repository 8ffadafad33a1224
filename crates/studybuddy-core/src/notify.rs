//! System notification capability.
//!
//! The runtime asks for permission once at startup and sends one
//! notification per completed countdown when permission is granted.
//! Hosts without notifications use [`NullNotifier`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not yet asked.
    Default,
}

pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask the host for permission. Must not block.
    fn request_permission(&self) -> Permission {
        self.permission()
    }

    /// Fire-and-forget; failures are the implementation's to log.
    fn notify(&self, title: &str, body: &str);
}

/// Host without notification support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn notify(&self, _title: &str, _body: &str) {}
}

#[cfg(feature = "desktop-notify")]
pub use desktop::DesktopNotifier;

#[cfg(feature = "desktop-notify")]
mod desktop {
    use super::{Notifier, Permission};

    /// Freedesktop / macOS / Windows notifications through `notify-rust`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DesktopNotifier;

    impl Notifier for DesktopNotifier {
        fn permission(&self) -> Permission {
            Permission::Granted
        }

        fn notify(&self, title: &str, body: &str) {
            let title = title.to_string();
            let body = body.to_string();
            // show() talks to the session bus; keep it off the caller's thread.
            std::thread::spawn(move || {
                if let Err(err) = notify_rust::Notification::new()
                    .summary(&title)
                    .body(&body)
                    .appname("studybuddy")
                    .icon("alarm-clock")
                    .show()
                {
                    tracing::warn!(error = %err, "desktop notification failed");
                }
            });
        }
    }
}
