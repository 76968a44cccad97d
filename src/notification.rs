use crate::event::NavigationEvent;
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("platform notification failed: {0}")]
    Platform(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
    /// Asked, answer not in yet. See [NotificationDispatcher::permission_resolved].
    Pending,
}

/// Platform notification primitives.
pub trait NotificationBackend {
    fn request_permission(&mut self) -> Permission;
    fn show(&mut self, title: &str, body: &str) -> Result<(), NotificationError>;
}

/// Writes notifications to the log. Always granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationBackend for LogNotifier {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), NotificationError> {
        info!("[notification] {title}: {body}");
        Ok(())
    }
}

/// For shells without system notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifications;

impl NotificationBackend for NoNotifications {
    fn request_permission(&mut self) -> Permission {
        Permission::Unsupported
    }

    fn show(&mut self, _title: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Platform("notifications unsupported".to_string()))
    }
}

/// Best-effort sink for navigation events.
///
/// The status message is always updated; a system notification is shown on top of it
/// only once permission has been granted. Nothing here can fail the caller.
pub struct NotificationDispatcher<B> {
    backend: B,
    permission: Option<Permission>,
    status_message: Option<String>,
    delivered: usize,
}

impl<B: NotificationBackend> NotificationDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            permission: None,
            status_message: None,
            delivered: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn permission(&self) -> Option<Permission> {
        self.permission
    }

    /// Asks the platform once per session; later calls return the known answer.
    pub fn request_permission(&mut self) -> Permission {
        if let Some(permission) = self.permission {
            return permission;
        }
        let permission = self.backend.request_permission();
        debug!("Notification permission: {permission:?}");
        self.permission = Some(permission);
        permission
    }

    /// Completes a [Permission::Pending] request.
    pub fn permission_resolved(&mut self, permission: Permission) {
        debug!("Notification permission resolved: {permission:?}");
        self.permission = Some(permission);
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Number of system notifications actually shown.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn dispatch(&mut self, event: &NavigationEvent) {
        self.status_message = Some(event.message.clone());

        if self.permission != Some(Permission::Granted) {
            return;
        }
        match self.backend.show(&event.title, &event.message) {
            Ok(()) => self.delivered += 1,
            Err(e) => warn!("Dropping notification for {}: {e}", event.key()),
        }
    }

    /// Forgets the permission answer and status so a new session asks again.
    pub fn reset(&mut self) {
        self.permission = None;
        self.status_message = None;
    }
}
