pub mod notify;

pub use notify::{Notification, NotificationCenter, NotificationKey, NotificationKind};
