//! Toast notifications stacked in the top-right corner.

use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::Style,
    symbols::border,
    widgets::{Block, Clear, Paragraph, Wrap},
};
use slotmap::{SlotMap, new_key_type};

use crate::{style::Theme, tui::Frame};

new_key_type! { pub struct NotificationKey; }

pub const DEFAULT_TTL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationKey,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

#[derive(Debug)]
pub struct NotificationCenter {
    items: SlotMap<NotificationKey, Notification>,
    default_ttl: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationCenter {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            items: SlotMap::with_key(),
            default_ttl,
        }
    }

    /// Adds a toast. `ttl: None` uses the center's default.
    pub fn push(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        ttl: Option<Duration>,
    ) -> NotificationKey {
        self.push_at(kind, message, ttl, Instant::now())
    }

    pub fn push_at(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> NotificationKey {
        let message = message.into();
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.items.insert_with_key(|id| Notification {
            id,
            kind,
            message,
            created_at: now,
            ttl,
        })
    }

    pub fn dismiss(&mut self, key: NotificationKey) -> bool {
        self.items.remove(key).is_some()
    }

    /// Removes the most recent toast, if any.
    pub fn dismiss_latest(&mut self) -> bool {
        match self.visible().first().map(|n| n.id) {
            Some(key) => self.dismiss(key),
            None => false,
        }
    }

    /// Drops every expired toast.
    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|_, n| !n.is_expired(now));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Toasts newest first.
    pub fn visible(&self) -> Vec<&Notification> {
        let mut items: Vec<&Notification> = self.items.values().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn draw(&self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
        const WIDTH: u16 = 44;
        const HEIGHT: u16 = 4;

        let width = WIDTH.min(area.width);
        let x = area.x + area.width.saturating_sub(width + 1);
        let mut y = area.y + 1;

        for toast in self.visible() {
            if y + HEIGHT > area.y + area.height {
                break;
            }
            let rect = Rect::new(x, y, width, HEIGHT);
            let (title, color) = match toast.kind {
                NotificationKind::Info => ("Info", theme.roles.info),
                NotificationKind::Success => ("Succès", theme.roles.success),
                NotificationKind::Error => ("Erreur", theme.roles.danger),
            };
            frame.render_widget(Clear, rect);
            let body = Paragraph::new(toast.message.as_str())
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(theme.roles.text).bg(theme.roles.surface))
                .block(
                    Block::bordered()
                        .title(format!(" {title} "))
                        .border_set(border::ROUNDED)
                        .border_style(Style::default().fg(color)),
                );
            frame.render_widget(body, rect);
            y += HEIGHT;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn newest_first() {
        let mut center = NotificationCenter::default();
        let t0 = Instant::now();
        center.push_at(NotificationKind::Info, "premier", None, t0);
        center.push_at(
            NotificationKind::Error,
            "second",
            None,
            t0 + Duration::from_millis(5),
        );
        let messages: Vec<&str> = center.visible().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "premier"]);
    }

    #[test]
    fn expire_after_default_ttl() {
        let mut center = NotificationCenter::default();
        let t0 = Instant::now();
        center.push_at(NotificationKind::Success, "ok", None, t0);
        center.push_at(
            NotificationKind::Info,
            "long",
            Some(Duration::from_secs(10)),
            t0,
        );

        center.prune(t0 + Duration::from_millis(3999));
        assert_eq!(center.len(), 2);
        center.prune(t0 + Duration::from_millis(4000));
        assert_eq!(center.len(), 1);
        assert_eq!(center.visible()[0].message, "long");
    }

    #[test]
    fn dismiss_before_expiry() {
        let mut center = NotificationCenter::default();
        let key = center.push(NotificationKind::Info, "a", None);
        center.push(NotificationKind::Info, "b", None);
        assert!(center.dismiss(key));
        assert!(!center.dismiss(key));
        assert_eq!(center.len(), 1);
        assert!(center.dismiss_latest());
        assert!(center.is_empty());
        assert!(!center.dismiss_latest());
    }
}
