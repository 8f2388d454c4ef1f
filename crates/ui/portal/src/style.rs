//! Semantic color roles shared by pages and components.

use ratatui::style::{Color, Modifier, Style};

use pki_api::RequestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Background,
    Surface,
    Text,
    SubtleText,
    InvertedText,
    Selection,

    Primary,
    Accent,
    Success,
    Warning,
    Danger,
    Info,
    Muted,
}

#[derive(Debug, Clone)]
pub struct RoleColors {
    pub background: Color,
    pub surface: Color,
    pub text: Color,
    pub subtle_text: Color,
    pub inverted_text: Color,
    pub selection: Color,

    pub primary: Color,
    pub accent: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub info: Color,
    pub muted: Color,
}

impl RoleColors {
    pub fn color(&self, role: Role) -> Color {
        match role {
            Role::Background => self.background,
            Role::Surface => self.surface,
            Role::Text => self.text,
            Role::SubtleText => self.subtle_text,
            Role::InvertedText => self.inverted_text,
            Role::Selection => self.selection,

            Role::Primary => self.primary,
            Role::Accent => self.accent,
            Role::Success => self.success,
            Role::Warning => self.warning,
            Role::Danger => self.danger,
            Role::Info => self.info,
            Role::Muted => self.muted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub roles: RoleColors,
}

impl Theme {
    pub fn style(&self, role: Role) -> Style {
        Style::default().fg(self.roles.color(role))
    }

    /// Title style of a bordered block, highlighted when focused.
    pub fn title(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(self.roles.primary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.roles.subtle_text)
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.roles.primary)
        } else {
            Style::default().fg(self.roles.muted)
        }
    }

    /// Highlight for the selected row of a table or list.
    pub fn selected_row(&self) -> Style {
        Style::default()
            .fg(self.roles.text)
            .bg(self.roles.selection)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status(&self, status: &RequestStatus) -> Style {
        let color = match status {
            RequestStatus::Pending => self.roles.warning,
            RequestStatus::Issued => self.roles.success,
            RequestStatus::Rejected => self.roles.danger,
            RequestStatus::Other(_) => self.roles.subtle_text,
        };
        Style::default().fg(color)
    }
}

impl Default for Theme {
    fn default() -> Self {
        default_dark_theme()
    }
}

/// Dark theme with the green and gold accents of the national PKI.
pub fn default_dark_theme() -> Theme {
    Theme {
        name: "pki-dark".into(),
        roles: RoleColors {
            background: Color::Rgb(12, 18, 14),
            surface: Color::Rgb(26, 32, 28),
            text: Color::Rgb(220, 220, 220),
            subtle_text: Color::Rgb(130, 130, 130),
            inverted_text: Color::Rgb(0, 0, 0),
            selection: Color::Rgb(32, 84, 58),

            primary: Color::Rgb(46, 170, 104),
            accent: Color::Rgb(252, 209, 22),
            success: Color::Rgb(102, 187, 106),
            warning: Color::Rgb(255, 214, 102),
            danger: Color::Rgb(239, 83, 80),
            info: Color::Rgb(144, 202, 249),
            muted: Color::Rgb(120, 120, 128),
        },
    }
}
