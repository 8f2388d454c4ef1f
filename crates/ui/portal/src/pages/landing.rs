use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::User;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use crate::{
    action::Action,
    pages::{Page, PageContext, centered_column, stop},
    router::{Route, home_for},
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

const BANNER: &[&str] = &[
    "╔═╗╦╔═╦  ╔═╗┌─┐┬ ┬┬  ┬┌─┐┬─┐┌─┐┬┌┐┌",
    "╠═╝╠╩╗║  ╚═╗│ ││ │└┐┌┘├┤ ├┬┘├─┤││││",
    "╩  ╩ ╩╩  ╚═╝└─┘└─┘ └┘ └─┘┴└─┴ ┴┴┘└┘",
];

/// Public entry screen.
pub struct LandingPage {
    user: Option<User>,
}

impl LandingPage {
    pub fn new(ctx: PageContext) -> Self {
        Self { user: ctx.user }
    }
}

impl Page for LandingPage {
    fn name(&self) -> &str {
        "landing"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        let target = match (key.code, &self.user) {
            (KeyCode::Enter, Some(user)) => home_for(user.role),
            (KeyCode::Enter | KeyCode::Char('l'), None) => Route::Login,
            (KeyCode::Char('i'), None) => Route::Register,
            _ => return Ok(None),
        };
        stop(Action::Navigate(target))
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        if self.user.is_some() {
            &[("Entrée", "Mon espace")]
        } else {
            &[("l", "Connexion"), ("i", "Inscription")]
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let column = centered_column(area, 72);
        let [_, banner, body, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(BANNER.len() as u16 + 1),
            Constraint::Length(10),
            Constraint::Fill(1),
        ])
        .areas(column);

        let banner_lines: Vec<Line> = BANNER
            .iter()
            .map(|l| Line::styled(*l, theme.style(Role::Primary)))
            .collect();
        frame.render_widget(Paragraph::new(banner_lines).centered(), banner);

        let accent = theme.style(Role::Accent).add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::styled(
                "Infrastructure à clés publiques nationale",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
            Line::styled(
                "Demandez, suivez et téléchargez vos certificats numériques. \
                 Les administrateurs valident les demandes et gèrent l'autorité racine.",
                theme.style(Role::SubtleText),
            ),
            Line::raw(""),
        ];
        match &self.user {
            Some(user) => lines.push(Line::from(vec![
                Span::raw(format!("Connecté en tant que {} · ", user.email)),
                Span::styled("Entrée", accent),
                Span::raw(" pour accéder à votre espace"),
            ])),
            None => lines.push(Line::from(vec![
                Span::styled("l", accent),
                Span::raw(" Se connecter    "),
                Span::styled("i", accent),
                Span::raw(" Créer un compte"),
            ])),
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .centered()
                .wrap(Wrap { trim: true }),
            body,
        );
        Ok(())
    }
}
