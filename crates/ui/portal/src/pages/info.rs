//! Informational pages for revocation and the CRL.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Text},
    widgets::{Paragraph, Wrap},
};

use crate::{
    action::Action,
    layers::NotificationKind,
    pages::{Page, PageContext, centered_column, page_block, stop},
    router::Route,
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

pub struct RevokeCertificatePage;

impl RevokeCertificatePage {
    pub fn new(_ctx: PageContext) -> Self {
        Self
    }
}

impl Page for RevokeCertificatePage {
    fn name(&self) -> &str {
        "revoke-certificate"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Enter => stop(Action::Navigate(Route::Certificates)),
            _ => Ok(None),
        }
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("Entrée", "Mes certificats")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(
            frame,
            centered_column(area, 90),
            "Révoquer un certificat",
            theme,
        );
        let lines = vec![
            Line::styled(
                "La révocation est effectuée par les administrateurs de l'autorité.",
                theme.style(Role::Text),
            ),
            Line::raw(""),
            Line::raw("Révoquez un certificat si :"),
            Line::raw("  • la clé privée a été perdue ou compromise ;"),
            Line::raw("  • les informations du certificat ne sont plus exactes ;"),
            Line::raw("  • le certificat n'est plus utilisé."),
            Line::raw(""),
            Line::styled(
                "Contactez l'administrateur de la PKI en indiquant le numéro de série \
                 du certificat (visible dans « Mes certificats »).",
                theme.style(Role::SubtleText),
            ),
            Line::raw(""),
            Line::styled(
                "Un certificat révoqué apparaît dans la prochaine liste de révocation (CRL).",
                theme.style(Role::Warning),
            ),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
            inner,
        );
        Ok(())
    }
}

/// Shows where the CRL is published.
pub struct DownloadCrlPage {
    crl_url: Option<String>,
}

impl DownloadCrlPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            crl_url: ctx.config.crl_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

impl Page for DownloadCrlPage {
    fn name(&self) -> &str {
        "download-crl"
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match (key.code, &self.crl_url) {
            (KeyCode::Char('c'), Some(url)) => stop(Action::CopyToClipboard(url.clone())),
            (KeyCode::Char('c'), None) => stop(Action::Toast(
                NotificationKind::Info,
                "Aucune URL de CRL configurée".into(),
            )),
            _ => Ok(None),
        }
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("c", "Copier l'URL")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(
            frame,
            centered_column(area, 90),
            "Liste de révocation (CRL)",
            theme,
        );
        let url_line = match &self.crl_url {
            Some(url) => Line::styled(url.clone(), theme.style(Role::Accent)),
            None => Line::styled(
                "Aucune URL de CRL configurée (clé crl_url).",
                theme.style(Role::Warning),
            ),
        };
        let lines = vec![
            Line::raw(
                "La CRL recense les certificats révoqués par l'autorité. \
                 Vos applications doivent la consulter régulièrement.",
            ),
            Line::raw(""),
            Line::styled("Point de distribution :", theme.style(Role::SubtleText)),
            url_line,
            Line::raw(""),
            Line::styled(
                "Appuyez sur c pour copier l'adresse dans le presse-papiers.",
                theme.style(Role::Muted),
            ),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }),
            inner,
        );
        Ok(())
    }
}
