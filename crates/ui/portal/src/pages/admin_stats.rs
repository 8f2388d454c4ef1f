use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use pki_api::DashboardData;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    widgets::{Block, Gauge},
};

use crate::{
    action::{Action, Dispatcher},
    core::{TaskKind, TaskResult},
    layers::NotificationKind,
    pages::{Page, PageContext, Remote, page_block, placeholder, stop},
    style::{Role, Theme},
    tui::{EventResponse, Frame},
};

/// Ratios derived from the dashboard counters, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratios {
    /// Active share of all issued certificates.
    pub active: f64,
    pub revoked: f64,
    /// Pending requests per registered user, capped at 1.
    pub pending_per_user: f64,
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64).clamp(0.0, 1.0)
    }
}

impl From<&DashboardData> for Ratios {
    fn from(data: &DashboardData) -> Self {
        let issued = data.active_certificates + data.revoked_certificates;
        Self {
            active: ratio(data.active_certificates, issued),
            revoked: ratio(data.revoked_certificates, issued),
            pending_per_user: ratio(data.pending_requests, data.total_users),
        }
    }
}

pub struct AdminStatsPage {
    dispatcher: Dispatcher,
    data: Remote<DashboardData>,
}

impl AdminStatsPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher,
            data: Remote::Loading,
        }
    }
}

impl Page for AdminStatsPage {
    fn name(&self) -> &str {
        "admin-stats"
    }

    fn on_enter(&mut self) -> Result<()> {
        self.dispatcher.spawn(TaskKind::LoadAdminDashboard);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<EventResponse<Action>>> {
        match key.code {
            KeyCode::Char('r') => {
                self.dispatcher.spawn(TaskKind::LoadAdminDashboard);
                stop(Action::Update)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::TaskDone {
            result: TaskResult::AdminDashboard(outcome),
            ..
        } = action
        {
            match outcome {
                Ok(data) => self.data = Remote::Loaded(data.clone()),
                Err(err) => {
                    let message = err.user_message("Erreur lors du chargement des statistiques");
                    if !matches!(self.data, Remote::Loaded(_)) {
                        self.data = Remote::Failed(message.clone());
                    }
                    self.dispatcher.toast(NotificationKind::Error, message);
                }
            }
        }
        Ok(None)
    }

    fn shortcuts(&self) -> &'static [(&'static str, &'static str)] {
        &[("r", "Actualiser")]
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, theme: &Theme) -> Result<()> {
        let inner = page_block(frame, area, "Statistiques", theme);
        let data = match &self.data {
            Remote::Loading => {
                placeholder(frame, inner, "Chargement…", theme.style(Role::SubtleText));
                return Ok(());
            }
            Remote::Failed(message) => {
                placeholder(frame, inner, message, theme.style(Role::Danger));
                return Ok(());
            }
            Remote::Loaded(data) => data,
        };
        let ratios = Ratios::from(data);
        let gauges = [
            (
                format!(
                    "Certificats actifs ({} / {})",
                    data.active_certificates,
                    data.active_certificates + data.revoked_certificates
                ),
                ratios.active,
                Role::Success,
            ),
            (
                format!("Certificats révoqués ({})", data.revoked_certificates),
                ratios.revoked,
                Role::Danger,
            ),
            (
                format!(
                    "Demandes en attente par utilisateur ({} / {})",
                    data.pending_requests, data.total_users
                ),
                ratios.pending_per_user,
                Role::Warning,
            ),
        ];
        let rows = Layout::vertical([Constraint::Length(3); 3]).split(inner);
        for ((title, value, role), row) in gauges.into_iter().zip(rows.iter()) {
            let gauge = Gauge::default()
                .block(
                    Block::bordered()
                        .title(title)
                        .title_style(theme.title(false))
                        .border_style(theme.border(false)),
                )
                .gauge_style(theme.style(role))
                .ratio(value)
                .label(format!("{:.1} %", value * 100.0));
            frame.render_widget(gauge, *row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ratios_from_counters() {
        let data = DashboardData {
            total_users: 4,
            pending_requests: 2,
            active_certificates: 3,
            revoked_certificates: 1,
            ..DashboardData::default()
        };
        assert_eq!(
            Ratios::from(&data),
            Ratios {
                active: 0.75,
                revoked: 0.25,
                pending_per_user: 0.5,
            }
        );
    }

    #[test]
    fn empty_counters_give_zero() {
        let ratios = Ratios::from(&DashboardData::default());
        assert_eq!(ratios.active, 0.0);
        assert_eq!(ratios.pending_per_user, 0.0);
    }

    #[test]
    fn ratio_is_capped() {
        let data = DashboardData {
            total_users: 1,
            pending_requests: 5,
            ..DashboardData::default()
        };
        assert_eq!(Ratios::from(&data).pending_per_user, 1.0);
    }
}
