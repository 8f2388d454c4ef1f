use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "portal", version, about = "PKI Souverain terminal portal")]
pub struct Cli {
    /// Backend base URL, overrides the configuration files
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the interactive portal
    Run {
        /// Path to open first, e.g. `/validate-token?requestId=42&token=abc`
        #[arg(long, default_value = "/")]
        route: String,
    },
    /// Print the signed-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Forget the persisted session
    Logout,
}

impl Cli {
    /// The command to run; the TUI at `/` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run { route: "/".into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_to_tui_at_root() {
        let cli = Cli::try_parse_from(["portal"]).unwrap();
        assert_eq!(cli.command(), Command::Run { route: "/".into() });
        assert!(!cli.ephemeral);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "portal",
            "whoami",
            "--json",
            "--api-url",
            "https://pki.gov.cm/api",
            "--ephemeral",
        ])
        .unwrap();
        assert_eq!(cli.command(), Command::Whoami { json: true });
        assert_eq!(cli.api_url.as_deref(), Some("https://pki.gov.cm/api"));
        assert!(cli.ephemeral);
    }

    #[test]
    fn run_takes_a_start_route() {
        let cli = Cli::try_parse_from(["portal", "run", "--route", "/reset-password?token=t"])
            .unwrap();
        assert_eq!(
            cli.command(),
            Command::Run {
                route: "/reset-password?token=t".into()
            }
        );
    }
}
