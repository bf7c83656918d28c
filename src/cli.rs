use std::path::PathBuf;

use cafe_client::models::EventType;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cafe-console")]
#[command(author, version, about = "Cafe loyalty console: menu, promotions, purchases, events admin and AI", long_about = None)]
pub struct Cli {
    /// Message language ("ru" or "en"); overrides APP_LANG
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Telegram Mini-App initData to run as a verified Telegram user
    #[arg(long, global = true, env = "TELEGRAM_INIT_DATA")]
    pub init_data: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the menu of a branch
    Menu {
        /// Branch identifier
        branch: String,
    },

    /// Manage scheduled events (requires ADMIN_TOKEN)
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },

    /// Show highlighted and upcoming events
    Promotions,

    /// Show purchase history of the signed-in customer
    Purchases {
        /// Customer bearer token; falls back to AUTH_TOKEN
        #[arg(long)]
        token: Option<String>,
    },

    /// Ask the AI assistant (requires GEMINI_API_KEY)
    Ai {
        #[command(subcommand)]
        command: AiCommand,
    },

    /// Show the Telegram user behind --init-data
    Whoami,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    /// List events
    List {
        /// Only events of this type
        #[arg(long = "type")]
        event_type: Option<EventType>,

        /// Only events with this month code (e.g. ДЕК)
        #[arg(long)]
        month: Option<String>,
    },

    /// Create an event
    Create {
        #[command(flatten)]
        fields: EventFields,
    },

    /// Edit an event; omitted fields keep their current values
    Edit {
        id: String,

        #[command(flatten)]
        fields: EventFields,
    },

    /// Delete an event
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct EventFields {
    /// Date as dd/mm/yyyy
    #[arg(long)]
    pub date: Option<String>,

    /// Month code; derived from the date when omitted
    #[arg(long)]
    pub month: Option<String>,

    #[arg(long)]
    pub performer: Option<String>,

    /// Time as HH:MM
    #[arg(long)]
    pub time: Option<String>,

    #[arg(long = "type")]
    pub event_type: Option<EventType>,

    /// Label for custom events
    #[arg(long)]
    pub custom_type: Option<String>,

    #[arg(long)]
    pub highlighted: Option<bool>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub active: Option<bool>,

    #[arg(long)]
    pub order: Option<i32>,

    /// Poster image file
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum AiCommand {
    /// Free-form question
    Ask {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Suggest menu items for the given preferences
    Suggest {
        #[arg(long)]
        branch: String,

        #[arg(required = true, num_args = 1..)]
        preferences: Vec<String>,
    },

    /// Write a description or a promo post for a published event
    Describe {
        event_id: String,

        /// Promotional post instead of a description
        #[arg(long)]
        promo: bool,
    },

    /// Pick a loyalty reward for a points balance
    Reward {
        #[arg(long)]
        points: i64,

        /// Reward as NAME=COST, repeatable
        #[arg(long = "option", value_parser = parse_reward, required = true)]
        options: Vec<(String, i64)>,
    },

    /// Interactive chat; empty line or Ctrl-D ends it
    Chat {
        /// Resume a session id instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
}

fn parse_reward(raw: &str) -> Result<(String, i64), String> {
    let (name, cost) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=COST, got {raw:?}"))?;
    let cost = cost
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid cost in {raw:?}: {e}"))?;
    Ok((name.trim().to_string(), cost))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_create() {
        let cli = Cli::try_parse_from([
            "cafe-console",
            "events",
            "create",
            "--date",
            "15/12/2024",
            "--performer",
            "Jazz Trio",
            "--time",
            "19:30",
            "--type",
            "live-music",
        ])
        .unwrap();

        let Commands::Events {
            command: EventsCommand::Create { fields },
        } = cli.command
        else {
            panic!("expected events create");
        };
        assert_eq!(fields.event_type, Some(EventType::LiveMusic));
        assert_eq!(fields.date.as_deref(), Some("15/12/2024"));
    }

    #[test]
    fn parses_reward_options() {
        assert_eq!(parse_reward("Free espresso=100").unwrap(), ("Free espresso".to_string(), 100));
        assert!(parse_reward("Free espresso").is_err());
        assert!(Cli::try_parse_from(["cafe-console", "events", "list", "--type", "rave"]).is_err());
    }
}
