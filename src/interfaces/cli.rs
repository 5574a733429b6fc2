use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "league")]
#[command(about = "Command-line admin client for the league backend.")]
#[command(version)]
pub struct Cli {
    /// Ignore cached results and fetch again
    #[arg(short = 'r', long, global = true)]
    pub refresh: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Retry transient failures (network, timeout, server errors)
    #[arg(long, global = true)]
    pub retry: bool,

    /// Override the configured API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List teams
    Teams,
    /// Show one team
    Team { id: u64 },
    /// List players
    Players {
        /// Only players of this team
        #[arg(long)]
        team: Option<u64>,
    },
    /// Show one player
    Player { id: u64 },
    /// List tournaments
    Tournaments,
    /// List matches
    Matches {
        #[arg(long)]
        tournament: Option<u64>,
        #[arg(long)]
        team: Option<u64>,
    },
    /// Show the participants of a match
    Participants { match_id: u64 },
    /// Show the events of a match
    Events { match_id: u64 },
    /// Show a player's achievements
    Achievements { player_id: u64 },
    /// Create a team
    CreateTeam {
        name: String,
        #[arg(long)]
        short_name: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Delete a team
    DeleteTeam { id: u64 },
    /// Create a player
    CreatePlayer {
        first_name: String,
        last_name: String,
        #[arg(long)]
        team: Option<u64>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        jersey: Option<u8>,
    },
    /// Delete a player
    DeletePlayer { id: u64 },
}
