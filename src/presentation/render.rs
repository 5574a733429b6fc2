use crate::domain::model::{
    Achievement, Match, MatchEvent, MatchParticipant, MatchStatus, Player, Team, Tournament,
};
use colored::Colorize;
use std::fmt::Write;

fn header(title: &str, count: usize) -> String {
    format!("{} {}\n", title.bright_magenta().bold(), format!("({})", count).dimmed())
}

fn idx(id: u64) -> String {
    format!("#{:<5}", id).bright_white().to_string()
}

pub fn teams(items: &[Team]) -> String {
    let mut output = header("Teams", items.len());
    for team in items {
        let short = team
            .short_name
            .as_deref()
            .map(|s| format!(" [{}]", s))
            .unwrap_or_default();
        let city = team.city.as_deref().unwrap_or("-");
        writeln!(
            output,
            "  {} {}{}  {}",
            idx(team.id),
            team.name.bold(),
            short.cyan(),
            city.dimmed()
        )
        .ok();
    }
    output
}

pub fn team(team: &Team) -> String {
    let mut output = String::new();
    writeln!(output, "{} {}", idx(team.id), team.name.bright_magenta().bold()).ok();
    if let Some(short) = &team.short_name {
        writeln!(output, "  short name: {}", short).ok();
    }
    if let Some(city) = &team.city {
        writeln!(output, "  city:       {}", city).ok();
    }
    if let Some(count) = team.player_count {
        writeln!(output, "  players:    {}", count).ok();
    }
    output
}

pub fn players(items: &[Player]) -> String {
    let mut output = header("Players", items.len());
    for player in items {
        writeln!(output, "  {}", player_line(player)).ok();
    }
    output
}

pub fn player(player: &Player) -> String {
    let mut output = format!("  {}\n", player_line(player));
    if let Some(birth) = player.birth_date {
        writeln!(output, "  born: {}", birth).ok();
    }
    output
}

fn player_line(player: &Player) -> String {
    let number = player
        .jersey_number
        .map(|n| format!("{:>2}", n))
        .unwrap_or_else(|| "--".to_string());
    let position = player.position.as_deref().unwrap_or("-");
    let team = player
        .team_id
        .map(|id| format!("team #{}", id))
        .unwrap_or_else(|| "free agent".to_string());
    format!(
        "{} {} {}  {}  {}",
        idx(player.id),
        number.yellow(),
        player.full_name().bold(),
        position.cyan(),
        team.dimmed()
    )
}

pub fn tournaments(items: &[Tournament]) -> String {
    let mut output = header("Tournaments", items.len());
    for t in items {
        let span = match (t.start_date, t.end_date) {
            (Some(start), Some(end)) => format!("{} → {}", start, end),
            (Some(start), None) => format!("from {}", start),
            _ => "dates tbd".to_string(),
        };
        writeln!(
            output,
            "  {} {}  {}  {}",
            idx(t.id),
            t.name.bold(),
            span.dimmed(),
            format!("{} teams", t.team_ids.len()).cyan()
        )
        .ok();
    }
    output
}

fn status_label(status: MatchStatus) -> String {
    match status {
        MatchStatus::Scheduled => "scheduled".cyan().to_string(),
        MatchStatus::Live => "live".red().bold().to_string(),
        MatchStatus::Finished => "finished".green().to_string(),
        MatchStatus::Cancelled => "cancelled".dimmed().to_string(),
        MatchStatus::Unknown => "unknown".dimmed().to_string(),
    }
}

pub fn matches(items: &[Match]) -> String {
    let mut output = header("Matches", items.len());
    for m in items {
        let score = match (m.home_score, m.away_score) {
            (Some(h), Some(a)) => format!("{}:{}", h, a),
            _ => "-:-".to_string(),
        };
        let when = m
            .scheduled_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "tbd".to_string());
        writeln!(
            output,
            "  {} team #{} vs team #{}  {}  {}  {}",
            idx(m.id),
            m.home_team_id,
            m.away_team_id,
            score.bold(),
            when.dimmed(),
            status_label(m.status)
        )
        .ok();
    }
    output
}

pub fn participants(items: &[MatchParticipant]) -> String {
    let mut output = header("Participants", items.len());
    for p in items {
        let role = if p.starter { "starter" } else { "bench" };
        let minutes = p
            .minutes_played
            .map(|m| format!("{}'", m))
            .unwrap_or_default();
        writeln!(
            output,
            "  player #{}  team #{}  {}  {}",
            p.player_id,
            p.team_id,
            role.cyan(),
            minutes.dimmed()
        )
        .ok();
    }
    output
}

pub fn events(items: &[MatchEvent]) -> String {
    let mut output = header("Match events", items.len());
    for e in items {
        let player = e
            .player_id
            .map(|id| format!("player #{}", id))
            .unwrap_or_default();
        writeln!(
            output,
            "  {:>3}'  {}  {}",
            e.minute,
            format!("{:?}", e.kind).yellow(),
            player
        )
        .ok();
    }
    output
}

pub fn achievements(items: &[Achievement]) -> String {
    let mut output = header("Achievements", items.len());
    for a in items {
        let when = a.awarded_at.map(|d| d.to_string()).unwrap_or_default();
        writeln!(output, "  {} {}  {}", idx(a.id), a.title.bold(), when.dimmed()).ok();
    }
    output
}
