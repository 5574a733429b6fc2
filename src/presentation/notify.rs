// User-facing notifications for finished actions
use crate::domain::app_error::AppError;
use colored::Colorize;
use serde_json::Value;

pub fn success(message: &str, enable_emoji: bool) -> String {
    let mark = if enable_emoji { "✔" } else { "[ok]" };
    format!("{} {}", mark.green().bold(), message)
}

pub fn failure(error: &AppError, enable_emoji: bool) -> String {
    let mark = if enable_emoji { "✘" } else { "[error]" };
    let mut line = format!(
        "{} {} {}",
        mark.red().bold(),
        format!("[{}]", error.code).red(),
        error.message
    );

    if let Some(status) = error.status_code {
        line.push_str(&format!(" (HTTP {})", status).dimmed().to_string());
    }
    if let Some(field) = &error.field {
        line.push_str(&format!("\n  field: {}", field.yellow()));
    }
    if let Some(Value::Object(details)) = &error.details {
        for (field, message) in details {
            let text = match message {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            line.push_str(&format!("\n  - {}: {}", field.yellow(), text));
        }
    }
    if error.is_retryable() {
        line.push_str(&format!("\n  {}", "retry with --retry".dimmed()));
    }

    line
}
