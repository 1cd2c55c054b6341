//! History command - activity log and streak

use crate::app::App;
use crate::cli::args::{HistoryAction, HistoryArgs, OutputFormat};
use crate::cli::output;
use crate::config::Config;
use crate::error::TierResult;
use crate::sync::HistoryItem;
use chrono::Utc;

/// Execute the history command
pub async fn execute(args: HistoryArgs, config: &Config) -> TierResult<()> {
    let app = App::from_config(config)?;

    match args.action {
        HistoryAction::List { format } => {
            let history = app.sync.fetch_history().await;
            if history.is_empty() {
                match format {
                    OutputFormat::Json => println!("[]"),
                    OutputFormat::Plain => {}
                    OutputFormat::Table => output::step_info("No history yet"),
                }
                return Ok(());
            }

            match format {
                OutputFormat::Table => print_table(&history),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                OutputFormat::Plain => {
                    for item in &history {
                        println!("{}\t{}", item.timestamp.to_rfc3339(), item.topic);
                    }
                }
            }
        }
        HistoryAction::Streak => {
            let streak = app.sync.calculate_streak(Utc::now().date_naive());
            println!("{}", streak);
        }
    }

    Ok(())
}

fn print_table(history: &[HistoryItem]) {
    output::table_header(
        &format!("{:<17} {:<6} {:<30}", "WHEN", "LEVEL", "TOPIC"),
        55,
    );

    for item in history {
        println!(
            "{:<17} {:<6} {:<30}",
            item.timestamp.format("%Y-%m-%d %H:%M"),
            item.level,
            item.topic
        );
    }

    println!();
    println!("{} item(s)", history.len());
}
