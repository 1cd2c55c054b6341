//! Stats command - show or update the profile

use crate::app::App;
use crate::cli::args::{OutputFormat, StatsAction, StatsArgs};
use crate::cli::output;
use crate::config::Config;
use crate::error::{TierError, TierResult};
use crate::sync::{ProfileStats, ProfileUpdate};
use console::style;

/// Execute the stats command
pub async fn execute(args: StatsArgs, config: &Config) -> TierResult<()> {
    let app = App::from_config(config)?;

    match args.action {
        None => show(&app, OutputFormat::Table).await,
        Some(StatsAction::Show { format }) => show(&app, format).await,
        Some(StatsAction::Add {
            points,
            credits,
            streak,
            level,
        }) => {
            let current = app.sync.fetch_profile_stats().await;
            let update = ProfileUpdate {
                points: points.map(|n| current.points.saturating_add(n)),
                credits: credits.map(|n| current.credits.saturating_add(n)),
                streak,
                level,
            };
            if update.is_empty() {
                return Err(TierError::User(
                    "Nothing to update. Pass --points, --credits, --streak or --level".to_string(),
                ));
            }

            let stats = app.sync.persist(update);
            app.sync.flush().await;
            output::step_ok(&format!(
                "{} points, {} credits, level {}",
                stats.points, stats.credits, stats.level
            ));
            Ok(())
        }
    }
}

async fn show(app: &App, format: OutputFormat) -> TierResult<()> {
    let stats = app.sync.fetch_profile_stats().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => print_plain(&stats),
        OutputFormat::Table => print_table(&stats),
    }
    Ok(())
}

fn print_plain(stats: &ProfileStats) {
    println!("points={}", stats.points);
    println!("streak={}", stats.streak);
    println!("credits={}", stats.credits);
    println!("level={}", stats.level);
}

fn print_table(stats: &ProfileStats) {
    let last = stats
        .last_activity
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!("{:<15} {}", style("Points").bold(), stats.points);
    println!("{:<15} {}", style("Streak").bold(), stats.streak);
    println!("{:<15} {}", style("Credits").bold(), stats.credits);
    println!("{:<15} {}", style("Level").bold(), stats.level);
    println!("{:<15} {}", style("Last activity").bold(), last);
}
