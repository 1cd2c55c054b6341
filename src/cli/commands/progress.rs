//! Progress command - completed chapters

use crate::app::App;
use crate::cli::args::{OutputFormat, ProgressAction, ProgressArgs};
use crate::cli::output;
use crate::config::Config;
use crate::error::TierResult;

/// Execute the progress command
pub async fn execute(args: ProgressArgs, config: &Config) -> TierResult<()> {
    let app = App::from_config(config)?;

    match args.action {
        ProgressAction::Complete { chapter, points } => {
            let stats = app.sync.complete_turn(&chapter, points).await;
            app.sync.flush().await;
            output::step_ok(&format!(
                "Completed {} (+{} points, {} total)",
                chapter, points, stats.points
            ));
        }
        ProgressAction::List { format } => {
            let chapters = app.sync.fetch_progress().await;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chapters)?),
                OutputFormat::Plain | OutputFormat::Table => {
                    for chapter in &chapters {
                        println!("{}", chapter);
                    }
                }
            }
        }
    }

    Ok(())
}
