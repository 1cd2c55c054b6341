//! Vocab command - manage the vocabulary vault

use crate::app::App;
use crate::cli::args::{OutputFormat, VocabAction, VocabArgs};
use crate::cli::output;
use crate::config::Config;
use crate::error::{TierError, TierResult};
use crate::sync::{Mastery, VocabItem};
use console::style;

/// Execute the vocab command
pub async fn execute(args: VocabArgs, config: &Config) -> TierResult<()> {
    let app = App::from_config(config)?;

    match args.action {
        VocabAction::Add {
            term,
            translation,
            kind,
        } => {
            let saved = app.sync.save_vocab(VocabItem::new(term, translation, kind));
            app.sync.flush().await;
            output::step_ok(&format!(
                "Saved {} ({}, {} saves)",
                saved.term, saved.mastery, saved.sync_count
            ));
        }
        VocabAction::Master { term, level } => {
            let Some(updated) = app.sync.update_vocab_mastery(&term, level.into()) else {
                return Err(TierError::User(format!("{} is not in the vault", term)));
            };
            app.sync.flush().await;
            output::step_ok(&format!("{} is now {}", updated.term, updated.mastery));
        }
        VocabAction::List { format } => {
            let vault = app.sync.fetch_vocab().await;
            if vault.is_empty() {
                match format {
                    OutputFormat::Json => println!("[]"),
                    OutputFormat::Plain => {}
                    OutputFormat::Table => output::step_info("The vault is empty"),
                }
                return Ok(());
            }

            match format {
                OutputFormat::Table => print_table(&vault),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&vault)?),
                OutputFormat::Plain => {
                    for item in &vault {
                        println!("{}\t{}", item.term, item.translation);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_table(vault: &[VocabItem]) {
    output::table_header(
        &format!(
            "{:<20} {:<20} {:<10} {:<10} {:>5}",
            "TERM", "TRANSLATION", "KIND", "MASTERY", "SAVES"
        ),
        69,
    );

    for item in vault {
        let mastery = match item.mastery {
            Mastery::New => style("new").cyan(),
            Mastery::Learning => style("learning").yellow(),
            Mastery::Mastered => style("mastered").green(),
            Mastery::Critical => style("critical").red(),
        };
        println!(
            "{:<20} {:<20} {:<10} {:<10} {:>5}",
            item.term, item.translation, item.kind, mastery, item.sync_count
        );
    }

    println!();
    println!("{} term(s)", vault.len());
}
