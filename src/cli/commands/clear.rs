//! Clear command - purge cached content

use crate::app::App;
use crate::cli::args::ClearArgs;
use crate::cli::output;
use crate::config::Config;
use crate::error::{TierError, TierResult};
use serde_json::json;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> TierResult<()> {
    if !args.yes {
        return Err(TierError::User(
            "Refusing to clear the cache without --yes".to_string(),
        ));
    }

    let app = App::from_config(config)?;
    let report = app.resolver.clear_all().await;
    output::step_ok(&format!(
        "Removed {} cached entr{}",
        report.local_removed,
        if report.local_removed == 1 { "y" } else { "ies" }
    ));
    if !report.remote_cleared {
        output::step_warn_hint(
            "Remote cache was not cleared",
            "Check [remote] in the config, then run clear again",
        );
    }

    if args.history {
        if app.sync.clear_history().await {
            output::step_ok("Cleared history");
        } else {
            output::step_ok("Cleared local history");
        }
    }

    app.events
        .log(
            "cache.cleared",
            &json!({
                "local_removed": report.local_removed,
                "remote_cleared": report.remote_cleared,
                "history": args.history,
            }),
        )
        .await;

    Ok(())
}
