use ibkit_core::levels_to_csv;
use serde_json::json;

use crate::cli::LevelsArgs;
use crate::error::CliError;

use super::{fetch_levels, CommandResult};

pub async fn run(args: &LevelsArgs) -> Result<CommandResult, CliError> {
    let fetched = fetch_levels(&args.selection).await?;
    let errors = fetched.envelope_errors()?;
    let levels = &fetched.response.levels;

    let data = json!({
        "session": fetched.request.session,
        "start": fetched.request.start,
        "end": fetched.request.end,
        "instruments": fetched.request.instruments,
        "levels": levels,
    });

    let mut result = CommandResult::ok(data, fetched.data_source)
        .with_session(fetched.request.session)
        .with_errors(errors)
        .with_latency(fetched.latency_ms)
        .with_cache_hit(fetched.response.cache_hit)
        .with_csv(levels_to_csv(levels)?);
    if levels.is_empty() {
        result = result.with_warning("no session data in the selected range");
    }
    Ok(result)
}
