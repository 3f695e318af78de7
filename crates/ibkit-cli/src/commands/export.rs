use ibkit_core::{export_filename, levels_to_csv, SessionCalendar, UtcDateTime};
use serde_json::json;
use tracing::info;

use crate::cli::ExportArgs;
use crate::error::CliError;

use super::{fetch_levels, CommandResult};

pub async fn run(args: &ExportArgs) -> Result<CommandResult, CliError> {
    let fetched = fetch_levels(&args.selection).await?;
    let errors = fetched.envelope_errors()?;
    let request = &fetched.request;
    let levels = &fetched.response.levels;

    let base = CommandResult::ok(json!({}), fetched.data_source)
        .with_session(request.session)
        .with_errors(errors)
        .with_latency(fetched.latency_ms)
        .with_cache_hit(fetched.response.cache_hit);

    if levels.is_empty() {
        return Ok(CommandResult {
            data: json!({ "path": null, "rows": 0 }),
            ..base.with_warning("no data to export")
        });
    }

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            let now = SessionCalendar::default()
                .local(UtcDateTime::now())
                .naive_local();
            export_filename(
                &request.instruments,
                request.session,
                request.start,
                request.end,
                now,
            )
            .into()
        }
    };

    let csv = levels_to_csv(levels)?;
    tokio::fs::write(&path, &csv).await?;
    info!(path = %path.display(), rows = levels.len(), "exported trading levels");

    Ok(CommandResult {
        data: json!({
            "path": path.display().to_string(),
            "rows": levels.len(),
        }),
        ..base.with_csv(csv)
    })
}
