use ibkit_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::CommandOutput;
use crate::error::CliError;

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.envelope)?
            } else {
                serde_json::to_string(&output.envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(&output.envelope)?,
        OutputFormat::Csv => match &output.csv {
            Some(csv) => {
                if !csv.is_empty() {
                    println!("{csv}");
                }
            }
            None => {
                return Err(CliError::Command(String::from(
                    "csv output is only available for levels and export",
                )))
            }
        },
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("data_source : {}", envelope.meta.data_source);
    if let Some(session) = envelope.meta.session {
        println!("session     : {session}");
    }
    println!("latency_ms  : {}", envelope.meta.latency_ms);
    println!("cache_hit   : {}", envelope.meta.cache_hit);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match envelope.data.get("levels").and_then(Value::as_array) {
        Some(levels) => render_levels(levels),
        None => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            match &error.instrument {
                Some(instrument) => println!("  - {instrument} {}: {}", error.code, error.message),
                None => println!("  - {}: {}", error.code, error.message),
            }
        }
    }

    Ok(())
}

fn render_levels(levels: &[Value]) {
    println!(
        "{:<10}  {:<10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>8}  {:>8}",
        "date", "instrument", "open", "close", "high", "low", "ib_1h", "ib_15m"
    );
    for level in levels {
        let number = |key: &str| level.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let text = |key: &str| level.get(key).and_then(Value::as_str).unwrap_or("-").to_owned();
        let ib = |key: &str| {
            level
                .pointer(&format!("/initial_balance/{key}"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
        };
        println!(
            "{:<10}  {:<10}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>8.2}  {:>8.2}",
            text("date"),
            text("instrument"),
            number("open"),
            number("close"),
            number("high"),
            number("low"),
            ib("ib_1h_range"),
            ib("ib_15m_range"),
        );
    }
}
