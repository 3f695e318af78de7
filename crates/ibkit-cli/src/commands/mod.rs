mod export;
mod instruments;
mod levels;
mod sessions;

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use ibkit_core::{
    BarSource, CsvDirectorySource, Envelope, EnvelopeError, EnvelopeMeta, InstrumentFailure,
    InstrumentSymbol, KeyValueStore, LevelService, LevelsRequest, LevelsResponse, MemoryStore,
    SampleSource, ServiceConfig, Session, UtcDateTime, ValidationError, SCHEMA_VERSION,
};
use serde_json::Value;

use crate::cli::{Cli, Command, SelectionArgs};
use crate::error::CliError;
use crate::metadata::RequestId;

/// Data source label for commands that read no bars.
const STATIC_SOURCE: &str = "static";

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub data_source: &'static str,
    pub session: Option<Session>,
    pub csv: Option<String>,
}

impl CommandResult {
    pub fn ok(data: Value, data_source: &'static str) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            data_source,
            session: None,
            csv: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_csv(mut self, csv: String) -> Self {
        self.csv = Some(csv);
        self
    }
}

/// Envelope plus the CSV rendering for commands that produce levels.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub csv: Option<String>,
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let command_result = match &cli.command {
        Command::Levels(args) => levels::run(args).await?,
        Command::Export(args) => export::run(args).await?,
        Command::Sessions(args) => sessions::run(args)?,
        Command::Instruments => instruments::run()?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        data_source,
        session,
        csv,
    } = command_result;

    let mut meta = EnvelopeMeta::new(
        RequestId::new_v4().to_string(),
        SCHEMA_VERSION,
        data_source,
        latency_ms,
        cache_hit,
    )?;
    if let Some(session) = session {
        meta = meta.with_session(session);
    }
    for warning in warnings {
        meta.push_warning(warning);
    }

    let envelope = Envelope::with_errors(meta, data, errors)?;
    Ok(CommandOutput { envelope, csv })
}

/// Levels fetched for a selection, with the timing needed for metadata.
pub struct FetchedLevels {
    pub request: LevelsRequest,
    pub response: LevelsResponse,
    pub data_source: &'static str,
    pub latency_ms: u64,
}

impl FetchedLevels {
    pub fn envelope_errors(&self) -> Result<Vec<EnvelopeError>, CliError> {
        self.response
            .failures
            .iter()
            .map(failure_to_error)
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(CliError::from)
    }
}

/// Build a one-shot service over a fresh [`MemoryStore`] and run the
/// selection through it. Cache and rate-limit state end with the process.
pub async fn fetch_levels(selection: &SelectionArgs) -> Result<FetchedLevels, CliError> {
    let started = Instant::now();
    let request = parse_selection(selection)?;
    let config = ServiceConfig::from_env();

    let source: Arc<dyn BarSource> = match &selection.data_dir {
        Some(dir) => Arc::new(CsvDirectorySource::new(dir.clone())),
        None => Arc::new(SampleSource::default()),
    };
    let data_source = source.name();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(config.cache_ttl));
    let service = LevelService::new(source, store, config).with_rate_limit();

    let response = service
        .levels(&selection.client_id, &request, UtcDateTime::now())
        .await?;

    Ok(FetchedLevels {
        request,
        response,
        data_source,
        latency_ms: elapsed_ms(started),
    })
}

fn parse_selection(selection: &SelectionArgs) -> Result<LevelsRequest, CliError> {
    let instruments = InstrumentSymbol::parse_list(&selection.instruments)?;
    let start = parse_date(&selection.start)?;
    let end = parse_date(&selection.end)?;
    let session: Session = selection.session.parse()?;
    Ok(LevelsRequest::new(instruments, start, end, session)?)
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: value.to_owned(),
    })
}

fn failure_to_error(failure: &InstrumentFailure) -> Result<EnvelopeError, ValidationError> {
    Ok(EnvelopeError::new(failure.code.clone(), failure.message.clone())?
        .with_retryable(failure.retryable)
        .with_instrument(failure.instrument.clone()))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
