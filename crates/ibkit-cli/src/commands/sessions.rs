use ibkit_core::{
    format_time_until, is_near_session_boundary, minutes_until_next_boundary,
    next_session_boundary, Session, SessionCalendar, UtcDateTime,
};
use serde_json::{json, Value};

use crate::cli::SessionsArgs;
use crate::error::CliError;

use super::{CommandResult, STATIC_SOURCE};

pub fn run(args: &SessionsArgs) -> Result<CommandResult, CliError> {
    let now = match &args.at {
        Some(at) => UtcDateTime::parse_normalized(at)?,
        None => UtcDateTime::now(),
    };
    let calendar = SessionCalendar::default();

    let sessions: Vec<Value> = Session::ALL
        .into_iter()
        .map(|session| describe(&calendar, session, now, args.threshold_minutes))
        .collect();

    let data = json!({
        "at": now,
        "timezone": calendar.timezone().name(),
        "sessions": sessions,
    });
    Ok(CommandResult::ok(data, STATIC_SOURCE))
}

fn describe(
    calendar: &SessionCalendar,
    session: Session,
    now: UtcDateTime,
    threshold: i64,
) -> Value {
    let local_now = calendar.local(now).naive_local();
    let window = calendar.session_window_at(local_now, session);
    let minutes = minutes_until_next_boundary(calendar, session, now);

    json!({
        "definition": session.definition(),
        "active": calendar.is_in_session(now, session),
        "window": window,
        "next_boundary": next_session_boundary(calendar, session, now),
        "minutes_until_boundary": minutes,
        "countdown": format_time_until(minutes),
        "near_boundary": is_near_session_boundary(calendar, session, now, threshold),
    })
}
