use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Evening hour from which a midnight-wrapping session is attributed to the next day.
const EVENING_START_HOUR: u32 = 18;

/// One of the three recurring daily trading sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Session {
    Asia,
    London,
    NewYork,
}

impl Session {
    pub const ALL: [Self; 3] = [Self::Asia, Self::London, Self::NewYork];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asia => "Asia",
            Self::London => "London",
            Self::NewYork => "NewYork",
        }
    }

    /// Wall-clock boundaries in the reference timezone (US Eastern).
    pub const fn definition(self) -> SessionDefinition {
        match self {
            Self::Asia => SessionDefinition {
                session: Self::Asia,
                name: "Asia Session",
                start_hour: 18,
                start_minute: 0,
                end_hour: 3,
                end_minute: 0,
            },
            Self::London => SessionDefinition {
                session: Self::London,
                name: "London Session",
                start_hour: 4,
                start_minute: 0,
                end_hour: 11,
                end_minute: 30,
            },
            Self::NewYork => SessionDefinition {
                session: Self::NewYork,
                name: "New York Session",
                start_hour: 9,
                start_minute: 30,
                end_hour: 16,
                end_minute: 0,
            },
        }
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Session {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asia" => Ok(Self::Asia),
            "london" => Ok(Self::London),
            "newyork" | "new-york" | "new_york" | "ny" => Ok(Self::NewYork),
            other => Err(ValidationError::InvalidSession {
                value: other.to_owned(),
            }),
        }
    }
}

/// Start/end time-of-day of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionDefinition {
    pub session: Session,
    pub name: &'static str,
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

impl SessionDefinition {
    pub const fn start_minutes(&self) -> u32 {
        self.start_hour * 60 + self.start_minute
    }

    pub const fn end_minutes(&self) -> u32 {
        self.end_hour * 60 + self.end_minute
    }

    pub fn start_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn end_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.end_hour, self.end_minute, 0).unwrap_or(NaiveTime::MIN)
    }

    /// The window ends on the calendar day after it starts.
    pub const fn wraps_midnight(&self) -> bool {
        self.start_minutes() > self.end_minutes()
    }

    /// An overnight session opening in the evening, which a morning query attributes
    /// to the previous calendar day.
    pub const fn starts_previous_evening(&self) -> bool {
        self.wraps_midnight() && self.start_hour >= EVENING_START_HOUR
    }

    pub const fn duration_minutes(&self) -> u32 {
        if self.wraps_midnight() {
            24 * 60 - self.start_minutes() + self.end_minutes()
        } else {
            self.end_minutes() - self.start_minutes()
        }
    }

    /// Whether a minute-of-day falls inside the window, including the wraparound case.
    pub const fn contains_minute_of_day(&self, minute_of_day: u32) -> bool {
        if self.wraps_midnight() {
            minute_of_day >= self.start_minutes() || minute_of_day < self.end_minutes()
        } else {
            minute_of_day >= self.start_minutes() && minute_of_day < self.end_minutes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_aliases() {
        assert_eq!(Session::from_str("new-york").expect("parse"), Session::NewYork);
        assert_eq!(Session::from_str("NY").expect("parse"), Session::NewYork);
        assert_eq!(Session::from_str(" Asia ").expect("parse"), Session::Asia);
        assert!(matches!(
            Session::from_str("tokyo"),
            Err(ValidationError::InvalidSession { .. })
        ));
    }

    #[test]
    fn only_asia_wraps_midnight() {
        let wrapping: Vec<Session> = Session::ALL
            .into_iter()
            .filter(|session| session.definition().wraps_midnight())
            .collect();
        assert_eq!(wrapping, vec![Session::Asia]);
        assert!(Session::Asia.definition().starts_previous_evening());
    }

    #[test]
    fn durations_account_for_wraparound() {
        assert_eq!(Session::Asia.definition().duration_minutes(), 9 * 60);
        assert_eq!(Session::London.definition().duration_minutes(), 7 * 60 + 30);
        assert_eq!(Session::NewYork.definition().duration_minutes(), 6 * 60 + 30);
    }

    #[test]
    fn wraparound_membership() {
        let asia = Session::Asia.definition();
        assert!(asia.contains_minute_of_day(23 * 60));
        assert!(asia.contains_minute_of_day(2 * 60 + 59));
        assert!(!asia.contains_minute_of_day(3 * 60));
        assert!(!asia.contains_minute_of_day(12 * 60));
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_string(&Session::NewYork).expect("serialize");
        assert_eq!(json, "\"NewYork\"");
    }
}
