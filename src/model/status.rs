//! Commit processing status and its state machine
//!
//! Statuses form an ordered scale used for "weakest status wins"
//! aggregation, plus two side values (`Missing`, `NotFound`) that sit
//! outside the scale. Transitions are driven by [`Event`]s through a
//! static table; anything not in the table is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotSeen,
    Fetched,
    Untranslated,
    Pending,
    Pulling,
    Pulled,
    Translated,
    Missing,
    NotFound,
}

/// Status after which the pipeline has nothing left to do
pub const FINISHED_STATUS: Status = Status::Translated;

impl Status {
    pub const ALL: [Status; 9] = [
        Status::NotSeen,
        Status::Fetched,
        Status::Untranslated,
        Status::Pending,
        Status::Pulling,
        Status::Pulled,
        Status::Translated,
        Status::Missing,
        Status::NotFound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotSeen => "NOT_SEEN",
            Status::Fetched => "FETCHED",
            Status::Untranslated => "UNTRANSLATED",
            Status::Pending => "PENDING",
            Status::Pulling => "PULLING",
            Status::Pulled => "PULLED",
            Status::Translated => "TRANSLATED",
            Status::Missing => "MISSING",
            Status::NotFound => "NOT_FOUND",
        }
    }

    /// Position on the ordered scale, `None` for side values
    pub fn rank(self) -> Option<u8> {
        match self {
            Status::NotSeen => Some(0),
            Status::Fetched => Some(1),
            Status::Untranslated => Some(2),
            Status::Pending => Some(3),
            Status::Pulling => Some(4),
            Status::Pulled => Some(5),
            Status::Translated => Some(6),
            Status::Missing | Status::NotFound => None,
        }
    }

    /// No stage will ever move a record out of a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Translated | Status::Missing)
    }

    /// Weakest ordered status among `statuses`; side values are ignored
    pub fn weakest(statuses: impl IntoIterator<Item = Status>) -> Option<Status> {
        statuses
            .into_iter()
            .filter_map(|s| s.rank().map(|r| (r, s)))
            .min_by_key(|(r, _)| *r)
            .map(|(_, s)| s)
    }

    /// Apply `event`, returning the destination status
    pub fn next(self, event: Event) -> Result<Status, TransitionError> {
        TRANSITIONS
            .iter()
            .find(|(source, e, _)| *e == event && source.admits(self))
            .map(|(_, _, to)| *to)
            .ok_or(TransitionError { from: self, event })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown commit status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Fetch,
    Extract,
    Push,
    /// Partial pull: translations are still outstanding
    Pull,
    /// Pull of a commit that has no phrases at all
    Translate,
    /// Pull found the commit fully translated
    Complete,
    Finalize,
    /// The commit object can no longer be resolved
    Missing,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Event::Fetch => "fetch",
            Event::Extract => "extract",
            Event::Push => "push",
            Event::Pull => "pull",
            Event::Translate => "translate",
            Event::Complete => "complete",
            Event::Finalize => "finalize",
            Event::Missing => "missing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("cannot {event} a commit in status {from}")]
pub struct TransitionError {
    pub from: Status,
    pub event: Event,
}

#[derive(Debug, Copy, Clone)]
enum Source {
    Is(Status),
    /// Every status except `Missing`
    Live,
    Any,
}

impl Source {
    fn admits(self, status: Status) -> bool {
        match self {
            Source::Is(s) => s == status,
            Source::Live => status != Status::Missing,
            Source::Any => true,
        }
    }
}

const TRANSITIONS: &[(Source, Event, Status)] = &[
    (Source::Is(Status::NotSeen), Event::Fetch, Status::Fetched),
    (Source::Is(Status::NotFound), Event::Fetch, Status::Fetched),
    (Source::Is(Status::Fetched), Event::Extract, Status::Untranslated),
    (Source::Is(Status::Untranslated), Event::Push, Status::Pending),
    (Source::Is(Status::Pending), Event::Pull, Status::Pulling),
    (Source::Is(Status::Pulling), Event::Pull, Status::Pulling),
    (Source::Is(Status::Pulling), Event::Complete, Status::Pulled),
    (Source::Is(Status::Translated), Event::Complete, Status::Translated),
    (Source::Is(Status::Pulled), Event::Finalize, Status::Translated),
    (Source::Live, Event::Translate, Status::Translated),
    (Source::Any, Event::Missing, Status::Missing),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = Status::NotSeen
            .next(Event::Fetch)
            .and_then(|s| s.next(Event::Extract))
            .and_then(|s| s.next(Event::Push))
            .and_then(|s| s.next(Event::Pull))
            .and_then(|s| s.next(Event::Complete))
            .and_then(|s| s.next(Event::Finalize))
            .unwrap();
        assert_eq!(status, FINISHED_STATUS);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let err = Status::NotSeen.next(Event::Push).unwrap_err();
        assert_eq!(err.from, Status::NotSeen);
        assert_eq!(err.event, Event::Push);
        assert_eq!(err.to_string(), "cannot push a commit in status NOT_SEEN");
    }

    #[test]
    fn test_complete_is_idempotent_when_translated() {
        assert_eq!(Status::Translated.next(Event::Complete).unwrap(), Status::Translated);
        assert!(Status::Pending.next(Event::Complete).is_err());
    }

    #[test]
    fn test_missing_from_anywhere() {
        for status in Status::ALL {
            assert_eq!(status.next(Event::Missing).unwrap(), Status::Missing);
        }
    }

    #[test]
    fn test_translate_from_any_live_status() {
        for status in Status::ALL {
            let result = status.next(Event::Translate);
            if status == Status::Missing {
                assert!(result.is_err());
            } else {
                assert_eq!(result.unwrap(), Status::Translated);
            }
        }
    }

    #[test]
    fn test_not_found_can_be_fetched() {
        assert_eq!(Status::NotFound.next(Event::Fetch).unwrap(), Status::Fetched);
    }

    #[test]
    fn test_weakest_ignores_side_values() {
        let weakest = Status::weakest([Status::Translated, Status::Missing, Status::Pending]);
        assert_eq!(weakest, Some(Status::Pending));
        assert_eq!(Status::weakest([Status::NotFound]), None);
        assert_eq!(Status::weakest([]), None);
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("EXTRACTED".parse::<Status>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = Status::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Status::Translated, Status::Missing]);
    }
}
