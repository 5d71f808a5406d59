use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Play,
    Complete,
    Skip,
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "complete" => Ok(Self::Complete),
            "skip" => Ok(Self::Skip),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Play => "play",
            Self::Complete => "complete",
            Self::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

/// One analytics event, as reported by a plugin's playback surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_type: EventType,
    pub subject_id: String,
    pub user_or_session_id: String,
    pub duration: Option<f64>,
    pub position: Option<f64>,
    pub genre: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// The completion percentage this event contributes to the running
    /// `avg_completion` average. `complete` always contributes 100;
    /// `skip` contributes the position/duration ratio (0 when duration
    /// is unknown or zero); `play` does not contribute.
    pub fn completion_value(&self) -> Option<f64> {
        match self.event_type {
            EventType::Complete => Some(100.0),
            EventType::Skip => {
                let position = self.position.unwrap_or(0.0);
                let duration = self.duration.unwrap_or(0.0);
                Some(if duration > 0.0 { 100.0 * position / duration } else { 0.0 })
            }
            EventType::Play => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: EventType, position: Option<f64>, duration: Option<f64>) -> AnalyticsEvent {
        AnalyticsEvent {
            event_type,
            subject_id: "T1".to_string(),
            user_or_session_id: "U1".to_string(),
            duration,
            position,
            genre: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn complete_event_contributes_100() {
        let e = event(EventType::Complete, None, None);
        assert_eq!(e.completion_value(), Some(100.0));
    }

    #[test]
    fn skip_event_contributes_position_over_duration_ratio() {
        let e = event(EventType::Skip, Some(30.0), Some(120.0));
        assert_eq!(e.completion_value(), Some(25.0));
    }

    #[test]
    fn skip_event_with_zero_duration_contributes_zero() {
        let e = event(EventType::Skip, Some(30.0), Some(0.0));
        assert_eq!(e.completion_value(), Some(0.0));
    }

    #[test]
    fn play_event_does_not_contribute_to_completion() {
        let e = event(EventType::Play, None, None);
        assert_eq!(e.completion_value(), None);
    }
}
