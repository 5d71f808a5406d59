//! The universal job record shared by every plugin runtime.
//!
//! A `Job` is mutated by exactly one worker during its in-flight window
//! (dequeue to terminal write); see `auris-worker` for the loop that
//! enforces this. This module only models the record and its legal
//! transitions, not who is allowed to call them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type JobId = Uuid;

/// Job priority. Lower numeric value sorts first out of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Streaming = 0,
    Normal = 10,
    Low = 20,
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Streaming),
            10 => Some(Self::Normal),
            20 => Some(Self::Low),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming => write!(f, "streaming"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// The capability a job asks the compute back-end to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modality {
    Embedding,
    StemSeparation,
    Enrichment,
    Download,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Embedding => "embedding",
            Self::StemSeparation => "stem-separation",
            Self::Enrichment => "enrichment",
            Self::Download => "download",
        };
        write!(f, "{s}")
    }
}

/// A job's position in the pending → {processing → {completed | failed}, cancelled} DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition per the job DAG.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Completed)
                | (Processing, Failed) | (Processing, Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// The universal job record shared across the store, scheduler, worker and API layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub subject_id: String,
    pub modality: Modality,
    pub input_descriptor: serde_json::Value,
    pub status: JobStatus,
    pub priority: Priority,
    #[serde(default)]
    pub progress: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        subject_id: impl Into<String>,
        modality: Modality,
        input_descriptor: serde_json::Value,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            modality,
            input_descriptor,
            status: JobStatus::Pending,
            priority,
            progress: 0.0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition, validating it against the job DAG.
    /// Returns `false` (and leaves the job untouched) if the transition is illegal.
    #[must_use]
    pub fn transition(&mut self, next: JobStatus, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }

    pub fn mark_completed(&mut self, result: serde_json::Value, now: DateTime<Utc>) -> bool {
        if !self.transition(JobStatus::Completed, now) {
            return false;
        }
        self.result = Some(result);
        self.progress = 1.0;
        true
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.transition(JobStatus::Failed, now) {
            return false;
        }
        self.error = Some(error.into());
        true
    }

    pub fn is_dedup_candidate(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Pending | JobStatus::Processing | JobStatus::Completed
        )
    }

    pub fn to_envelope(&self) -> JobEnvelope {
        JobEnvelope {
            id: self.id,
            subject_id: self.subject_id.clone(),
            status: self.status,
            priority: self.priority.as_i32(),
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// The canonical JSON object returned by the Job API for any job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: JobId,
    pub subject_id: String,
    pub status: JobStatus,
    pub priority: i32,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job::new(
            "T1",
            Modality::Embedding,
            serde_json::json!({"path": "a.flac"}),
            Priority::Normal,
        )
    }

    #[test]
    fn pending_to_processing_is_legal() {
        let mut job = sample_job();
        assert!(job.transition(JobStatus::Processing, Utc::now()));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn terminal_status_never_changes() {
        let mut job = sample_job();
        assert!(job.mark_completed(serde_json::json!({"vector_len": 512}), Utc::now()));
        assert!(!job.transition(JobStatus::Processing, Utc::now()));
        assert!(!job.transition(JobStatus::Failed, Utc::now()));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        let mut job = sample_job();
        assert!(!job.transition(JobStatus::Completed, Utc::now()));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn pending_can_be_cancelled_directly() {
        let mut job = sample_job();
        assert!(job.transition(JobStatus::Cancelled, Utc::now()));
    }

    #[test]
    fn envelope_round_trip() {
        let mut job = sample_job();
        job.transition(JobStatus::Processing, Utc::now());
        job.mark_failed("decode-failed", Utc::now());
        let envelope = job.to_envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: JobEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn priority_ordering_matches_numeric_value() {
        assert!(Priority::Streaming < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
    }

    #[test]
    fn dedup_candidate_excludes_failed_and_cancelled() {
        let mut job = sample_job();
        assert!(job.is_dedup_candidate());
        job.mark_failed("x", Utc::now());
        assert!(!job.is_dedup_candidate());
    }
}
