//! Full prediction refresh: enumerate universities, fetch each one's trailing
//! window of reports, build weekday timelines and upsert them.
//!
//! Universities are processed one after another and each is isolated: a read
//! failure for one university, or a write failure for one weekday, is recorded
//! in the [`RefreshResult`] and the run moves on.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::Instrument;
use uuid::Uuid;

use crate::bucket::group_reports;
use crate::error::{RefreshError, StoreError};
use crate::forecast::build_timeline;
use crate::models::{
    DayFailure, DayOfWeek, FailedUniversity, RefreshResult, StatusReport, Timeline,
    UniversityOutcome,
};

pub const DEFAULT_WINDOW_WEEKS: i64 = 4;
const MAX_WINDOW_WEEKS: i64 = 520;

/// Read side: where status reports come from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Distinct universities with any report history.
    async fn list_universities(&self) -> Result<Vec<i32>, StoreError>;

    /// Reports for one university created at or after `since`, in scan order.
    async fn fetch_reports(
        &self,
        university_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusReport>, StoreError>;
}

/// Write side: where weekday timelines are upserted.
#[async_trait]
pub trait PredictionSink: Send + Sync {
    /// Atomic upsert keyed by `(university_id, day)`.
    async fn upsert_timeline(&self, timeline: &Timeline) -> Result<(), StoreError>;
}

pub fn window_start(now: DateTime<Utc>, window_weeks: i64) -> DateTime<Utc> {
    now - Duration::weeks(window_weeks.clamp(1, MAX_WINDOW_WEEKS))
}

/// Runs the refresh over every known university. Never returns an error:
/// failures end up in the result instead.
pub async fn run_refresh<S, P>(
    source: &S,
    sink: &P,
    window_weeks: i64,
    now: DateTime<Utc>,
) -> RefreshResult
where
    S: ReportSource + ?Sized,
    P: PredictionSink + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("refresh", %run_id);

    async move {
        let universities = match source.list_universities().await {
            Ok(ids) => ids,
            Err(err) => {
                let err = RefreshError::Enumerate(err);
                tracing::error!(error = %err, "refresh aborted");
                return RefreshResult::Error {
                    message: err.to_string(),
                };
            }
        };

        tracing::info!(universities = universities.len(), "starting prediction refresh");

        let since = window_start(now, window_weeks);
        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let mut outcomes = Vec::with_capacity(universities.len());

        for university_id in universities {
            let outcome = match refresh_university(source, sink, university_id, since, now).await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(university_id, error = %err, "university refresh failed");
                    UniversityOutcome::Failed {
                        university_id,
                        reason: err.to_string(),
                    }
                }
            };

            match &outcome {
                UniversityOutcome::Updated {
                    days_written,
                    days_failed,
                    ..
                } => {
                    if !days_written.is_empty() {
                        processed.push(format!("University {university_id} updated."));
                    }
                    failed.extend(days_failed.iter().map(|failure| FailedUniversity {
                        university_id,
                        reason: format!("{}: {}", failure.day, failure.reason),
                    }));
                }
                UniversityOutcome::Skipped { .. } => skipped.push(university_id),
                UniversityOutcome::Failed { reason, .. } => failed.push(FailedUniversity {
                    university_id,
                    reason: reason.clone(),
                }),
            }
            outcomes.push(outcome);
        }

        tracing::info!(
            processed = processed.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            "prediction refresh finished"
        );

        RefreshResult::Success {
            processed,
            skipped,
            failed,
            outcomes,
        }
    }
    .instrument(span)
    .await
}

/// Refreshes one university. Only the report fetch can fail the whole
/// university; weekday write failures are collected in the outcome.
async fn refresh_university<S, P>(
    source: &S,
    sink: &P,
    university_id: i32,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<UniversityOutcome, RefreshError>
where
    S: ReportSource + ?Sized,
    P: PredictionSink + ?Sized,
{
    let reports = source
        .fetch_reports(university_id, since)
        .await
        .map_err(|source| RefreshError::FetchReports {
            university_id,
            source,
        })?;

    if reports.is_empty() {
        tracing::debug!(university_id, "no reports in window");
        return Ok(UniversityOutcome::Skipped { university_id });
    }

    let groups = group_reports(&reports);
    let mut days_written: Vec<DayOfWeek> = Vec::new();
    let mut days_failed: Vec<DayFailure> = Vec::new();

    for day in DayOfWeek::WORKDAYS {
        let Some(timeline) = build_timeline(university_id, day, &groups, now) else {
            continue;
        };

        match sink.upsert_timeline(&timeline).await {
            Ok(()) => {
                tracing::debug!(
                    university_id,
                    %day,
                    slots = timeline.slots.len(),
                    reports = timeline.slots.iter().map(|slot| slot.report_count).sum::<usize>(),
                    "timeline upserted"
                );
                days_written.push(day);
            }
            Err(source) => {
                let err = RefreshError::Upsert {
                    university_id,
                    day,
                    source,
                };
                tracing::warn!(error = %err, "timeline upsert failed");
                days_failed.push(DayFailure {
                    day,
                    reason: err.to_string(),
                });
            }
        }
    }

    if days_written.is_empty() && days_failed.is_empty() {
        tracing::debug!(
            university_id,
            reports = reports.len(),
            "no weekday reports inside operating hours"
        );
        return Ok(UniversityOutcome::Skipped { university_id });
    }

    tracing::info!(
        university_id,
        reports = reports.len(),
        days = days_written.len(),
        "university refreshed"
    );

    Ok(UniversityOutcome::Updated {
        university_id,
        days_written,
        days_failed,
    })
}
