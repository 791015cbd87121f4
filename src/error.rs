use thiserror::Error;

use crate::models::DayOfWeek;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("timeline encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to enumerate universities: {0}")]
    Enumerate(#[source] StoreError),

    #[error("failed to fetch reports for university {university_id}: {source}")]
    FetchReports {
        university_id: i32,
        #[source]
        source: StoreError,
    },

    #[error("failed to upsert {day} timeline for university {university_id}: {source}")]
    Upsert {
        university_id: i32,
        day: DayOfWeek,
        #[source]
        source: StoreError,
    },
}
