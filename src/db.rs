use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::config::DbConfig;
use crate::error::StoreError;
use crate::models::{Category, DayOfWeek, StatusReport, StoredPrediction, Timeline, TimelineEntry};
use crate::refresh::{PredictionSink, ReportSource};

pub async fn connect(config: &DbConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed report source and prediction sink.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportSource for PgStore {
    async fn list_universities(&self) -> Result<Vec<i32>, StoreError> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"SELECT DISTINCT "universityId" FROM campus_status_message ORDER BY "universityId""#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn fetch_reports(
        &self,
        university_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusReport>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT content, category, "createdAt"
            FROM campus_status_message
            WHERE "universityId" = $1
              AND "createdAt" >= $2
            ORDER BY "createdAt", id
            "#,
        )
        .bind(university_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(StatusReport {
                content: row.try_get("content")?,
                category: Category::from(row.try_get::<String, _>("category")?),
                created_at: row.try_get("createdAt")?,
            });
        }

        Ok(reports)
    }
}

#[async_trait]
impl PredictionSink for PgStore {
    async fn upsert_timeline(&self, timeline: &Timeline) -> Result<(), StoreError> {
        let entries = serde_json::to_value(timeline.entries())?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO campus_prediction ("universityId", "dayOfWeek", timeline, "updatedAt")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("universityId", "dayOfWeek") DO UPDATE
            SET timeline = EXCLUDED.timeline, "updatedAt" = EXCLUDED."updatedAt"
            "#,
        )
        .bind(timeline.university_id)
        .bind(timeline.day.code())
        .bind(entries)
        .bind(timeline.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

pub async fn fetch_prediction(
    pool: &PgPool,
    university_id: i32,
    day: DayOfWeek,
) -> anyhow::Result<Option<StoredPrediction>> {
    let row = sqlx::query(
        r#"
        SELECT timeline, "updatedAt"
        FROM campus_prediction
        WHERE "universityId" = $1 AND "dayOfWeek" = $2
        "#,
    )
    .bind(university_id)
    .bind(day.code())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let Json(timeline): Json<Vec<TimelineEntry>> = row.try_get("timeline")?;
    Ok(Some(StoredPrediction {
        day,
        timeline,
        updated_at: row.try_get("updatedAt")?,
    }))
}

/// All stored weekday predictions for a university, Monday first.
pub async fn fetch_predictions(
    pool: &PgPool,
    university_id: i32,
) -> anyhow::Result<Vec<StoredPrediction>> {
    let rows = sqlx::query(
        r#"
        SELECT "dayOfWeek", timeline, "updatedAt"
        FROM campus_prediction
        WHERE "universityId" = $1
        "#,
    )
    .bind(university_id)
    .fetch_all(pool)
    .await?;

    let mut predictions = Vec::with_capacity(rows.len());
    for row in rows {
        let day_code: String = row.try_get("dayOfWeek")?;
        let day = day_code
            .parse::<DayOfWeek>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("unexpected dayOfWeek for university {university_id}"))?;
        let Json(timeline): Json<Vec<TimelineEntry>> = row.try_get("timeline")?;
        predictions.push(StoredPrediction {
            day,
            timeline,
            updated_at: row.try_get("updatedAt")?,
        });
    }

    predictions.sort_by_key(|prediction| prediction.day);
    Ok(predictions)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    // (university, content, category, minutes before now)
    let reports: Vec<(i32, &str, &str, i64)> = vec![
        (1, "Shuttle line reaches the main gate", "TRAFFIC", 60 * 24 * 2 + 30),
        (1, "Bus stop packed before first period", "TRAFFIC", 60 * 24 * 2 + 25),
        (1, "Student union cafeteria queue out the door", "CAFETERIA", 60 * 24 * 3),
        (1, "Second floor cafeteria is full", "CAFETERIA", 60 * 24 * 3 + 5),
        (1, "Stairs near the library are icy", "WEATHER", 60 * 24 * 8),
        (1, "Club fair booths blocking the plaza", "EVENT", 60 * 24 * 9),
        (1, "Reading room seats all taken", "LIBRARY", 60 * 24 * 10),
        (2, "Traffic jam at the east gate", "TRAFFIC", 60 * 24 * 4),
        (2, "Dining hall line is short today", "CAFETERIA", 60 * 24 * 5),
        (2, "Concert setup in front of the stadium", "EVENT", 60 * 24 * 6),
    ];

    let now = Utc::now();
    let mut inserted = 0usize;

    for (university_id, content, category, minutes_ago) in reports {
        sqlx::query(
            r#"
            INSERT INTO campus_status_message ("universityId", content, category, "createdAt")
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(university_id)
        .bind(content)
        .bind(category)
        .bind(now - chrono::Duration::minutes(minutes_ago))
        .execute(pool)
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        university_id: i32,
        content: String,
        category: String,
        created_at: DateTime<Utc>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", index + 1))?;

        sqlx::query(
            r#"
            INSERT INTO campus_status_message ("universityId", content, category, "createdAt")
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(row.university_id)
        .bind(&row.content)
        .bind(&row.category)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await?;

        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::models::TimeSlot;

    fn timeline(university_id: i32, congestion: u8, updated_at: DateTime<Utc>) -> Timeline {
        Timeline {
            university_id,
            day: DayOfWeek::Mon,
            slots: vec![TimeSlot {
                hour: 12,
                minute_offset: 0,
                dominant_category: Category::Cafeteria,
                report_count: 4,
                congestion_score: congestion,
                summary: "dining hall queue congestion".to_string(),
            }],
            updated_at,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a live DATABASE_URL"]
    async fn upsert_overwrites_existing_row(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let first_at = Utc::now() - ChronoDuration::hours(1);
        let second_at = Utc::now();

        store
            .upsert_timeline(&timeline(1, 30, first_at))
            .await
            .expect("first upsert");
        store
            .upsert_timeline(&timeline(1, 45, second_at))
            .await
            .expect("second upsert");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM campus_prediction")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);

        let stored = fetch_prediction(&pool, 1, DayOfWeek::Mon)
            .await
            .expect("fetch")
            .expect("row exists");
        assert_eq!(stored.timeline[0].congestion, 45);
        assert_eq!(stored.timeline[0].time, "12:00");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a live DATABASE_URL"]
    async fn fetch_reports_binds_university_and_window(pool: PgPool) {
        let now = Utc::now();
        for (university_id, category, age_days) in
            [(1, "TRAFFIC", 1), (1, "EVENT", 40), (2, "CAFETERIA", 1)]
        {
            sqlx::query(
                r#"INSERT INTO campus_status_message ("universityId", content, category, "createdAt")
                   VALUES ($1, 'x', $2, $3)"#,
            )
            .bind(university_id)
            .bind(category)
            .bind(now - ChronoDuration::days(age_days))
            .execute(&pool)
            .await
            .expect("insert report");
        }

        let store = PgStore::new(pool);
        assert_eq!(store.list_universities().await.expect("list"), vec![1, 2]);

        let reports = store
            .fetch_reports(1, now - ChronoDuration::weeks(4))
            .await
            .expect("fetch");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, Category::Traffic);
    }
}
