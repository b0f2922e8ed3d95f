use chrono::{DateTime, Utc};
use recall_algo::sanitize::{sanitize_count, sanitize_interval};
use recall_algo::{MasteryPolicy, MemoryState, QueueEntry, ReviewTransition, DEFAULT_EASINESS};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use super::events::{insert_event, ReviewEvent};
use super::{from_millis, to_millis};

// 12 binds per row keeps a chunk under SQLite's 999 variable limit
const MAX_INSERT_ROWS: usize = 80;

const RECORD_COLUMNS: &str = r#""id","userId","wordId","easinessFactor","intervalDays","repetitions",
    "dueAt","lastReviewedAt","lapseCount","version","createdAt","updatedAt""#;

/// Per-(user, word) scheduling state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordMemoryRecord {
    pub id: String,
    pub user_id: String,
    pub word_id: String,
    pub easiness_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub lapse_count: u32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WordMemoryRecord {
    /// A freshly collected word: due immediately, never reviewed.
    pub fn enrolled(user_id: &str, word_id: &str, initial_easiness: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            word_id: word_id.to_string(),
            easiness_factor: initial_easiness,
            interval_days: 0,
            repetitions: 0,
            due_at: now,
            last_reviewed_at: None,
            lapse_count: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn memory_state(&self) -> MemoryState {
        MemoryState {
            easiness_factor: self.easiness_factor,
            interval_days: self.interval_days,
            repetitions: self.repetitions,
            lapse_count: self.lapse_count,
        }
    }
}

impl QueueEntry for WordMemoryRecord {
    fn entry_id(&self) -> &str {
        &self.id
    }

    fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    fn easiness(&self) -> f64 {
        self.easiness_factor
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_unreviewed(&self) -> bool {
        self.last_reviewed_at.is_none() && self.repetitions == 0
    }
}

/// Outcome of the version-checked write
#[derive(Debug)]
pub enum CommitOutcome {
    Committed {
        record: WordMemoryRecord,
        event: ReviewEvent,
    },
    VersionMismatch {
        current: i64,
    },
    Missing,
}

pub async fn insert_record(
    conn: &mut SqliteConnection,
    record: &WordMemoryRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "word_memory_records"
          ("id","userId","wordId","easinessFactor","intervalDays","repetitions",
           "dueAt","lastReviewedAt","lapseCount","version","createdAt","updatedAt")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.word_id)
    .bind(record.easiness_factor)
    .bind(i64::from(record.interval_days))
    .bind(i64::from(record.repetitions))
    .bind(to_millis(record.due_at))
    .bind(record.last_reviewed_at.map(to_millis))
    .bind(i64::from(record.lapse_count))
    .bind(record.version)
    .bind(to_millis(record.created_at))
    .bind(to_millis(record.updated_at))
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert new records, skipping any the user already has.
///
/// Returns the ids that were actually inserted.
pub async fn insert_records_skipping_enrolled(
    conn: &mut SqliteConnection,
    records: &[WordMemoryRecord],
) -> Result<Vec<String>, sqlx::Error> {
    let mut inserted = Vec::with_capacity(records.len());
    for chunk in records.chunks(MAX_INSERT_ROWS) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"INSERT INTO "word_memory_records"
              ("id","userId","wordId","easinessFactor","intervalDays","repetitions",
               "dueAt","lastReviewedAt","lapseCount","version","createdAt","updatedAt") "#,
        );
        qb.push_values(chunk, |mut b, record| {
            b.push_bind(&record.id)
                .push_bind(&record.user_id)
                .push_bind(&record.word_id)
                .push_bind(record.easiness_factor)
                .push_bind(i64::from(record.interval_days))
                .push_bind(i64::from(record.repetitions))
                .push_bind(to_millis(record.due_at))
                .push_bind(record.last_reviewed_at.map(to_millis))
                .push_bind(i64::from(record.lapse_count))
                .push_bind(record.version)
                .push_bind(to_millis(record.created_at))
                .push_bind(to_millis(record.updated_at));
        });
        qb.push(r#" ON CONFLICT ("userId","wordId") DO NOTHING RETURNING "id""#);

        let ids: Vec<String> = qb.build_query_scalar().fetch_all(&mut *conn).await?;
        inserted.extend(ids);
    }
    Ok(inserted)
}

pub async fn find_record(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
) -> Result<Option<WordMemoryRecord>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {RECORD_COLUMNS} FROM "word_memory_records" WHERE "id" = ? AND "userId" = ? LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_record).transpose()
}

/// Returns false when nothing matched.
pub async fn delete_record(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "word_memory_records" WHERE "id" = ? AND "userId" = ?"#)
        .bind(record_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Reviewed records whose due time has passed, in queue order
pub async fn list_due_reviews(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<WordMemoryRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {RECORD_COLUMNS} FROM "word_memory_records"
        WHERE "userId" = ? AND "lastReviewedAt" IS NOT NULL AND "dueAt" <= ?
        ORDER BY "dueAt" ASC, "easinessFactor" ASC, "id" ASC
        LIMIT ?
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(to_millis(now))
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_record).collect()
}

pub async fn count_due_reviews(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "word_memory_records"
        WHERE "userId" = ? AND "lastReviewedAt" IS NOT NULL AND "dueAt" <= ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(now))
    .fetch_one(pool)
    .await
}

/// Never-reviewed records, oldest collected first
pub async fn list_unreviewed(
    pool: &SqlitePool,
    user_id: &str,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<WordMemoryRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {RECORD_COLUMNS} FROM "word_memory_records"
        WHERE "userId" = ? AND "lastReviewedAt" IS NULL AND "repetitions" = 0 AND "dueAt" <= ?
        ORDER BY "createdAt" ASC, "id" ASC
        LIMIT ?
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(to_millis(now))
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_record).collect()
}

/// Records collected in `[start, end)`
pub async fn count_created_between(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "word_memory_records"
        WHERE "userId" = ? AND "createdAt" >= ? AND "createdAt" < ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await
}

/// Records collected in `[start, end)` that are still waiting for a first review
pub async fn count_unreviewed_created_between(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "word_memory_records"
        WHERE "userId" = ? AND "lastReviewedAt" IS NULL
          AND "createdAt" >= ? AND "createdAt" < ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await
}

pub async fn count_mastered(
    pool: &SqlitePool,
    user_id: &str,
    policy: &MasteryPolicy,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "word_memory_records"
        WHERE "userId" = ? AND "repetitions" >= ? AND "easinessFactor" >= ? AND "intervalDays" >= ?
        "#,
    )
    .bind(user_id)
    .bind(i64::from(policy.min_repetitions))
    .bind(policy.min_easiness)
    .bind(i64::from(policy.min_interval_days))
    .fetch_one(pool)
    .await
}

/// Learning stage used to filter the collection listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    New,
    Learning,
    Mastered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSort {
    CreatedAt,
    DueAt,
    Easiness,
    LastReviewedAt,
}

impl RecordSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => r#""createdAt""#,
            Self::DueAt => r#""dueAt""#,
            Self::Easiness => r#""easinessFactor""#,
            Self::LastReviewedAt => r#""lastReviewedAt""#,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordPage {
    pub stage: Option<RecordStage>,
    pub sort: RecordSort,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

fn push_stage_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    stage: Option<RecordStage>,
    policy: &MasteryPolicy,
) {
    let Some(stage) = stage else {
        return;
    };
    match stage {
        RecordStage::New => {
            qb.push(r#" AND "lastReviewedAt" IS NULL"#);
            return;
        }
        RecordStage::Learning => {
            qb.push(r#" AND "lastReviewedAt" IS NOT NULL AND NOT ("#);
        }
        RecordStage::Mastered => {
            qb.push(" AND (");
        }
    }
    qb.push(r#""repetitions" >= "#)
        .push_bind(i64::from(policy.min_repetitions))
        .push(r#" AND "easinessFactor" >= "#)
        .push_bind(policy.min_easiness)
        .push(r#" AND "intervalDays" >= "#)
        .push_bind(i64::from(policy.min_interval_days))
        .push(")");
}

/// One page of the user's collection
pub async fn list_records(
    pool: &SqlitePool,
    user_id: &str,
    page: &RecordPage,
    policy: &MasteryPolicy,
) -> Result<Vec<WordMemoryRecord>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        r#"SELECT {RECORD_COLUMNS} FROM "word_memory_records" WHERE "userId" = "#
    ));
    qb.push_bind(user_id.to_string());
    push_stage_filter(&mut qb, page.stage, policy);

    let order = page.order.keyword();
    qb.push(format!(
        r#" ORDER BY {} {order}, "id" {order} LIMIT "#,
        page.sort.column()
    ))
    .push_bind(page.limit)
    .push(" OFFSET ")
    .push_bind(page.offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(map_record).collect()
}

pub async fn count_records(
    pool: &SqlitePool,
    user_id: &str,
    stage: Option<RecordStage>,
    policy: &MasteryPolicy,
) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"SELECT COUNT(*) FROM "word_memory_records" WHERE "userId" = "#,
    );
    qb.push_bind(user_id.to_string());
    push_stage_filter(&mut qb, stage, policy);
    qb.build_query_scalar().fetch_one(pool).await
}

/// Most recently collected records first
pub async fn list_recent(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<WordMemoryRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {RECORD_COLUMNS} FROM "word_memory_records"
        WHERE "userId" = ?
        ORDER BY "createdAt" DESC, "id" DESC
        LIMIT ?
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_record).collect()
}

/// Persist a review: compare-and-swap on `version`, then append the event.
///
/// Both writes share one transaction; returning early or dropping the future
/// rolls everything back.
pub async fn commit_review(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
    expected_version: i64,
    transition: &ReviewTransition,
    event: ReviewEvent,
) -> Result<CommitOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        UPDATE "word_memory_records"
        SET "easinessFactor" = ?, "intervalDays" = ?, "repetitions" = ?, "lapseCount" = ?,
            "dueAt" = ?, "lastReviewedAt" = ?, "updatedAt" = ?, "version" = "version" + 1
        WHERE "id" = ? AND "userId" = ? AND "version" = ?
        RETURNING {RECORD_COLUMNS}
        "#
    );
    let next = &transition.state;
    let reviewed_at = to_millis(transition.reviewed_at);
    let updated = sqlx::query(&sql)
        .bind(next.easiness_factor)
        .bind(i64::from(next.interval_days))
        .bind(i64::from(next.repetitions))
        .bind(i64::from(next.lapse_count))
        .bind(to_millis(transition.due_at))
        .bind(reviewed_at)
        .bind(reviewed_at)
        .bind(record_id)
        .bind(user_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = updated else {
        let current: Option<i64> = sqlx::query_scalar(
            r#"SELECT "version" FROM "word_memory_records" WHERE "id" = ? AND "userId" = ?"#,
        )
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.rollback().await?;
        return Ok(match current {
            Some(current) => CommitOutcome::VersionMismatch { current },
            None => CommitOutcome::Missing,
        });
    };
    let record = map_record(&row)?;

    insert_event(&mut *tx, &event).await?;
    tx.commit().await?;

    Ok(CommitOutcome::Committed { record, event })
}

fn map_record(row: &SqliteRow) -> Result<WordMemoryRecord, sqlx::Error> {
    let easiness: f64 = row.try_get("easinessFactor")?;
    let interval: i64 = row.try_get("intervalDays")?;
    let repetitions: i64 = row.try_get("repetitions")?;
    let lapses: i64 = row.try_get("lapseCount")?;
    let last_reviewed: Option<i64> = row.try_get("lastReviewedAt")?;

    Ok(WordMemoryRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        word_id: row.try_get("wordId")?,
        // the configured floor is applied by the review path, not here
        easiness_factor: if easiness.is_finite() { easiness } else { DEFAULT_EASINESS },
        interval_days: sanitize_interval(interval),
        repetitions: sanitize_count(repetitions),
        due_at: from_millis(row.try_get("dueAt")?),
        last_reviewed_at: last_reviewed.map(from_millis),
        lapse_count: sanitize_count(lapses),
        version: row.try_get("version")?,
        created_at: from_millis(row.try_get("createdAt")?),
        updated_at: from_millis(row.try_get("updatedAt")?),
    })
}
