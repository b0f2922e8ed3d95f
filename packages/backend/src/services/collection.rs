use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::db::operations::{
    count_records, delete_record, fetch_entries, find_record, insert_record,
    insert_records_skipping_enrolled, list_recent, list_records, truncate_to_millis, upsert_entry,
    Definition, PartOfSpeech, RecordPage, RecordSort, RecordStage, SortOrder, VocabularyEntry,
    WordMemoryRecord,
};
use crate::services::review::ReviewError;

const MAX_DEFINITIONS: usize = 32;
const MAX_WORD_TEXT_LEN: usize = 128;
const MAX_MEANING_LEN: usize = 1000;
const MAX_BATCH_WORDS: usize = 200;
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// A record joined with its catalog entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    pub record: WordMemoryRecord,
    pub word_text: Option<String>,
    pub phonetic: Option<String>,
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDefinition {
    pub part_of_speech: String,
    pub meaning: String,
    #[serde(default)]
    pub example: Option<String>,
}

/// Definitions arrive either as a list or as the legacy JSON-encoded string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefinitionsInput {
    List(Vec<RawDefinition>),
    Encoded(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollWord {
    pub word_id: String,
    pub word_text: String,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub definitions: Option<DefinitionsInput>,
}

pub fn validate_definitions(input: Option<DefinitionsInput>) -> Result<Vec<Definition>, ReviewError> {
    let raw = match input {
        None => return Ok(Vec::new()),
        Some(DefinitionsInput::List(list)) => list,
        Some(DefinitionsInput::Encoded(text)) if text.trim().is_empty() => return Ok(Vec::new()),
        Some(DefinitionsInput::Encoded(text)) => serde_json::from_str::<Vec<RawDefinition>>(&text)
            .map_err(|e| ReviewError::Validation(format!("definitions is not a valid list: {e}")))?,
    };

    if raw.len() > MAX_DEFINITIONS {
        return Err(ReviewError::Validation(format!(
            "at most {MAX_DEFINITIONS} definitions are allowed"
        )));
    }

    raw.into_iter()
        .enumerate()
        .map(|(idx, def)| {
            let part_of_speech: PartOfSpeech = def
                .part_of_speech
                .parse()
                .map_err(|e| ReviewError::Validation(format!("definitions[{idx}]: {e}")))?;
            let meaning = def.meaning.trim();
            if meaning.is_empty() {
                return Err(ReviewError::Validation(format!(
                    "definitions[{idx}]: meaning must not be empty"
                )));
            }
            if meaning.chars().count() > MAX_MEANING_LEN {
                return Err(ReviewError::Validation(format!(
                    "definitions[{idx}]: meaning is too long"
                )));
            }
            let example = def
                .example
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty());
            Ok(Definition {
                part_of_speech,
                meaning: meaning.to_string(),
                example,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchEnroll {
    #[serde(default)]
    pub words: Vec<EnrollWord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnrollResult {
    pub count: usize,
    pub skipped: usize,
    pub words: Vec<RecordView>,
}

/// Raw listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default)]
pub struct ListWords {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPage {
    pub words: Vec<RecordView>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

fn prepare_entry(request: EnrollWord) -> Result<VocabularyEntry, ReviewError> {
    let word_id = request.word_id.trim();
    let word_text = request.word_text.trim();
    if word_id.is_empty() {
        return Err(ReviewError::Validation("wordId must not be empty".to_string()));
    }
    if word_text.is_empty() || word_text.chars().count() > MAX_WORD_TEXT_LEN {
        return Err(ReviewError::Validation(format!(
            "wordText must be 1-{MAX_WORD_TEXT_LEN} characters"
        )));
    }

    Ok(VocabularyEntry {
        word_id: word_id.to_string(),
        text: word_text.to_string(),
        phonetic: request
            .phonetic
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        definitions: validate_definitions(request.definitions)?,
    })
}

/// Add a word to the user's collection: due now, never reviewed.
pub async fn enroll(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    request: EnrollWord,
    now: DateTime<Utc>,
) -> Result<RecordView, ReviewError> {
    let now = truncate_to_millis(now);
    let entry = prepare_entry(request)?;
    let word_id = entry.word_id.as_str();
    let record = WordMemoryRecord::enrolled(user_id, word_id, engine.scheduling.initial_easiness, now);
    let record_id = record.id.clone();

    let mut tx = pool.begin().await?;
    upsert_entry(&mut *tx, &entry, now).await?;
    if let Err(err) = insert_record(&mut *tx, &record).await {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                tracing::warn!(user_id, word_id, "word already enrolled");
                return Err(ReviewError::AlreadyEnrolled(word_id.to_string()));
            }
        }
        return Err(err.into());
    }
    tx.commit().await?;

    tracing::debug!(user_id, word_id, user_word_id = %record_id, "word enrolled");

    // the catalog entry may predate this request
    let mut views = attach_catalog(pool, vec![record]).await?;
    views.pop().ok_or(ReviewError::NotFound(record_id))
}

/// Add many words in one transaction.
///
/// Items without a word id or text are skipped, as are words the user
/// already collected. Any other invalid item rejects the whole batch.
pub async fn enroll_batch(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    request: BatchEnroll,
    now: DateTime<Utc>,
) -> Result<BatchEnrollResult, ReviewError> {
    if request.words.is_empty() {
        return Err(ReviewError::Validation("words must not be empty".to_string()));
    }
    if request.words.len() > MAX_BATCH_WORDS {
        return Err(ReviewError::Validation(format!(
            "at most {MAX_BATCH_WORDS} words per batch"
        )));
    }
    let now = truncate_to_millis(now);

    let mut skipped = 0;
    let mut entries = Vec::with_capacity(request.words.len());
    for (idx, word) in request.words.into_iter().enumerate() {
        if word.word_id.trim().is_empty() || word.word_text.trim().is_empty() {
            skipped += 1;
            continue;
        }
        let entry = prepare_entry(word).map_err(|err| match err {
            ReviewError::Validation(msg) => ReviewError::Validation(format!("words[{idx}]: {msg}")),
            other => other,
        })?;
        entries.push(entry);
    }

    let records: Vec<WordMemoryRecord> = entries
        .iter()
        .map(|entry| {
            WordMemoryRecord::enrolled(user_id, &entry.word_id, engine.scheduling.initial_easiness, now)
        })
        .collect();

    let mut tx = pool.begin().await?;
    for entry in &entries {
        upsert_entry(&mut *tx, entry, now).await?;
    }
    let inserted: HashSet<String> = insert_records_skipping_enrolled(&mut *tx, &records)
        .await?
        .into_iter()
        .collect();
    tx.commit().await?;

    let added: Vec<WordMemoryRecord> = records
        .into_iter()
        .filter(|record| inserted.contains(&record.id))
        .collect();
    skipped += entries.len() - added.len();

    tracing::debug!(user_id, added = added.len(), skipped, "batch enrolled");

    let words = attach_catalog(pool, added).await?;
    Ok(BatchEnrollResult {
        count: words.len(),
        skipped,
        words,
    })
}

fn parse_stage(raw: &str) -> Result<RecordStage, ReviewError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "new" => Ok(RecordStage::New),
        "learning" => Ok(RecordStage::Learning),
        "mastered" => Ok(RecordStage::Mastered),
        _ => Err(ReviewError::Validation(format!(
            "status must be one of new, learning, mastered (got {raw})"
        ))),
    }
}

fn parse_sort(raw: &str) -> Result<RecordSort, ReviewError> {
    match raw.trim() {
        "createdAt" | "created_at" => Ok(RecordSort::CreatedAt),
        "dueAt" | "due_at" => Ok(RecordSort::DueAt),
        "easinessFactor" | "easiness_factor" => Ok(RecordSort::Easiness),
        "lastReviewedAt" | "last_reviewed_at" => Ok(RecordSort::LastReviewedAt),
        _ => Err(ReviewError::Validation(format!("cannot sort by {raw}"))),
    }
}

/// Paginated collection listing.
///
/// An out-of-range page or limit falls back to the first page of 20.
pub async fn list_words(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    query: ListWords,
) -> Result<WordPage, ReviewError> {
    let page = query.page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = query
        .limit
        .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let stage = query.status.as_deref().map(parse_stage).transpose()?;
    let sort = query
        .sort
        .as_deref()
        .map(parse_sort)
        .transpose()?
        .unwrap_or(RecordSort::CreatedAt);
    let order = match query.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };

    let request = RecordPage {
        stage,
        sort,
        order,
        limit,
        offset: (page - 1).saturating_mul(limit),
    };
    let records = list_records(pool, user_id, &request, &engine.mastery).await?;
    let total = count_records(pool, user_id, stage, &engine.mastery).await?;

    Ok(WordPage {
        words: attach_catalog(pool, records).await?,
        page,
        limit,
        total,
    })
}

pub async fn remove(pool: &SqlitePool, user_id: &str, record_id: &str) -> Result<(), ReviewError> {
    if delete_record(pool, user_id, record_id).await? {
        tracing::debug!(user_id, user_word_id = record_id, "word removed");
        Ok(())
    } else {
        Err(ReviewError::NotFound(record_id.to_string()))
    }
}

pub async fn get_word(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
) -> Result<RecordView, ReviewError> {
    let record = find_record(pool, user_id, record_id)
        .await?
        .ok_or_else(|| ReviewError::NotFound(record_id.to_string()))?;
    let mut views = attach_catalog(pool, vec![record]).await?;
    views
        .pop()
        .ok_or_else(|| ReviewError::NotFound(record_id.to_string()))
}

pub async fn recent_words(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<RecordView>, ReviewError> {
    let records = list_recent(pool, user_id, limit).await?;
    attach_catalog(pool, records).await
}

/// Join records with catalog data, preserving input order.
pub async fn attach_catalog(
    pool: &SqlitePool,
    records: Vec<WordMemoryRecord>,
) -> Result<Vec<RecordView>, ReviewError> {
    let word_ids: Vec<String> = records.iter().map(|r| r.word_id.clone()).collect();
    let mut entries = fetch_entries(pool, &word_ids).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            match entries.remove(&record.word_id) {
                Some(entry) => RecordView {
                    record,
                    word_text: Some(entry.text),
                    phonetic: entry.phonetic,
                    definitions: entry.definitions,
                },
                None => RecordView {
                    record,
                    word_text: None,
                    phonetic: None,
                    definitions: Vec::new(),
                },
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_definitions_from_list() {
        let input: DefinitionsInput = serde_json::from_str(
            r#"[{"partOfSpeech":"noun","meaning":"  a fruit ","example":""}]"#,
        )
        .unwrap();
        let defs = validate_definitions(Some(input)).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].part_of_speech, PartOfSpeech::Noun);
        assert_eq!(defs[0].meaning, "a fruit");
        assert!(defs[0].example.is_none());
    }

    #[test]
    fn test_validate_definitions_from_encoded_string() {
        let input = DefinitionsInput::Encoded(
            r#"[{"partOfSpeech":"v","meaning":"to go","example":"go home"}]"#.to_string(),
        );
        let defs = validate_definitions(Some(input)).unwrap();
        assert_eq!(defs[0].part_of_speech, PartOfSpeech::Verb);
        assert_eq!(defs[0].example.as_deref(), Some("go home"));
    }

    #[test]
    fn test_validate_definitions_rejects_bad_input() {
        let unknown = DefinitionsInput::List(vec![RawDefinition {
            part_of_speech: "gerund".into(),
            meaning: "x".into(),
            example: None,
        }]);
        assert!(matches!(
            validate_definitions(Some(unknown)),
            Err(ReviewError::Validation(_))
        ));

        let empty_meaning = DefinitionsInput::List(vec![RawDefinition {
            part_of_speech: "noun".into(),
            meaning: "   ".into(),
            example: None,
        }]);
        assert!(validate_definitions(Some(empty_meaning)).is_err());

        let garbage = DefinitionsInput::Encoded("not json".into());
        assert!(validate_definitions(Some(garbage)).is_err());
    }
}
