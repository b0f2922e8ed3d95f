use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use super::to_millis;

const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Preposition,
    Conjunction,
    Interjection,
    Phrase,
    Other,
}

impl PartOfSpeech {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::Verb => "verb",
            Self::Adjective => "adjective",
            Self::Adverb => "adverb",
            Self::Pronoun => "pronoun",
            Self::Preposition => "preposition",
            Self::Conjunction => "conjunction",
            Self::Interjection => "interjection",
            Self::Phrase => "phrase",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown part of speech: {0}")]
pub struct UnknownPartOfSpeech(pub String);

impl FromStr for PartOfSpeech {
    type Err = UnknownPartOfSpeech;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "noun" | "n" => Self::Noun,
            "verb" | "v" => Self::Verb,
            "adjective" | "adj" => Self::Adjective,
            "adverb" | "adv" => Self::Adverb,
            "pronoun" | "pron" => Self::Pronoun,
            "preposition" | "prep" => Self::Preposition,
            "conjunction" | "conj" => Self::Conjunction,
            "interjection" | "interj" => Self::Interjection,
            "phrase" => Self::Phrase,
            "other" => Self::Other,
            _ => return Err(UnknownPartOfSpeech(s.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub part_of_speech: PartOfSpeech,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Local mirror of a dictionary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub word_id: String,
    pub text: String,
    pub phonetic: Option<String>,
    pub definitions: Vec<Definition>,
}

/// Merge an entry into the shared catalog.
///
/// The first writer's text is kept. A missing phonetic is filled in, and
/// definitions are only written while the word has none, so a later
/// enrollment by another user never erases what is already there.
pub async fn upsert_entry(
    conn: &mut SqliteConnection,
    entry: &VocabularyEntry,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "vocabulary_entries" ("wordId","text","phonetic","updatedAt")
        VALUES (?, ?, ?, ?)
        ON CONFLICT("wordId") DO UPDATE SET
          "phonetic" = COALESCE("vocabulary_entries"."phonetic", excluded."phonetic"),
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(&entry.word_id)
    .bind(&entry.text)
    .bind(&entry.phonetic)
    .bind(to_millis(now))
    .execute(&mut *conn)
    .await?;

    if entry.definitions.is_empty() {
        return Ok(());
    }

    let existing: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM "word_definitions" WHERE "wordId" = ?"#)
            .bind(&entry.word_id)
            .fetch_one(&mut *conn)
            .await?;
    if existing > 0 {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"INSERT INTO "word_definitions" ("wordId","position","partOfSpeech","meaning","example") "#,
    );
    qb.push_values(entry.definitions.iter().enumerate(), |mut b, (position, def)| {
        b.push_bind(&entry.word_id)
            .push_bind(position as i64)
            .push_bind(def.part_of_speech.as_str())
            .push_bind(&def.meaning)
            .push_bind(&def.example);
    });
    qb.build().execute(&mut *conn).await?;

    Ok(())
}

/// Entries for the given words, keyed by word id. Unknown ids are absent.
pub async fn fetch_entries(
    pool: &SqlitePool,
    word_ids: &[String],
) -> Result<HashMap<String, VocabularyEntry>, sqlx::Error> {
    let mut out: HashMap<String, VocabularyEntry> = HashMap::with_capacity(word_ids.len());
    if word_ids.is_empty() {
        return Ok(out);
    }

    for chunk in word_ids.chunks(MAX_BATCH_SIZE) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"SELECT "wordId","text","phonetic" FROM "vocabulary_entries" WHERE "wordId" IN ("#,
        );
        {
            let mut sep = qb.separated(", ");
            for id in chunk {
                sep.push_bind(id);
            }
        }
        qb.push(")");

        for row in qb.build().fetch_all(pool).await? {
            let word_id: String = row.try_get("wordId")?;
            out.insert(
                word_id.clone(),
                VocabularyEntry {
                    word_id,
                    text: row.try_get("text")?,
                    phonetic: row.try_get("phonetic")?,
                    definitions: Vec::new(),
                },
            );
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"SELECT "wordId","partOfSpeech","meaning","example" FROM "word_definitions" WHERE "wordId" IN ("#,
        );
        {
            let mut sep = qb.separated(", ");
            for id in chunk {
                sep.push_bind(id);
            }
        }
        qb.push(r#") ORDER BY "wordId", "position""#);

        for row in qb.build().fetch_all(pool).await? {
            let word_id: String = row.try_get("wordId")?;
            let raw_pos: String = row.try_get("partOfSpeech")?;
            let Some(entry) = out.get_mut(&word_id) else {
                continue;
            };
            let part_of_speech = match raw_pos.parse::<PartOfSpeech>() {
                Ok(pos) => pos,
                Err(_) => {
                    tracing::warn!(
                        word_id = %entry.word_id,
                        part_of_speech = %raw_pos,
                        "stored part of speech is invalid, using other"
                    );
                    PartOfSpeech::Other
                }
            };
            entry.definitions.push(Definition {
                part_of_speech,
                meaning: row.try_get("meaning")?,
                example: row.try_get("example")?,
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_of_speech_parsing() {
        assert_eq!("noun".parse::<PartOfSpeech>().unwrap(), PartOfSpeech::Noun);
        assert_eq!("Adj".parse::<PartOfSpeech>().unwrap(), PartOfSpeech::Adjective);
        assert!("gerund".parse::<PartOfSpeech>().is_err());
    }

    #[test]
    fn test_definition_deserializes_tagged_part_of_speech() {
        let def: Definition =
            serde_json::from_str(r#"{"partOfSpeech":"verb","meaning":"to run"}"#).unwrap();
        assert_eq!(def.part_of_speech, PartOfSpeech::Verb);
        assert!(def.example.is_none());

        let bad = serde_json::from_str::<Definition>(r#"{"partOfSpeech":"gerund","meaning":"x"}"#);
        assert!(bad.is_err());
    }
}
