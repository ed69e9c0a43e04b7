mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Quote cache
    // ============================================================

    /// The quote cached for exactly this date, if any.
    pub fn get_cached_quote(&self, date: NaiveDate) -> Result<Option<DailyQuote>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let quote = conn
            .query_row(
                "SELECT text, author FROM quote_cache WHERE quote_date = ?",
                [date.to_string()],
                |row| {
                    Ok(DailyQuote {
                        date,
                        text: row.get(0)?,
                        author: row.get(1)?,
                        origin: QuoteOrigin::Cached,
                    })
                },
            )
            .optional()?;
        Ok(quote)
    }

    /// Store the quote for its date, replacing whatever was cached before.
    pub fn cache_quote(&self, quote: &DailyQuote) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM quote_cache", [])?;
        tx.execute(
            "INSERT INTO quote_cache (quote_date, text, author, created_at) VALUES (?, ?, ?, ?)",
            (
                quote.date.to_string(),
                &quote.text,
                &quote.author,
                Utc::now().to_rfc3339(),
            ),
        )?;
        tx.commit()?;
        Ok(())
    }

    // ============================================================
    // Preferences
    // ============================================================

    pub fn get_preferences(&self) -> Result<Preferences> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let row = conn
            .query_row(
                "SELECT volume, muted, default_minutes FROM preferences WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i32>(1)? != 0,
                        row.get::<_, u32>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(match row {
            Some((volume, muted, minutes)) => Preferences {
                volume: volume.clamp(0, 100) as u8,
                muted,
                default_preset: DurationPreset::from_minutes(minutes).unwrap_or_default(),
            },
            None => Preferences::default(),
        })
    }

    /// Store `default_preset` as the starting session length unless
    /// preferences were already saved. Returns what is stored afterwards.
    pub fn seed_preferences(&self, default_preset: DurationPreset) -> Result<Preferences> {
        {
            let defaults = Preferences::default();
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "INSERT OR IGNORE INTO preferences (id, volume, muted, default_minutes, updated_at)
                 VALUES (1, ?, ?, ?, ?)",
                (
                    defaults.volume,
                    defaults.muted as i32,
                    default_preset.minutes(),
                    Utc::now().to_rfc3339(),
                ),
            )?;
        }
        self.get_preferences()
    }

    pub fn update_preferences(&self, input: UpdatePreferencesInput) -> Result<Preferences> {
        let existing = self.get_preferences()?;

        let default_preset = match input.default_minutes {
            Some(minutes) => DurationPreset::from_minutes(minutes)
                .ok_or_else(|| anyhow::anyhow!("{} minutes is not a session preset", minutes))?,
            None => existing.default_preset,
        };
        let prefs = Preferences {
            volume: input.volume.unwrap_or(existing.volume).min(100),
            muted: input.muted.unwrap_or(existing.muted),
            default_preset,
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO preferences (id, volume, muted, default_minutes, updated_at)
             VALUES (1, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                volume = excluded.volume,
                muted = excluded.muted,
                default_minutes = excluded.default_minutes,
                updated_at = excluded.updated_at",
            (
                prefs.volume,
                prefs.muted as i32,
                prefs.default_preset.minutes(),
                Utc::now().to_rfc3339(),
            ),
        )?;

        Ok(prefs)
    }

    // ============================================================
    // Practice log
    // ============================================================

    pub fn record_practice(
        &self,
        kind: PracticeKind,
        amount: u32,
        practice_date: NaiveDate,
    ) -> Result<PracticeRecord> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO practice_log (id, kind, amount, practice_date, completed_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                kind.as_str(),
                amount,
                practice_date.to_string(),
                now.to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        )?;

        Ok(PracticeRecord {
            id,
            kind,
            amount,
            practice_date,
            completed_at: now,
        })
    }

    pub fn get_practice(&self, practice_date: NaiveDate) -> Result<Vec<PracticeRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, kind, amount, practice_date, completed_at
             FROM practice_log WHERE practice_date = ? ORDER BY completed_at, rowid",
        )?;

        let records = stmt
            .query_map([practice_date.to_string()], |row| {
                Ok(PracticeRecord {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    kind: PracticeKind::from_str(&row.get::<_, String>(1)?)
                        .unwrap_or(PracticeKind::Meditation),
                    amount: row.get(2)?,
                    practice_date: parse_date(row.get::<_, String>(3)?),
                    completed_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn practice_summary(&self, practice_date: NaiveDate) -> Result<PracticeSummary> {
        let records = self.get_practice(practice_date)?;
        let mut summary = PracticeSummary {
            date: practice_date,
            meditations_completed: 0,
            meditation_seconds: 0,
            bow_rounds: 0,
        };

        for record in records {
            match record.kind {
                PracticeKind::Meditation => {
                    summary.meditations_completed += 1;
                    summary.meditation_seconds += record.amount;
                }
                PracticeKind::Bows => summary.bow_rounds += 1,
            }
        }

        Ok(summary)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `<data dir>/mind-lantern/lantern.db`
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "mind-lantern")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("lantern.db"))
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_date(s: String) -> NaiveDate {
    s.parse().unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
