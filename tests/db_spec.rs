use chrono::NaiveDate;
use mind_lantern::db::Database;
use mind_lantern::models::*;
use speculate2::speculate;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
}

fn quote_for(day: u32, text: &str) -> DailyQuote {
    DailyQuote {
        date: date(day),
        text: text.to_string(),
        author: Some("붓다".to_string()),
        origin: QuoteOrigin::Generated,
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "quote cache" {
        it "is empty on a fresh database" {
            assert!(db.get_cached_quote(date(16)).expect("Query failed").is_none());
        }

        it "returns the cached quote for the same date" {
            db.cache_quote(&quote_for(16, "마음이 고요하면")).expect("Failed to cache");

            let cached = db.get_cached_quote(date(16)).expect("Query failed").expect("missing quote");
            assert_eq!(cached.text, "마음이 고요하면");
            assert_eq!(cached.author.as_deref(), Some("붓다"));
            assert_eq!(cached.origin, QuoteOrigin::Cached);
        }

        it "does not serve yesterday's quote today" {
            db.cache_quote(&quote_for(15, "어제의 말씀")).expect("Failed to cache");
            assert!(db.get_cached_quote(date(16)).expect("Query failed").is_none());
        }

        it "keeps only the newest entry" {
            db.cache_quote(&quote_for(15, "어제의 말씀")).expect("Failed to cache");
            db.cache_quote(&quote_for(16, "오늘의 말씀")).expect("Failed to cache");

            assert!(db.get_cached_quote(date(15)).expect("Query failed").is_none());
            assert_eq!(
                db.get_cached_quote(date(16)).expect("Query failed").map(|q| q.text),
                Some("오늘의 말씀".to_string())
            );
        }

        it "replaces the cached quote on the same date" {
            db.cache_quote(&quote_for(16, "첫 말씀")).expect("Failed to cache");
            db.cache_quote(&quote_for(16, "다시 쓴 말씀")).expect("Failed to cache");

            assert_eq!(
                db.get_cached_quote(date(16)).expect("Query failed").map(|q| q.text),
                Some("다시 쓴 말씀".to_string())
            );
        }
    }

    describe "preferences" {
        it "starts with defaults" {
            let prefs = db.get_preferences().expect("Query failed");
            assert_eq!(prefs, Preferences::default());
        }

        it "applies partial updates" {
            db.update_preferences(UpdatePreferencesInput {
                volume: Some(80),
                ..Default::default()
            }).expect("Failed to update");

            let prefs = db.update_preferences(UpdatePreferencesInput {
                muted: Some(true),
                default_minutes: Some(30),
                ..Default::default()
            }).expect("Failed to update");

            assert_eq!(prefs.volume, 80);
            assert!(prefs.muted);
            assert_eq!(prefs.default_preset, DurationPreset::ThirtyMinutes);
            assert_eq!(db.get_preferences().expect("Query failed"), prefs);
        }

        it "seeds the configured length on a fresh database" {
            let prefs = db.seed_preferences(DurationPreset::FifteenMinutes).expect("Failed to seed");
            assert_eq!(prefs.default_preset, DurationPreset::FifteenMinutes);
            assert_eq!(prefs.volume, Preferences::default().volume);
            assert_eq!(db.get_preferences().expect("Query failed"), prefs);
        }

        it "never overrides saved preferences when seeding" {
            db.update_preferences(UpdatePreferencesInput {
                volume: Some(30),
                default_minutes: Some(5),
                ..Default::default()
            }).expect("Failed to update");

            let prefs = db.seed_preferences(DurationPreset::ThirtyMinutes).expect("Failed to seed");
            assert_eq!(prefs.volume, 30);
            assert_eq!(prefs.default_preset, DurationPreset::FiveMinutes);
        }

        it "clamps volume to 100" {
            let prefs = db.update_preferences(UpdatePreferencesInput {
                volume: Some(250),
                ..Default::default()
            }).expect("Failed to update");
            assert_eq!(prefs.volume, 100);
        }

        it "rejects a default length that is not a preset" {
            let result = db.update_preferences(UpdatePreferencesInput {
                default_minutes: Some(7),
                ..Default::default()
            });
            assert!(result.is_err());
            assert_eq!(db.get_preferences().expect("Query failed"), Preferences::default());
        }
    }

    describe "practice log" {
        it "summarises an empty day" {
            let summary = db.practice_summary(date(16)).expect("Query failed");
            assert_eq!(summary.meditations_completed, 0);
            assert_eq!(summary.bow_rounds, 0);
        }

        it "totals meditations and bow rounds per day" {
            db.record_practice(PracticeKind::Meditation, 300, date(16)).expect("Failed to record");
            db.record_practice(PracticeKind::Meditation, 600, date(16)).expect("Failed to record");
            db.record_practice(PracticeKind::Bows, 108, date(16)).expect("Failed to record");
            db.record_practice(PracticeKind::Meditation, 1800, date(15)).expect("Failed to record");

            let summary = db.practice_summary(date(16)).expect("Query failed");
            assert_eq!(summary, PracticeSummary {
                date: date(16),
                meditations_completed: 2,
                meditation_seconds: 900,
                bow_rounds: 1,
            });
        }

        it "lists records in completion order" {
            let first = db.record_practice(PracticeKind::Bows, 108, date(16)).expect("Failed to record");
            db.record_practice(PracticeKind::Meditation, 300, date(16)).expect("Failed to record");

            let records = db.get_practice(date(16)).expect("Query failed");
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].id, first.id);
            assert_eq!(records[0].kind, PracticeKind::Bows);
        }
    }

    describe "on disk" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("data").join("lantern.db");

            {
                let db = Database::open(path.clone()).expect("Failed to open");
                db.migrate().expect("Failed to migrate");
                db.record_practice(PracticeKind::Bows, 108, date(16)).expect("Failed to record");
            }

            let reopened = Database::open(path).expect("Failed to reopen");
            reopened.migrate().expect("Failed to migrate");
            assert_eq!(reopened.practice_summary(date(16)).expect("Query failed").bow_rounds, 1);
        }
    }
}
