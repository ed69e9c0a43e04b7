use std::cell::RefCell;

use mind_lantern::audio::RecordingSink;
use mind_lantern::bows::{BowCounter, Confirmation, BOW_CEILING, RESET_PROMPT};
use mind_lantern::models::*;
use speculate2::speculate;

/// Answers with a fixed choice and remembers what it was asked.
struct Scripted {
    answer: bool,
    asked: RefCell<Vec<String>>,
}

impl Scripted {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: RefCell::new(Vec::new()),
        }
    }
}

impl Confirmation for Scripted {
    fn confirm(&self, prompt: &str) -> bool {
        self.asked.borrow_mut().push(prompt.to_string());
        self.answer
    }
}

speculate! {
    before {
        let cues = RecordingSink::new();
        let mut counter = BowCounter::new();
    }

    describe "tap" {
        it "counts and clicks the moktak" {
            assert_eq!(counter.tap(&cues), TapOutcome::Counted);
            assert_eq!(counter.count(), 1);
            assert_eq!(cues.played(), vec![CueKind::Moktak]);
        }

        it "reports the tap that reaches 108" {
            for _ in 0..107 {
                assert_eq!(counter.tap(&cues), TapOutcome::Counted);
            }
            assert_eq!(counter.tap(&cues), TapOutcome::Completed);
            assert_eq!(counter.count(), BOW_CEILING);
            assert!(counter.snapshot().completed);
        }

        it "rejects the 109th tap silently" {
            for _ in 0..108 {
                counter.tap(&cues);
            }
            assert_eq!(counter.tap(&cues), TapOutcome::Rejected);
            assert_eq!(counter.count(), 108);
            assert_eq!(cues.count(CueKind::Moktak), 108);
        }
    }

    describe "reset" {
        it "asks for confirmation and resets on approval" {
            counter.tap(&cues);
            counter.tap(&cues);
            let confirm = Scripted::new(true);

            assert!(counter.reset(&confirm));
            assert_eq!(counter.count(), 0);
            assert_eq!(*confirm.asked.borrow(), vec![RESET_PROMPT.to_string()]);
        }

        it "keeps the count when declined" {
            counter.tap(&cues);
            assert!(!counter.reset(&Scripted::new(false)));
            assert_eq!(counter.count(), 1);
        }

        it "accepts a decision made up front" {
            for _ in 0..108 {
                counter.tap(&cues);
            }
            assert!(counter.reset(&true));
            assert_eq!(counter.tap(&cues), TapOutcome::Counted);
        }
    }

    describe "custom ceiling" {
        it "never goes above it" {
            let mut short = BowCounter::with_ceiling(3);
            let outcomes: Vec<_> = (0..5).map(|_| short.tap(&cues)).collect();
            assert_eq!(outcomes, vec![
                TapOutcome::Counted,
                TapOutcome::Counted,
                TapOutcome::Completed,
                TapOutcome::Rejected,
                TapOutcome::Rejected,
            ]);
            assert_eq!(short.snapshot(), BowCount { count: 3, ceiling: 3, completed: true });
        }
    }
}
