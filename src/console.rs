//! Interactive terminal practice.
//!
//! Each command owns its own controller or counter and talks to the user on
//! stdout. Logging goes to stderr so it never interleaves with the display.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::api::today;
use crate::audio::synth::cue_duration;
use crate::audio::CueSink;
use crate::bows::{BowCounter, Confirmation};
use crate::counsel::{ChatService, ChatSession, Counselor, MONK_INSTRUCTION};
use crate::db::Database;
use crate::meditation::{IntervalTicker, SessionController, TickHandler, TickOutcome};
use crate::models::*;
use crate::scripture;
use crate::wisdom::QuoteKeeper;

const BAR_WIDTH: usize = 30;
const FILLED: char = '█';
const EMPTY: char = '░';

/// Render one status line for a countdown.
///
/// ```text
/// ███████████░░░░░░░░░░░░░░░░░░░  37%  6:18  (running)
/// ```
pub fn render_progress(snapshot: &SessionSnapshot) -> String {
    let filled = (snapshot.progress * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let bar: String = std::iter::repeat(FILLED)
        .take(filled)
        .chain(std::iter::repeat(EMPTY).take(BAR_WIDTH - filled))
        .collect();
    format!(
        "{} {:>3}%  {}  ({})",
        bar,
        (snapshot.progress * 100.0).round() as u32,
        snapshot.clock,
        snapshot.phase.as_str()
    )
}

/// Render the bows counter, e.g. `  54 / 108`.
pub fn render_bows(count: &BowCount) -> String {
    if count.completed {
        format!("{:>4} / {}  회향 (complete)", count.count, count.ceiling)
    } else {
        format!("{:>4} / {}", count.count, count.ceiling)
    }
}

pub fn render_quote(quote: &DailyQuote) -> String {
    match &quote.author {
        Some(author) => format!("\"{}\"\n    - {}", quote.text, author),
        None => format!("\"{}\"", quote.text),
    }
}

// ============================================================
// Meditation
// ============================================================

enum Command {
    Toggle,
    Reset,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" | "p" | "pause" | "s" | "start" => Some(Command::Toggle),
        "r" | "reset" => Some(Command::Reset),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Run a countdown in the terminal until it completes or the user quits.
///
/// Enter toggles pause, `r` resets, `q` or Ctrl-C quits.
pub async fn meditate(
    preset: DurationPreset,
    cues: Arc<dyn CueSink>,
    db: &Database,
) -> Result<()> {
    let (tx, mut ticks) = mpsc::unbounded_channel();
    let handler: TickHandler = Arc::new(move |epoch| {
        let _ = tx.send(epoch);
    });
    let mut controller = SessionController::with_preset(
        preset,
        Box::new(IntervalTicker::every_second(handler)),
        cues,
    );

    println!(
        "{} minute meditation. [Enter] pause/resume  [r] reset  [q] quit",
        preset.minutes()
    );
    controller.start();
    print_status(&controller.snapshot())?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(epoch) = ticks.recv() => {
                match controller.tick_for(epoch) {
                    TickOutcome::Ignored => continue,
                    TickOutcome::Ticked { .. } => print_status(&controller.snapshot())?,
                    TickOutcome::Completed => {
                        print_status(&controller.snapshot())?;
                        println!("\n\n🪷 The session is complete.");
                        let seconds = controller.total_seconds();
                        db.record_practice(PracticeKind::Meditation, seconds, today())?;
                        // Let the closing bowl ring out before the process exits.
                        tokio::time::sleep(cue_duration(&Cue::singing_bowl())).await;
                        break;
                    }
                }
            }
            line = input.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Some(Command::Toggle) if controller.is_running() => controller.pause(),
                    Some(Command::Toggle) => {
                        controller.start();
                    }
                    Some(Command::Reset) => controller.reset(),
                    Some(Command::Quit) => break,
                    None => continue,
                }
                print_status(&controller.snapshot())?;
            }
            _ = tokio::signal::ctrl_c() => {
                controller.pause();
                println!();
                break;
            }
        }
    }

    Ok(())
}

fn print_status(snapshot: &SessionSnapshot) -> Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "\r{}   ", render_progress(snapshot))?;
    out.flush()?;
    Ok(())
}

// ============================================================
// Bows
// ============================================================

/// Asks on the terminal and reads a y/n answer.
struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes" | "예" | "네"),
            Err(_) => false,
        }
    }
}

/// Count bows from the terminal: Enter taps, `r` resets, `q` quits.
pub async fn bow(cues: Arc<dyn CueSink>, db: Database) -> Result<()> {
    tokio::task::spawn_blocking(move || bow_loop(cues.as_ref(), &db))
        .await
        .context("Bows loop panicked")?
}

fn bow_loop(cues: &dyn CueSink, db: &Database) -> Result<()> {
    let mut counter = BowCounter::new();
    println!("108 bows. [Enter] bow  [r] reset  [q] quit");
    println!("{}", render_bows(&counter.snapshot()));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "q" | "quit" => break,
            "r" | "reset" => {
                counter.reset(&TerminalConfirmation);
            }
            _ => match counter.tap(cues) {
                TapOutcome::Completed => {
                    db.record_practice(PracticeKind::Bows, counter.count(), today())?;
                }
                TapOutcome::Counted | TapOutcome::Rejected => {}
            },
        }
        println!("{}", render_bows(&counter.snapshot()));
    }
    Ok(())
}

// ============================================================
// Quote and scriptures
// ============================================================

pub async fn quote(db: Database, service: Option<Arc<dyn ChatService>>) -> Result<()> {
    let quote = QuoteKeeper::new(db, service).today(today()).await;
    println!("{}", render_quote(&quote));
    Ok(())
}

/// Print one scripture, or the list when `id` is `None`.
pub fn sutra(id: Option<&str>) -> Result<()> {
    match id {
        None => {
            for s in scripture::summaries() {
                println!("{:<10} {}  {}", s.id, s.title, s.short_description);
            }
        }
        Some(id) => {
            let text = scripture::find(id)
                .ok_or_else(|| anyhow::anyhow!("No scripture with id '{}'", id))?;
            println!("{}\n\n{}", text.title, text.content);
        }
    }
    Ok(())
}

// ============================================================
// Counsel
// ============================================================

/// Chat with the counselor, printing replies as they stream in.
pub async fn chat(service: Option<Arc<dyn ChatService>>) -> Result<()> {
    let counselor = Counselor::new(ChatSession::open(service, MONK_INSTRUCTION));
    for message in counselor.messages() {
        println!("🪷 {}\n", message.text);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = input.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        print!("🪷 ");
        let reply = counselor
            .ask_streaming(&line, |fragment| {
                print!("{}", fragment);
                let _ = io::stdout().flush();
            })
            .await;
        if let Err(e) = reply {
            tracing::warn!("Counsel request not recorded: {}", e);
        }
        println!("\n");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meditation::progress;

    fn snapshot(remaining: u32, total: u32, running: bool) -> SessionSnapshot {
        let session = MeditationSession {
            total_seconds: total,
            remaining_seconds: remaining,
            running,
        };
        SessionSnapshot {
            total_seconds: total,
            remaining_seconds: remaining,
            running,
            phase: session.phase(),
            progress: progress::project(remaining, total),
            clock: progress::format_clock(remaining),
            preset_minutes: None,
            completed_runs: 0,
        }
    }

    #[test]
    fn progress_line_starts_empty() {
        let line = render_progress(&snapshot(600, 600, false));
        assert!(line.starts_with(&EMPTY.to_string().repeat(BAR_WIDTH)));
        assert!(line.ends_with("  0%  10:00  (idle)"));
    }

    #[test]
    fn progress_line_fills_at_completion() {
        let line = render_progress(&snapshot(0, 300, false));
        assert!(line.starts_with(&FILLED.to_string().repeat(BAR_WIDTH)));
        assert!(line.contains("100%  0:00  (completed)"));
    }

    #[test]
    fn progress_line_half_way() {
        let line = render_progress(&snapshot(150, 300, true));
        assert_eq!(line.chars().filter(|c| *c == FILLED).count(), BAR_WIDTH / 2);
        assert!(line.contains(" 50%  2:30  (running)"));
    }

    #[test]
    fn bows_line_marks_completion() {
        let done = BowCount {
            count: 108,
            ceiling: 108,
            completed: true,
        };
        assert!(render_bows(&done).contains("complete"));
        let partial = BowCount {
            count: 7,
            ceiling: 108,
            completed: false,
        };
        assert_eq!(render_bows(&partial), "   7 / 108");
    }

    #[test]
    fn quote_renders_author_on_own_line() {
        let quote = DailyQuote {
            date: chrono::NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            text: "고요함".into(),
            author: Some("붓다".into()),
            origin: QuoteOrigin::Cached,
        };
        assert_eq!(render_quote(&quote), "\"고요함\"\n    - 붓다");
    }

    #[test]
    fn commands_parse() {
        assert!(matches!(parse_command(""), Some(Command::Toggle)));
        assert!(matches!(parse_command(" r "), Some(Command::Reset)));
        assert!(matches!(parse_command("q"), Some(Command::Quit)));
        assert!(parse_command("dance").is_none());
    }
}
