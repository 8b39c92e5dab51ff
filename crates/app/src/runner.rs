//! Line-oriented terminal front end for taking one assignment.

use std::fmt::Write as _;
use std::sync::Arc;

use services::{LiveQuiz, QuizEvent, QuizService, QuizServiceError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tutor_core::model::{AnswerSlot, AnswerValue, AssignmentId, Question, QuizSession};

const HELP: &str = "commands: n next | p prev | g <n> go to | a <answer> answer | \
t <option> toggle | s submit | q save and quit | h help";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Prev,
    GoTo(usize),
    Answer(String),
    Toggle(String),
    Submit,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match cmd {
        "n" => Ok(Input::Next),
        "p" => Ok(Input::Prev),
        "g" => rest
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .map(Input::GoTo)
            .ok_or_else(|| format!("expected a question number, got {rest:?}")),
        "a" => Ok(Input::Answer(rest.to_owned())),
        "t" if !rest.is_empty() => Ok(Input::Toggle(rest.to_owned())),
        "t" => Err("t needs an option".into()),
        "s" => Ok(Input::Submit),
        "q" => Ok(Input::Quit),
        "h" | "?" | "" => Ok(Input::Help),
        other => Err(format!("unknown command {other:?}")),
    }
}

/// Map a 1-based option number to its label; anything else passes through.
fn resolve_option(question: &Question, raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.choices().get(i))
        .cloned()
        .unwrap_or_else(|| raw.to_owned())
}

fn render(session: &QuizSession) -> String {
    let progress = session.progress();
    let question = session.current_question();
    let slot = session.answer(progress.cursor);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n[{}/{}] answered {} · {} {}",
        progress.cursor + 1,
        progress.total,
        progress.answered,
        if session.timer().is_countdown() { "left" } else { "elapsed" },
        session.timer(),
    );
    let _ = writeln!(
        out,
        "{} ({}, {} pt)",
        question.prompt(),
        question.kind().label(),
        question.points()
    );
    for (i, choice) in question.choices().iter().enumerate() {
        let mark = if slot.is_some_and(|s| s.contains(choice)) { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {}) {choice}", i + 1);
    }
    if let Some(AnswerSlot::Text(text)) = slot {
        if question.choices().is_empty() {
            let _ = writeln!(out, "  answer: {text}");
        }
    }
    out
}

/// Apply one edit or navigation command to the session.
fn apply(session: &mut QuizSession, input: &Input) -> Result<(), String> {
    let cursor = session.cursor();
    let result = match input {
        Input::Next => session.next(),
        Input::Prev => session.prev(),
        Input::GoTo(index) => session.go_to(*index),
        Input::Answer(raw) => {
            let value = resolve_option(session.current_question(), raw);
            session.set_answer(cursor, AnswerValue::from(value))
        }
        Input::Toggle(raw) => {
            let option = resolve_option(session.current_question(), raw);
            session.toggle(cursor, &option)
        }
        Input::Submit | Input::Quit | Input::Help => Ok(()),
    };
    result.map_err(|e| e.to_string())
}

enum Flow {
    Continue,
    Done,
}

fn report_event(event: QuizEvent) -> Flow {
    match event {
        QuizEvent::Tick(_) => Flow::Continue,
        QuizEvent::Warning(warning) => {
            println!("!! {}", warning.message());
            Flow::Continue
        }
        QuizEvent::TimeUp => {
            println!("Time is up. Submitting your answers...");
            Flow::Continue
        }
        QuizEvent::Submitted(score) => {
            println!(
                "Submitted: {} / {} ({:.1}%)",
                score.scored_points, score.total_points, score.percentage
            );
            Flow::Done
        }
        QuizEvent::SubmitFailed(reason) => {
            println!("Submission failed: {reason}. Type s to retry.");
            Flow::Continue
        }
        QuizEvent::Expired => {
            println!("The due date has passed; this assignment can no longer be submitted.");
            Flow::Done
        }
    }
}

async fn submit(live: &mut LiveQuiz) -> Flow {
    match live.submit().await {
        Ok(score) => report_event(QuizEvent::Submitted(score)),
        Err(err) if err.is_expired() => report_event(QuizEvent::Expired),
        Err(QuizServiceError::Session(err)) => {
            println!("Cannot submit: {err}");
            Flow::Continue
        }
        Err(err) => report_event(QuizEvent::SubmitFailed(err.to_string())),
    }
}

/// Take `assignment_id` interactively until it is submitted, expired or closed.
///
/// # Errors
///
/// Returns an error if the assignment cannot be opened, stdin fails, or the
/// closing checkpoint cannot be written.
pub async fn take(
    service: Arc<QuizService>,
    assignment_id: &AssignmentId,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = service.open(assignment_id).await?;
    if session.was_resumed() {
        println!("Resuming your saved progress.");
    }
    println!("{}", session.assignment().title());
    println!("{HELP}");
    print!("{}", render(&session));

    let (mut live, mut events) = LiveQuiz::start(service, session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Flow::Done = report_event(event) {
                    return Ok(());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };

                if confirming {
                    confirming = false;
                    if line.trim().eq_ignore_ascii_case("y") {
                        if let Flow::Done = submit(&mut live).await {
                            return Ok(());
                        }
                    } else {
                        println!("Submission cancelled.");
                    }
                    continue;
                }

                let input = match parse_input(&line) {
                    Ok(input) => input,
                    Err(msg) => {
                        println!("{msg}\n{HELP}");
                        continue;
                    }
                };
                match input {
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Submit => {
                        let unanswered = live.with_session(|s| s.count_unanswered()).await;
                        if unanswered > 0 {
                            println!("{unanswered} question(s) unanswered. Submit anyway? (y/n)");
                            confirming = true;
                        } else if let Flow::Done = submit(&mut live).await {
                            return Ok(());
                        }
                    }
                    edit => {
                        let outcome = live
                            .with_session(|s| apply(s, &edit).map(|()| render(s)))
                            .await;
                        match outcome {
                            Ok(view) => print!("{view}"),
                            Err(msg) => println!("{msg}"),
                        }
                    }
                }
            }
        }
    }

    if live.close().await? {
        println!("Progress saved. Run `take` again to continue.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::{Assignment, QuestionId, QuestionKind};
    use tutor_core::time::fixed_now;

    fn session() -> QuizSession {
        let q = Question::new(
            QuestionId::new("q1").unwrap(),
            QuestionKind::MultiSelect,
            "Primes?",
            vec!["2".into(), "4".into(), "5".into()],
            1.0,
        )
        .unwrap();
        let assignment =
            Assignment::new(AssignmentId::new("cw").unwrap(), "Numbers", vec![q]).unwrap();
        QuizSession::start(assignment, None, fixed_now()).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("g 3"), Ok(Input::GoTo(2)));
        assert_eq!(parse_input(" a  hello world "), Ok(Input::Answer("hello world".into())));
        assert_eq!(parse_input("t B"), Ok(Input::Toggle("B".into())));
        assert!(parse_input("g 0").is_err());
        assert!(parse_input("x").is_err());
    }

    #[test]
    fn toggle_by_number_uses_choice_label() {
        let mut session = session();
        apply(&mut session, &Input::Toggle("3".into())).unwrap();
        apply(&mut session, &Input::Toggle("2".into())).unwrap();
        let slot = session.answer(0).unwrap();
        assert!(slot.contains("5") && slot.contains("4") && !slot.contains("2"));
        assert!(render(&session).contains("[x] 3) 5"));
    }
}
