/// Riddle content and the modal prompt seam.
///
/// The engine never owns trivia: it asks a `RiddleBook` for content by id
/// and hands it to a `RiddlePrompt`, which blocks until the avatar answers
/// or escapes. `RiddleBank` is the stock book: five built-in riddles, or a
/// TOML file of `[[riddle]]` tables.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const OPTION_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Riddle {
    pub id: u32,
    pub question: String,
    pub options: [String; OPTION_COUNT],
    /// Index into `options`.
    pub correct: usize,
}

impl Riddle {
    pub fn new(id: u32, question: &str, options: [&str; OPTION_COUNT], correct: usize) -> Self {
        Riddle {
            id,
            question: question.to_string(),
            options: options.map(str::to_string),
            correct,
        }
    }

    pub fn check(&self, answer: usize) -> bool {
        answer == self.correct
    }
}

/// Content provider keyed by riddle id.
pub trait RiddleBook {
    fn riddle(&self, id: u32) -> Option<&Riddle>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PromptReply {
    /// Zero-based option index.
    Answer(usize),
    Escape,
}

/// Blocking modal interaction. The tick loop is suspended while it runs.
pub trait RiddlePrompt {
    fn ask(&mut self, riddle: &Riddle) -> PromptReply;

    /// Content for `riddle_id` could not be found; show it in place.
    fn report_missing(&mut self, _riddle_id: u32) {}

    /// Feedback after a judged answer.
    fn feedback(&mut self, _correct: bool) {}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RiddleOutcome {
    Solved,
    Wrong,
    Escaped,
    Missing,
}

/// Run one riddle interaction end to end.
pub fn challenge(book: &dyn RiddleBook, prompt: &mut dyn RiddlePrompt, riddle_id: u32) -> RiddleOutcome {
    let Some(riddle) = book.riddle(riddle_id) else {
        log::warn!("riddle {} has no content", riddle_id);
        prompt.report_missing(riddle_id);
        return RiddleOutcome::Missing;
    };
    match prompt.ask(riddle) {
        PromptReply::Escape => RiddleOutcome::Escaped,
        PromptReply::Answer(a) => {
            let correct = riddle.check(a);
            log::debug!("riddle {} answered {} ({})", riddle_id, a, if correct { "right" } else { "wrong" });
            prompt.feedback(correct);
            if correct {
                RiddleOutcome::Solved
            } else {
                RiddleOutcome::Wrong
            }
        }
    }
}

// ── Riddle bank ──

#[derive(Debug, Error)]
pub enum RiddleError {
    #[error("cannot read riddle file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse riddle file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("riddle {id} has {count} options, expected 4")]
    OptionCount { id: u32, count: usize },
    #[error("riddle {id} marks option {answer} correct, out of range")]
    AnswerOutOfRange { id: u32, answer: usize },
}

#[derive(Deserialize)]
struct RiddleFile {
    #[serde(default)]
    riddle: Vec<RiddleEntry>,
}

#[derive(Deserialize)]
struct RiddleEntry {
    id: u32,
    question: String,
    options: Vec<String>,
    answer: usize,
}

#[derive(Clone, Debug)]
pub struct RiddleBank {
    riddles: Vec<Riddle>,
}

impl Default for RiddleBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RiddleBank {
    pub fn builtin() -> Self {
        RiddleBank {
            riddles: vec![
                Riddle::new(0, "What has keys but can't open locks?",
                    ["A Piano", "A Map", "A Tree", "A Clock"], 0),
                Riddle::new(1, "What runs but never walks?",
                    ["A River", "A Clock", "A Machine", "A Person"], 0),
                Riddle::new(2, "What gets wetter as it dries?",
                    ["A Towel", "A Sponge", "A Desert", "A Fire"], 0),
                Riddle::new(3, "What can speak without a mouth?",
                    ["An Echo", "A Shadow", "A Memory", "A Dream"], 0),
                Riddle::new(4, "What is always coming but never arrives?",
                    ["The Future", "Yesterday", "Tomorrow", "A Dream"], 2),
            ],
        }
    }

    pub fn from_toml_str(src: &str) -> Result<Self, RiddleError> {
        let file: RiddleFile = toml::from_str(src)?;
        let mut riddles = Vec::with_capacity(file.riddle.len());
        for entry in file.riddle {
            let count = entry.options.len();
            let options: [String; OPTION_COUNT] = entry
                .options
                .try_into()
                .map_err(|_| RiddleError::OptionCount { id: entry.id, count })?;
            if entry.answer >= OPTION_COUNT {
                return Err(RiddleError::AnswerOutOfRange { id: entry.id, answer: entry.answer });
            }
            riddles.push(Riddle { id: entry.id, question: entry.question, options, correct: entry.answer });
        }
        Ok(RiddleBank { riddles })
    }

    pub fn load(path: &Path) -> Result<Self, RiddleError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }

    /// Load `path` if given, falling back to the built-in set on any error.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            None => Self::builtin(),
            Some(p) => match Self::load(p) {
                Ok(bank) => {
                    log::info!("loaded {} riddles from {}", bank.len(), p.display());
                    bank
                }
                Err(e) => {
                    log::warn!("{}; using built-in riddles", e);
                    Self::builtin()
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.riddles.len()
    }
}

impl RiddleBook for RiddleBank {
    fn riddle(&self, id: u32) -> Option<&Riddle> {
        self.riddles.iter().find(|r| r.id == id)
    }
}
