//! Question cards and the text block format they are authored in

use std::fmt;
use std::str::FromStr;

/// How hard a question is meant to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Kind of answer a question collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QuestionType {
    Slider,
    Short,
    Mc,
    Match,
    Rank,
    Ai,
}

/// How answering participants are shown next to the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DisplayType {
    Face,
    Initial,
    #[default]
    Anonymous,
}

macro_rules! tagged_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $text:literal = $tag:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the lowercase name used in question files
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Returns the single-byte tag used in the snapshot container
            pub fn tag(&self) -> u8 {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }

            /// Looks up a value from its container tag
            pub fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl FromStr for $ty {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseError::UnknownValue {
                        field: $what,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tagged_enum!(Difficulty, "difficulty", {
    Easy => "easy" = 0,
    Medium => "medium" = 1,
    Hard => "hard" = 2,
});

tagged_enum!(QuestionType, "type", {
    Slider => "slider" = 0,
    Short => "short" = 1,
    Mc => "mc" = 2,
    Match => "match" = 3,
    Rank => "rank" = 4,
    Ai => "ai" = 5,
});

tagged_enum!(DisplayType, "display", {
    Face => "face" = 0,
    Initial => "initial" = 1,
    Anonymous => "anonymous" = 2,
});

/// An interactive prompt shown while a question segment is active.
///
/// Questions are immutable once placed on the timeline; editing one means
/// replacing the whole value held by the segment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Question {
    pub id: String,
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answers: Vec<String>,
    pub difficulty: Difficulty,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub question_type: QuestionType,
    pub display_type: DisplayType,
    pub show_winner: bool,
    pub live: bool,
    /// Grouping key for question libraries
    pub associated_tab: Option<u32>,
}

impl Question {
    /// Creates a question with a fresh id and default display options
    pub fn new(question: impl Into<String>, difficulty: Difficulty, question_type: QuestionType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            answers: Vec::new(),
            correct_answers: Vec::new(),
            difficulty,
            question_type,
            display_type: DisplayType::default(),
            show_winner: false,
            live: false,
            associated_tab: None,
        }
    }

    /// Adds an answer option
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answers.push(answer.into());
        self
    }

    /// Parses one block of tagged lines into a question
    pub fn parse_block(block: &str) -> Result<Self, ParseError> {
        let mut text = None;
        let mut difficulty = None;
        let mut question_type = None;
        let mut display_type = None;
        let mut show_winner = false;
        let mut live = false;
        let mut associated_tab = None;
        let mut answers = Vec::new();
        let mut correct_answers = Vec::new();

        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(value) = strip_tag(line, "Q:") {
                text.get_or_insert_with(|| value.to_string());
            } else if let Some(value) = strip_tag(line, "D:") {
                if difficulty.is_none() {
                    difficulty = Some(value.parse::<Difficulty>()?);
                }
            } else if let Some(value) = strip_tag(line, "T:") {
                if question_type.is_none() {
                    question_type = Some(value.parse::<QuestionType>()?);
                }
            } else if let Some(value) = strip_tag(line, "A:") {
                answers.push(value.to_string());
            } else if let Some(value) = strip_tag(line, "Correct:") {
                correct_answers.push(value.to_string());
            } else if let Some(value) = strip_tag(line, "Display:") {
                display_type = Some(value.parse::<DisplayType>()?);
            } else if let Some(value) = strip_tag(line, "Winner:") {
                show_winner = value.eq_ignore_ascii_case("true");
            } else if let Some(value) = strip_tag(line, "Live:") {
                live = value.eq_ignore_ascii_case("true");
            } else if let Some(value) = strip_tag(line, "Tab:") {
                associated_tab = Some(value.parse::<u32>().map_err(|_| ParseError::UnknownValue {
                    field: "tab",
                    value: value.to_string(),
                })?);
            }
        }

        let text = text.filter(|t| !t.is_empty()).ok_or(ParseError::MissingField("Q:"))?;
        let difficulty = difficulty.ok_or(ParseError::MissingField("D:"))?;
        let question_type = question_type.ok_or(ParseError::MissingField("T:"))?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            question: text,
            answers,
            correct_answers,
            difficulty,
            question_type,
            display_type: display_type.unwrap_or_default(),
            show_winner,
            live,
            associated_tab,
        })
    }
}

fn strip_tag<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.strip_prefix(tag).map(str::trim)
}

/// Error raised for a question block that cannot be turned into a [`Question`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing required line '{0}'")]
    MissingField(&'static str),

    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// Splits a question file into blank-line separated blocks and parses each.
///
/// Every block yields its own result so callers can skip bad blocks and keep
/// the rest.
pub fn parse_questions(text: &str) -> Vec<Result<Question, ParseError>> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks.iter().map(|b| Question::parse_block(b)).collect()
}
