//! A single G-code line and the facts derived for it

use std::collections::BTreeMap;

use nom::bytes::complete::take_while1;
use nom::character::complete::satisfy;
use nom::combinator::all_consuming;
use nom::{IResult, Parser};

use crate::core::error::{Result, WizardError};
use crate::facts::{Facts, ToolId};

/// Motion verbs whose X/Y/F words update the kinematic state
pub const MOTION_VERBS: [&str; 4] = ["G0", "G1", "G2", "G3"];

/// Parameter letter carrying the tool number
pub const TOOL_LETTER: char = 'T';

/// Value of a single-letter parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Tool numbers (`T` words)
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Int(value) => value as f64,
            ParamValue::Float(value) => value,
        }
    }
}

/// What a verb means to the passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Blank, comment-only, or unparseable line
    Passthrough,
    Motion,
    ToolSelect,
    /// `M104` / `M109`
    HeaterSet,
    /// `M106`
    FanSet,
    /// `M107`
    FanOff,
    Other,
}

impl CommandKind {
    pub fn classify(verb: Option<&str>) -> Self {
        match verb {
            None => Self::Passthrough,
            Some(verb) if MOTION_VERBS.contains(&verb) => Self::Motion,
            Some(verb) if verb.starts_with(TOOL_LETTER) => Self::ToolSelect,
            Some("M104" | "M109") => Self::HeaterSet,
            Some("M106") => Self::FanSet,
            Some("M107") => Self::FanOff,
            Some(_) => Self::Other,
        }
    }
}

/// One input line: its parsed words plus everything the passes derive
#[derive(Debug, Clone)]
pub struct Command {
    /// 1-based line number in the input
    pub line: usize,
    /// Original text without trailing whitespace
    pub raw: String,
    /// Exact bytes of `raw` when the line was not valid UTF-8
    pub raw_bytes: Option<Vec<u8>>,
    pub verb: Option<String>,
    pub params: BTreeMap<char, ParamValue>,
    pub facts: Facts,
    /// Synthesized lines emitted before `raw`
    pub pre: Vec<String>,
    /// Synthesized lines emitted after `raw`
    pub post: Vec<String>,
}

/// `<A-Z><number chars>`, split into letter and number text
fn word(input: &str) -> IResult<&str, (char, &str)> {
    all_consuming((
        satisfy(|c: char| c.is_ascii_uppercase()),
        take_while1(|c: char| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')),
    ))
    .parse(input)
}

fn parse_word(text: &str) -> Option<(char, ParamValue)> {
    let (_, (letter, number)) = word(text).ok()?;
    let value = if letter == TOOL_LETTER {
        ParamValue::Int(number.parse().ok()?)
    } else {
        ParamValue::Float(number.parse().ok()?)
    };
    Some((letter, value))
}

/// Split a line into its verb and parameters
///
/// Returns `None` when any word fails to parse, or when the line has no words.
fn parse_words(text: &str) -> Option<(String, BTreeMap<char, ParamValue>)> {
    let code = text.split(';').next().unwrap_or("");
    let mut words = code.split_whitespace();

    let first = words.next()?;
    let mut params = BTreeMap::new();
    let (letter, value) = parse_word(first)?;
    params.insert(letter, value);

    for token in words {
        let (letter, value) = parse_word(token)?;
        params.insert(letter, value);
    }

    Some((first.to_string(), params))
}

impl Command {
    /// Parse one line. Lines that don't parse become passthrough commands.
    pub fn parse(line: usize, text: &str) -> Self {
        let raw = text.trim_end().to_string();
        let (verb, params) = match parse_words(&raw) {
            Some((verb, params)) => (Some(verb), params),
            None => (None, BTreeMap::new()),
        };

        if verb.is_none() && !raw.split(';').next().unwrap_or("").trim().is_empty() {
            tracing::trace!(line, raw = %raw, "Unparseable line passed through");
        }

        Self {
            line,
            raw,
            raw_bytes: None,
            verb,
            params,
            facts: Facts::new(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Parse a line that is not valid UTF-8
    ///
    /// Words are read from a lossy decoding; the original bytes are kept so
    /// the line is written back unchanged.
    pub fn parse_bytes(line: usize, bytes: &[u8]) -> Self {
        let raw_bytes = bytes.trim_ascii_end().to_vec();
        let mut command = Self::parse(line, &String::from_utf8_lossy(&raw_bytes));
        command.raw_bytes = Some(raw_bytes);
        command
    }

    /// Bytes written to the output for this line
    pub fn raw_output(&self) -> &[u8] {
        self.raw_bytes.as_deref().unwrap_or(self.raw.as_bytes())
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::classify(self.verb.as_deref())
    }

    /// Numeric parameter, if present
    pub fn param(&self, letter: char) -> Option<f64> {
        self.params.get(&letter).map(ParamValue::as_f64)
    }

    /// Numeric parameter this command cannot do without
    pub fn require(&self, letter: char) -> Result<f64> {
        self.param(letter).ok_or_else(|| self.missing(letter))
    }

    /// The `T` parameter of a tool-select or heater-set command
    pub fn tool(&self) -> Result<ToolId> {
        match self.params.get(&TOOL_LETTER) {
            Some(ParamValue::Int(tool)) => Ok(*tool),
            _ => Err(self.missing(TOOL_LETTER)),
        }
    }

    /// Drop all derived state, keeping only what was parsed
    pub fn reset(&mut self) {
        self.facts = Facts::new();
        self.pre.clear();
        self.post.clear();
    }

    fn missing(&self, letter: char) -> WizardError {
        WizardError::MissingParameter {
            line: self.line,
            verb: self.verb.clone().unwrap_or_default(),
            letter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_motion_line() {
        let cmd = Command::parse(1, "G1 X10.5 Y-2 F6000 ; travel\n");
        assert_eq!(cmd.raw, "G1 X10.5 Y-2 F6000 ; travel");
        assert_eq!(cmd.verb.as_deref(), Some("G1"));
        assert_eq!(cmd.kind(), CommandKind::Motion);
        assert_eq!(cmd.param('X'), Some(10.5));
        assert_eq!(cmd.param('Y'), Some(-2.0));
        assert_eq!(cmd.param('F'), Some(6000.0));
        // The verb word is kept as a parameter too
        assert_eq!(cmd.param('G'), Some(1.0));
    }

    #[test]
    fn test_tool_word_is_integer() {
        let cmd = Command::parse(3, "T1");
        assert_eq!(cmd.kind(), CommandKind::ToolSelect);
        assert_eq!(cmd.params.get(&'T'), Some(&ParamValue::Int(1)));
        assert_eq!(cmd.tool().unwrap(), 1);
    }

    #[test]
    fn test_fractional_tool_number_is_unparseable() {
        let cmd = Command::parse(1, "T1.5");
        assert_eq!(cmd.verb, None);
        assert_eq!(cmd.kind(), CommandKind::Passthrough);
    }

    #[test]
    fn test_blank_and_comment_lines_have_no_verb() {
        assert_eq!(Command::parse(1, "").kind(), CommandKind::Passthrough);
        assert_eq!(Command::parse(2, "   ").kind(), CommandKind::Passthrough);
        assert_eq!(Command::parse(3, "; layer 2").kind(), CommandKind::Passthrough);
    }

    #[test]
    fn test_any_bad_word_discards_the_whole_line() {
        let cmd = Command::parse(1, "G1 X10 hello");
        assert_eq!(cmd.verb, None);
        assert!(cmd.params.is_empty());

        let cmd = Command::parse(2, "G1 x10");
        assert_eq!(cmd.verb, None);

        let cmd = Command::parse(3, "G1 X");
        assert_eq!(cmd.verb, None);
    }

    #[test]
    fn test_heater_and_fan_kinds() {
        assert_eq!(Command::parse(1, "M104 T1 S200").kind(), CommandKind::HeaterSet);
        assert_eq!(Command::parse(1, "M109 T0 S210").kind(), CommandKind::HeaterSet);
        assert_eq!(Command::parse(1, "M106 S255").kind(), CommandKind::FanSet);
        assert_eq!(Command::parse(1, "M107").kind(), CommandKind::FanOff);
        assert_eq!(Command::parse(1, "G28").kind(), CommandKind::Other);
        // Only the exact motion verbs count
        assert_eq!(Command::parse(1, "G01 X1").kind(), CommandKind::Other);
    }

    #[test]
    fn test_missing_parameter_is_reported_with_line() {
        let cmd = Command::parse(7, "M104 S200");
        match cmd.tool() {
            Err(WizardError::MissingParameter { line, verb, letter }) => {
                assert_eq!(line, 7);
                assert_eq!(verb, "M104");
                assert_eq!(letter, 'T');
            }
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_non_utf8_comment_keeps_words_and_bytes() {
        let cmd = Command::parse_bytes(4, b"G1 X0 Y0 F60 ; 200\xb0C\r");
        assert_eq!(cmd.kind(), CommandKind::Motion);
        assert_eq!(cmd.param('F'), Some(60.0));
        assert_eq!(cmd.raw_output(), b"G1 X0 Y0 F60 ; 200\xb0C");
    }

    #[test]
    fn test_non_utf8_word_is_passthrough() {
        let cmd = Command::parse_bytes(1, b"G1 X\xff1");
        assert_eq!(cmd.kind(), CommandKind::Passthrough);
        assert_eq!(cmd.raw_output(), b"G1 X\xff1");
    }

    #[test]
    fn test_last_duplicate_letter_wins() {
        let cmd = Command::parse(1, "G1 X1 X2");
        assert_eq!(cmd.param('X'), Some(2.0));
    }
}
