//! Plate text normalization and format matching.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Letter,
    Digit,
}

impl CharClass {
    fn of(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(CharClass::Letter)
        } else if c.is_ascii_digit() {
            Some(CharClass::Digit)
        } else {
            None
        }
    }
}

/// A run of `min..=max` characters of one class.
#[derive(Debug, Clone, Copy)]
struct Segment {
    class: CharClass,
    min: usize,
    max: usize,
}

const fn letters(min: usize, max: usize) -> Segment {
    Segment {
        class: CharClass::Letter,
        min,
        max,
    }
}

const fn digits(min: usize, max: usize) -> Segment {
    Segment {
        class: CharClass::Digit,
        min,
        max,
    }
}

/// A known plate layout: alternating letter/digit runs.
#[derive(Debug)]
pub struct PlateFormat {
    pub name: &'static str,
    segments: &'static [Segment],
}

/// Recognized layouts, tried in order.
pub static PLATE_FORMATS: &[PlateFormat] = &[
    PlateFormat {
        name: "letter-digits6",
        segments: &[letters(1, 1), digits(6, 6)],
    },
    PlateFormat {
        name: "letters2-digits5to6",
        segments: &[letters(2, 2), digits(5, 6)],
    },
    PlateFormat {
        name: "digits3-letters1to2-digits3to5",
        segments: &[digits(3, 3), letters(1, 2), digits(3, 5)],
    },
    PlateFormat {
        name: "digits4-letters2-digits2",
        segments: &[digits(4, 4), letters(2, 2), digits(2, 2)],
    },
    PlateFormat {
        name: "letters2-digits6",
        segments: &[letters(2, 2), digits(6, 6)],
    },
];

impl PlateFormat {
    /// Full-string match. Adjacent segments always differ in class, so
    /// splitting the text into same-class runs is enough.
    fn matches(&self, runs: &[(CharClass, usize)]) -> bool {
        runs.len() == self.segments.len()
            && runs
                .iter()
                .zip(self.segments)
                .all(|(&(class, len), seg)| class == seg.class && (seg.min..=seg.max).contains(&len))
    }
}

/// Split into maximal runs of one class. `None` if any character is
/// neither an ASCII uppercase letter nor a digit.
fn class_runs(text: &str) -> Option<Vec<(CharClass, usize)>> {
    let mut runs: Vec<(CharClass, usize)> = Vec::new();
    for c in text.chars() {
        let class = CharClass::of(c)?;
        match runs.last_mut() {
            Some((last, len)) if *last == class => *len += 1,
            _ => runs.push((class, 1)),
        }
    }
    Some(runs)
}

/// Uppercase and remove every whitespace character.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Plate text that matched one of [`PLATE_FORMATS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlate {
    text: String,
    format: &'static str,
}

impl ValidatedPlate {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Name of the format that accepted this plate.
    pub fn format(&self) -> &'static str {
        self.format
    }
}

impl fmt::Display for ValidatedPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Why a candidate was not accepted. Not an error: rejects are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No text, or only whitespace.
    Empty,
    /// Normalized text that fits no known layout.
    NoMatchingFormat(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("no text"),
            Rejection::NoMatchingFormat(text) => write!(f, "'{}' matches no plate format", text),
        }
    }
}

/// Normalize `raw_text` and accept it if it fits a plate layout.
pub fn validate(raw_text: Option<&str>) -> Result<ValidatedPlate, Rejection> {
    let normalized = normalize(raw_text.unwrap_or_default());
    if normalized.is_empty() {
        return Err(Rejection::Empty);
    }

    let format = class_runs(&normalized)
        .and_then(|runs| PLATE_FORMATS.iter().find(|f| f.matches(&runs)));

    match format {
        Some(format) => Ok(ValidatedPlate {
            text: normalized,
            format: format.name,
        }),
        None => Err(Rejection::NoMatchingFormat(normalized)),
    }
}
