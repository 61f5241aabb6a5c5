//! Recognizers for closed choices, yes/no answers and numbers.

use serde::{Deserialize, Serialize};

/// One option of a closed-choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms = synonyms.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Build plain choices from their values.
pub fn to_choices(values: &[&str]) -> Vec<Choice> {
    values.iter().map(|v| Choice::new(*v)).collect()
}

/// A recognized choice and its position in the offered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundChoice {
    pub index: usize,
    pub value: String,
}

const YES: &[&str] = &["yes", "y", "yeah", "yep", "sure", "ok", "okay", "true"];
const NO: &[&str] = &["no", "n", "nope", "nah", "false"];
// `t` is what is left of "don't" or "can't" after tokenizing.
const NEGATIONS: &[&str] = &["not", "never", "t", "dont", "cant", "wont"];

/// Render choices inline: `(1) Car, (2) Bus, or (3) Bicycle`.
pub fn inline_list(choices: &[Choice]) -> String {
    let items: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("({}) {}", i + 1, c.value))
        .collect();

    match items.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

/// Match `input` against `choices`.
///
/// Tried in order: exact value or synonym (case-insensitive), 1-based
/// ordinal, then a value or synonym appearing as whole words inside the
/// input. A phrase matching more than one choice is not recognized.
pub fn recognize_choice(input: &str, choices: &[Choice]) -> Option<FoundChoice> {
    let wanted = input.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let found = |index: usize| FoundChoice {
        index,
        value: choices[index].value.clone(),
    };

    if let Some(index) = choices.iter().position(|c| {
        labels(c).any(|label| label.eq_ignore_ascii_case(&wanted))
    }) {
        return Some(found(index));
    }

    if let Ok(ordinal) = wanted.parse::<usize>()
        && (1..=choices.len()).contains(&ordinal)
    {
        return Some(found(ordinal - 1));
    }

    let words = tokenize(&wanted);
    let mut matches = choices.iter().enumerate().filter(|(_, c)| {
        labels(c).any(|label| contains_phrase(&words, &tokenize(&label.to_lowercase())))
    });
    match (matches.next(), matches.next()) {
        (Some((index, _)), None) => Some(found(index)),
        _ => None,
    }
}

/// Parse a yes/no answer. `1` and `2` select yes and no, matching the
/// `(1) Yes or (2) No` rendering.
///
/// A whole-answer match wins. Otherwise the answer must contain words of
/// only one polarity and no negation, so "not sure" and "yes and no" are
/// not recognized.
pub fn recognize_confirm(input: &str) -> Option<bool> {
    let wanted = input.trim().to_lowercase();
    match wanted.as_str() {
        "1" => return Some(true),
        "2" => return Some(false),
        w if YES.contains(&w) => return Some(true),
        w if NO.contains(&w) => return Some(false),
        _ => {},
    }

    let words = tokenize(&wanted);
    if words.iter().any(|w| NEGATIONS.contains(&w.as_str())) {
        return None;
    }
    let yes = words.iter().any(|w| YES.contains(&w.as_str()));
    let no = words.iter().any(|w| NO.contains(&w.as_str()));
    match (yes, no) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// First number in the input (`42`, `-3`, `41.5`, `I am 42.`).
pub fn recognize_number(input: &str) -> Option<f64> {
    input
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !(c.is_ascii_digit() || c == '-' || c == '.'))
                .trim_end_matches('.')
        })
        .filter(|word| !word.is_empty())
        .find_map(|word| word.parse::<f64>().ok().filter(|n| n.is_finite()))
}

fn labels(choice: &Choice) -> impl Iterator<Item = &str> {
    std::iter::once(choice.value.as_str()).chain(choice.synonyms.iter().map(String::as_str))
}

fn tokenize(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && words.windows(phrase.len()).any(|w| w == phrase)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn transport() -> Vec<Choice> {
        to_choices(&["Car", "Bus", "Bicycle"])
    }

    #[rstest]
    #[case("Car", Some(0))]
    #[case("bus", Some(1))]
    #[case("  BICYCLE ", Some(2))]
    #[case("3", Some(2))]
    #[case("I'll take the bus", Some(1))]
    #[case("4", None)]
    #[case("0", None)]
    #[case("plane", None)]
    #[case("car or bus", None)]
    #[case("", None)]
    fn recognizes_transport(#[case] input: &str, #[case] expected: Option<usize>) {
        assert_eq!(
            recognize_choice(input, &transport()).map(|f| f.index),
            expected
        );
    }

    #[test]
    fn recognizes_synonyms() {
        let choices = vec![
            Choice::new("Normal (State Properly Stored)").with_synonyms(&["normal"]),
            Choice::new("State Stored Globally").with_synonyms(&["global", "globally"]),
        ];
        let found = recognize_choice("Global", &choices).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.value, "State Stored Globally");
    }

    #[rstest]
    #[case("Yes", Some(true))]
    #[case("yep, go ahead", Some(true))]
    #[case("1", Some(true))]
    #[case("No", Some(false))]
    #[case("2", Some(false))]
    #[case("nope", Some(false))]
    #[case("11", None)]
    #[case("maybe", None)]
    #[case("not sure", None)]
    #[case("I don't know", None)]
    #[case("yes and no", None)]
    #[case("no way", Some(false))]
    #[case("  OK ", Some(true))]
    fn recognizes_confirm(#[case] input: &str, #[case] expected: Option<bool>) {
        assert_eq!(recognize_confirm(input), expected);
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case("I am 42.", Some(42.0))]
    #[case("-1", Some(-1.0))]
    #[case("41.5", Some(41.5))]
    #[case("forty two", None)]
    #[case("", None)]
    fn recognizes_numbers(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(recognize_number(input), expected);
    }

    #[test]
    fn renders_inline_lists() {
        assert_eq!(inline_list(&transport()), "(1) Car, (2) Bus, or (3) Bicycle");
        assert_eq!(inline_list(&to_choices(&["Yes", "No"])), "(1) Yes or (2) No");
        assert_eq!(inline_list(&to_choices(&["Only"])), "(1) Only");
        assert_eq!(inline_list(&[]), "");
    }
}
