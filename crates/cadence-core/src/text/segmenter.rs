//! Splits text into ordered speech and pause units.

use super::TextUnit;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Inline `[pause:<payload>]` directive, payload validated separately
pub(crate) static PAUSE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[pause:([^\]]*)\]").unwrap());

static PAUSE_PAYLOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

/// Terminator run, optional closing quotes or brackets, then whitespace
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([.!?]+)["'\u{201D}\u{2019})\]]*(\s+)"#).unwrap());

/// Words whose trailing period does not end a sentence (compared lowercase)
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "vs.", "etc.", "e.g.",
    "i.e.", "inc.", "ltd.", "co.", "no.", "vol.", "fig.", "approx.", "gen.", "col.", "lt.",
    "sgt.", "capt.", "rev.",
];

/// Packs sentences into speech units no longer than a character bound
#[derive(Debug, Clone, Copy)]
pub struct TextSegmenter {
    max_chunk_length: usize,
}

impl Default for TextSegmenter {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_CHUNK_LENGTH)
    }
}

impl TextSegmenter {
    /// Create a segmenter; a zero bound is treated as one
    #[must_use]
    pub fn new(max_chunk_length: usize) -> Self {
        Self {
            max_chunk_length: max_chunk_length.max(1),
        }
    }

    /// Upper bound on packed unit length in characters
    #[must_use]
    pub const fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    /// Split text into units in input order
    ///
    /// A directive with a payload that is not a nonnegative decimal is
    /// dropped without leaving a pause or literal text behind.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<TextUnit> {
        let mut units = Vec::new();
        let mut last = 0;

        for caps in PAUSE_DIRECTIVE.captures_iter(text) {
            let Some(directive) = caps.get(0) else {
                continue;
            };
            self.push_speech(&text[last..directive.start()], &mut units);

            let payload = &caps[1];
            match parse_pause(payload) {
                Some(seconds) => units.push(TextUnit::pause(seconds)),
                None => debug!("Dropping pause directive with payload '{}'", payload),
            }
            last = directive.end();
        }
        self.push_speech(&text[last..], &mut units);

        units
    }

    fn push_speech(&self, span: &str, units: &mut Vec<TextUnit>) {
        for paragraph in PARAGRAPH_BREAK.split(span) {
            let mut current = String::new();
            let mut current_len = 0;

            for sentence in split_sentences(paragraph) {
                let sentence_len = sentence.chars().count();
                if current.is_empty() {
                    current.push_str(sentence);
                    current_len = sentence_len;
                } else if current_len + sentence_len + 1 <= self.max_chunk_length {
                    current.push(' ');
                    current.push_str(sentence);
                    current_len += sentence_len + 1;
                } else {
                    units.push(TextUnit::speech(std::mem::take(&mut current)));
                    current.push_str(sentence);
                    current_len = sentence_len;
                }
            }

            if !current.is_empty() {
                units.push(TextUnit::speech(current));
            }
        }
    }
}

/// Split text into units with the given packing bound
#[must_use]
pub fn smart_split(text: &str, max_chunk_length: usize) -> Vec<TextUnit> {
    TextSegmenter::new(max_chunk_length).split(text)
}

fn parse_pause(payload: &str) -> Option<f64> {
    if !PAUSE_PAYLOAD.is_match(payload) {
        return None;
    }
    payload.parse::<f64>().ok().filter(|seconds| seconds.is_finite())
}

/// Sentences of a paragraph, trimmed, empty ones dropped
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for caps in SENTENCE_END.captures_iter(paragraph) {
        let (Some(terminator), Some(space)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if terminator.as_str() == "." && is_abbreviation(&paragraph[start..terminator.end()]) {
            continue;
        }

        let sentence = paragraph[start..space.start()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = space.end();
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Check whether the last word of `text` (ending in a period) is an
/// abbreviation or a single-letter initial
fn is_abbreviation(text: &str) -> bool {
    let word = text
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['"', '\'', '(', '[']);

    let mut chars = word.chars();
    if let (Some(first), Some('.'), None) = (chars.next(), chars.next(), chars.next()) {
        if first.is_alphabetic() {
            return true;
        }
    }

    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::UnitKind;
    use proptest::prelude::*;

    fn contents(units: &[TextUnit]) -> Vec<&str> {
        units.iter().map(TextUnit::content).collect()
    }

    #[test]
    fn test_pause_between_sentences() {
        let units = smart_split("A. [pause:1.5] B.", 300);
        assert_eq!(
            units,
            vec![
                TextUnit::speech("A."),
                TextUnit::pause(1.5),
                TextUnit::speech("B."),
            ]
        );
    }

    #[test]
    fn test_malformed_pause_dropped() {
        let units = smart_split("A. [pause:abc] B.", 300);
        assert_eq!(contents(&units), vec!["A.", "B."]);
        assert!(units.iter().all(|u| u.kind() == UnitKind::Speech));

        let units = smart_split("Hello [pause:] world.", 300);
        assert_eq!(contents(&units), vec!["Hello", "world."]);
    }

    #[test]
    fn test_pause_payload_forms() {
        assert_eq!(parse_pause("2"), Some(2.0));
        assert_eq!(parse_pause("0.25"), Some(0.25));
        assert_eq!(parse_pause("3."), Some(3.0));
        assert_eq!(parse_pause(".5"), Some(0.5));
        assert_eq!(parse_pause("-1"), None);
        assert_eq!(parse_pause("1e3"), None);
        assert_eq!(parse_pause(""), None);
        assert_eq!(parse_pause(" 1"), None);
    }

    #[test]
    fn test_pause_directive_case_sensitive() {
        let units = smart_split("Hi. [PAUSE:1] there.", 300);
        assert_eq!(units.len(), 1);
        assert!(units[0].content().contains("[PAUSE:1]"));
    }

    #[test]
    fn test_packing_bound() {
        let units = smart_split("One two. Three four. Five six.", 20);
        assert_eq!(contents(&units), vec!["One two. Three four.", "Five six."]);

        let units = smart_split("One two. Three four. Five six.", 19);
        assert_eq!(contents(&units), vec!["One two.", "Three four.", "Five six."]);
    }

    #[test]
    fn test_long_sentence_not_split() {
        let long = "word ".repeat(100) + "end.";
        let units = smart_split(&format!("Short. {long} Tail."), 50);
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].content(), long.trim());
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let units = smart_split("Mr. Smith met Dr. Jones. J. R. R. Tolkien wrote e.g. that.", 1);
        assert_eq!(
            contents(&units),
            vec!["Mr. Smith met Dr. Jones.", "J. R. R. Tolkien wrote e.g. that."]
        );
    }

    #[test]
    fn test_terminators_and_closers() {
        let units = smart_split("Really?! \"Yes.\" (Fine.) Done", 1);
        assert_eq!(contents(&units), vec!["Really?!", "\"Yes.\"", "(Fine.)", "Done"]);
    }

    #[test]
    fn test_paragraphs_restart_packing() {
        let units = smart_split("First.\n\nSecond.\n  \nThird.", 300);
        assert_eq!(contents(&units), vec!["First.", "Second.", "Third."]);
    }

    #[test]
    fn test_empty_spans_dropped() {
        assert!(smart_split("", 300).is_empty());
        assert!(smart_split("   \n\n  ", 300).is_empty());
        assert_eq!(smart_split("[pause:1][pause:2]", 300).len(), 2);
    }

    #[test]
    fn test_unicode_length_in_chars() {
        let units = smart_split("Ééé. Ààà.", 9);
        assert_eq!(units.len(), 1);
    }

    fn sentence() -> impl Strategy<Value = String> {
        let word = prop::sample::select(vec![
            "alpha", "bravo", "delta", "echo", "foxtrot", "golf", "hotel", "india", "kilo",
        ]);
        (prop::collection::vec(word, 1..6), prop::sample::select(vec![".", "!", "?"]))
            .prop_map(|(words, end)| format!("{}{end}", words.join(" ")))
    }

    proptest! {
        #[test]
        fn prop_units_rejoin_to_sentences(
            sentences in prop::collection::vec(sentence(), 1..20),
            max in 1usize..120,
        ) {
            let text = sentences.join(" ");
            let units = smart_split(&text, max);

            let rejoined = units.iter().map(TextUnit::content).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(rejoined, text);

            for unit in &units {
                let len = unit.content().chars().count();
                let single = sentences.iter().any(|s| s == unit.content());
                prop_assert!(len <= max || single);
            }
        }
    }
}
