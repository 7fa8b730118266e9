//! Deterministic lexical cleanup of request text before segmentation.
//!
//! Normalization runs as an ordered cascade. Later stages assume earlier
//! ones already ran, so a number stage never sees an abbreviation and the
//! special-character stage never sees a digit.

use super::numbers;
use super::segmenter::PAUSE_DIRECTIVE;
use super::NormalizationOptions;
use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n\s*").unwrap());

static DOUBLE_DOUBLE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""{2,}"#).unwrap());
static DOUBLE_SINGLE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'{2,}").unwrap());

static TITLE_ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("mrs", "misuss"),
        ("ms", "miss"),
        ("mr", "mister"),
        ("dr", "doctor"),
        ("st", "saint"),
        ("co", "company"),
        ("jr", "junior"),
        ("maj", "major"),
        ("gen", "general"),
        ("drs", "doctors"),
        ("rev", "reverend"),
        ("lt", "lieutenant"),
        ("hon", "honorable"),
        ("sgt", "sergeant"),
        ("capt", "captain"),
        ("esq", "esquire"),
        ("ltd", "limited"),
        ("col", "colonel"),
        ("ft", "fort"),
    ]
    .into_iter()
    .map(|(abbr, word)| (Regex::new(&format!(r"(?i)\b{abbr}\.")).unwrap(), word))
    .collect()
});

static CASED_ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("TTS", "text to speech"),
        ("Hz", "hertz"),
        ("kHz", "kilohertz"),
        ("KBs", "kilobytes"),
        ("KB", "kilobyte"),
        ("MBs", "megabytes"),
        ("MB", "megabyte"),
        ("GBs", "gigabytes"),
        ("GB", "gigabyte"),
        ("TBs", "terabytes"),
        ("TB", "terabyte"),
        ("APIs", "a p i's"),
        ("API", "a p i"),
        ("CLIs", "c l i's"),
        ("CLI", "c l i"),
        ("CPUs", "c p u's"),
        ("CPU", "c p u"),
        ("GPUs", "g p u's"),
        ("GPU", "g p u"),
        ("Ave", "avenue"),
        ("etc", "etcetera"),
    ]
    .into_iter()
    .map(|(abbr, word)| (Regex::new(&format!(r"\b{abbr}\b")).unwrap(), word))
    .collect()
});

static NUM_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([0-9])").unwrap());
static NUM_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([0-9])([kmbt])\b").unwrap());
static DIGIT_THEN_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9])([a-z]+)").unwrap());
static LETTER_THEN_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([a-z])([0-9])").unwrap());
static COMMA_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9][0-9,]+[0-9]").unwrap());
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^/])([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2}(?:[0-9]{2})?)($|[^/])").unwrap()
});
static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s]?[0-9]{4}").unwrap());
static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?").unwrap());
static POUNDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"£([0-9,]*[0-9]+)").unwrap());
static DOLLARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([0-9.,]*[0-9]+)").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)+").unwrap());
static MULTIPLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]\s?\*\s?[0-9]").unwrap());
static DIVIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]\s?/\s?[0-9]").unwrap());
static ADD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]\s?\+\s?[0-9]").unwrap());
static SUBTRACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]?\s?-\s?[0-9]").unwrap());
static FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+(?:/[0-9]+)+").unwrap());
static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([0-9]+)(?:st|nd|rd|th)").unwrap());
static CARDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

static URL_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(https?)://").unwrap());
static SPACED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.) - (.)").unwrap());
static DOTTED_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([a-z])\.([a-z])").unwrap());
static PARENTHESES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[{].*[)\]}](?:.|$)").unwrap());
static OPEN_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[{]").unwrap());
static CLOSE_BRACKET_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[)\]}][^$.!?,]").unwrap());
static CLOSE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"[)\]}]").unwrap());

static SPECIAL_CHARACTERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("@", " at "),
        ("&", " and "),
        ("%", " percent "),
        (":", "."),
        (";", ","),
        (r"\+", " plus "),
        (r"\\", " backslash "),
        ("~", " about "),
        ("(^| )<3", " heart "),
        ("<=", " less than or equal to "),
        (">=", " greater than or equal to "),
        ("<", " less than "),
        (">", " greater than "),
        ("=", " equals "),
        ("/", " slash "),
        ("_", " "),
    ]
    .into_iter()
    .map(|(pattern, word)| (Regex::new(pattern).unwrap(), word))
    .collect()
});

static UNKNOWN_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z !$%&'*+,\-./0-9<>?_]").unwrap());
static SILENT_CHARACTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[<>/_+]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r" ([.?!,])").unwrap());
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());
static COMMA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r",+").unwrap());
static PERIOD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,]*\.[.,]*").unwrap());
static EXCLAMATION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,!]*![.,!]*").unwrap());
static QUESTION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,!?]*\?[.,!?]*").unwrap());

/// Stands in for `...` while the other punctuation runs are collapsed
const ELLIPSIS_MARK: &str = "\u{2026}";

/// Rewrites request text into a form the synthesizer pronounces reliably
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    options: NormalizationOptions,
}

impl TextNormalizer {
    /// Create a normalizer with the given options
    #[must_use]
    pub const fn new(options: NormalizationOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &NormalizationOptions {
        &self.options
    }

    /// Normalize a full request text
    ///
    /// `[pause:…]` directives pass through verbatim and paragraph breaks are
    /// kept as blank lines.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        if !self.options.normalize {
            return text.to_string();
        }

        let mut pieces = Vec::new();
        let mut last = 0;
        for directive in PAUSE_DIRECTIVE.find_iter(text) {
            pieces.push(self.normalize_span(&text[last..directive.start()]));
            pieces.push(directive.as_str().to_string());
            last = directive.end();
        }
        pieces.push(self.normalize_span(&text[last..]));

        pieces
            .into_iter()
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn normalize_span(&self, span: &str) -> String {
        PARAGRAPH_BREAK
            .split(span)
            .map(|paragraph| self.normalize_paragraph(paragraph))
            .filter(|paragraph| !paragraph.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn normalize_paragraph(&self, paragraph: &str) -> String {
        let text = fold_to_ascii(paragraph);
        let text = join_lines(&text);
        if text.is_empty() {
            return text;
        }

        let text = expand_abbreviations(&text);
        let text = normalize_numbers(&text);
        let text = normalize_special(&text, self.options.url_normalization);
        let text = expand_special_characters(&text);

        let text = if self.options.lowercase {
            text.to_lowercase()
        } else {
            text
        };
        let text = remove_unknown_characters(&text);
        let text = collapse_whitespace(&text);
        let text = dedup_punctuation(&text);
        ensure_terminal_punctuation(text)
    }
}

/// Decompose, fold letters to ASCII, strip marks and decorations, and
/// replace typographic punctuation
fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd() {
        if is_combining_mark(c) || is_emoji_or_decoration(c) {
            continue;
        }
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("Th"),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'ı' => out.push('i'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' | '«' | '»' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2007}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            other => out.push(other),
        }
    }

    let out = DOUBLE_DOUBLE_QUOTE.replace_all(&out, "\"");
    DOUBLE_SINGLE_QUOTE.replace_all(&out, "'").into_owned()
}

fn is_emoji_or_decoration(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0x25A0..=0x25FF
            | 0x2022
            | 0x2122
            | 0x00A9
            | 0x00AE
            | 0xFE0E..=0xFE0F
            | 0x200D
            | 0xE0000..=0xE007F
    )
}

/// Trim each line, end it with punctuation and join the lines with spaces
fn join_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.ends_with(['.', '!', '?']) {
                line.to_string()
            } else {
                format!("{line}.")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_abbreviations(text: &str) -> String {
    let mut text = text.to_string();
    for (regex, word) in TITLE_ABBREVIATIONS.iter().chain(CASED_ABBREVIATIONS.iter()) {
        text = regex.replace_all(&text, NoExpand(word)).into_owned();
    }
    text
}

fn normalize_numbers(text: &str) -> String {
    let text = NUM_PREFIX.replace_all(text, "number ${1}");
    let text = NUM_SUFFIX.replace_all(&text, |caps: &Captures| {
        let magnitude = match caps[2].to_ascii_lowercase().as_str() {
            "k" => "thousand",
            "m" => "million",
            "b" => "billion",
            _ => "trillion",
        };
        format!("{} {magnitude}", &caps[1])
    });

    let mut text = text.into_owned();
    for _ in 0..2 {
        text = DIGIT_THEN_LETTERS
            .replace_all(&text, |caps: &Captures| {
                let letters = &caps[2];
                if is_ordinal_suffix(letters) {
                    caps[0].to_string()
                } else {
                    format!("{} {letters}", &caps[1])
                }
            })
            .into_owned();
        text = LETTER_THEN_DIGIT
            .replace_all(&text, "${1} ${2}")
            .into_owned();
    }

    let text = COMMA_NUMBER.replace_all(&text, |caps: &Captures| caps[0].replace(',', ""));
    let text = DATE.replace_all(&text, |caps: &Captures| {
        let date = caps[2].split(['/', '-', '.']).collect::<Vec<_>>().join(" dash ");
        format!("{}{date}{}", &caps[1], &caps[3])
    });
    let text = PHONE_NUMBER.replace_all(&text, |caps: &Captures| expand_phone_number(&caps[0]));
    let text = CLOCK_TIME.replace_all(&text, |caps: &Captures| expand_time(&caps[0]));
    let text = POUNDS.replace_all(&text, "${1} pounds");
    let text = DOLLARS.replace_all(&text, |caps: &Captures| expand_dollars(&caps[1]));
    let text = DECIMAL.replace_all(&text, |caps: &Captures| expand_decimal(&caps[0]));

    let mut text = text.into_owned();
    for (regex, symbol, word) in [
        (&*MULTIPLY, '*', " times "),
        (&*DIVIDE, '/', " over "),
        (&*ADD, '+', " plus "),
        (&*SUBTRACT, '-', " minus "),
    ] {
        // Chains like 1*2*3 need a second pass since matches cannot overlap
        for _ in 0..2 {
            text = regex
                .replace_all(&text, |caps: &Captures| caps[0].replace(symbol, word))
                .into_owned();
        }
    }

    let text = FRACTION.replace_all(&text, |caps: &Captures| {
        let parts: Vec<&str> = caps[0].split('/').collect();
        if parts.len() == 2 {
            parts.join(" over ")
        } else {
            parts.join(" slash ")
        }
    });
    let text = ORDINAL.replace_all(&text, |caps: &Captures| numbers::ordinal_digits(&caps[1]));
    CARDINAL
        .replace_all(&text, |caps: &Captures| numbers::spoken_digits(&caps[0]))
        .into_owned()
}

fn is_ordinal_suffix(letters: &str) -> bool {
    matches!(
        letters.to_ascii_lowercase().as_str(),
        "st" | "nd" | "rd" | "th"
    )
}

fn expand_phone_number(number: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let spaced = |part: &str| {
        part.chars()
            .map(String::from)
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "{}, {}, {}",
        spaced(&digits[..3]),
        spaced(&digits[3..6]),
        spaced(&digits[6..])
    )
}

/// Spoken form of `H:MM` or `H:MM:SS`
///
/// With a non-zero hour, two-digit minutes that do not start with zero are
/// read as the plain minute value (`1:35:20` reads "1 35 20").
fn expand_time(time: &str) -> String {
    let parts: Vec<&str> = time.split(':').collect();
    let hours_value: u32 = parts[0].parse().unwrap_or(0);

    if let [hours, minutes] = parts.as_slice() {
        if *minutes == "00" {
            return if hours_value == 0 {
                "0".to_string()
            } else if hours_value > 12 {
                format!("{hours} minutes")
            } else {
                format!("{hours} o'clock")
            };
        }
        if let Some(rest) = minutes.strip_prefix('0') {
            return format!("{hours} oh {rest}");
        }
        return format!("{hours} {minutes}");
    }

    let (hours, minutes, seconds) = (parts[0], parts[1], parts[2]);
    let with_oh = |part: &str| {
        part.strip_prefix('0')
            .map_or_else(|| part.to_string(), |rest| format!("oh {rest}"))
    };

    if hours_value != 0 {
        let minutes = if minutes == "00" {
            "oh oh".to_string()
        } else {
            with_oh(minutes)
        };
        let seconds = if seconds == "00" {
            String::new()
        } else {
            with_oh(seconds)
        };
        format!("{hours} {minutes} {seconds}").trim_end().to_string()
    } else if minutes != "00" {
        let seconds = if seconds == "00" {
            "oh oh".to_string()
        } else {
            with_oh(seconds)
        };
        format!("{minutes} {seconds}")
    } else {
        seconds.to_string()
    }
}

fn expand_dollars(amount: &str) -> String {
    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return format!("{amount} dollars");
    }

    let parse = |part: &str| part.replace(',', "").parse::<u128>().unwrap_or(0);
    let dollars = parse(parts[0]);
    let cents = parts.get(1).copied().map_or(0, parse);

    let dollar_unit = if dollars == 1 { "dollar" } else { "dollars" };
    let cent_unit = if cents == 1 { "cent" } else { "cents" };

    match (dollars, cents) {
        (0, 0) => "zero dollars".to_string(),
        (d, 0) => format!("{d} {dollar_unit}"),
        (0, c) => format!("{c} {cent_unit}"),
        (d, c) => format!("{d} {dollar_unit}, {c} {cent_unit}"),
    }
}

fn expand_decimal(number: &str) -> String {
    let mut parts = number.split('.');
    let whole = parts.next().unwrap_or_default();
    let fractions: Vec<String> = parts
        .map(|part| {
            part.chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    format!("{whole} point {}", fractions.join(" point "))
}

fn normalize_special(text: &str, url_normalization: bool) -> String {
    let text = if url_normalization {
        URL_SCHEME
            .replace_all(text, |caps: &Captures| {
                let letters = caps[1]
                    .to_ascii_lowercase()
                    .chars()
                    .map(String::from)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{letters} colon slash slash ")
            })
            .into_owned()
    } else {
        text.to_string()
    };

    let text = SPACED_DASH.replace_all(&text, "${1}, ${2}");
    let mut text = text.into_owned();
    for _ in 0..2 {
        text = DOTTED_LETTERS
            .replace_all(&text, "${1} dot ${2}")
            .into_owned();
    }

    PARENTHESES
        .replace_all(&text, |caps: &Captures| {
            let inner = OPEN_BRACKET.replace_all(&caps[0], ", ");
            let inner = CLOSE_BRACKET_INLINE.replace_all(&inner, ", ");
            CLOSE_BRACKET.replace_all(&inner, "").into_owned()
        })
        .into_owned()
}

fn expand_special_characters(text: &str) -> String {
    let mut text = text.to_string();
    for (regex, word) in SPECIAL_CHARACTERS.iter() {
        text = regex.replace_all(&text, NoExpand(word)).into_owned();
    }
    text
}

fn remove_unknown_characters(text: &str) -> String {
    let text = UNKNOWN_CHARACTERS.replace_all(text, "");
    SILENT_CHARACTERS.replace_all(&text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    SPACE_BEFORE_PUNCTUATION
        .replace_all(&text, "${1}")
        .trim()
        .to_string()
}

fn dedup_punctuation(text: &str) -> String {
    let text = ELLIPSIS.replace_all(text, ELLIPSIS_MARK);
    let text = COMMA_RUN.replace_all(&text, ",");
    let text = PERIOD_RUN.replace_all(&text, ".");
    let text = EXCLAMATION_RUN.replace_all(&text, "!");
    let text = QUESTION_RUN.replace_all(&text, "?");
    text.replace(ELLIPSIS_MARK, "...")
}

fn ensure_terminal_punctuation(text: String) -> String {
    let trimmed = text.trim_end_matches([',', ' ']);
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalize(text: &str) -> String {
        TextNormalizer::default().normalize(text)
    }

    #[rstest]
    #[case("Dr. Smith lives on Main St.", "doctor smith lives on main saint.")]
    #[case("The TTS API runs on a GPU", "the text to speech a p i runs on a g p u.")]
    #[case("I have 3 apples.", "i have three apples.")]
    #[case("It costs $5.50", "it costs five dollars, fifty cents.")]
    #[case("Only $1", "only one dollar.")]
    #[case("Just $0.00", "just zero dollars.")]
    #[case("That is £20", "that is twenty pounds.")]
    #[case("Call 555-123-4567", "call five five five, one two three, four five six seven.")]
    #[case("The year 1984", "the year nineteen eighty-four.")]
    #[case("He finished 1st", "he finished first.")]
    #[case("50% off", "fifty percent off.")]
    #[case("2.5 kHz", "two point five kilohertz.")]
    #[case("#1 hit", "number one hit.")]
    #[case("10K runners", "ten thousand runners.")]
    #[case("1,000,000 people", "one million people.")]
    #[case("3 + 4 = 7", "three plus four equals seven.")]
    #[case("5 - 3", "five minus three.")]
    #[case("Born 12/25/2023", "born twelve dash twenty-five dash twenty twenty-three.")]
    #[case("Tom & Jerry", "tom and jerry.")]
    #[case("This (really) works", "this, really, works.")]
    #[case("Visit https://example.com", "visit h t t p s colon slash slash example dot com.")]
    fn test_normalize_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("Meet at 3:30", "meet at three thirty.")]
    #[case("At 10:05 today", "at ten oh five today.")]
    #[case("Wake at 5:00", "wake at five o'clock.")]
    #[case("Start 0:00", "start zero.")]
    #[case("Done by 13:00", "done by thirteen minutes.")]
    #[case("Lap 1:00:00", "lap one oh oh.")]
    #[case("Lap 1:05:07", "lap one oh five oh seven.")]
    #[case("Lap 0:05:30", "lap five thirty.")]
    #[case("Lap 0:00:45", "lap forty-five.")]
    fn test_clock_times(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_clock_time_with_plain_minutes() {
        assert_eq!(expand_time("1:35:20"), "1 35 20");
        assert_eq!(normalize("Lap 1:35:20"), "lap one thirty-five twenty.");
    }

    #[test]
    fn test_unicode_folding() {
        assert_eq!(normalize("Café naïve straße"), "cafe naive strasse.");
        assert_eq!(normalize("I ♥ Rust ★"), "i rust.");
        assert_eq!(normalize("“Smart” ‘quotes’ — ok…"), "smart 'quotes', ok...");
    }

    #[test]
    fn test_punctuation_dedup() {
        assert_eq!(normalize("Hello!!!"), "hello!");
        assert_eq!(normalize("Wait... what?!"), "wait... what?");
        assert_eq!(normalize("Hello , world ,,"), "hello, world.");
    }

    #[test]
    fn test_lines_and_paragraphs() {
        assert_eq!(
            normalize("First line\nsecond line\n\nNew paragraph"),
            "first line. second line.\n\nnew paragraph."
        );
    }

    #[test]
    fn test_pause_directives_preserved() {
        assert_eq!(
            normalize("Hello world. [pause:0.5] Goodbye."),
            "hello world. [pause:0.5] goodbye."
        );
        assert_eq!(normalize("[pause:1]"), "[pause:1]");
    }

    #[test]
    fn test_options() {
        let raw = TextNormalizer::new(NormalizationOptions {
            normalize: false,
            ..NormalizationOptions::default()
        });
        assert_eq!(raw.normalize("Dr. 42 ★"), "Dr. 42 ★");

        let cased = TextNormalizer::new(NormalizationOptions {
            lowercase: false,
            ..NormalizationOptions::default()
        });
        assert_eq!(cased.normalize("Hello World"), "Hello World.");

        let no_urls = TextNormalizer::new(NormalizationOptions {
            url_normalization: false,
            ..NormalizationOptions::default()
        });
        assert!(!no_urls.normalize("see https://example.com").contains("h t t p"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\n  "), "");
        assert_eq!(normalize("★★★"), "");
    }

    #[rstest]
    #[case("hello world, this is a test.")]
    #[case("wait... really? yes!")]
    #[case("it's fine, i think.")]
    #[case("first paragraph.\n\nsecond paragraph!")]
    fn test_idempotent_on_normalized_text(#[case] text: &str) {
        assert_eq!(normalize(text), text);
        assert_eq!(normalize(&normalize(text)), normalize(text));
    }
}
