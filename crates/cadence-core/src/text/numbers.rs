//! Number to words conversion (American English, no "and").

const ONES: &[&str] = &[
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: &[&str] = &[
    "",
    "thousand",
    "million",
    "billion",
    "trillion",
    "quadrillion",
    "quintillion",
    "sextillion",
    "septillion",
    "octillion",
    "nonillion",
    "decillion",
    "undecillion",
];

/// Words for 0-99, tens and units joined by a hyphen
fn below_hundred(n: u128) -> String {
    debug_assert!(n < 100);
    if n < 20 {
        ONES[n as usize].to_string()
    } else {
        let ten = TENS[(n / 10) as usize];
        match n % 10 {
            0 => ten.to_string(),
            one => format!("{ten}-{}", ONES[one as usize]),
        }
    }
}

/// Words for 1-999
fn below_thousand(n: u128) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, _) => below_hundred(rest),
        (h, 0) => format!("{} hundred", ONES[h as usize]),
        (h, r) => format!("{} hundred {}", ONES[h as usize], below_hundred(r)),
    }
}

/// Convert an integer to cardinal words
///
/// `1234` becomes `"one thousand two hundred thirty-four"`.
#[must_use]
pub fn cardinal(n: u128) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut groups = Vec::new();
    let mut remaining = n;
    let mut scale = 0;
    while remaining > 0 {
        let group = remaining % 1000;
        if group > 0 {
            let words = below_thousand(group);
            groups.push(match SCALES[scale] {
                "" => words,
                name => format!("{words} {name}"),
            });
        }
        remaining /= 1000;
        scale += 1;
    }

    groups.reverse();
    groups.join(" ")
}

/// Convert an integer to ordinal words
///
/// `21` becomes `"twenty-first"`.
#[must_use]
pub fn ordinal(n: u128) -> String {
    let words = cardinal(n);
    let split = words.rfind([' ', '-']).map_or(0, |i| i + 1);
    let (head, last) = words.split_at(split);

    let last = match last {
        "one" => "first".to_string(),
        "two" => "second".to_string(),
        "three" => "third".to_string(),
        "five" => "fifth".to_string(),
        "eight" => "eighth".to_string(),
        "nine" => "ninth".to_string(),
        "twelve" => "twelfth".to_string(),
        word if word.ends_with('y') => format!("{}ieth", &word[..word.len() - 1]),
        word => format!("{word}th"),
    };

    format!("{head}{last}")
}

/// Read a number the way it is spoken in running text
///
/// Values between 1001 and 2999 are read as years: `2000` is "two
/// thousand", `2001`-`2009` are "two thousand N", whole hundreds are "N
/// hundred" and everything else is read in digit pairs with "oh" for a
/// zero tens digit (`1905` is "nineteen oh five"). Other values are plain
/// cardinals.
#[must_use]
pub fn spoken(n: u128) -> String {
    if !(1001..3000).contains(&n) {
        return cardinal(n);
    }

    if n == 2000 {
        return "two thousand".to_string();
    }
    if (2001..2010).contains(&n) {
        return format!("two thousand {}", cardinal(n % 100));
    }
    if n % 100 == 0 {
        return format!("{} hundred", cardinal(n / 100));
    }

    let high = below_hundred(n / 100);
    let low = n % 100;
    if low < 10 {
        format!("{high} oh {}", ONES[low as usize])
    } else {
        format!("{high} {}", below_hundred(low))
    }
}

/// Spell a digit string one digit at a time
#[must_use]
pub fn digit_by_digit(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a run of ASCII digits, falling back to digit-wise reading when
/// the value does not fit in 128 bits
#[must_use]
pub fn spoken_digits(digits: &str) -> String {
    digits
        .parse::<u128>()
        .map_or_else(|_| digit_by_digit(digits), spoken)
}

/// Ordinal counterpart of [`spoken_digits`]
#[must_use]
pub fn ordinal_digits(digits: &str) -> String {
    digits
        .parse::<u128>()
        .map_or_else(|_| digit_by_digit(digits), ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "zero")]
    #[case(7, "seven")]
    #[case(13, "thirteen")]
    #[case(40, "forty")]
    #[case(42, "forty-two")]
    #[case(100, "one hundred")]
    #[case(305, "three hundred five")]
    #[case(1000, "one thousand")]
    #[case(3000, "three thousand")]
    #[case(65_536, "sixty-five thousand five hundred thirty-six")]
    #[case(1_000_001, "one million one")]
    #[case(2_500_000_000, "two billion five hundred million")]
    fn test_cardinal(#[case] n: u128, #[case] expected: &str) {
        assert_eq!(cardinal(n), expected);
    }

    #[rstest]
    #[case(1, "first")]
    #[case(2, "second")]
    #[case(3, "third")]
    #[case(4, "fourth")]
    #[case(12, "twelfth")]
    #[case(20, "twentieth")]
    #[case(21, "twenty-first")]
    #[case(100, "one hundredth")]
    #[case(103, "one hundred third")]
    fn test_ordinal(#[case] n: u128, #[case] expected: &str) {
        assert_eq!(ordinal(n), expected);
    }

    #[rstest]
    #[case(1000, "one thousand")]
    #[case(1984, "nineteen eighty-four")]
    #[case(1905, "nineteen oh five")]
    #[case(1100, "eleven hundred")]
    #[case(2000, "two thousand")]
    #[case(2007, "two thousand seven")]
    #[case(2015, "twenty fifteen")]
    #[case(2999, "twenty-nine ninety-nine")]
    #[case(3001, "three thousand one")]
    #[case(999, "nine hundred ninety-nine")]
    fn test_spoken(#[case] n: u128, #[case] expected: &str) {
        assert_eq!(spoken(n), expected);
    }

    #[test]
    fn test_digit_fallbacks() {
        assert_eq!(digit_by_digit("405"), "four zero five");
        assert_eq!(spoken_digits("007"), "seven");
        let long = "1".repeat(50);
        assert_eq!(spoken_digits(&long).split(' ').count(), 50);
        assert_eq!(ordinal_digits("22"), "twenty-second");
    }
}
