//! Line and subject canonicalisation.
//!
//! Books quote the same bet with slightly different conventions: "10"
//! vs "10.5", "Kylian Mbappé (PSG)" vs "kylian mbappe". Everything that
//! compares quotes across books goes through these functions first.

/// Fractional parts closer than this are treated as exact.
const LINE_EPSILON: f64 = 1e-9;

/// Canonical line for cross-book comparison.
///
/// Whole numbers move up half a point (a "10" is ambiguous with a push;
/// "10.5" is not). Half and quarter lines are kept. Anything else snaps
/// to the nearest half.
pub fn normalize_line(line: f64) -> f64 {
    if !line.is_finite() {
        return line;
    }

    let frac = (line - line.floor()).abs();
    if frac < LINE_EPSILON || (1.0 - frac) < LINE_EPSILON {
        return line.round() + 0.5;
    }
    if [0.25, 0.5, 0.75].iter().any(|q| (frac - q).abs() < LINE_EPSILON) {
        return line;
    }
    round_half(line)
}

/// Round to the nearest half-point.
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Canonical subject identity used for grouping.
///
/// Case-folds, strips diacritics, drops team/jersey annotations like
/// `(LAL)`, `[GSW]` or `#23`, turns punctuation into spaces and
/// collapses whitespace.
pub fn normalize_subject(subject: &str) -> String {
    let mut stripped = String::with_capacity(subject.len());
    let mut depth = 0usize;
    for ch in subject.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }

    let mut words: Vec<String> = Vec::new();
    for token in stripped.split_whitespace() {
        if is_jersey_token(token) {
            continue;
        }
        let mut word = String::with_capacity(token.len());
        for ch in token.chars().flat_map(char::to_lowercase) {
            match fold_diacritic(ch) {
                Some(folded) => word.push_str(folded),
                None if ch.is_alphanumeric() => word.push(ch),
                None => {
                    // Punctuation ends the current word.
                    if !word.is_empty() {
                        words.push(std::mem::take(&mut word));
                    }
                }
            }
        }
        if !word.is_empty() {
            words.push(word);
        }
    }
    words.join(" ")
}

/// `#23`, `#7` and similar.
fn is_jersey_token(token: &str) -> bool {
    token
        .strip_prefix('#')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// ASCII replacement for common Latin letters with diacritics.
fn fold_diacritic(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' | 'ĉ' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ķ' => "k",
        'ł' | 'ľ' | 'ĺ' | 'ļ' => "l",
        'ñ' | 'ń' | 'ň' | 'ņ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' | 'ŕ' => "r",
        'ś' | 'š' | 'ş' | 'ș' => "s",
        'ß' => "ss",
        'ť' | 'ţ' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
