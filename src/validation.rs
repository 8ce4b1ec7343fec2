// ✅ Input validation - plate and driver name formats
//
// Pure predicates. The ledger trusts its callers to have run these.

use once_cell::sync::Lazy;
use regex::Regex;

/// Traditional Brazilian plate (ABC1234 / ABC-1234) or Mercosul (ABC1D23)
static PLATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Z]{3}-?[0-9]{4}|[A-Z]{3}[0-9][A-Z][0-9]{2})$").unwrap()
});

pub fn is_valid_plate(text: &str) -> bool {
    PLATE_PATTERN.is_match(text)
}

/// At least two words, each purely alphabetic and title-cased ("Jane Silva")
pub fn is_valid_name(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return false;
    }
    words.iter().all(|word| is_title_word(word))
}

fn is_title_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() && first.is_uppercase() => {
            chars.all(|c| c.is_alphabetic() && !c.is_uppercase())
        }
        _ => false,
    }
}
