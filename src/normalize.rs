//! Name normalization for matching.
//!
//! - Unicode canonical decomposition with combining marks dropped
//! - Lowercase conversion
//! - Punctuation treated as a token separator (apostrophes are joined)
//! - Fixed abbreviation table (`Ma.` → `maria`, `Fco.` → `francisco`)
//! - Honorifics dropped from given names
//! - Surname particles (`de`, `del`, `y`, `la`, ...) split out of the surname

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Particles removed from surname tokenization but kept for display.
const SURNAME_PARTICLES: &[&str] = &[
    "de", "del", "della", "di", "da", "do", "dos", "das", "du", "la", "las", "los", "le", "van",
    "von", "der", "den", "y", "e", "i",
];

/// Titles that precede a given name and carry no identity.
const HONORIFICS: &[&str] = &[
    "don", "dona", "sr", "sra", "srta", "dr", "mr", "mrs", "ms", "rev", "fr",
];

struct Abbreviation {
    short: &'static str,
    full: &'static str,
    /// Only expand when written with a trailing period (`ma` is also a name)
    needs_period: bool,
}

const ABBREVIATIONS: &[Abbreviation] = &[
    Abbreviation { short: "ma", full: "maria", needs_period: true },
    Abbreviation { short: "fco", full: "francisco", needs_period: false },
    Abbreviation { short: "gpe", full: "guadalupe", needs_period: false },
    Abbreviation { short: "jph", full: "joseph", needs_period: false },
    Abbreviation { short: "jno", full: "john", needs_period: true },
    Abbreviation { short: "wm", full: "william", needs_period: false },
    Abbreviation { short: "thos", full: "thomas", needs_period: false },
    Abbreviation { short: "chas", full: "charles", needs_period: false },
    Abbreviation { short: "jas", full: "james", needs_period: true },
    Abbreviation { short: "geo", full: "george", needs_period: true },
    Abbreviation { short: "glez", full: "gonzalez", needs_period: false },
    Abbreviation { short: "fdez", full: "fernandez", needs_period: false },
    Abbreviation { short: "hdez", full: "hernandez", needs_period: false },
    Abbreviation { short: "rguez", full: "rodriguez", needs_period: false },
    Abbreviation { short: "mtz", full: "martinez", needs_period: false },
];

/// A name reduced to its comparable form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormalizedName {
    /// Given-name tokens joined by single spaces
    pub given: String,
    /// Surname tokens with particles removed, joined by single spaces
    pub surname: String,
    /// Particles removed from the surname, in order of appearance
    pub particles: Vec<String>,
}

impl NormalizedName {
    pub fn given_tokens(&self) -> impl Iterator<Item = &str> {
        self.given.split_whitespace()
    }

    pub fn surname_tokens(&self) -> impl Iterator<Item = &str> {
        self.surname.split_whitespace()
    }

    /// Neither part carries any information
    pub fn is_unknown(&self) -> bool {
        self.given.is_empty() && self.surname.is_empty()
    }

    /// `given surname` in normalized form
    pub fn full(&self) -> String {
        match (self.given.is_empty(), self.surname.is_empty()) {
            (false, false) => format!("{} {}", self.given, self.surname),
            (false, true) => self.given.clone(),
            (true, false) => self.surname.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Normalize a raw given/surname pair. Blank input yields empty fields.
pub fn normalize(given: &str, surname: &str) -> NormalizedName {
    let given_tokens = drop_honorifics(tokenize(given));
    let (surname_tokens, particles) = split_particles(tokenize(surname));

    NormalizedName {
        given: given_tokens.join(" "),
        surname: surname_tokens.join(" "),
        particles,
    }
}

/// Lowercase, strip diacritics and collapse punctuation for free text
/// such as places and search filters.
pub fn fold_text(text: &str) -> String {
    let folded: String = strip_diacritics(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split into expanded tokens. A period ends a token and marks it as
/// abbreviated; apostrophes are dropped so `o'brien` stays one token.
fn tokenize(raw: &str) -> Vec<String> {
    fn flush(current: &mut String, dotted: bool, tokens: &mut Vec<String>) {
        if !current.is_empty() {
            tokens.push(expand(current, dotted));
            current.clear();
        }
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in strip_diacritics(raw).chars() {
        match c {
            '\'' | '\u{2019}' => {}
            '.' => flush(&mut current, true, &mut tokens),
            c if c.is_alphanumeric() => current.push(c),
            _ => flush(&mut current, false, &mut tokens),
        }
    }
    flush(&mut current, false, &mut tokens);
    tokens
}

fn expand(token: &str, dotted: bool) -> String {
    ABBREVIATIONS
        .iter()
        .find(|abbr| abbr.short == token && (dotted || !abbr.needs_period))
        .map(|abbr| abbr.full.to_string())
        .unwrap_or_else(|| token.to_string())
}

fn drop_honorifics(tokens: Vec<String>) -> Vec<String> {
    let kept: Vec<String> = tokens
        .iter()
        .filter(|token| !HONORIFICS.contains(&token.as_str()))
        .cloned()
        .collect();
    if kept.is_empty() {
        tokens
    } else {
        kept
    }
}

fn split_particles(tokens: Vec<String>) -> (Vec<String>, Vec<String>) {
    let (particles, core): (Vec<String>, Vec<String>) = tokens
        .iter()
        .cloned()
        .partition(|token| SURNAME_PARTICLES.contains(&token.as_str()));
    if core.is_empty() {
        // A surname made only of particles keeps its tokens.
        (tokens, Vec::new())
    } else {
        (core, particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diacritics_and_case() {
        let name = normalize("José María", "Martínez");
        assert_eq!(name.given, "jose maria");
        assert_eq!(name.surname, "martinez");
        assert!(name.particles.is_empty());
        assert_eq!(name, normalize("JOSE MARIA", "MARTINEZ"));
    }

    #[test]
    fn test_particles_removed_from_surname() {
        let name = normalize("Juana", "de la Cruz y Núñez");
        assert_eq!(name.surname, "cruz nunez");
        assert_eq!(name.particles, vec!["de", "la", "y"]);
    }

    #[test]
    fn test_particle_only_surname_kept() {
        let name = normalize("Pedro", "De la");
        assert_eq!(name.surname, "de la");
        assert!(name.particles.is_empty());
    }

    #[test]
    fn test_abbreviation_expansion() {
        assert_eq!(normalize("Ma. Guadalupe", "").given, "maria guadalupe");
        assert_eq!(normalize("Fco. Javier", "").given, "francisco javier");
        assert_eq!(normalize("Fco Javier", "").given, "francisco javier");
        // Without a period `ma` is left alone
        assert_eq!(normalize("Ma", "").given, "ma");
        assert_eq!(normalize("Ma.José", "Glez.").surname, "gonzalez");
        assert_eq!(normalize("Ma.José", "Glez.").given, "maria jose");
    }

    #[test]
    fn test_honorifics_dropped() {
        assert_eq!(normalize("Don Pedro", "Soto").given, "pedro");
        assert_eq!(normalize("Doña Inés", "Soto").given, "ines");
        assert_eq!(normalize("Don", "Soto").given, "don");
    }

    #[test]
    fn test_punctuation_and_apostrophes() {
        let name = normalize("Mary-Anne", "O'Brien");
        assert_eq!(name.given, "mary anne");
        assert_eq!(name.surname, "obrien");
    }

    #[test]
    fn test_empty_input_is_unknown() {
        let name = normalize("", "   ");
        assert!(name.is_unknown());
        assert_eq!(name.full(), "");
    }

    #[test]
    fn test_idempotent_on_normalized_fields() {
        for (given, surname) in [
            ("Ma. de los Ángeles", "de la Cruz y Núñez"),
            ("Fco.", "Glez."),
            ("Don", "De la"),
            ("  ", "Ñúñez"),
        ] {
            let once = normalize(given, surname);
            let twice = normalize(&once.given, &once.surname);
            assert_eq!(twice.given, once.given);
            assert_eq!(twice.surname, once.surname);
        }
    }

    #[test]
    fn test_fold_text() {
        assert_eq!(fold_text("San José, Costa Rica"), "san jose costa rica");
        assert_eq!(fold_text("  "), "");
    }
}
