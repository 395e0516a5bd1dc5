//! Validation helpers shared by the entity forms.

use regex::Regex;
use std::sync::LazyLock;

pub static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// `NN-NNNNNNNN-N`
pub static CUIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{8}-\d$").expect("valid CUIT pattern"));

pub static DNI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid DNI pattern"));

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Trim, mapping a blank string to `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// URL slug for a display name: ASCII-folded, lowercase, words joined by `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(c);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuit_pattern() {
        assert!(CUIT_PATTERN.is_match("30-71234567-9"));
        assert!(!CUIT_PATTERN.is_match("30712345679"));
        assert!(!CUIT_PATTERN.is_match("3-71234567-9"));
    }

    #[test]
    fn email_pattern() {
        assert!(EMAIL_PATTERN.is_match("admin@sicc.com.ar"));
        assert!(!EMAIL_PATTERN.is_match("admin@sicc"));
        assert!(!EMAIL_PATTERN.is_match("ad min@sicc.com"));
    }

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("  Planta Añelo — Sección 2 "), "planta-anelo-seccion-2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn trimmed_maps_blank_to_none() {
        assert_eq!(trimmed(Some("  ".to_string())), None);
        assert_eq!(trimmed(Some(" Ford ".to_string())), Some("Ford".to_string()));
        assert_eq!(trimmed(None), None);
        assert!(is_blank(" \t"));
    }
}
