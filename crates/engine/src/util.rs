//! Internal helpers for input validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim a required name, rejecting empty input.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text; blank input becomes `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Collapse internal whitespace of a category name as shown to users.
pub(crate) fn normalize_category_display(input: &str) -> ResultEngine<String> {
    let display = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
        return Err(EngineError::InvalidName(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(display)
}

/// Uniqueness key for category names.
///
/// Accents are stripped (NFKD without combining marks), letters lowercased and
/// any run of non-alphanumeric characters folded into a single space, so
/// `"Food & Dining"` and `"food  dining"` collide.
pub(crate) fn normalize_category_key(input: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        return Err(EngineError::InvalidName(
            "category name must contain letters or digits".to_string(),
        ));
    }
    Ok(normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_name_is_trimmed() {
        assert_eq!(normalize_required_name("  Lunch ", "expense").unwrap(), "Lunch");
        assert!(normalize_required_name("   ", "expense").is_err());
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" Coffee Shop ")),
            Some("Coffee Shop".to_string())
        );
    }

    #[test]
    fn category_key_folds_case_accents_and_punctuation() {
        assert_eq!(normalize_category_key("Food & Dining").unwrap(), "food dining");
        assert_eq!(normalize_category_key("  food   dining ").unwrap(), "food dining");
        assert_eq!(normalize_category_key("Caffè").unwrap(), "caffe");
        assert!(normalize_category_key(" & ").is_err());
    }

    #[test]
    fn category_display_collapses_whitespace() {
        assert_eq!(
            normalize_category_display(" Bills   &  Utilities ").unwrap(),
            "Bills & Utilities"
        );
        assert!(normalize_category_display("   ").is_err());
    }
}
