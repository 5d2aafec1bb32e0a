//! Short title slug ("ATS") used as an alternative process title prefix.

use tracing::warn;

use crate::error::{ImportError, Result};

// characters taken from the first, second, third and fourth word
const WORD_LENGTHS: [usize; 4] = [4, 2, 2, 1];

/// Builds the slug from the first four words of `title`: four characters of
/// the first word, two of the second and third, one of the fourth. Only
/// letters and digits are kept, the result is lowercase.
pub fn create_atstsl(title: &str) -> Result<String> {
    let words = title
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty());
    let mut slug = String::new();
    for (word, len) in words.zip(WORD_LENGTHS) {
        slug.extend(word.chars().take(len).flat_map(char::to_lowercase));
    }
    if slug.is_empty() {
        return Err(ImportError::Parse(format!("no title slug for '{title}'")));
    }
    Ok(slug)
}

/// Like [`create_atstsl`], an empty slug when none can be derived.
pub fn atstsl_or_empty(title: &str) -> String {
    create_atstsl(title).unwrap_or_else(|e| {
        warn!("{}", e);
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_words() {
        assert_eq!(
            create_atstsl("Jahrbuch des Landkreises Lindau am Bodensee").unwrap(),
            "jahrdelal"
        );
        assert_eq!(create_atstsl("Montfort").unwrap(), "mont");
        assert_eq!(create_atstsl("Über den See").unwrap(), "überdese");
    }

    #[test]
    fn punctuation_is_dropped() {
        assert_eq!(create_atstsl("Schriften : Verein - Bodensee").unwrap(), "schrvebo");
        assert_eq!(create_atstsl("A.B. Zeitung").unwrap(), "abze");
    }

    #[test]
    fn empty_fallback() {
        assert!(create_atstsl("").is_err());
        assert!(create_atstsl(" - : ").is_err());
        assert_eq!(atstsl_or_empty("--"), "");
        assert_eq!(atstsl_or_empty("Montfort"), "mont");
    }
}
