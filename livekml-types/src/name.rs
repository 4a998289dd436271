//! Element and attribute names.

/// Check that `name` can be written as an XML element or attribute name.
///
/// Accepts a letter or `_` followed by letters, digits, `-`, `_`, `.` and
/// `:`, so prefixed extension names such as `gx:Track` pass. A trailing
/// `:` is rejected.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        && !name.ends_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kml_names_are_valid() {
        for name in ["Placemark", "name", "gx:Track", "_x", "data-1.2", "xmlns"] {
            assert!(is_valid_name(name), "{name}");
        }
    }

    #[test]
    fn markup_and_empty_names_are_rejected() {
        for name in ["", "a><b", "1st", "-x", "two words", "gx:", "a\"b", "&amp;"] {
            assert!(!is_valid_name(name), "{name}");
        }
    }
}
