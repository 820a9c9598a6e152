//! Colon-delimited line codec.
//!
//! Splitting is purely syntactic. A line with missing trailing fields yields
//! a shorter sequence, so callers check the length before indexing.

/// Split a line into its ordered fields.
///
/// An empty line yields no fields. A single trailing delimiter, as produced by
/// [`join`], does not add an empty last field.
pub fn split(line: &str, delimiter: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    let line = line.strip_suffix(delimiter).unwrap_or(line);
    line.split(delimiter).map(str::to_string).collect()
}

/// Join fields back into a line, re-appending the trailing delimiter the
/// device expects on written records.
pub fn join<S: AsRef<str>>(fields: &[S], delimiter: &str) -> String {
    let mut line = String::with_capacity(fields.iter().map(|f| f.as_ref().len() + 1).sum());
    for field in fields {
        line.push_str(field.as_ref());
        line.push_str(delimiter);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_field_order() {
        assert_eq!(split("q:AL4MIC:4671:0", ":"), vec!["q", "AL4MIC", "4671", "0"]);
    }

    #[test]
    fn split_empty_line() {
        assert!(split("", ":").is_empty());
    }

    #[test]
    fn split_keeps_inner_empty_fields() {
        assert_eq!(split("R::5", ":"), vec!["R", "", "5"]);
        assert_eq!(split("R:", ":"), vec!["R"]);
    }

    #[test]
    fn join_appends_trailing_delimiter() {
        assert_eq!(join(&["U", "1", "0"], ":"), "U:1:0:");
    }

    #[test]
    fn join_then_split_restores_fields() {
        for line in ["u:1:1:80", "q", "A:4.8.1 micro", "x:-4.1:18.5"] {
            let fields = split(line, ":");
            assert_eq!(split(&join(&fields, ":"), ":"), fields);
        }
    }
}
