//! Splitting a single command into argv-style words.

/// Splits a command string into words on runs of whitespace.
///
/// There is no quoting: `echo "a b"` yields `["echo", "\"a", "b\""]`.
/// Leading and trailing whitespace never produce empty words.
///
/// # Arguments
/// * `command` - One command's text, already separated from its neighbours.
///
/// # Returns
/// The words in order; an empty vector for a blank command.
pub fn tokenize(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_spaces_and_tabs() {
        assert_eq!(
            tokenize("  PingPong\tabc   100 "),
            vec!["PingPong", "abc", "100"]
        );
    }

    #[test]
    fn test_tokenize_blank_is_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t ").is_empty());
    }

    #[test]
    fn test_tokenize_has_no_quoting() {
        assert_eq!(tokenize("echo \"a b\""), vec!["echo", "\"a", "b\""]);
    }
}
