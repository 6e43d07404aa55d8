/// Name of the directory directly containing the last segment of `path`.
///
/// Both `/` and `\` count as separators. Returns `""` when there is no
/// separator at all.
pub fn enclosing_folder(path: &str) -> &str {
    let mut segments = path.rsplit(['/', '\\']);
    segments.next();
    segments.next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_path() {
        assert_eq!(enclosing_folder("a/b/c.txt"), "b");
    }

    #[test]
    fn bare_file_name() {
        assert_eq!(enclosing_folder("c.txt"), "");
        assert_eq!(enclosing_folder(""), "");
    }

    #[test]
    fn dropped_root_file() {
        assert_eq!(enclosing_folder("/c.txt"), "");
        assert_eq!(enclosing_folder("/photos/c.txt"), "photos");
    }

    #[test]
    fn backslashes() {
        assert_eq!(enclosing_folder("a\\b\\c.txt"), "b");
        assert_eq!(enclosing_folder("a/b\\c.txt"), "b");
    }
}
