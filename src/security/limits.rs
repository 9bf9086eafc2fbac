//! Request sanity checks.
//!
//! Cheap syntactic rejection of obviously hostile requests before any
//! decoding or lookup work: embedded NULs, parent-directory traversal,
//! oversized request lines.

/// Longest accepted request path, decoded.
const MAX_PATH_LEN: usize = 4096;

/// Returns the violated rule for a decoded request path, if any.
pub fn path_violation(path: &str) -> Option<&'static str> {
    if path.len() > MAX_PATH_LEN {
        return Some("path too long");
    }
    if path.bytes().any(|b| b == 0) {
        return Some("embedded NUL");
    }
    if path.split('/').any(|segment| segment == "..") {
        return Some("parent traversal");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_paths_pass() {
        assert_eq!(path_violation("/"), None);
        assert_eq!(path_violation("/share/photos/2024/a.jpg"), None);
        assert_eq!(path_violation("/a..b/file.txt"), None); // dots inside a name are fine
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(path_violation("/share/../etc/passwd"), Some("parent traversal"));
        assert_eq!(path_violation("/.."), Some("parent traversal"));
    }

    #[test]
    fn nul_is_rejected() {
        assert_eq!(path_violation("/share/a\0b"), Some("embedded NUL"));
    }

    #[test]
    fn oversized_path_is_rejected() {
        let path = format!("/{}", "a".repeat(MAX_PATH_LEN + 1));
        assert_eq!(path_violation(&path), Some("path too long"));
    }
}
