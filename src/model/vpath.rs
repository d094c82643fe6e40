/// Vault path helpers. Paths are `/`-separated and relative to the vault
/// root; the root folder itself is addressed as `"/"`.
pub const ROOT: &str = "/";

/// Folder that contains `path`. Top-level entries live under [`ROOT`].
pub fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ROOT.to_string(),
    }
}

/// Base name of `path` (the last segment).
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn join(folder: &str, name: &str) -> String {
    if folder == ROOT {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_top_level_entry_is_root() {
        assert_eq!(parent("note.md"), ROOT);
        assert_eq!(parent("folder/note.md"), "folder");
        assert_eq!(parent("a/b/c.md"), "a/b");
    }

    #[test]
    fn join_inverts_parent_and_name() {
        for path in ["note.md", "folder/note.md", "a/b/c.md"] {
            assert_eq!(join(&parent(path), name(path)), path);
        }
    }
}
