use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
}

/// Every `*.json` file under `root`, sorted by path.
///
/// Unreadable entries are logged and skipped. A missing root yields an empty
/// list.
pub fn find_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_json_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_json_file() {
        assert!(is_json_file(Path::new("/data/log_data/2018-11-01-events.json")));
        assert!(is_json_file(Path::new("/data/TRAAAAW128F429D538.JSON")));
        assert!(!is_json_file(Path::new("/data/readme.md")));
        assert!(!is_json_file(Path::new("/data/json")));
    }

    #[test]
    fn test_find_json_files_recurses_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("A/B")).unwrap();
        fs::create_dir_all(root.join("A/A")).unwrap();
        fs::write(root.join("A/B/two.json"), "{}").unwrap();
        fs::write(root.join("A/A/one.json"), "{}").unwrap();
        fs::write(root.join("A/notes.txt"), "skip").unwrap();

        let files = find_json_files(root);
        assert_eq!(
            files,
            vec![root.join("A/A/one.json"), root.join("A/B/two.json")]
        );
    }

    #[test]
    fn test_find_json_files_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_json_files(&temp_dir.path().join("absent")).is_empty());
    }
}
