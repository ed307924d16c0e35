use repokit_core::paths::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the repository root every tool runs against.
///
/// Priority:
/// 1. `--root` flag / `REPOKIT_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.repokit.yaml`
/// 3. Walk upward from `cwd` looking for `.git` (directory or worktree file)
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, CONFIG_FILE)
        .or_else(|| find_upward(&cwd, ".git"))
        .unwrap_or(cwd)
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn config_file_found_from_nested_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "top_n: 5\n").unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_upward(&nested, CONFIG_FILE).as_deref(),
            Some(dir.path())
        );
    }

    #[test]
    fn git_file_counts_as_marker() {
        let dir = TempDir::new().unwrap();
        // Linked worktrees carry a `.git` file rather than a directory.
        std::fs::write(dir.path().join(".git"), "gitdir: /elsewhere\n").unwrap();
        let nested = dir.path().join("pkg");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_upward(&nested, ".git").as_deref(), Some(dir.path()));
    }
}
