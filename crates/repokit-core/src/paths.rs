use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Well-known locations
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".repokit.yaml";
pub const MARKETPLACE_FILE: &str = ".claude-plugin/marketplace.json";
pub const SKILLS_DIR: &str = "skills";
pub const SKILL_FILE: &str = "SKILL.md";
pub const PBXPROJ_FILE: &str = "project.pbxproj";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn marketplace_path(root: &Path) -> PathBuf {
    root.join(MARKETPLACE_FILE)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

/// Strip every leading `.` and `/` from a registered skill path, so that
/// `./skills/a` and `skills/a` name the same skill.
pub fn normalize_skill_path(path: &str) -> &str {
    path.trim_start_matches(['.', '/'])
}

pub fn skill_md_path(root: &Path, normalized: &str) -> PathBuf {
    root.join(normalized).join(SKILL_FILE)
}

/// Render a path relative to `root` with forward slashes.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
