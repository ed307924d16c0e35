//! Integrity checks for a plugin marketplace manifest and the skills it
//! registers.
//!
//! The manifest is a local file whose shape is exactly what is being
//! validated, so it is inspected as a `serde_json::Value` rather than
//! decoded into fixed types.

use crate::error::Result;
use crate::io::atomic_write;
use crate::paths::{self, relative_display};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Limits and word lists applied to every skill.
#[derive(Debug, Clone)]
pub struct MarketplaceRules {
    pub required_marketplace_fields: Vec<&'static str>,
    pub required_plugin_fields: Vec<&'static str>,
    pub recommended_plugin_fields: Vec<&'static str>,
    pub required_frontmatter_fields: Vec<&'static str>,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_skill_lines: usize,
    pub gerund_suffixes: Vec<&'static str>,
    pub first_person_starts: Vec<&'static str>,
}

impl Default for MarketplaceRules {
    fn default() -> Self {
        Self {
            required_marketplace_fields: vec!["name", "plugins"],
            required_plugin_fields: vec!["name", "source"],
            recommended_plugin_fields: vec!["description", "category"],
            required_frontmatter_fields: vec!["name", "description"],
            max_name_length: 64,
            max_description_length: 1024,
            max_skill_lines: 500,
            gerund_suffixes: vec!["ing", "ment", "tion", "sion"],
            first_person_starts: vec!["i ", "we ", "my ", "our "],
        }
    }
}

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap())
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketplaceStats {
    pub plugins_checked: usize,
    pub skills_checked: usize,
    pub skills_missing: usize,
    pub orphans_found: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceReport {
    pub status: Status,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub stats: MarketplaceStats,
    /// Actions taken by `--fix`.
    pub fixes: Vec<String>,
}

impl Default for MarketplaceReport {
    fn default() -> Self {
        Self {
            status: Status::Pass,
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: MarketplaceStats::default(),
            fixes: Vec::new(),
        }
    }
}

impl MarketplaceReport {
    fn error(&mut self, rule: &str, message: String, path: Option<String>, fix: Option<String>) {
        self.errors.push(Finding {
            severity: Severity::Error,
            rule: rule.to_string(),
            message,
            path,
            fix,
        });
        self.status = Status::Fail;
    }

    fn warning(&mut self, rule: &str, message: String, path: Option<String>, fix: Option<String>) {
        self.warnings.push(Finding {
            severity: Severity::Warning,
            rule: rule.to_string(),
            message,
            path,
            fix,
        });
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontmatterValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FrontmatterValue::Scalar(s) => Some(s),
            FrontmatterValue::List(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontmatterError {
    #[error("No YAML frontmatter found (missing opening ---)")]
    MissingOpening,
    #[error("Unclosed YAML frontmatter (missing closing ---)")]
    Unclosed,
}

/// Parse the flat `key: value` / `key:` + `- item` subset of YAML used in
/// SKILL.md headers. Values that do not fit the subset are kept as literal
/// strings rather than rejected.
pub fn parse_frontmatter(
    content: &str,
) -> std::result::Result<BTreeMap<String, FrontmatterValue>, FrontmatterError> {
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.first().map(|l| l.trim()) != Some("---") {
        return Err(FrontmatterError::MissingOpening);
    }
    let end = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| l.trim() == "---")
        .map(|(i, _)| i)
        .ok_or(FrontmatterError::Unclosed)?;

    let mut fm = BTreeMap::new();
    let mut current_key: Option<String> = None;
    let mut current_list: Option<Vec<String>> = None;

    for line in &lines[1..end] {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        if let Some(item) = stripped.strip_prefix("- ") {
            if current_key.is_some() {
                if let Some(list) = current_list.as_mut() {
                    list.push(item.trim().to_string());
                }
            }
            continue;
        }

        if let Some((key, value)) = stripped.split_once(':') {
            if let (Some(k), Some(list)) = (current_key.take(), current_list.take()) {
                fm.insert(k, FrontmatterValue::List(list));
            }
            let key = key.trim().to_string();
            let value = unquote(value.trim());
            if value.is_empty() {
                current_list = Some(Vec::new());
            } else {
                fm.insert(key.clone(), FrontmatterValue::Scalar(value.to_string()));
            }
            current_key = Some(key);
        }
    }

    if let (Some(k), Some(list)) = (current_key, current_list) {
        fm.insert(k, FrontmatterValue::List(list));
    }

    Ok(fm)
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

struct Validator<'a> {
    root: &'a Path,
    rules: &'a MarketplaceRules,
    report: MarketplaceReport,
    /// normalized skill path -> owning plugin name
    registered: HashMap<String, String>,
}

impl<'a> Validator<'a> {
    fn display(&self, path: &Path) -> String {
        relative_display(self.root, path)
    }

    fn check_structure(&mut self, data: &Value) {
        for field in &self.rules.required_marketplace_fields {
            if data.get(*field).is_none() {
                self.report.error(
                    "required-field",
                    format!("Missing required field: {field}"),
                    None,
                    None,
                );
            }
        }
        if let Some(plugins) = data.get("plugins") {
            if !plugins.is_array() {
                self.report.error(
                    "invalid-type",
                    "Field 'plugins' must be an array".to_string(),
                    None,
                    None,
                );
            }
        }
    }

    fn check_unique_plugin_names(&mut self, plugins: &[Value]) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, plugin) in plugins.iter().enumerate() {
            let Some(name) = plugin.get("name").and_then(Value::as_str) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            if let Some(first) = seen.get(name) {
                self.report.error(
                    "duplicate-plugin-name",
                    format!("Plugin name '{name}' is used by plugins at index {first} and {i}"),
                    None,
                    None,
                );
            }
            seen.insert(name, i);
        }
    }

    fn check_plugin(&mut self, plugin: &Value, idx: usize) {
        self.report.stats.plugins_checked += 1;

        let Some(obj) = plugin.as_object() else {
            self.report.error(
                "invalid-type",
                format!("plugins[{idx}] must be an object"),
                None,
                None,
            );
            return;
        };

        let plugin_name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("plugin[{idx}]"));

        for field in &self.rules.required_plugin_fields {
            if !obj.contains_key(*field) {
                self.report.error(
                    "required-field",
                    format!("Plugin '{plugin_name}': missing required field '{field}'"),
                    None,
                    None,
                );
            }
        }
        for field in &self.rules.recommended_plugin_fields {
            if !obj.contains_key(*field) {
                self.report.warning(
                    "recommended-field",
                    format!("Plugin '{plugin_name}': missing recommended field '{field}'"),
                    None,
                    None,
                );
            }
        }

        let skills = match obj.get("skills") {
            None => return,
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.report.error(
                    "invalid-type",
                    format!("Plugin '{plugin_name}': 'skills' must be an array"),
                    None,
                    None,
                );
                return;
            }
        };

        for skill in skills {
            self.report.stats.skills_checked += 1;
            let Some(skill_path) = skill.as_str() else {
                self.report.error(
                    "invalid-type",
                    format!("Plugin '{plugin_name}': skill entries must be strings"),
                    None,
                    None,
                );
                continue;
            };
            self.check_skill(skill_path, &plugin_name);
        }
    }

    fn check_skill(&mut self, skill_path: &str, plugin_name: &str) {
        let normalized = paths::normalize_skill_path(skill_path).to_string();
        let skill_md = paths::skill_md_path(self.root, &normalized);

        if !skill_md.is_file() {
            self.report.stats.skills_missing += 1;
            let shown = self.display(&skill_md);
            self.report.error(
                "missing-skill",
                format!("Skill path does not exist: {skill_path}"),
                Some(shown.clone()),
                Some(format!(
                    "Remove '{skill_path}' from plugin '{plugin_name}' or create {shown}"
                )),
            );
            return;
        }

        if let Some(owner) = self.registered.get(&normalized) {
            self.report.error(
                "duplicate-path",
                format!(
                    "Skill path '{skill_path}' appears in both '{owner}' and '{plugin_name}'"
                ),
                None,
                None,
            );
        }
        self.registered
            .insert(normalized.clone(), plugin_name.to_string());

        self.check_skill_md(&skill_md, &normalized);
    }

    fn check_skill_md(&mut self, skill_md: &Path, skill_path: &str) {
        let shown = self.display(skill_md);
        let content = match std::fs::read_to_string(skill_md) {
            Ok(c) => c,
            Err(e) => {
                self.report.error(
                    "read-error",
                    format!("Cannot read {shown}: {e}"),
                    Some(shown),
                    None,
                );
                return;
            }
        };

        let line_count = content.split('\n').count();
        if line_count > self.rules.max_skill_lines {
            self.report.warning(
                "skill-too-large",
                format!(
                    "SKILL.md is {line_count} lines (max {})",
                    self.rules.max_skill_lines
                ),
                Some(shown.clone()),
                None,
            );
        }

        let fm = match parse_frontmatter(&content) {
            Ok(fm) => fm,
            Err(e) => {
                self.report
                    .error("invalid-frontmatter", e.to_string(), Some(shown), None);
                return;
            }
        };

        for field in &self.rules.required_frontmatter_fields {
            if !fm.contains_key(*field) {
                self.report.error(
                    "missing-frontmatter-field",
                    format!("Missing required frontmatter field: {field}"),
                    Some(shown.clone()),
                    None,
                );
            }
        }

        if let Some(name) = fm.get("name").and_then(FrontmatterValue::as_scalar) {
            self.check_name(name, skill_path, &shown);
        }
        if let Some(desc) = fm.get("description").and_then(FrontmatterValue::as_scalar) {
            self.check_description(desc, &shown);
        }
    }

    fn check_name(&mut self, name: &str, skill_path: &str, shown: &str) {
        let len = name.chars().count();
        if len > self.rules.max_name_length {
            self.report.error(
                "name-too-long",
                format!(
                    "Name '{name}' exceeds {} chars ({len})",
                    self.rules.max_name_length
                ),
                Some(shown.to_string()),
                None,
            );
        }

        if !name_re().is_match(name) {
            self.report.error(
                "invalid-name-format",
                format!("Name '{name}' must be lowercase letters, numbers, and hyphens only"),
                Some(shown.to_string()),
                None,
            );
        }

        if name.contains("--") {
            self.report.error(
                "consecutive-hyphens",
                format!("Name '{name}' contains consecutive hyphens"),
                Some(shown.to_string()),
                None,
            );
        }

        let first_word = name.split('-').next().unwrap_or_default();
        if !self
            .rules
            .gerund_suffixes
            .iter()
            .any(|s| first_word.ends_with(s))
        {
            self.report.warning(
                "non-gerund-name",
                format!(
                    "Name '{name}' first word '{first_word}' doesn't appear to be gerund form"
                ),
                Some(shown.to_string()),
                None,
            );
        }

        let parts: Vec<&str> = skill_path.split('/').filter(|p| !p.is_empty()).collect();
        let dir_name = parts.last().copied().unwrap_or_default();
        let parent_prefixed = if parts.len() >= 2 {
            format!("{}-{dir_name}", parts[parts.len() - 2])
        } else {
            String::new()
        };
        if name != dir_name && name != parent_prefixed {
            self.report.warning(
                "name-mismatch",
                format!(
                    "Frontmatter name '{name}' doesn't match directory name '{dir_name}' or '{parent_prefixed}'"
                ),
                Some(shown.to_string()),
                None,
            );
        }
    }

    fn check_description(&mut self, desc: &str, shown: &str) {
        let len = desc.chars().count();
        if len > self.rules.max_description_length {
            self.report.error(
                "description-too-long",
                format!(
                    "Description exceeds {} chars ({len})",
                    self.rules.max_description_length
                ),
                Some(shown.to_string()),
                None,
            );
        }

        let lower = desc.trim().to_lowercase();
        if self
            .rules
            .first_person_starts
            .iter()
            .any(|p| lower.starts_with(p))
        {
            self.report.warning(
                "first-person-description",
                "Description should be third-person (avoid 'I', 'We')".to_string(),
                Some(shown.to_string()),
                None,
            );
        }

        if !lower.contains("use when") {
            self.report.warning(
                "missing-use-when",
                "Description should include 'Use when' trigger clause".to_string(),
                Some(shown.to_string()),
                None,
            );
        }
    }

    fn find_orphans(&mut self) {
        let skills_dir = paths::skills_dir(self.root);
        if !skills_dir.is_dir() {
            return;
        }
        let found: Vec<PathBuf> = WalkDir::new(&skills_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == paths::SKILL_FILE)
            .map(|e| e.into_path())
            .collect();

        for skill_md in found {
            let Some(dir) = skill_md.parent() else {
                continue;
            };
            let rel = self.display(dir);
            if self.registered.contains_key(&rel) {
                continue;
            }
            self.report.stats.orphans_found += 1;
            let shown = self.display(&skill_md);
            self.report.warning(
                "orphan-skill",
                format!("Skill exists on disk but not in marketplace.json: {rel}"),
                Some(shown),
                Some(format!("Add './{rel}' to a plugin in marketplace.json")),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// The repository root owning a manifest at `<root>/.claude-plugin/marketplace.json`.
pub fn repo_root_for(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Run every check. Problems with the manifest itself are reported as
/// findings; only a failed `--fix` write is an `Err`.
pub fn verify(manifest: &Path, rules: &MarketplaceRules, fix: bool) -> Result<MarketplaceReport> {
    let manifest = std::fs::canonicalize(manifest).unwrap_or_else(|_| manifest.to_path_buf());
    let root = repo_root_for(&manifest);
    let mut v = Validator {
        root: &root,
        rules,
        report: MarketplaceReport::default(),
        registered: HashMap::new(),
    };

    if !manifest.is_file() {
        v.report.error(
            "file-not-found",
            format!("File not found: {}", manifest.display()),
            None,
            None,
        );
        return Ok(v.report);
    }

    let raw = std::fs::read_to_string(&manifest)?;
    let mut data: Value = match serde_json::from_str(&raw) {
        Ok(d) => d,
        Err(e) => {
            v.report
                .error("invalid-json", format!("Invalid JSON: {e}"), None, None);
            return Ok(v.report);
        }
    };

    v.check_structure(&data);

    let Some(plugins) = data.get("plugins").and_then(Value::as_array) else {
        return Ok(v.report);
    };

    v.check_unique_plugin_names(plugins);
    for (i, plugin) in plugins.iter().enumerate() {
        v.check_plugin(plugin, i);
    }
    v.find_orphans();

    tracing::debug!(
        errors = v.report.errors.len(),
        warnings = v.report.warnings.len(),
        "marketplace checks complete"
    );

    let mut report = v.report;
    if fix && !report.passed() {
        report.fixes = apply_fixes(&manifest, &mut data, &root)?;
    }
    Ok(report)
}

/// Drop skill paths without a SKILL.md and plugins left without skills,
/// then rewrite the manifest with its key order intact.
pub fn apply_fixes(manifest: &Path, data: &mut Value, root: &Path) -> Result<Vec<String>> {
    let mut actions = Vec::new();

    let Some(plugins) = data.get_mut("plugins").and_then(Value::as_array_mut) else {
        return Ok(actions);
    };

    for plugin in plugins.iter_mut() {
        let name = plugin
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        let Some(skills) = plugin.get_mut("skills").and_then(Value::as_array_mut) else {
            continue;
        };
        skills.retain(|sp| {
            let Some(path) = sp.as_str() else {
                return true;
            };
            let exists =
                paths::skill_md_path(root, paths::normalize_skill_path(path)).is_file();
            if !exists {
                actions.push(format!("Removed missing: {path} from {name}"));
            }
            exists
        });
    }

    let before = plugins.len();
    plugins.retain(|p| {
        p.get("skills")
            .and_then(Value::as_array)
            .is_some_and(|s| !s.is_empty())
    });
    let removed = before - plugins.len();
    if removed > 0 {
        actions.push(format!("Removed {removed} empty plugins"));
    }

    if !actions.is_empty() {
        let mut out = serde_json::to_string_pretty(data)?;
        out.push('\n');
        atomic_write(manifest, out.as_bytes())?;
        actions.push(format!(
            "Fixed marketplace.json written to {}",
            manifest.display()
        ));
        tracing::info!(path = %manifest.display(), "rewrote marketplace manifest");
    }

    Ok(actions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, rel: &str, name: &str, description: &str) {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n# Body\n"),
        )
        .unwrap();
    }

    fn write_manifest(root: &Path, json: &str) -> PathBuf {
        let dir = root.join(".claude-plugin");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("marketplace.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    fn rules_hit(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[test]
    fn frontmatter_scalars_and_lists() {
        let fm = parse_frontmatter(
            "---\nname: diffing-branches\n# comment\ndescription: \"Summarize diffs. Use when reviewing.\"\nallowed-tools:\n  - Bash\n  - Read\n---\nbody",
        )
        .unwrap();
        assert_eq!(
            fm.get("name"),
            Some(&FrontmatterValue::Scalar("diffing-branches".to_string()))
        );
        assert_eq!(
            fm["description"].as_scalar(),
            Some("Summarize diffs. Use when reviewing.")
        );
        assert_eq!(
            fm.get("allowed-tools"),
            Some(&FrontmatterValue::List(vec![
                "Bash".to_string(),
                "Read".to_string()
            ]))
        );
    }

    #[test]
    fn frontmatter_errors() {
        assert_eq!(
            parse_frontmatter("# Title\n"),
            Err(FrontmatterError::MissingOpening)
        );
        assert_eq!(
            parse_frontmatter("---\nname: x\n"),
            Err(FrontmatterError::Unclosed)
        );
    }

    #[test]
    fn clean_marketplace_passes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_skill(
            root,
            "skills/git/diffing-branches",
            "diffing-branches",
            "Summarizes branch diffs. Use when reviewing a feature branch.",
        );
        let manifest = write_manifest(
            root,
            r#"{"name":"demo","plugins":[{"name":"git-tools","source":"./","description":"Git","category":"dev","skills":["./skills/git/diffing-branches"]}]}"#,
        );

        let report = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        assert!(report.passed(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.status, Status::Pass);
        assert_eq!(report.stats.plugins_checked, 1);
        assert_eq!(report.stats.skills_checked, 1);
    }

    #[test]
    fn missing_skill_and_orphan() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_skill(
            root,
            "skills/orphaned-thing",
            "orphaned-thing",
            "Does things. Use when needed.",
        );
        let manifest = write_manifest(
            root,
            r#"{"name":"demo","plugins":[{"name":"p","source":"./","skills":["./skills/missing-one"]}]}"#,
        );

        let report = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        assert_eq!(report.status, Status::Fail);
        assert_eq!(rules_hit(&report.errors), vec!["missing-skill"]);
        assert_eq!(report.errors[0].path.as_deref(), Some("skills/missing-one/SKILL.md"));
        assert_eq!(report.stats.skills_missing, 1);
        assert_eq!(report.stats.orphans_found, 1);
        let warnings = rules_hit(&report.warnings);
        assert!(warnings.contains(&"recommended-field"));
        assert!(warnings.contains(&"orphan-skill"));
    }

    #[test]
    fn name_and_description_rules() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_skill(root, "skills/bad", "Bad--Name", "I do stuff.");
        let manifest = write_manifest(
            root,
            r#"{"name":"demo","plugins":[{"name":"p","source":"./","description":"d","category":"c","skills":["skills/bad"]}]}"#,
        );
        let report = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        let errors = rules_hit(&report.errors);
        assert!(errors.contains(&"invalid-name-format"));
        assert!(errors.contains(&"consecutive-hyphens"));
        let warnings = rules_hit(&report.warnings);
        assert!(warnings.contains(&"non-gerund-name"));
        assert!(warnings.contains(&"name-mismatch"));
        assert!(warnings.contains(&"first-person-description"));
        assert!(warnings.contains(&"missing-use-when"));
    }

    #[test]
    fn duplicate_names_and_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_skill(
            root,
            "skills/testing-code",
            "testing-code",
            "Runs tests. Use when testing.",
        );
        let manifest = write_manifest(
            root,
            r#"{"name":"demo","plugins":[
                {"name":"p","source":"./","description":"d","category":"c","skills":["./skills/testing-code"]},
                {"name":"p","source":"./","description":"d","category":"c","skills":["skills/testing-code"]}
            ]}"#,
        );
        let report = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        let errors = rules_hit(&report.errors);
        assert_eq!(errors, vec!["duplicate-plugin-name", "duplicate-path"]);
    }

    #[test]
    fn invalid_json_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let manifest = write_manifest(dir.path(), "{ nope");
        let report = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        assert_eq!(rules_hit(&report.errors), vec!["invalid-json"]);

        let missing = dir.path().join("nowhere/marketplace.json");
        let report = verify(&missing, &MarketplaceRules::default(), false).unwrap();
        assert_eq!(rules_hit(&report.errors), vec!["file-not-found"]);
    }

    #[test]
    fn fix_removes_missing_skills_and_empty_plugins() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_skill(
            root,
            "skills/keeping-this",
            "keeping-this",
            "Stays. Use when kept.",
        );
        let manifest = write_manifest(
            root,
            r#"{"name":"demo","owner":{"name":"x"},"plugins":[
                {"name":"keep","source":"./","skills":["./skills/keeping-this","./skills/gone"]},
                {"name":"empty","source":"./","skills":["./skills/also-gone"]}
            ]}"#,
        );

        let report = verify(&manifest, &MarketplaceRules::default(), true).unwrap();
        assert_eq!(report.fixes.len(), 4, "{:?}", report.fixes);
        assert_eq!(report.fixes[0], "Removed missing: ./skills/gone from keep");
        assert_eq!(report.fixes[2], "Removed 1 empty plugins");

        let rewritten: Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
        let keys: Vec<&String> = rewritten.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "owner", "plugins"]);
        let plugins = rewritten["plugins"].as_array().unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0]["skills"], serde_json::json!(["./skills/keeping-this"]));

        let again = verify(&manifest, &MarketplaceRules::default(), false).unwrap();
        assert!(again.passed(), "{:?}", again.errors);
    }

    #[test]
    fn report_json_shape() {
        let mut report = MarketplaceReport::default();
        report.error("required-field", "Missing required field: name".to_string(), None, None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["errors"][0]["severity"], "error");
        assert!(json["errors"][0].get("path").is_none());
        assert_eq!(json["stats"]["plugins_checked"], 0);
    }
}
