//! Native target listing for Xcode projects, read straight from
//! `project.pbxproj` without invoking `xcodebuild`.

use crate::error::{RepokitError, Result};
use crate::parse::Parsed;
use crate::paths::{relative_display, PBXPROJ_FILE};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const SECTION_BEGIN: &str = "/* Begin PBXNativeTarget section */";
const SECTION_END: &str = "/* End PBXNativeTarget section */";

/// Directories never searched for a project bundle.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "Pods", "Carthage", "DerivedData", "build"];
const SEARCH_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    /// Parsed from the `PBXNativeTarget` section.
    Section,
    /// Recovered by the loose object-header pattern.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XcodeTarget {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XcodeTargets {
    pub project: String,
    pub source: TargetSource,
    pub count: usize,
    pub targets: Vec<XcodeTarget>,
    pub skipped: Vec<crate::parse::SkippedLine>,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static HEADER_RE: OnceLock<Regex> = OnceLock::new();
static FIELD_RE: OnceLock<Regex> = OnceLock::new();
static FALLBACK_RE: OnceLock<Regex> = OnceLock::new();

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| Regex::new(r"^([0-9A-Fa-f]{24}) /\* (.+?) \*/ = \{$").unwrap())
}

fn field_re() -> &'static Regex {
    FIELD_RE.get_or_init(|| Regex::new(r"^(\w+) = (.+);$").unwrap())
}

fn fallback_re() -> &'static Regex {
    FALLBACK_RE.get_or_init(|| {
        Regex::new(r"([0-9A-Fa-f]{24}) /\* (.+?) \*/ = \{\s*isa = PBXNativeTarget;").unwrap()
    })
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the object blocks inside the `PBXNativeTarget` section. A block
/// without a `name` field is skipped; its header line is reported.
pub fn parse_native_targets(content: &str) -> Parsed<XcodeTarget> {
    let mut parsed = Parsed::default();
    let mut in_section = false;
    let mut current: Option<(usize, String, XcodeTarget)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line == SECTION_BEGIN {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if line == SECTION_END {
            break;
        }

        if let Some(caps) = header_re().captures(line) {
            current = Some((
                line_no,
                line.to_string(),
                XcodeTarget {
                    id: caps[1].to_string(),
                    name: String::new(),
                    product_name: None,
                    product_type: None,
                },
            ));
            continue;
        }

        if line == "};" {
            if let Some((start, header, mut target)) = current.take() {
                if target.name.is_empty() {
                    parsed.skip(start, &header, "native target without a name");
                } else {
                    target.name = unquote(&target.name);
                    parsed.records.push(target);
                }
            }
            continue;
        }

        let Some((_, _, target)) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = field_re().captures(line) {
            let value = caps[2].to_string();
            match &caps[1] {
                "name" => target.name = value,
                "productName" => target.product_name = Some(unquote(&value)),
                "productType" => target.product_type = Some(unquote(&value)),
                _ => {}
            }
        }
    }

    if let Some((start, header, _)) = current {
        parsed.skip(start, &header, "native target block never closed");
    }

    parsed
}

/// Loose scan for `/* Name */ = { isa = PBXNativeTarget;` headers anywhere
/// in the file. Only the id and the comment name are recovered.
pub fn parse_fallback(content: &str) -> Vec<XcodeTarget> {
    fallback_re()
        .captures_iter(content)
        .map(|caps| XcodeTarget {
            id: caps[1].to_string(),
            name: caps[2].to_string(),
            product_name: None,
            product_type: None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Locating
// ---------------------------------------------------------------------------

/// Resolve the `project.pbxproj` to read. `explicit` may name the file
/// itself or its `.xcodeproj` bundle; otherwise the first bundle under
/// `root` in sorted order is used.
pub fn locate_project(root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let file = if path.is_dir() {
            path.join(PBXPROJ_FILE)
        } else {
            path
        };
        if !file.is_file() {
            return Err(RepokitError::Usage(format!(
                "{} does not exist",
                file.display()
            )));
        }
        return Ok(file);
    }

    let found = WalkDir::new(root)
        .max_depth(SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !SKIP_DIRS.iter().any(|d| e.file_name().to_str() == Some(*d))
        })
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_dir()
                && e.path().extension().and_then(|x| x.to_str()) == Some("xcodeproj")
                && e.path().join(PBXPROJ_FILE).is_file()
        });

    match found {
        Some(entry) => Ok(entry.path().join(PBXPROJ_FILE)),
        None => Err(RepokitError::Usage(format!(
            "no *.xcodeproj found under {}; pass a project path",
            root.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

pub fn collect(root: &Path, explicit: Option<&Path>) -> Result<XcodeTargets> {
    let pbxproj = locate_project(root, explicit)?;
    let project = relative_display(root, &pbxproj);
    tracing::debug!(project = %project, "reading xcode project");

    let content = std::fs::read_to_string(&pbxproj)?;
    let parsed = parse_native_targets(&content);

    let (source, targets, skipped) = if parsed.records.is_empty() {
        let loose = parse_fallback(&content);
        if !loose.is_empty() {
            tracing::warn!(
                project = %project,
                count = loose.len(),
                "PBXNativeTarget section unreadable, using fallback pattern"
            );
        }
        (TargetSource::Fallback, loose, parsed.skipped)
    } else {
        (TargetSource::Section, parsed.records, parsed.skipped)
    };

    if targets.is_empty() {
        return Err(RepokitError::NoRecords(format!(
            "no native targets in {project}"
        )));
    }

    Ok(XcodeTargets {
        project,
        source,
        count: targets.len(),
        targets,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PBXPROJ: &str = r#"// !$*UTF8*$!
{
	objects = {

/* Begin PBXNativeTarget section */
		8D1107260486CEB800E47090 /* Weather */ = {
			isa = PBXNativeTarget;
			buildConfigurationList = C01FCF4A08A954540054247B /* Build configuration list for PBXNativeTarget "Weather" */;
			buildPhases = (
				8D1107290486CEB800E47090 /* Resources */,
			);
			dependencies = (
			);
			name = Weather;
			productName = Weather;
			productReference = 8D1107320486CEB800E47090 /* Weather.app */;
			productType = "com.apple.product-type.application";
		};
		AA1107260486CEB800E470FF /* Weather Tests */ = {
			isa = PBXNativeTarget;
			buildPhases = (
			);
			name = "Weather Tests";
			productName = WeatherTests;
			productType = "com.apple.product-type.bundle.unit-test";
		};
/* End PBXNativeTarget section */
	};
}
"#;

    #[test]
    fn section_parse_reads_names_and_types() {
        let parsed = parse_native_targets(PBXPROJ);
        assert_eq!(parsed.skipped_count(), 0);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].name, "Weather");
        assert_eq!(parsed.records[0].id, "8D1107260486CEB800E47090");
        assert_eq!(
            parsed.records[0].product_type.as_deref(),
            Some("com.apple.product-type.application")
        );
        assert_eq!(parsed.records[1].name, "Weather Tests");
        assert_eq!(parsed.records[1].product_name.as_deref(), Some("WeatherTests"));
    }

    #[test]
    fn nameless_block_is_skipped() {
        let content = "/* Begin PBXNativeTarget section */\n\t\tAAAAAAAAAAAAAAAAAAAAAAAA /* Ghost */ = {\n\t\t\tisa = PBXNativeTarget;\n\t\t};\n/* End PBXNativeTarget section */\n";
        let parsed = parse_native_targets(content);
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.skipped_count(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn fallback_recovers_single_line_objects() {
        let content = "objects = { BBBBBBBBBBBBBBBBBBBBBBBB /* Widget */ = {isa = PBXNativeTarget; name = Widget; }; };";
        assert!(parse_native_targets(content).records.is_empty());
        let loose = parse_fallback(content);
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].name, "Widget");
    }

    #[test]
    fn collect_finds_first_bundle() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("ios/Weather.xcodeproj");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(PBXPROJ_FILE), PBXPROJ).unwrap();

        let result = collect(dir.path(), None).unwrap();
        assert_eq!(result.project, "ios/Weather.xcodeproj/project.pbxproj");
        assert_eq!(result.source, TargetSource::Section);
        assert_eq!(result.count, 2);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "section");
        assert_eq!(json["targets"][0]["productType"], "com.apple.product-type.application");
    }

    #[test]
    fn empty_project_is_no_records() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("Empty.xcodeproj");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(PBXPROJ_FILE), "{ objects = { }; }").unwrap();

        let err = collect(dir.path(), Some(Path::new("Empty.xcodeproj"))).unwrap_err();
        assert!(matches!(err, RepokitError::NoRecords(_)));
    }

    #[test]
    fn missing_project_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let err = collect(dir.path(), None).unwrap_err();
        assert!(matches!(err, RepokitError::Usage(_)));
    }
}
