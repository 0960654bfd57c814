//! Reading and editing the logger's Lua configuration
//!
//! The config script selects a preset with `local preset_choice = "<name>"` and
//! defines one table per preset:
//!
//! ```lua
//! local preset_choice = "normal"
//!
//! local presets = {
//!     normal = {
//!         log_file_path = "C:\\Users\\me\\habit.jsonl",
//!     },
//!     advanced = {
//!         log_file_path = "",
//!     },
//! }
//! ```
//!
//! Only the active preset's table is consulted when looking up
//! `log_file_path`, so settings of inactive presets never leak into the result.
//! The scanner works line by line for assignments and uses bracket matching to
//! bound a preset table, which handles one-line and nested tables alike.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::error::ResolveError;
use crate::fs::FileSystem;

pub const PRESET_CHOICE_KEY: &str = "preset_choice";
pub const LOG_FILE_PATH_KEY: &str = "log_file_path";

/// Logging presets shipped with the config script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Accuracy metrics only
    Normal,
    /// Focus on non-first-choice commits, for dictionary contributors
    Developer,
    /// Record nearly everything
    Advanced,
    /// Hand-edited configuration
    Custom,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Normal => "normal",
            Preset::Developer => "developer",
            Preset::Advanced => "advanced",
            Preset::Custom => "custom",
        }
    }

    /// Whether install can select this preset without manual edits
    pub fn is_installable(&self) -> bool {
        !matches!(self, Preset::Custom)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `key = "value"` assignment on a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Assignment<'a> {
    key: &'a str,
    value: &'a str,
    /// Byte range of `value` within the line
    value_start: usize,
    value_end: usize,
}

fn assignment_regex() -> &'static Regex {
    static ASSIGNMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    ASSIGNMENT_REGEX.get_or_init(|| {
        Regex::new(r#"^\s*(?:local\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"([^"]*)""#)
            .expect("Invalid assignment regex")
    })
}

/// Parses a string assignment at the start of `line`; comment lines never match
fn parse_assignment(line: &str) -> Option<Assignment<'_>> {
    let caps = assignment_regex().captures(line)?;
    let key = caps.get(1)?;
    let value = caps.get(2)?;
    Some(Assignment {
        key: key.as_str(),
        value: value.as_str(),
        value_start: value.start(),
        value_end: value.end(),
    })
}

/// Name of the active preset, from the first `preset_choice` assignment
pub fn find_preset_choice(content: &str) -> Option<&str> {
    content
        .lines()
        .filter_map(parse_assignment)
        .find(|a| a.key == PRESET_CHOICE_KEY && !a.value.is_empty())
        .map(|a| a.value)
}

/// Body of the first `<name> = { ... }` table, without the braces
pub fn find_block<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some(after_brace) = block_opening(line, name) else {
            continue;
        };
        let body_start = line_start + after_brace;
        match matching_brace(&content[body_start..]) {
            Some(len) => return Some(&content[body_start..body_start + len]),
            None => {
                debug!(preset = name, "Preset table is not closed");
                return None;
            }
        }
    }
    None
}

/// Byte offset just past `{` when `line` opens the table `name`
fn block_opening(line: &str, name: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix(name)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let rest = rest.trim_start().strip_prefix('{')?;
    Some(line.len() - rest.len())
}

/// Length of `text` up to the `}` closing an already opened table
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' | '\'' => {
                // Skip the string literal, honouring backslash escapes
                while let Some((_, c)) = chars.next() {
                    if c == '\\' {
                        chars.next();
                    } else if c == ch || c == '\n' {
                        break;
                    }
                }
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Undo Lua string escaping of backslashes: `C:\\Users` becomes `C:\Users`
fn unescape_path(raw: &str) -> String {
    raw.replace("\\\\", "\\")
}

/// Extracts the active preset's `log_file_path` from the config text
pub fn extract_log_path(content: &str) -> Result<String, ResolveError> {
    active_log_path(content).map(|(_, path)| path)
}

fn active_log_path(content: &str) -> Result<(&str, String), ResolveError> {
    let preset = find_preset_choice(content).ok_or(ResolveError::NoPresetChoice)?;

    let body = find_block(content, preset).ok_or_else(|| ResolveError::PresetBlockNotFound {
        preset: preset.to_string(),
    })?;

    let not_set = || ResolveError::LogPathNotSet {
        preset: preset.to_string(),
    };
    let raw = body
        .lines()
        .filter_map(parse_assignment)
        .find(|a| a.key == LOG_FILE_PATH_KEY && !a.value.is_empty())
        .ok_or_else(not_set)?;

    let path = unescape_path(raw.value);
    if path.is_empty() {
        return Err(not_set());
    }
    Ok((preset, path))
}

/// Rewrites the value of the first `preset_choice` assignment
///
/// Every other byte of `content` is preserved.
pub fn set_preset_choice(content: &str, preset: Preset) -> Result<String, ResolveError> {
    let mut out = String::with_capacity(content.len() + 16);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        if !replaced {
            if let Some(a) = parse_assignment(line).filter(|a| a.key == PRESET_CHOICE_KEY) {
                out.push_str(&line[..a.value_start]);
                out.push_str(preset.as_str());
                out.push_str(&line[a.value_end..]);
                replaced = true;
                continue;
            }
        }
        out.push_str(line);
    }

    if replaced {
        Ok(out)
    } else {
        Err(ResolveError::NoPresetChoice)
    }
}

/// Where the effective log path came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "preset")]
pub enum LogPathSource {
    Default,
    Preset(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLogPath {
    pub path: PathBuf,
    pub source: LogPathSource,
}

/// Resolves the effective log file path from the config script at `config_path`
///
/// Any failure (missing file, unreadable file, no active preset, no custom path)
/// falls back to `default_path`.
pub fn resolve_log_path(
    fs: &dyn FileSystem,
    config_path: &Path,
    default_path: &Path,
) -> ResolvedLogPath {
    let fallback = || ResolvedLogPath {
        path: default_path.to_path_buf(),
        source: LogPathSource::Default,
    };

    if !fs.exists(config_path) {
        debug!(config = %config_path.display(), "Config script not found, using default log path");
        return fallback();
    }

    let content = match fs.read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "Could not read config script, using default log path");
            return fallback();
        }
    };

    match active_log_path(&content) {
        Ok((preset, path)) => {
            info!(path = %path, preset = %preset, "Found active custom log path");
            ResolvedLogPath {
                path: PathBuf::from(path),
                source: LogPathSource::Preset(preset.to_string()),
            }
        }
        Err(reason) => {
            debug!(%reason, "Using default log path");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use yare::parameterized;

    const SAMPLE_CONFIG: &str = r#"-- Input habit logger configuration
-- local preset_choice = "advanced"
local preset_choice = "normal"

local presets = {
    advanced = {
        log_file_path = "/var/log/advanced.jsonl",
        record_candidates = true,
    },
    normal = {
        -- log_file_path = "/commented/out.jsonl",
        log_file_path = "C:\\Users\\me\\habit.jsonl",
        fields = { "committed_text", "selected_candidate_rank" },
    },
}

return presets[preset_choice]
"#;

    #[test]
    fn test_find_preset_choice_skips_comments() {
        assert_eq!(find_preset_choice(SAMPLE_CONFIG), Some("normal"));
    }

    #[test]
    fn test_find_preset_choice_without_local() {
        assert_eq!(
            find_preset_choice("preset_choice = \"developer\"\n"),
            Some("developer")
        );
        assert_eq!(find_preset_choice("preset_choice = \"\"\n"), None);
        assert_eq!(find_preset_choice("my_preset_choice = \"x\"\n"), None);
    }

    #[test]
    fn test_extract_log_path_is_bounded_to_active_block() {
        assert_eq!(
            extract_log_path(SAMPLE_CONFIG).unwrap(),
            r"C:\Users\me\habit.jsonl"
        );
    }

    #[test]
    fn test_inactive_preset_does_not_leak() {
        let config = r#"local preset_choice = "normal"
local presets = {
    advanced = {
        log_file_path = "/leak.jsonl",
    },
    normal = {
        record_candidates = false,
    },
}
"#;
        assert_eq!(
            extract_log_path(config),
            Err(ResolveError::LogPathNotSet {
                preset: "normal".to_string()
            })
        );
    }

    #[test]
    fn test_single_line_block() {
        let config = r#"local preset_choice = "normal"
normal = { log_file_path = "C:\\Users\\x\\log.jsonl" }
"#;
        assert_eq!(extract_log_path(config).unwrap(), r"C:\Users\x\log.jsonl");
    }

    #[test]
    fn test_block_not_found() {
        let config = "local preset_choice = \"developer\"\nnormal = {\n}\n";
        assert_eq!(
            extract_log_path(config),
            Err(ResolveError::PresetBlockNotFound {
                preset: "developer".to_string()
            })
        );
    }

    #[test]
    fn test_no_preset_choice() {
        assert_eq!(
            extract_log_path("normal = { log_file_path = \"/x\" }\n"),
            Err(ResolveError::NoPresetChoice)
        );
    }

    #[test]
    fn test_block_name_must_match_exactly() {
        let config = r#"local preset_choice = "normal"
normal_old = {
    log_file_path = "/old.jsonl",
}
normal = {
    log_file_path = "/new.jsonl",
}
"#;
        assert_eq!(extract_log_path(config).unwrap(), "/new.jsonl");
    }

    #[test]
    fn test_braces_inside_strings_and_comments() {
        let config = r#"local preset_choice = "normal"
normal = {
    prefix = "}{",  -- a stray } in a comment
    log_file_path = "/ok.jsonl",
}
"#;
        assert_eq!(find_block(config, "normal").map(|b| b.contains("/ok.jsonl")), Some(true));
        assert_eq!(extract_log_path(config).unwrap(), "/ok.jsonl");
    }

    #[test]
    fn test_unclosed_block() {
        let config = "local preset_choice = \"normal\"\nnormal = {\n  log_file_path = \"/x\",\n";
        assert!(matches!(
            extract_log_path(config),
            Err(ResolveError::PresetBlockNotFound { .. })
        ));
    }

    #[parameterized(
        double = { r"C:\\Users\\x", r"C:\Users\x" },
        plain = { "/home/me/log.jsonl", "/home/me/log.jsonl" },
        single = { r"C:\Users", r"C:\Users" },
    )]
    fn test_unescape_path(raw: &str, expected: &str) {
        assert_eq!(unescape_path(raw), expected);
    }

    #[test]
    fn test_set_preset_choice_preserves_everything_else() {
        let updated = set_preset_choice(SAMPLE_CONFIG, Preset::Advanced).unwrap();

        assert!(updated.contains("local preset_choice = \"advanced\"\n"));
        assert!(updated.contains("-- local preset_choice = \"advanced\"\n"));
        assert_eq!(updated.len(), SAMPLE_CONFIG.len() + "advanced".len() - "normal".len());
        assert_eq!(find_preset_choice(&updated), Some("advanced"));
        assert_eq!(extract_log_path(&updated).unwrap(), "/var/log/advanced.jsonl");
    }

    #[test]
    fn test_set_preset_choice_only_first_assignment() {
        let config = "local preset_choice = \"normal\"\npreset_choice = \"normal\"\n";
        let updated = set_preset_choice(config, Preset::Developer).unwrap();
        assert_eq!(
            updated,
            "local preset_choice = \"developer\"\npreset_choice = \"normal\"\n"
        );
    }

    #[test]
    fn test_set_preset_choice_missing() {
        assert_eq!(
            set_preset_choice("return {}\n", Preset::Normal),
            Err(ResolveError::NoPresetChoice)
        );
    }

    #[test]
    fn test_resolve_log_path_defaults_when_config_missing() {
        let fs = MockFileSystem::new();
        let resolved = resolve_log_path(
            &fs,
            Path::new("/mock/lua/config.lua"),
            Path::new("/mock/default.jsonl"),
        );

        assert_eq!(resolved.path, PathBuf::from("/mock/default.jsonl"));
        assert_eq!(resolved.source, LogPathSource::Default);
    }

    #[test]
    fn test_resolve_log_path_uses_active_preset() {
        let fs = MockFileSystem::new();
        fs.add_file("lua/config.lua", SAMPLE_CONFIG);

        let resolved = resolve_log_path(
            &fs,
            Path::new("/mock/lua/config.lua"),
            Path::new("/mock/default.jsonl"),
        );

        assert_eq!(resolved.path, PathBuf::from(r"C:\Users\me\habit.jsonl"));
        assert_eq!(resolved.source, LogPathSource::Preset("normal".to_string()));
    }

    #[test]
    fn test_resolve_log_path_falls_back_on_empty_value() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "lua/config.lua",
            "local preset_choice = \"normal\"\nnormal = {\n    log_file_path = \"\",\n}\n",
        );

        let resolved = resolve_log_path(
            &fs,
            Path::new("/mock/lua/config.lua"),
            Path::new("/mock/default.jsonl"),
        );
        assert_eq!(resolved.source, LogPathSource::Default);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(Preset::Normal.to_string(), "normal");
        assert!(Preset::Advanced.is_installable());
        assert!(!Preset::Custom.is_installable());
    }
}
