//! Per-user ssh alias configuration
//!
//! Reads the subset of `ssh_config(5)` needed to turn a host alias into
//! connection parameters: `Host` blocks with `*`/`?` wildcards and `!`
//! negation, `Key value` or `Key=value` lines, case-insensitive keys,
//! first-match-wins semantics, and `Include` with `~` and wildcards.
//! `Match` blocks are skipped.

use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Looks up configuration values for a host alias
pub trait HostLookup: Send + Sync {
    /// Value of `key` for `alias`, or an empty string if unset
    fn lookup(&self, alias: &str, key: &str) -> String;
}

#[derive(Debug, Clone)]
struct HostPattern {
    glob: String,
    negated: bool,
}

#[derive(Debug, Clone)]
struct HostBlock {
    /// Empty for `Match` blocks, which never match
    patterns: Vec<HostPattern>,
    /// (lowercased key, value) in file order
    options: Vec<(String, String)>,
}

impl HostBlock {
    fn matches(&self, alias: &str) -> bool {
        let alias = alias.to_ascii_lowercase();
        let mut matched = false;
        for pattern in &self.patterns {
            if glob_match(&pattern.glob, &alias) {
                if pattern.negated {
                    return false;
                }
                matched = true;
            }
        }
        matched
    }
}

/// Include nesting limit, as in OpenSSH
const MAX_INCLUDE_DEPTH: usize = 16;

/// Parsed ssh client configuration
#[derive(Debug, Clone, Default)]
pub struct SshConfig {
    blocks: Vec<HostBlock>,
}

impl SshConfig {
    /// Parse configuration text
    ///
    /// Relative `Include` paths resolve against `~/.ssh`.
    pub fn parse(content: &str) -> Self {
        let home = dirs::home_dir();
        Reader::new(home.as_deref()).read(content)
    }

    /// Parse configuration text with an explicit home directory
    pub fn parse_with_home(content: &str, home: Option<&Path>) -> Self {
        Reader::new(home).read(content)
    }

    /// Load configuration from `path`; a missing file is an empty config
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let home = dirs::home_dir();
        Self::load_with_home(path, home.as_deref())
    }

    /// Load configuration from `path` with an explicit home directory
    pub fn load_with_home(path: &Path, home: Option<&Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse_with_home(&content, home)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No ssh config at {:?}", path);
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Invalid(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// First value of `key` that applies to `alias`
    pub fn get(&self, alias: &str, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.blocks
            .iter()
            .filter(|block| block.matches(alias))
            .flat_map(|block| block.options.iter())
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parser state shared across included files
struct Reader<'a> {
    home: Option<&'a Path>,
    blocks: Vec<HostBlock>,
}

impl<'a> Reader<'a> {
    fn new(home: Option<&'a Path>) -> Self {
        // Options before the first Host line apply to every host
        Self {
            home,
            blocks: vec![HostBlock {
                patterns: vec![HostPattern {
                    glob: "*".to_string(),
                    negated: false,
                }],
                options: vec![],
            }],
        }
    }

    fn read(mut self, content: &str) -> SshConfig {
        self.read_lines(content, 0);
        SshConfig {
            blocks: self.blocks,
        }
    }

    fn read_lines(&mut self, content: &str, depth: usize) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = split_option(line) else {
                tracing::debug!("Ignoring malformed ssh config line: {:?}", line);
                continue;
            };
            let key = key.to_ascii_lowercase();

            match key.as_str() {
                "host" => self.blocks.push(HostBlock {
                    patterns: value
                        .split_whitespace()
                        .map(|p| match p.strip_prefix('!') {
                            Some(glob) => HostPattern {
                                glob: glob.to_ascii_lowercase(),
                                negated: true,
                            },
                            None => HostPattern {
                                glob: p.to_ascii_lowercase(),
                                negated: false,
                            },
                        })
                        .collect(),
                    options: vec![],
                }),
                "match" => self.blocks.push(HostBlock {
                    patterns: vec![],
                    options: vec![],
                }),
                "include" => self.include(value, depth),
                _ => {
                    if let Some(block) = self.blocks.last_mut() {
                        block.options.push((key, unquote(value).to_string()));
                    }
                }
            }
        }
    }

    /// Splice included files in place
    ///
    /// Lines before the first `Host` of an included file belong to the
    /// enclosing block, and that block resumes after the include.
    fn include(&mut self, value: &str, depth: usize) {
        if depth >= MAX_INCLUDE_DEPTH {
            tracing::warn!("Ignoring ssh config Include {:?}: nested too deeply", value);
            return;
        }

        let resume = self
            .blocks
            .last()
            .map(|block| block.patterns.clone())
            .unwrap_or_default();
        let before = self.blocks.len();

        for pattern in value.split_whitespace().map(unquote) {
            let Some(pattern) = self.include_path(pattern) else {
                tracing::debug!("No home directory to resolve Include {:?}", pattern);
                continue;
            };
            for path in expand_wildcards(&pattern) {
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        tracing::debug!("Including ssh config {:?}", path);
                        self.read_lines(&content, depth + 1);
                    }
                    Err(e) => tracing::debug!("Skipping ssh config Include {:?}: {}", path, e),
                }
            }
        }

        if self.blocks.len() != before {
            self.blocks.push(HostBlock {
                patterns: resume,
                options: vec![],
            });
        }
    }

    /// Absolute path for an Include argument
    fn include_path(&self, pattern: &str) -> Option<PathBuf> {
        if let Some(rest) = pattern.strip_prefix("~/") {
            return self.home.map(|home| home.join(rest));
        }
        let path = Path::new(pattern);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            self.home.map(|home| home.join(".ssh").join(path))
        }
    }
}

/// Files matching an absolute path whose components may hold `*` or `?`
///
/// Matches are sorted per directory. Hidden entries only match patterns
/// that start with a dot.
fn expand_wildcards(pattern: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::new()];

    for component in pattern.components() {
        let part = component.as_os_str().to_string_lossy();
        let wild = matches!(component, Component::Normal(_))
            && part.contains(|c: char| c == '*' || c == '?');
        if !wild {
            for candidate in &mut candidates {
                candidate.push(component);
            }
            continue;
        }

        let mut next = Vec::new();
        for dir in &candidates {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let mut matched: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .filter(|entry| {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    (!name.starts_with('.') || part.starts_with('.')) && glob_match(&part, &name)
                })
                .map(|entry| entry.path())
                .collect();
            matched.sort();
            next.extend(matched);
        }
        candidates = next;
    }

    candidates
}

impl HostLookup for SshConfig {
    fn lookup(&self, alias: &str, key: &str) -> String {
        self.get(alias, key).unwrap_or_default().to_string()
    }
}

/// Split `Key value` / `Key=value` / `Key = value`
fn split_option(line: &str) -> Option<(&str, &str)> {
    let end = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
    if key.is_empty() || rest.is_empty() {
        return None;
    }
    Some((key, rest))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Match `text` against a glob with `*` and `?`
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
