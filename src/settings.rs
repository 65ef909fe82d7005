//! Compilation settings snapshot.
//!
//! Settings are never edited in place: the host swaps in a whole new
//! [`CompilerSettings`] and drops every cached resolution when it does.

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::path_key::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ScriptTarget {
    ES3,
    #[default]
    ES5,
    ES2015,
    ES2016,
    ES2017,
    ES2018,
    ES2019,
    ES2020,
    ES2021,
    ES2022,
    ESNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolutionKind {
    Classic,
    Node,
    Node16,
    NodeNext,
    Bundler,
}

/// Project-level typings configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypingOptions {
    /// Whether auto-discovered type declarations may satisfy failed module lookups
    pub enable_auto_discovery: bool,
}

/// Immutable compiler settings consumed by the resolution loaders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilerSettings {
    pub target: ScriptTarget,
    pub module_resolution: Option<ModuleResolutionKind>,
    pub base_url: Option<PathBuf>,
    /// Path mapping patterns in declaration order
    pub paths: IndexMap<String, Vec<String>>,
    pub type_roots: Option<Vec<PathBuf>>,
    pub types: Option<Vec<String>>,
    pub trace_resolution: bool,
    pub allow_js: bool,
    pub max_node_module_js_depth: Option<u32>,
}

impl CompilerSettings {
    /// Parse the `compilerOptions` of a tsconfig document.
    ///
    /// Comments and trailing commas are accepted. Relative `baseUrl` and
    /// `typeRoots` entries are anchored at `config_dir`.
    pub fn from_tsconfig_json(source: &str, config_dir: &Path) -> Result<Self> {
        let sanitized = sanitize_jsonc(source);
        let config: TsConfigFile =
            serde_json::from_str(&sanitized).context("failed to parse tsconfig JSON")?;
        match config.compiler_options {
            Some(options) => Self::from_raw(options, config_dir),
            None => Ok(Self::default()),
        }
    }

    fn from_raw(raw: RawCompilerOptions, config_dir: &Path) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(target) = raw.target.as_deref() {
            settings.target = parse_script_target(target)?;
        }

        if let Some(module_resolution) = raw.module_resolution.as_deref() {
            let value = module_resolution.trim();
            if !value.is_empty() {
                settings.module_resolution = Some(parse_module_resolution(value)?);
            }
        }

        settings.base_url = raw
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| anchor(config_dir, value));

        if let Some(paths) = raw.paths {
            for (pattern, targets) in &paths {
                if targets.is_empty() {
                    bail!("compilerOptions.paths '{}' has no substitutions", pattern);
                }
            }
            settings.paths = paths;
        }

        settings.type_roots = raw.type_roots.map(|roots| {
            roots
                .iter()
                .map(|root| root.trim())
                .filter(|root| !root.is_empty())
                .map(|root| anchor(config_dir, root))
                .collect()
        });

        settings.types = raw.types.map(|types| {
            types
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        });

        settings.trace_resolution = raw.trace_resolution.unwrap_or(false);
        settings.allow_js = raw.allow_js.unwrap_or(false);
        settings.max_node_module_js_depth = raw.max_node_module_js_depth;

        Ok(settings)
    }

    /// Module resolution strategy, defaulting to classic Node lookup.
    pub fn effective_module_resolution(&self) -> ModuleResolutionKind {
        self.module_resolution.unwrap_or(ModuleResolutionKind::Node)
    }

    /// File name of the default library for the configured target.
    pub fn default_lib_file_name(&self) -> &'static str {
        match self.target {
            ScriptTarget::ES3 | ScriptTarget::ES5 => "lib.d.ts",
            ScriptTarget::ES2015 => "lib.es6.d.ts",
            ScriptTarget::ES2016 => "lib.es2016.full.d.ts",
            _ => "lib.es2017.full.d.ts",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TsConfigFile {
    #[serde(default)]
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    module_resolution: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    type_roots: Option<Vec<String>>,
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    trace_resolution: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    allow_js: Option<bool>,
    #[serde(default)]
    max_node_module_js_depth: Option<u32>,
}

/// Accept `true`, `false` and their string spellings.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(value)) => Ok(Some(value)),
        Some(Flag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{}'. Expected true or false",
                text
            ))),
        },
    }
}

fn anchor(config_dir: &Path, value: &str) -> PathBuf {
    normalize_path(&config_dir.join(value))
}

fn parse_script_target(value: &str) -> Result<ScriptTarget> {
    let target = match normalize_option(value).as_str() {
        "es3" => ScriptTarget::ES3,
        "es5" => ScriptTarget::ES5,
        "es6" | "es2015" => ScriptTarget::ES2015,
        "es2016" => ScriptTarget::ES2016,
        "es2017" => ScriptTarget::ES2017,
        "es2018" => ScriptTarget::ES2018,
        "es2019" => ScriptTarget::ES2019,
        "es2020" => ScriptTarget::ES2020,
        "es2021" => ScriptTarget::ES2021,
        "es2022" => ScriptTarget::ES2022,
        "esnext" => ScriptTarget::ESNext,
        _ => bail!("unsupported compilerOptions.target '{}'", value),
    };
    Ok(target)
}

fn parse_module_resolution(value: &str) -> Result<ModuleResolutionKind> {
    let resolution = match normalize_option(value).as_str() {
        "classic" => ModuleResolutionKind::Classic,
        "node" | "node10" => ModuleResolutionKind::Node,
        "node16" => ModuleResolutionKind::Node16,
        "nodenext" => ModuleResolutionKind::NodeNext,
        "bundler" => ModuleResolutionKind::Bundler,
        _ => bail!("unsupported compilerOptions.moduleResolution '{}'", value),
    };
    Ok(resolution)
}

fn normalize_option(value: &str) -> String {
    value
        .chars()
        .filter(|ch| *ch != '-' && *ch != '_' && !ch.is_whitespace())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Turn tsconfig-flavoured JSON into plain JSON.
///
/// Drops `//` and `/* */` comments and commas directly followed (modulo
/// whitespace and comments) by `}` or `]`. String contents are untouched.
fn sanitize_jsonc(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                let end = skip_string(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if matches!(chars.get(i + 1), Some('/') | Some('*')) => {
                let end = skip_comment(&chars, i);
                // Keep line structure for serde_json error positions.
                out.extend(chars[i..end].iter().filter(|c| **c == '\n'));
                i = end;
            }
            ',' => {
                let mut next = i + 1;
                loop {
                    while next < chars.len() && chars[next].is_whitespace() {
                        next += 1;
                    }
                    if chars.get(next) == Some(&'/')
                        && matches!(chars.get(next + 1), Some('/') | Some('*'))
                    {
                        next = skip_comment(&chars, next);
                        continue;
                    }
                    break;
                }
                if !matches!(chars.get(next), Some('}') | Some(']')) {
                    out.push(ch);
                }
                i += 1;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}

/// Index just past the string literal opening at `start`.
fn skip_string(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index just past the comment opening at `start`.
fn skip_comment(chars: &[char], start: usize) -> usize {
    if chars.get(start + 1) == Some(&'/') {
        let mut i = start + 2;
        while i < chars.len() && chars[i] != '\n' {
            i += 1;
        }
        return i;
    }

    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}
