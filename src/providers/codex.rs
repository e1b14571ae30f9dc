//! OpenAI Codex CLI adapter (`~/.codex/config.toml` + `~/.codex/auth.json`).
//!
//! `config.toml` is edited as a sequence of lines: scan and classify every
//! line, then splice the few lines that change. Comments, ordering and
//! unknown keys are never re-serialized, so they survive byte-for-byte.
//!
//! The effective provider section is chosen by the same rule on read and
//! write: the section named by the root `model_provider` key, else the
//! `codex` section, else the first provider section in file order.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::agent_ids::AgentId;
use crate::error::{Error, Result};
use crate::fields::{Fields, Update};
use crate::fs::{self, PRIVATE_FILE_MODE};
use crate::providers::{Backup, Provider, with_rollback};

const PROVIDERS_TABLE: &str = "model_providers";
const OWN_PROVIDER: &str = "codex";

pub const BASE_URL_KEY: &str = "base_url";
pub const SELECTED_PROVIDER_KEY: &str = "model_provider";
pub const MODEL_KEY: &str = "model";
pub const TOKEN_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct CodexProvider {
    config_path: PathBuf,
    auth_path: PathBuf,
}

impl CodexProvider {
    pub fn new(home: &Path) -> Self {
        let dir = home.join(".codex");
        Self {
            config_path: dir.join("config.toml"),
            auth_path: dir.join("auth.json"),
        }
    }

    fn load_config(&self) -> Result<Option<ConfigDoc>> {
        Ok(fs::read_optional(&self.config_path)?.map(|content| ConfigDoc::parse(&content)))
    }

    fn load_auth(&self) -> Result<Option<Map<String, Value>>> {
        let Some(content) = fs::read_optional(&self.auth_path)? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(Some(Map::new()));
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(Error::malformed(&self.auth_path, "auth must be a JSON object")),
            Err(e) => Err(Error::malformed(&self.auth_path, e)),
        }
    }
}

impl Provider for CodexProvider {
    fn id(&self) -> AgentId {
        AgentId::Codex
    }

    fn paths(&self) -> Vec<PathBuf> {
        vec![self.config_path.clone(), self.auth_path.clone()]
    }

    fn read(&self) -> Result<Fields> {
        let mut fields = Fields::default();

        if let Some(doc) = self.load_config()? {
            if let Some(section) = doc.target_section() {
                fields.url = section.base_url.clone().unwrap_or_default();
            }
            fields.model = doc.model.clone().unwrap_or_default();
        } else {
            tracing::debug!(path = %self.config_path.display(), "Codex config not found");
        }

        if let Some(auth) = self.load_auth()? {
            fields.token = auth
                .get(TOKEN_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
        }

        Ok(fields)
    }

    fn write(&self, fields: &Fields, model: &Update<String>) -> Result<Backup> {
        self.write_with(fields, model, |path, body| {
            fs::write_atomic(path, body, PRIVATE_FILE_MODE)
        })
    }
}

impl CodexProvider {
    /// Body of [`Provider::write`] with the file replace step supplied by
    /// the caller.
    fn write_with<W>(&self, fields: &Fields, model: &Update<String>, write: W) -> Result<Backup>
    where
        W: Fn(&Path, &[u8]) -> Result<()>,
    {
        self.validate(fields)?;

        // Prepare both files before touching either.
        let original = fs::read_optional(&self.config_path)?;
        let doc = original
            .as_deref()
            .map(ConfigDoc::parse)
            .unwrap_or_default();
        let config_body = doc.edit(&fields.url, model);

        let auth_body = if fields.token.is_empty() {
            None
        } else {
            let mut auth = self.load_auth()?.unwrap_or_default();
            auth.insert(TOKEN_KEY.to_string(), Value::String(fields.token.clone()));
            let mut body = serde_json::to_string_pretty(&Value::Object(auth))
                .map_err(|e| Error::malformed(&self.auth_path, e))?;
            body.push('\n');
            Some(body)
        };

        let mut backup = Backup::new();
        backup.snapshot(&self.config_path)?;
        if auth_body.is_some() {
            backup.snapshot(&self.auth_path)?;
        }

        write(&self.config_path, config_body.as_bytes())?;
        if let Some(body) = auth_body {
            with_rollback(
                || write(&self.auth_path, body.as_bytes()),
                || self.restore_config(original.as_deref()),
            )?;
        }

        tracing::info!(
            config = %self.config_path.display(),
            auth = %self.auth_path.display(),
            "Wrote Codex configuration"
        );
        Ok(backup)
    }

    /// Put `config.toml` back the way it was after a failed token write.
    fn restore_config(&self, original: Option<&str>) {
        let restored = match original {
            Some(content) => {
                fs::write_atomic(&self.config_path, content.as_bytes(), PRIVATE_FILE_MODE)
            }
            None => std::fs::remove_file(&self.config_path)
                .map_err(|e| Error::write(&self.config_path, e)),
        };
        if let Err(e) = restored {
            tracing::error!(
                path = %self.config_path.display(),
                error = %e,
                "Failed to roll back Codex config"
            );
        }
    }
}

// =============================================================================
// Line Model
// =============================================================================

/// One `[model_providers.<name>]` table found in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProviderSection {
    name: String,
    header_line: usize,
    base_url_line: Option<usize>,
    base_url: Option<String>,
}

/// `config.toml` as lines plus the positions the adapter cares about.
#[derive(Debug, Default)]
struct ConfigDoc {
    lines: Vec<String>,
    trailing_newline: bool,
    sections: Vec<ProviderSection>,
    selected: Option<String>,
    model: Option<String>,
    model_line: Option<usize>,
    /// Last line of the last root-level `key = value` entry. For a value
    /// spanning several lines this is its closing line.
    last_root_key_line: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Root,
    Provider(usize),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrKind {
    Basic,
    Literal,
    MultiBasic,
    MultiLiteral,
}

/// Delimiters left open at the end of a line of a value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ValueState {
    depth: usize,
    string: Option<StrKind>,
}

impl ValueState {
    /// Whether the value continues on the next line.
    fn is_open(&self) -> bool {
        self.depth > 0
            || matches!(
                self.string,
                Some(StrKind::MultiBasic | StrKind::MultiLiteral)
            )
    }

    /// Advance over one line of value text.
    fn scan(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let rest = &bytes[i..];
            match (self.string, bytes[i]) {
                (Some(StrKind::Basic | StrKind::MultiBasic), b'\\') => i += 1,
                (Some(StrKind::Basic), b'"') | (Some(StrKind::Literal), b'\'') => {
                    self.string = None;
                }
                (Some(StrKind::MultiBasic), b'"') if rest.starts_with(b"\"\"\"") => {
                    self.string = None;
                    i += 2;
                }
                (Some(StrKind::MultiLiteral), b'\'') if rest.starts_with(b"'''") => {
                    self.string = None;
                    i += 2;
                }
                (Some(_), _) => {}
                (None, b'#') => break,
                (None, b'"') if rest.starts_with(b"\"\"\"") => {
                    self.string = Some(StrKind::MultiBasic);
                    i += 2;
                }
                (None, b'"') => self.string = Some(StrKind::Basic),
                (None, b'\'') if rest.starts_with(b"'''") => {
                    self.string = Some(StrKind::MultiLiteral);
                    i += 2;
                }
                (None, b'\'') => self.string = Some(StrKind::Literal),
                (None, b'[' | b'{') => self.depth += 1,
                (None, b']' | b'}') => self.depth = self.depth.saturating_sub(1),
                (None, _) => {}
            }
            i += 1;
        }
        // Single-line strings never continue.
        if matches!(self.string, Some(StrKind::Basic | StrKind::Literal)) {
            self.string = None;
        }
    }
}

impl ConfigDoc {
    fn parse(content: &str) -> Self {
        let mut doc = ConfigDoc {
            trailing_newline: content.is_empty() || content.ends_with('\n'),
            ..Default::default()
        };
        if content.is_empty() {
            return doc;
        }
        let body = content.strip_suffix('\n').unwrap_or(content);
        doc.lines = body.split('\n').map(str::to_string).collect();

        let mut scope = Scope::Root;
        // Set while inside a value that spans lines; such lines are never
        // classified as headers or keys.
        let mut pending: Option<ValueState> = None;
        for (idx, line) in doc.lines.iter().enumerate() {
            if let Some(mut state) = pending.take() {
                state.scan(line);
                if state.is_open() {
                    pending = Some(state);
                } else if matches!(scope, Scope::Root) {
                    doc.last_root_key_line = Some(idx);
                }
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') {
                scope = match provider_name(trimmed) {
                    Some(name) => {
                        doc.sections.push(ProviderSection {
                            name,
                            header_line: idx,
                            base_url_line: None,
                            base_url: None,
                        });
                        Scope::Provider(doc.sections.len() - 1)
                    }
                    None => Scope::Other,
                };
                continue;
            }
            let Some((key, value)) = split_key_value(trimmed) else {
                continue;
            };
            let mut state = ValueState::default();
            state.scan(value);
            let multiline = state.is_open();
            if multiline {
                pending = Some(state);
            }
            match scope {
                Scope::Root => {
                    if !multiline {
                        doc.last_root_key_line = Some(idx);
                    }
                    if key == SELECTED_PROVIDER_KEY {
                        doc.selected = Some(parse_value(value));
                    } else if key == MODEL_KEY {
                        doc.model = Some(parse_value(value));
                        doc.model_line = Some(idx);
                    }
                }
                Scope::Provider(i) if key == BASE_URL_KEY => {
                    let section = &mut doc.sections[i];
                    if section.base_url_line.is_none() {
                        section.base_url_line = Some(idx);
                        section.base_url = Some(parse_value(value));
                    }
                }
                Scope::Provider(_) | Scope::Other => {}
            }
        }
        doc
    }

    fn section_index(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    fn target_index(&self) -> Option<usize> {
        if let Some(selected) = self.selected.as_deref().filter(|s| !s.is_empty()) {
            match self.section_index(selected) {
                Some(i) => return Some(i),
                None => tracing::warn!(
                    provider = %selected,
                    "Selected Codex provider has no [model_providers] section"
                ),
            }
        }
        self.section_index(OWN_PROVIDER)
            .or_else(|| (!self.sections.is_empty()).then_some(0))
    }

    fn target_section(&self) -> Option<&ProviderSection> {
        self.target_index().map(|i| &self.sections[i])
    }

    /// Render the file with the target section's `base_url` and the root
    /// `model` line updated. Every other line is emitted unchanged.
    fn edit(mut self, url: &str, model: &Update<String>) -> String {
        let url_line = |indent: &str| format!("{indent}{BASE_URL_KEY} = {}", quote(url));

        // Section edits only touch lines after the first header, so the
        // root line indices used below stay valid.
        match self.target_index() {
            Some(i) => {
                let section = &self.sections[i];
                match section.base_url_line {
                    Some(line) => {
                        let indent = leading_whitespace(&self.lines[line]).to_string();
                        self.lines[line] = url_line(&indent);
                    }
                    None => {
                        let indent = self
                            .lines
                            .get(section.header_line + 1)
                            .filter(|l| !l.trim().is_empty() && !l.trim().starts_with('['))
                            .map(|l| leading_whitespace(l).to_string())
                            .unwrap_or_default();
                        self.lines.insert(section.header_line + 1, url_line(&indent));
                    }
                }
            }
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{PROVIDERS_TABLE}.{OWN_PROVIDER}]"));
                self.lines.push(url_line(""));
            }
        }

        match (model, self.model_line) {
            (Update::Unchanged, _) | (Update::Clear, None) => {}
            (Update::Clear, Some(line)) => {
                self.lines.remove(line);
            }
            (Update::Set(m), Some(line)) => {
                let indent = leading_whitespace(&self.lines[line]).to_string();
                self.lines[line] = format!("{indent}{MODEL_KEY} = {}", quote(m));
            }
            (Update::Set(m), None) => {
                let at = self.last_root_key_line.map_or(0, |l| l + 1);
                self.lines.insert(at, format!("{MODEL_KEY} = {}", quote(m)));
            }
        }

        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

// =============================================================================
// TOML Line Helpers
// =============================================================================

/// Provider name for a `[model_providers.<name>]` header, `None` for any
/// other table header (including deeper sub-tables and array tables).
fn provider_name(header: &str) -> Option<String> {
    if header.starts_with("[[") {
        return None;
    }
    let inner = header.strip_prefix('[')?;
    let end = inner.find(']')?;
    let segments = split_dotted(&inner[..end]);
    match segments.as_slice() {
        [table, name] if table == PROVIDERS_TABLE => Some(name.clone()),
        _ => None,
    }
}

/// Split a dotted table path, honoring quoted segments.
fn split_dotted(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in path.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => quote = Some(c),
            (None, '.') => segments.push(std::mem::take(&mut current).trim().to_string()),
            (None, c) => current.push(c),
        }
    }
    segments.push(current.trim().to_string());
    segments
}

/// `key = value` with the key unquoted; `None` for anything else.
fn split_key_value(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let key = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(key);
    Some((key.to_string(), value))
}

/// Decode a TOML string value (basic, literal or bare), ignoring any
/// trailing comment.
fn parse_value(raw: &str) -> String {
    let raw = raw.trim_start();
    let mut chars = raw.chars();
    match chars.next() {
        Some('"') => {
            let mut out = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => match chars.next() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('b') => out.push('\u{8}'),
                        Some('f') => out.push('\u{c}'),
                        Some(u @ ('u' | 'U')) => {
                            let len = if u == 'u' { 4 } else { 8 };
                            let hex: String = chars.by_ref().take(len).collect();
                            if let Some(c) = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                            {
                                out.push(c);
                            }
                        }
                        Some(other) => out.push(other),
                        None => break,
                    },
                    c => out.push(c),
                }
            }
            out
        }
        Some('\'') => chars.take_while(|c| *c != '\'').collect(),
        _ => raw.split('#').next().unwrap_or_default().trim().to_string(),
    }
}

/// Encode as a TOML basic string.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
