//! The canonical value triple managed for every agent.

use url::Url;

use crate::error::{Error, Result};

/// Base URL, API token and model for one agent.
///
/// Any field may be empty, which means "not configured". A value read from
/// disk is a snapshot and holds no reference to the file it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub url: String,
    pub token: String,
    pub model: String,
}

impl Fields {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            model: String::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.token.is_empty() && self.model.is_empty()
    }

    /// Per-field differences between `self` (current) and `next`.
    pub fn diff(&self, next: &Fields) -> Vec<FieldChange> {
        [
            (FieldName::Url, &self.url, &next.url),
            (FieldName::Token, &self.token, &next.token),
            (FieldName::Model, &self.model, &next.model),
        ]
        .into_iter()
        .filter(|(_, before, after)| before != after)
        .map(|(field, before, after)| FieldChange {
            field,
            before: before.clone(),
            after: after.clone(),
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Url,
    Token,
    Model,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Url => "url",
            FieldName::Token => "token",
            FieldName::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: FieldName,
    pub before: String,
    pub after: String,
}

/// A field update: leave it alone, blank it, or replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Update<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Update<T> {
    /// Build an update from a CLI-style value/flag pair. `clear` wins over
    /// any supplied value.
    pub fn from_flags(value: Option<T>, clear: bool) -> Self {
        match (clear, value) {
            (true, _) => Update::Clear,
            (false, Some(v)) => Update::Set(v),
            (false, None) => Update::Unchanged,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Update::Unchanged)
    }
}

impl Update<String> {
    /// `Set` for a non-empty value, `Unchanged` otherwise.
    pub fn from_nonempty(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Update::Unchanged
        } else {
            Update::Set(value)
        }
    }

    /// Apply to a stored string field.
    pub fn apply_to(self, field: &mut String) {
        match self {
            Update::Unchanged => {}
            Update::Clear => field.clear(),
            Update::Set(v) => *field = v,
        }
    }
}

/// Check `fields` before any write.
///
/// The URL must be present and absolute with both a scheme and a host.
/// Token and model are never inspected: empty is a legitimate state.
pub fn validate_fields(fields: &Fields) -> Result<()> {
    validate_url(&fields.url)
}

pub(crate) fn validate_url(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidConfig("url is required".to_string()));
    }
    let parsed = Url::parse(raw)
        .map_err(|e| Error::InvalidConfig(format!("invalid url {raw:?}: {e}")))?;
    if parsed.scheme().is_empty() || parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidConfig(format!(
            "invalid url {raw:?}: scheme and host are required"
        )));
    }
    Ok(())
}
