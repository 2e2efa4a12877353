//! The atomic ingestion unit (spec.md §3 "Field"), grounded on the
//! `Field` dataclass of `src/models/base.py` in `examples/original_source`.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Bool,
    Timestamp,
    String,
    Binary,
    Varbinary,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uint8 => "uint8",
            FieldType::Uint16 => "uint16",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Bool => "bool",
            FieldType::Timestamp => "timestamp",
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::Varbinary => "varbinary",
        };
        write!(f, "{s}")
    }
}

/// A field's mutable runtime value. `Null` is the epoch-start and
/// transform-failure state (spec.md §3 lifecycle / §7 kind 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// `idx` references in transformer expressions resolve to a whole dict.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::String(s) => s.parse().ok(),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            FieldValue::Map(_) => write!(f, "<map>"),
        }
    }
}

/// A readonly system field (`ts`, `uid`, `created_at`, `updated_at`) is
/// never cleared between epochs (spec.md §3 Lifecycle).
pub fn is_readonly_system_field(name: &str) -> bool {
    matches!(name, "ts" | "uid" | "created_at")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// Source locator; format depends on ingester type.
    pub target: String,
    /// Path, CSS/XPath, calldata sig, byte range, or channel name.
    pub selector: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Ordered list of transformer expression strings.
    #[serde(default)]
    pub transformers: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub protected: bool,
    /// Optional handler expression (ws_api / resp3_subscriber).
    #[serde(default)]
    pub handler: Option<String>,
    /// Optional reducer expression (ws_api / resp3_subscriber).
    #[serde(default)]
    pub reducer: Option<String>,

    #[serde(skip)]
    pub value: FieldValue,

    #[serde(skip)]
    target_id: OnceCell<String>,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        target: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Field {
            name: name.into(),
            field_type,
            target: target.into(),
            selector: selector.into(),
            params: BTreeMap::new(),
            transformers: Vec::new(),
            tags: Vec::new(),
            transient: false,
            protected: false,
            handler: None,
            reducer: None,
            value: FieldValue::Null,
            target_id: OnceCell::new(),
        }
    }

    /// Stable `target_id = MD5(target ∥ selector ∥ params ∥ handler)`
    /// (spec.md §3). Memoized: computed once, reused for the process
    /// lifetime (invariant P4/P6 at zero recurring cost).
    pub fn target_id(&self) -> &str {
        self.target_id.get_or_init(|| {
            let mut buf = String::new();
            buf.push_str(&self.target);
            buf.push_str(&self.selector);
            for (k, v) in &self.params {
                buf.push_str(k);
                buf.push_str(v);
            }
            if let Some(h) = &self.handler {
                buf.push_str(h);
            }
            format!("{:x}", md5::compute(buf.as_bytes()))
        })
    }

    /// Signature bytes folded into an owning ingester's `id` (spec.md §3).
    pub fn signature(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name, self.field_type, self.target_id(), self.transformers.join(",")
        )
    }

    /// Reset to the epoch-start state, except readonly system fields
    /// (spec.md §3 Lifecycle).
    pub fn clear_for_epoch(&mut self) {
        if !is_readonly_system_field(&self.name) {
            self.value = FieldValue::Null;
        }
    }

    /// Merge-replace-empty: copy attributes from `other` only where this
    /// field's own attribute is still empty/default (spec.md §4.5.4,
    /// processor dependency inheritance).
    pub fn inherit_missing_from(&mut self, other: &Field) {
        if self.transformers.is_empty() {
            self.transformers = other.transformers.clone();
        }
        if self.tags.is_empty() {
            self.tags = other.tags.clone();
        }
        if self.handler.is_none() {
            self.handler = other.handler.clone();
        }
        if self.params.is_empty() {
            self.params = other.params.clone();
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Null
    }
}

/// Filters fields visible under `scope`: a `protected` field only survives
/// if the scope explicitly includes `Scope::PROTECTED` (invariant P3).
pub fn public_filter(fields: &[Field], scope: Scope) -> Vec<&Field> {
    fields
        .iter()
        .filter(|f| !f.protected || scope.contains(Scope::PROTECTED))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_is_stable_across_calls() {
        let f = Field::new("usd", FieldType::Float64, "http://x/p", ".data.usd");
        let a = f.target_id().to_string();
        let b = f.target_id().to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn target_id_changes_with_selector() {
        let f1 = Field::new("usd", FieldType::Float64, "http://x/p", ".data.usd");
        let f2 = Field::new("usd", FieldType::Float64, "http://x/p", ".data.eur");
        assert_ne!(f1.target_id(), f2.target_id());
    }

    #[test]
    fn clear_for_epoch_preserves_readonly_fields() {
        let mut uid = Field::new("uid", FieldType::String, "", "");
        uid.value = FieldValue::String("abc".into());
        uid.clear_for_epoch();
        assert_eq!(uid.value, FieldValue::String("abc".into()));

        let mut usd = Field::new("usd", FieldType::Float64, "", "");
        usd.value = FieldValue::Float(1.0);
        usd.clear_for_epoch();
        assert!(usd.value.is_null());
    }

    #[test]
    fn protected_field_hidden_from_public_scope() {
        let mut f = Field::new("secret", FieldType::String, "", "");
        f.protected = true;
        let visible = public_filter(std::slice::from_ref(&f), Scope::DETAILED);
        assert!(visible.is_empty());
    }
}
