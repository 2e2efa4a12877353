//! The unit of scheduling (spec.md §3 "Ingester"), grounded on
//! `src/models/ingesters.py` / `src/models/base.py` in
//! `examples/original_source`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldType, FieldValue};
use crate::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Timeseries,
    Update,
    Series,
    Value,
}

impl ResourceType {
    /// Whether rows of this resource type are ever written to storage at
    /// all (spec.md Glossary: `value` is cache-only).
    pub fn is_persisted(self) -> bool {
        !matches!(self, ResourceType::Value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngesterType {
    HttpApi,
    WsApi,
    StaticScrapper,
    DynamicScrapper,
    EvmCaller,
    SvmCaller,
    SuiCaller,
    Resp3Getter,
    Resp3Subscriber,
    Processor,
    Monitor,
}

impl IngesterType {
    pub fn as_str(self) -> &'static str {
        match self {
            IngesterType::HttpApi => "http_api",
            IngesterType::WsApi => "ws_api",
            IngesterType::StaticScrapper => "static_scrapper",
            IngesterType::DynamicScrapper => "dynamic_scrapper",
            IngesterType::EvmCaller => "evm_caller",
            IngesterType::SvmCaller => "svm_caller",
            IngesterType::SuiCaller => "sui_caller",
            IngesterType::Resp3Getter => "resp3_getter",
            IngesterType::Resp3Subscriber => "resp3_subscriber",
            IngesterType::Processor => "processor",
            IngesterType::Monitor => "monitor",
        }
    }
}

/// System fields prefixed onto a persisted row, per resource type
/// (spec.md §3 invariant P3/P4, §6 "Persisted table schema").
pub fn system_fields_for(resource_type: ResourceType) -> Vec<Field> {
    match resource_type {
        ResourceType::Timeseries | ResourceType::Series => {
            vec![Field::new("ts", FieldType::Timestamp, "", "")]
        }
        ResourceType::Update => vec![
            Field::new("created_at", FieldType::Timestamp, "", ""),
            Field::new("updated_at", FieldType::Timestamp, "", ""),
            Field::new("uid", FieldType::String, "", ""),
        ],
        ResourceType::Value => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingester {
    pub name: String,
    pub ingester_type: IngesterType,
    pub resource_type: ResourceType,
    pub interval: Interval,
    pub fields: Vec<Field>,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub pre_transformer: Option<String>,

    #[serde(skip)]
    pub started: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub last_ingested: Option<DateTime<Utc>>,
}

fn default_probability() -> f64 {
    1.0
}

impl Ingester {
    pub fn new(
        name: impl Into<String>,
        ingester_type: IngesterType,
        resource_type: ResourceType,
        interval: Interval,
    ) -> Self {
        let mut fields = system_fields_for(resource_type);
        fields.truncate(0); // system fields are prepended by `all_fields`, not stored inline
        Ingester {
            name: name.into(),
            ingester_type,
            resource_type,
            interval,
            fields,
            probability: 1.0,
            pre_transformer: None,
            started: None,
            last_ingested: None,
        }
    }

    /// Stable `id = MD5(signature)` per spec.md §3 / invariant P4.
    pub fn id(&self) -> String {
        let mut sig = format!(
            "{}:{}:{}:{}",
            self.name,
            resource_type_tag(self.resource_type),
            self.interval,
            self.ingester_type.as_str(),
        );
        for field in &self.fields {
            sig.push(':');
            sig.push_str(&format!("{:x}", md5::compute(field.signature().as_bytes())));
        }
        format!("{:x}", md5::compute(sig.as_bytes()))
    }

    /// Non-transient, non-system fields in declared order, followed
    /// nowhere — system fields are prepended separately by the storage
    /// layer (spec.md invariant P3/P4).
    pub fn persisted_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| !f.transient).collect()
    }

    /// All columns a persisted row carries: system fields first, then
    /// declared non-transient fields in order (spec.md §6).
    pub fn column_fields(&self) -> Vec<Field> {
        let mut cols = system_fields_for(self.resource_type);
        cols.extend(self.persisted_fields().into_iter().cloned());
        cols
    }

    pub fn clear_fields_for_epoch(&mut self) {
        for field in &mut self.fields {
            field.clear_for_epoch();
        }
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_name_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn set_field_value(&mut self, name: &str, value: FieldValue) -> bool {
        match self.field_by_name_mut(name) {
            Some(field) => {
                field.value = value;
                true
            }
            None => false,
        }
    }

    /// Whether any declared field still holds a null value after
    /// transformation — logged as a "missing fields" warning (spec.md §7
    /// kind 3).
    pub fn missing_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.value.is_null())
            .map(|f| f.name.as_str())
            .collect()
    }
}

fn resource_type_tag(rt: ResourceType) -> &'static str {
    match rt {
        ResourceType::Timeseries => "timeseries",
        ResourceType::Update => "update",
        ResourceType::Series => "series",
        ResourceType::Value => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn sample() -> Ingester {
        let mut ing = Ingester::new(
            "px",
            IngesterType::HttpApi,
            ResourceType::Timeseries,
            "m1".parse().unwrap(),
        );
        ing.fields
            .push(Field::new("usd", FieldType::Float64, "http://x/p", ".data.usd"));
        ing
    }

    #[test]
    fn id_is_stable_across_instances() {
        let a = sample();
        let b = sample();
        assert_eq!(a.id(), b.id()); // P4
    }

    #[test]
    fn id_changes_when_a_field_changes() {
        let a = sample();
        let mut b = sample();
        b.fields[0].selector = ".data.eur".to_string();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn column_fields_prefixes_system_fields_first() {
        let ing = sample();
        let cols = ing.column_fields();
        assert_eq!(cols[0].name, "ts");
        assert_eq!(cols[1].name, "usd");
    }

    #[test]
    fn only_value_resources_skip_storage() {
        assert!(ResourceType::Timeseries.is_persisted());
        assert!(ResourceType::Update.is_persisted());
        assert!(ResourceType::Series.is_persisted());
        assert!(!ResourceType::Value.is_persisted());
    }

    #[test]
    fn transient_field_excluded_from_columns() {
        let mut ing = sample();
        ing.fields.push(Field::new(
            "raw",
            FieldType::String,
            "http://x/p",
            ".data.raw",
        ));
        ing.fields[1].transient = true;
        let cols = ing.column_fields();
        assert!(cols.iter().all(|f| f.name != "raw"));
    }
}
