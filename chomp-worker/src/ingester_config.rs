//! Loads the worker's ingesters file into [`chomp_common::Ingester`]
//! values, grounded on `IngesterConfig`/`Ingester.from_config` in
//! `src/models/ingesters.py` of `examples/original_source`: one YAML
//! mapping keyed by ingester name, each value shaped like the struct
//! itself except the name comes from the key rather than being repeated.

use std::path::Path;

use chomp_common::{ConfigError, Ingester};

pub fn load_ingesters(path: &Path) -> Result<Vec<Ingester>, ConfigError> {
    let doc = chomp_common::config::load_yaml_with_includes(path)?;
    let definitions = chomp_common::config::ingester_definitions(doc);

    let mut ingesters = Vec::with_capacity(definitions.len());
    for (name, mut value) in definitions {
        if let serde_yaml::Value::Mapping(map) = &mut value {
            map.insert(serde_yaml::Value::String("name".to_string()), serde_yaml::Value::String(name.clone()));
        }
        let ingester: Ingester = serde_yaml::from_value(value).map_err(|e| ConfigError::Parse {
            path: format!("{} (ingester {name})", path.display()),
            source: anyhow::Error::from(e),
        })?;
        ingesters.push(ingester);
    }
    ingesters.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ingesters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_minimal_ingester_definition() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "btc_price:\n  ingester_type: http_api\n  resource_type: value\n  interval: m1\n  fields:\n    - name: usd\n      field_type: float64\n      target: https://example.com\n      selector: .data.usd\n"
        )
        .unwrap();
        let ingesters = load_ingesters(file.path()).unwrap();
        assert_eq!(ingesters.len(), 1);
        assert_eq!(ingesters[0].name, "btc_price");
        assert_eq!(ingesters[0].fields.len(), 1);
    }

    #[test]
    fn missing_file_reports_config_error() {
        let missing = Path::new("/nonexistent/chomp-ingesters.yml");
        assert!(load_ingesters(missing).is_err());
    }
}
