/**
 * REGISTRE DE CONTRATS MQTT
 *
 * RÔLE : Charge les contrats JSON de `contracts/mqtt` et vérifie chaque
 * payload entrant avant ingestion.
 *
 * FONCTIONNEMENT : un contrat = `{ "topic": ..., "schema": {...} }`, indexé
 * par le dernier segment du topic ("snapshot@v1" n'est pas unique, on garde
 * donc les deux derniers : "nodes/snapshot@v1").
 * Validation volontairement légère : `type`, `required`, et `type` des
 * propriétés présentes. Pas de JSON Schema complet.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub topic: String,
    pub schema: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("contract '{0}' not found")]
    NotFound(String),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected {expected} at {path}")]
    WrongType { path: String, expected: String },
    #[error("missing required field '{0}'")]
    MissingField(String),
}

#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: HashMap<String, Contract>, // "nodes/snapshot@v1" -> Contract
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: Contract) {
        let name = extract_contract_name(&contract.topic);
        self.contracts.insert(name, contract);
    }

    /// Charge tous les contrats `*.json` du dossier. Un fichier invalide est
    /// ignoré avec un warning, un dossier illisible est une erreur.
    pub async fn load_contracts_from_dir<P: AsRef<Path>>(contracts_dir: P) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        let mut entries = fs::read_dir(contracts_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read contract");
                    continue;
                }
            };
            match serde_json::from_str::<Contract>(&content) {
                Ok(contract) => {
                    debug!(topic = %contract.topic, "loaded contract");
                    registry.insert(contract);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "invalid contract JSON"),
            }
        }

        Ok(registry)
    }

    /// Parse le payload et vérifie qu'il respecte le contrat du topic.
    pub fn validate_message(&self, topic: &str, payload: &str) -> Result<Value, ContractError> {
        let name = extract_contract_name(topic);
        let contract = self.contracts.get(&name).ok_or(ContractError::NotFound(name))?;
        let value: Value = serde_json::from_str(payload)?;
        check_schema(&contract.schema, &value, "$")?;
        Ok(value)
    }

    pub fn list_contracts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contracts.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_contract(&self, contract_name: &str) -> Option<&Contract> {
        self.contracts.get(contract_name)
    }
}

/// Ex: "fleetview/nodes/snapshot@v1" -> "nodes/snapshot@v1"
fn extract_contract_name(topic: &str) -> String {
    let mut parts = topic.rsplit('/');
    match (parts.next(), parts.next()) {
        (Some(last), Some(parent)) => format!("{parent}/{last}"),
        _ => topic.to_string(),
    }
}

fn check_schema(schema: &Value, value: &Value, path: &str) -> Result<(), ContractError> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            return Err(ContractError::WrongType { path: path.to_string(), expected: expected.to_string() });
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if value.get(field).is_none() {
                return Err(ContractError::MissingField(field.to_string()));
            }
        }
    }

    if let (Some(props), Some(obj)) = (schema.get("properties").and_then(Value::as_object), value.as_object()) {
        for (key, sub_schema) in props {
            if let Some(sub_value) = obj.get(key) {
                check_schema(sub_schema, sub_value, &format!("{path}.{key}"))?;
            }
        }
    }

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for (i, item) in array.iter().enumerate() {
            check_schema(items, item, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}
