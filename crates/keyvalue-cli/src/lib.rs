//! # keyvalue-cli
//!
//! Store commands shared by the `keyvalue` binary. Each command runs against
//! any [`Storage`], so the same code serves the persistent and secure
//! backends.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use keyvalue_core::{Storage, StorageExt};

/// How a value is typed when stored and read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ValueType {
    /// UTF-8 text
    #[default]
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// `true` or `false`
    Bool,
    /// Any JSON document, stored as a structured value
    Json,
}

/// A store operation
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        key: String,
        #[arg(long = "type", value_enum, default_value_t)]
        value_type: ValueType,
    },
    /// Store a value under a key
    Set {
        key: String,
        value: String,
        #[arg(long = "type", value_enum, default_value_t)]
        value_type: ValueType,
    },
    /// Remove a key
    Remove { key: String },
    /// List every key in the store
    List,
    /// Remove every key the store owns
    Clear,
}

impl Command {
    /// Run the command, writing its output to `out`
    pub fn execute(&self, storage: &dyn Storage, out: &mut impl Write) -> Result<()> {
        match self {
            Command::Get { key, value_type } => {
                let Some(text) = read_value(storage, key, *value_type)? else {
                    bail!("No {:?} value stored under {:?}", value_type, key);
                };
                writeln!(out, "{}", text)?;
            }
            Command::Set { key, value, value_type } => {
                if !write_value(storage, key, value, *value_type)? {
                    bail!("{} rejected the value for {:?}", storage.backend_name(), key);
                }
            }
            Command::Remove { key } => {
                if !storage.remove(key) {
                    bail!("{} failed to remove {:?}", storage.backend_name(), key);
                }
            }
            Command::List => {
                let mut keys = storage.list_keys();
                keys.sort();
                for key in keys {
                    writeln!(out, "{}", key)?;
                }
            }
            Command::Clear => {
                if !storage.clear() {
                    bail!("{} failed to clear", storage.backend_name());
                }
            }
        }
        Ok(())
    }
}

fn read_value(storage: &dyn Storage, key: &str, value_type: ValueType) -> Result<Option<String>> {
    let text = match value_type {
        ValueType::String => storage.get::<String>(key),
        ValueType::Int => storage.get::<i64>(key).map(|v| v.to_string()),
        ValueType::Double => storage.get::<f64>(key).map(|v| v.to_string()),
        ValueType::Bool => storage.get::<bool>(key).map(|v| v.to_string()),
        ValueType::Json => match storage.get::<serde_json::Value>(key) {
            Some(value) => Some(serde_json::to_string_pretty(&value)?),
            None => None,
        },
    };
    Ok(text)
}

fn write_value(storage: &dyn Storage, key: &str, raw: &str, value_type: ValueType) -> Result<bool> {
    let stored = match value_type {
        ValueType::String => storage.set(key, Some(&raw.to_string())),
        ValueType::Int => {
            let value: i64 = raw.parse().with_context(|| format!("{:?} is not an integer", raw))?;
            storage.set(key, Some(&value))
        }
        ValueType::Double => {
            let value: f64 = raw.parse().with_context(|| format!("{:?} is not a number", raw))?;
            storage.set(key, Some(&value))
        }
        ValueType::Bool => {
            let value: bool = raw.parse().with_context(|| format!("{:?} is not a boolean", raw))?;
            storage.set(key, Some(&value))
        }
        ValueType::Json => {
            let value: serde_json::Value =
                serde_json::from_str(raw).with_context(|| format!("{:?} is not valid JSON", raw))?;
            storage.set(key, Some(&value))
        }
    };
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyvalue_core::MemoryStore;

    fn run(storage: &dyn Storage, command: Command) -> Result<String> {
        let mut out = Vec::new();
        command.execute(storage, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn set(key: &str, value: &str, value_type: ValueType) -> Command {
        Command::Set {
            key: key.to_string(),
            value: value.to_string(),
            value_type,
        }
    }

    fn get(key: &str, value_type: ValueType) -> Command {
        Command::Get {
            key: key.to_string(),
            value_type,
        }
    }

    #[test]
    fn test_set_then_get() {
        let storage = MemoryStore::new();

        run(&storage, set("name", "qwe", ValueType::String)).unwrap();
        run(&storage, set("count", "42", ValueType::Int)).unwrap();

        assert_eq!(run(&storage, get("name", ValueType::String)).unwrap(), "qwe\n");
        assert_eq!(run(&storage, get("count", ValueType::Int)).unwrap(), "42\n");
    }

    #[test]
    fn test_json_value() {
        let storage = MemoryStore::new();

        run(&storage, set("profile", r#"{"foo":123,"bar":"qwe"}"#, ValueType::Json)).unwrap();

        let printed = run(&storage, get("profile", ValueType::Json)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(parsed, serde_json::json!({ "foo": 123, "bar": "qwe" }));
    }

    #[test]
    fn test_get_missing_or_mismatched_fails() {
        let storage = MemoryStore::new();
        assert!(run(&storage, get("missing", ValueType::String)).is_err());

        run(&storage, set("count", "42", ValueType::Int)).unwrap();
        assert!(run(&storage, get("count", ValueType::Bool)).is_err());
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let storage = MemoryStore::new();

        assert!(run(&storage, set("count", "many", ValueType::Int)).is_err());
        assert!(run(&storage, set("doc", "{", ValueType::Json)).is_err());
        assert!(storage.list_keys().is_empty());
    }

    #[test]
    fn test_list_remove_clear() {
        let storage = MemoryStore::new();
        run(&storage, set("b", "2", ValueType::String)).unwrap();
        run(&storage, set("a", "1", ValueType::String)).unwrap();

        assert_eq!(run(&storage, Command::List).unwrap(), "a\nb\n");

        run(&storage, Command::Remove { key: "a".to_string() }).unwrap();
        assert_eq!(run(&storage, Command::List).unwrap(), "b\n");

        run(&storage, Command::Clear).unwrap();
        assert_eq!(run(&storage, Command::List).unwrap(), "");
    }
}
