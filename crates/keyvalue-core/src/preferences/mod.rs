//! Flat preference namespaces
//!
//! The persistent store treats a preference domain as an opaque native
//! surface: object get/set/remove plus enumeration of every key. This module
//! defines that surface and ships a JSON file implementation.

mod file;
mod value;

use crate::error::Result;

pub use file::FilePreferences;
pub use value::PropertyValue;

/// A flat key/value preference namespace
pub trait PreferenceDomain: Send + Sync {
    /// Get the object stored under a raw key
    fn object(&self, key: &str) -> Option<PropertyValue>;

    /// Store an object under a raw key
    fn set_object(&self, key: &str, value: PropertyValue) -> Result<()>;

    /// Remove the object stored under a raw key
    fn remove_object(&self, key: &str) -> Result<()>;

    /// Remove every object whose raw key satisfies `predicate`
    fn remove_where(&self, predicate: &dyn Fn(&str) -> bool) -> Result<()> {
        for key in self.keys() {
            if predicate(key.as_str()) {
                self.remove_object(&key)?;
            }
        }
        Ok(())
    }

    /// Every raw key currently present in the domain
    fn keys(&self) -> Vec<String>;

    /// Name of the suite this domain is scoped to, if any
    fn suite_name(&self) -> Option<&str>;
}
