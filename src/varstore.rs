//! §4.1 VarStore — environment-scoped string variables with defaulted lookup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The always-present fallback environment.
pub const DEFAULT_ENV: &str = "";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarStore {
    env: String,
    values: IndexMap<String, IndexMap<String, String>>,
}

impl Default for VarStore {
    fn default() -> Self {
        let mut values = IndexMap::new();
        values.insert(DEFAULT_ENV.to_string(), IndexMap::new());
        Self {
            env: DEFAULT_ENV.to_string(),
            values,
        }
    }
}

fn normalize(s: &str) -> String {
    s.to_uppercase()
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after deserializing from disk, to restore the invariant that
    /// the default environment is always present even if the file was
    /// hand-edited to omit it.
    pub fn ensure_default_env(&mut self) {
        self.values.entry(DEFAULT_ENV.to_string()).or_default();
    }

    pub fn current_env(&self) -> &str {
        &self.env
    }

    /// Fallback lookup: current env -> default env -> "".
    pub fn get(&self, name: &str) -> String {
        self.get_in(name, &self.env.clone())
    }

    pub fn get_in(&self, name: &str, env: &str) -> String {
        let name = normalize(name);
        let env = normalize(env);

        if let Some(v) = self.values.get(&env).and_then(|m| m.get(&name)) {
            return v.clone();
        }
        if env != DEFAULT_ENV {
            if let Some(v) = self.values.get(DEFAULT_ENV).and_then(|m| m.get(&name)) {
                return v.clone();
            }
        }
        String::new()
    }

    /// Writes into the current environment.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let env = self.env.clone();
        self.set_in(name, value, &env);
    }

    pub fn set_in(&mut self, name: &str, value: impl Into<String>, env: &str) {
        let name = normalize(name);
        let env = normalize(env);
        self.values
            .entry(env)
            .or_default()
            .insert(name, value.into());
    }

    /// Switches the current environment. Non-existent environments are
    /// created lazily on first write, not here — switching alone does not
    /// mutate `values`.
    pub fn switch_env(&mut self, env: &str) {
        self.env = normalize(env);
    }

    /// The default environment can never be deleted. Deleting the current
    /// environment resets the current environment back to default.
    pub fn delete_env(&mut self, env: &str) -> bool {
        let env = normalize(env);
        if env == DEFAULT_ENV {
            return false;
        }
        let removed = self.values.shift_remove(&env).is_some();
        if removed && self.env == env {
            self.env = DEFAULT_ENV.to_string();
        }
        removed
    }

    /// Number of variables defined in the current environment.
    pub fn count(&self) -> usize {
        self.values.get(&self.env).map_or(0, |m| m.len())
    }

    /// Number of environments, always at least 1 (the default).
    pub fn env_count(&self) -> usize {
        self.values.len()
    }

    pub fn envs(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn vars_in(&self, env: &str) -> impl Iterator<Item = (&str, &str)> {
        let env = normalize(env);
        self.values
            .get(&env)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_lookup_chain() {
        let mut store = VarStore::new();
        store.set_in("token", "default-token", DEFAULT_ENV);
        store.switch_env("staging");
        assert_eq!(store.get("token"), "default-token");

        store.set("token", "staging-token");
        assert_eq!(store.get("token"), "staging-token");

        assert_eq!(store.get("missing"), "");
    }

    #[test]
    fn names_and_envs_are_upper_cased() {
        let mut store = VarStore::new();
        store.switch_env("Staging");
        store.set("token", "abc");
        assert_eq!(store.get_in("TOKEN", "STAGING"), "abc");
        assert_eq!(store.get_in("token", "staging"), "abc");
    }

    #[test]
    fn default_env_cannot_be_deleted() {
        let mut store = VarStore::new();
        assert!(!store.delete_env(""));
        assert_eq!(store.env_count(), 1);
    }

    #[test]
    fn deleting_current_env_resets_to_default() {
        let mut store = VarStore::new();
        store.switch_env("staging");
        store.set("x", "1");
        assert!(store.delete_env("staging"));
        assert_eq!(store.current_env(), DEFAULT_ENV);
    }

    #[test]
    fn env_count_minimum_is_one() {
        let store = VarStore::new();
        assert_eq!(store.env_count(), 1);
    }
}
