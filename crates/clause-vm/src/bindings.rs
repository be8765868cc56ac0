//! Table des liaisons statiques : nom → producteur sans argument.

use std::collections::HashMap;
use std::fmt;

use clause_core::Value;
use serde::Serialize;

use crate::bridge::{self, BridgeError, ToValue};

/// Producteur de valeur hôte, réinvoqué à chaque référence.
pub type Producer = Box<dyn Fn() -> Result<Value, BridgeError> + Send + Sync>;

/// Registre des liaisons `@nom`.
#[derive(Default)]
pub struct StaticBindings {
    entries: HashMap<String, Producer>,
}

impl StaticBindings {
    /// Registre vide.
    pub fn new() -> Self { Self::default() }

    /// Enregistre (ou remplace) un producteur.
    pub fn register<F>(&mut self, name: impl Into<String>, producer: F)
    where
        F: Fn() -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(producer));
    }

    /// Producteur renvoyant une valeur `Serialize`, convertie à chaque appel.
    pub fn register_serde<T, F>(&mut self, name: impl Into<String>, producer: F)
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(name, move || bridge::reflect(&producer()));
    }

    /// Valeur hôte possédée, reconvertie à chaque référence.
    pub fn register_value<T>(&mut self, name: impl Into<String>, host: T)
    where
        T: ToValue + Send + Sync + 'static,
    {
        self.register(name, move || host.to_value());
    }

    /// Invoque le producteur de `name` ; `None` si absent.
    pub fn resolve(&self, name: &str) -> Option<Result<Value, BridgeError>> { self.entries.get(name).map(|p| p()) }

    /// Vrai si `name` est lié.
    pub fn contains(&self, name: &str) -> bool { self.entries.contains_key(name) }

    /// Nombre de liaisons.
    pub fn len(&self) -> usize { self.entries.len() }

    /// Vrai si aucune liaison.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Noms liés, triés.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StaticBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_set().entries(self.names()).finish() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn register_overwrites() {
        let mut b = StaticBindings::new();
        b.register("x", || Ok(Value::Int(1)));
        b.register("x", || Ok(Value::Int(2)));
        assert_eq!(b.len(), 1);
        assert_eq!(b.resolve("x"), Some(Ok(Value::Int(2))));
        assert_eq!(b.resolve("y"), None);
    }

    #[test]
    fn serde_and_fixed_values() {
        let mut b = StaticBindings::new();
        b.register_serde("v", || vec![1, 2]);
        b.register_value("s", "hi");
        assert_eq!(b.resolve("v"), Some(Ok(Value::Array(vec![Value::Int(1), Value::Int(2)]))));
        assert_eq!(b.resolve("s"), Some(Ok(Value::from("hi"))));
        assert_eq!(b.names(), vec!["s", "v"]);
        assert_eq!(format!("{b:?}"), r#"{"s", "v"}"#);
        // L'échec de conversion apparaît à la résolution.
        b.register_value("n", None::<i32>);
        assert!(matches!(b.resolve("n"), Some(Err(_))));
    }

    struct Counted(Arc<AtomicUsize>);

    impl ToValue for Counted {
        fn to_value(&self) -> Result<Value, BridgeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(7))
        }
    }

    #[test]
    fn fixed_values_convert_on_every_resolve() {
        let conversions = Arc::new(AtomicUsize::new(0));
        let mut b = StaticBindings::new();
        b.register_value("c", Counted(Arc::clone(&conversions)));
        assert_eq!(conversions.load(Ordering::SeqCst), 0);
        for _ in 0..3 {
            assert_eq!(b.resolve("c"), Some(Ok(Value::Int(7))));
        }
        assert_eq!(conversions.load(Ordering::SeqCst), 3);
    }
}
