use super::errors::{OperationError, RegistryError};
use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
};


pub type OperationFn<V> = dyn Fn(&[V]) -> Result<V, OperationError> + Send + Sync + 'static;


/// Зарегистрированная чистая функция. `arity == None` - любое число аргументов.
pub struct Operation<V> {
    name: String,
    arity: Option<usize>,
    func: Arc<OperationFn<V>>,
}

impl<V> Operation<V> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub(crate) fn func(&self) -> Arc<OperationFn<V>> {
        self.func.clone()
    }

    pub fn call(&self, arguments: &[V]) -> Result<V, OperationError> {
        (self.func)(arguments)
    }
}

impl<V> Clone for Operation<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            arity: self.arity,
            func: self.func.clone(),
        }
    }
}

impl<V> fmt::Debug for Operation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}


/// Таблица операций. Передаётся в пул при создании и после этого не меняется.
pub struct OperationTable<V> {
    operations: HashMap<String, Operation<V>>,
}

impl<V> OperationTable<V> {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    fn insert(&mut self, operation: Operation<V>) -> Result<&mut Self, RegistryError> {
        if self.operations.contains_key(&operation.name) {
            return Err(RegistryError::Duplicate(operation.name));
        }
        self.operations.insert(operation.name.clone(), operation);
        Ok(self)
    }

    pub fn register<S, F>(&mut self, name: S, arity: usize, func: F) -> Result<&mut Self, RegistryError>
    where
        S: Into<String>,
        F: Fn(&[V]) -> Result<V, OperationError> + Send + Sync + 'static,
    {
        self.insert(Operation {
            name: name.into(),
            arity: Some(arity),
            func: Arc::new(func),
        })
    }

    pub fn register_variadic<S, F>(&mut self, name: S, func: F) -> Result<&mut Self, RegistryError>
    where
        S: Into<String>,
        F: Fn(&[V]) -> Result<V, OperationError> + Send + Sync + 'static,
    {
        self.insert(Operation {
            name: name.into(),
            arity: None,
            func: Arc::new(func),
        })
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Operation<V>> {
        self.operations.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl<V> Default for OperationTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for OperationTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.operations.values()).finish()
    }
}
