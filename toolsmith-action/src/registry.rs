//! Action registry: kind tag → descriptor.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

use serde_json::Value;

use crate::action::{Action, AnyAction};
use crate::builtin;
use crate::error::ActionError;
use crate::observation::Observation;
use crate::schema::{FunctionSchema, function_schema_for, schema_value};

/// Type-erased descriptor of one action type.
pub trait ActionKind: Send + Sync {
    /// Kind tag.
    fn kind(&self) -> &'static str;
    /// Callable-tool schema, generated on first use and cached.
    fn function_schema(&self) -> &FunctionSchema;
    /// JSON Schema of the declared observation type.
    fn observation_schema(&self) -> Value;
    /// Parse model-supplied arguments into an action.
    ///
    /// An `action` key carrying the kind tag is ignored, so request bodies
    /// produced by [`AnyAction::to_request`] parse back.
    fn parse(&self, arguments: Value) -> Result<Arc<dyn AnyAction>, ActionError>;
}

struct Descriptor<A> {
    schema: OnceLock<FunctionSchema>,
    _action: PhantomData<fn() -> A>,
}

impl<A: Action> Descriptor<A> {
    fn new() -> Self {
        Self {
            schema: OnceLock::new(),
            _action: PhantomData,
        }
    }
}

impl<A: Action> ActionKind for Descriptor<A> {
    fn kind(&self) -> &'static str {
        A::KIND
    }

    fn function_schema(&self) -> &FunctionSchema {
        self.schema.get_or_init(|| function_schema_for::<A>(A::KIND))
    }

    fn observation_schema(&self) -> Value {
        schema_value::<A::Observation>()
    }

    fn parse(&self, mut arguments: Value) -> Result<Arc<dyn AnyAction>, ActionError> {
        if let Value::Object(map) = &mut arguments {
            map.remove("action");
        }
        let action: A =
            serde_json::from_value(arguments).map_err(|e| ActionError::InvalidArguments {
                kind: A::KIND.to_string(),
                message: e.to_string(),
            })?;
        Ok(Arc::new(action))
    }
}

/// A set of action descriptors keyed by kind tag.
///
/// Registering a kind that is already present replaces the earlier
/// descriptor without warning.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    kinds: HashMap<String, Arc<dyn ActionKind>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in action.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register an action type.
    pub fn register<A: Action>(&mut self) -> &mut Self {
        self.register_kind(Arc::new(Descriptor::<A>::new()))
    }

    /// Register a pre-built descriptor.
    pub fn register_kind(&mut self, kind: Arc<dyn ActionKind>) -> &mut Self {
        self.kinds.insert(kind.kind().to_string(), kind);
        self
    }

    /// Look up a descriptor.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActionKind>> {
        self.kinds.get(kind).cloned()
    }

    /// Copy of this registry without `kind`.
    pub fn without(&self, kind: &str) -> Self {
        let mut copy = self.clone();
        copy.kinds.remove(kind);
        copy
    }

    /// Registered kind tags, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Tool schemas of every registered action, sorted by kind.
    pub fn function_schemas(&self) -> Vec<FunctionSchema> {
        self.kinds()
            .into_iter()
            .filter_map(|kind| self.kinds.get(kind))
            .map(|k| k.function_schema().clone())
            .collect()
    }

    /// Parse arguments for `kind`.
    pub fn parse(&self, kind: &str, arguments: Value) -> Result<Arc<dyn AnyAction>, ActionError> {
        self.kinds
            .get(kind)
            .ok_or_else(|| ActionError::UnknownKind(kind.to_string()))?
            .parse(arguments)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

static GLOBAL: LazyLock<RwLock<ActionRegistry>> =
    LazyLock::new(|| RwLock::new(ActionRegistry::builtin()));

/// Register an action type in the process-wide table.
pub fn register<A: Action>() {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register::<A>();
}

/// Register a descriptor in the process-wide table.
pub fn register_kind(kind: Arc<dyn ActionKind>) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_kind(kind);
}

/// Look up a kind in the process-wide table.
pub fn lookup(kind: &str) -> Option<Arc<dyn ActionKind>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(kind)
}

/// Snapshot of the process-wide table.
pub fn registered() -> ActionRegistry {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Schema of the observation type declared for `kind`, or of the base
/// [`Observation`] when the kind is unknown.
pub fn observation_type_for(kind: &str) -> Value {
    match lookup(kind) {
        Some(descriptor) => descriptor.observation_schema(),
        None => schema_value::<Observation>(),
    }
}
