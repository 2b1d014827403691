//! Explicit registry mapping function names to descriptors and implementations.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ToolError, ToolResult};
use crate::schema::{FunctionArgs, FunctionDescriptor};

/// Executor signature emitted by the `#[tool]` attribute.
pub type FunctionExecutor = fn(FunctionArgs) -> ToolResult<Value>;

/// Declarative binding returned by the `#[tool]` macro.
#[derive(Clone)]
pub struct FunctionBinding {
    descriptor: FunctionDescriptor,
    executor: FunctionExecutor,
}

impl FunctionBinding {
    /// Creates a new binding from a descriptor and an executor function.
    #[must_use]
    pub fn new(descriptor: FunctionDescriptor, executor: FunctionExecutor) -> Self {
        Self {
            descriptor,
            executor,
        }
    }

    /// Returns the descriptor associated with this binding.
    #[must_use]
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Registers the binding with the provided registry.
    ///
    /// # Errors
    ///
    /// Propagates [`ToolError::DuplicateFunction`] if a function with the same
    /// name has already been registered.
    pub fn register(self, registry: &mut FunctionRegistry) -> ToolResult<()> {
        let FunctionBinding {
            descriptor,
            executor,
        } = self;
        registry.register_function(descriptor, executor)
    }
}

impl std::fmt::Debug for FunctionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBinding")
            .field("name", self.descriptor.name())
            .finish_non_exhaustive()
    }
}

/// Trait implemented by callable functions.
pub trait Function: Send + Sync {
    /// Calls the function with bound keyword arguments, returning JSON output.
    ///
    /// # Errors
    ///
    /// Implementations return [`ToolError`] when they reject the arguments or
    /// fail while running.
    fn call(&self, args: FunctionArgs) -> ToolResult<Value>;
}

impl<F> Function for F
where
    F: Send + Sync + Fn(FunctionArgs) -> ToolResult<Value>,
{
    fn call(&self, args: FunctionArgs) -> ToolResult<Value> {
        (self)(args)
    }
}

/// Handle returned by the registry for direct invocation.
#[derive(Clone)]
pub struct FunctionHandle {
    descriptor: FunctionDescriptor,
    executor: Arc<dyn Function>,
}

impl FunctionHandle {
    /// Returns the associated descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Binds `args` against the descriptor and calls the implementation.
    ///
    /// # Errors
    ///
    /// Returns the binding errors of [`FunctionDescriptor::bind`] or whatever
    /// the implementation returns.
    pub fn invoke(&self, args: FunctionArgs) -> ToolResult<Value> {
        let bound = self.descriptor.bind(args)?;
        self.executor.call(bound)
    }
}

/// Registry that stores function implementations keyed by name.
///
/// Built once by the caller and then shared read-only, typically behind an
/// [`Arc`] handed to a [`crate::dispatch::Dispatcher`].
#[derive(Default)]
pub struct FunctionRegistry {
    inner: HashMap<String, FunctionHandle>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.inner.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function implementation under its descriptor's name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateFunction`] if the name is already present.
    pub fn register_function<T>(
        &mut self,
        descriptor: FunctionDescriptor,
        function: T,
    ) -> ToolResult<()>
    where
        T: Function + 'static,
    {
        let name = descriptor.name().to_string();
        if self.inner.contains_key(&name) {
            return Err(ToolError::DuplicateFunction { name });
        }

        self.inner.insert(
            name,
            FunctionHandle {
                descriptor,
                executor: Arc::new(function),
            },
        );

        Ok(())
    }

    /// Registers a binding produced by the `#[tool]` macro.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateFunction`] if the binding name already
    /// exists within the registry.
    pub fn register_binding(&mut self, binding: FunctionBinding) -> ToolResult<()> {
        binding.register(self)
    }

    /// Returns the handle for the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionHandle> {
        self.inner.get(name)
    }

    /// Returns true when a function with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Invokes a registered function directly.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownFunction`] when the name is not found, or
    /// propagates binding and execution errors from [`FunctionHandle::invoke`].
    pub fn invoke(&self, name: &str, args: FunctionArgs) -> ToolResult<Value> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownFunction {
            name: name.to_owned(),
        })?;
        handle.invoke(args)
    }

    /// Lists the descriptors of all registered functions, ordered by name.
    #[must_use]
    pub fn descriptors(&self) -> Vec<FunctionDescriptor> {
        let mut descriptors: Vec<_> = self
            .inner
            .values()
            .map(|handle| handle.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name().cmp(b.name()));
        descriptors
    }
}
