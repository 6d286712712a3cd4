//! Cache-key derivation.
//!
//! The default factory renders `service[:version][:integration][:method]`
//! followed by `name=value` argument pairs in declaration order. The method
//! segment falls back to the intercepted function's name, so two functions
//! sharing a namespace still get distinct keys. Substitute a custom
//! [`KeyFactory`](crate::traits::KeyFactory) through the builder to replace
//! the encoding wholesale.

use std::fmt::Display;

use crate::traits::KeyFactory;

/// Namespace segments identifying the service and integration a wrapped
/// call belongs to.
#[derive(Debug, Clone)]
pub struct Namespace {
    service: String,
    version: Option<String>,
    integration: Option<String>,
    method: Option<String>,
}

impl Namespace {
    /// Create a namespace rooted at a service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: None,
            integration: None,
            method: None,
        }
    }

    /// Set the service version segment.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the integration name segment.
    pub fn integration(mut self, integration: impl Into<String>) -> Self {
        self.integration = Some(integration.into());
        self
    }

    /// Pin the integration-method segment.
    ///
    /// When unset, the intercepted function's name is used instead.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// Identity and bound arguments of one intercepted call.
///
/// Arguments are recorded as `(name, rendered value)` pairs in the wrapped
/// function's declared parameter order, including default-filled ones.
/// There is no call-site reflection in Rust, so binding is explicit:
///
/// ```rust
/// # use mimir::CallContext;
/// let ctx = CallContext::new("fetch_document")
///     .arg("patient_id", 42)
///     .arg("fresh", false);
/// ```
#[derive(Debug, Clone)]
pub struct CallContext<'a> {
    function: &'a str,
    args: Vec<(&'a str, String)>,
}

impl<'a> CallContext<'a> {
    /// Start a context for the named function.
    pub fn new(function: &'a str) -> Self {
        Self {
            function,
            args: Vec::new(),
        }
    }

    /// Bind the next argument, in declaration order.
    pub fn arg(mut self, name: &'a str, value: impl Display) -> Self {
        self.args.push((name, value.to_string()));
        self
    }

    /// The intercepted function's name.
    pub fn function(&self) -> &str {
        self.function
    }

    /// Bound arguments in declaration order.
    pub fn args(&self) -> &[(&'a str, String)] {
        &self.args
    }
}

/// Default deterministic key encoding.
#[derive(Debug, Clone)]
pub struct DefaultKeyFactory {
    namespace: Namespace,
}

impl DefaultKeyFactory {
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }
}

impl KeyFactory for DefaultKeyFactory {
    fn build(&self, ctx: &CallContext<'_>) -> String {
        let ns = &self.namespace;
        let mut segments: Vec<&str> = vec![ns.service.as_str()];
        if let Some(version) = &ns.version {
            segments.push(version);
        }
        if let Some(integration) = &ns.integration {
            segments.push(integration);
        }
        segments.push(ns.method.as_deref().unwrap_or(ctx.function()));

        let mut key = segments.join(":");
        for (name, value) in ctx.args() {
            key.push(':');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        key
    }
}
