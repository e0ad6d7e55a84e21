//! # Per-execution options.
//!
//! [`ExecutionOptions`] carries everything a single run needs besides the work itself:
//! its policies (in application order), an optional parent cancellation token, and the
//! initial properties of the operation.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::model::OperationProperties;
use crate::policies::{OperationPolicy, PolicyRef};

/// Options for `execute`, `run_operation` and `begin_operation`.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use opshub::{AutoCompletePolicy, ExecutionOptions, RetentionPolicy};
///
/// let opts = ExecutionOptions::new()
///     .with_title("Apply configuration")
///     .with_policy(AutoCompletePolicy)
///     .with_policy(RetentionPolicy::new(Duration::from_secs(3)));
/// assert_eq!(opts.policies().len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ExecutionOptions {
    policies: Vec<PolicyRef>,
    cancellation: Option<CancellationToken>,
    properties: OperationProperties,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a policy. Policies apply in the order they were added.
    pub fn with_policy(self, policy: impl OperationPolicy) -> Self {
        self.with_policy_ref(Arc::new(policy))
    }

    /// Appends an already shared policy.
    pub fn with_policy_ref(mut self, policy: PolicyRef) -> Self {
        self.policies.push(policy);
        self
    }

    /// Appends several shared policies.
    pub fn with_policies(mut self, policies: impl IntoIterator<Item = PolicyRef>) -> Self {
        self.policies.extend(policies);
        self
    }

    /// The operation's token becomes a child of `token`: cancelling it cancels the operation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.properties = self.properties.with_title(title);
        self
    }

    /// Replaces the initial properties wholesale.
    pub fn with_properties(mut self, properties: OperationProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn policies(&self) -> &[PolicyRef] {
        &self.policies
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn properties(&self) -> &OperationProperties {
        &self.properties
    }

    pub(crate) fn into_parts(self) -> (Vec<PolicyRef>, Option<CancellationToken>, OperationProperties) {
        (self.policies, self.cancellation, self.properties)
    }
}

impl fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.policies.iter().map(|p| p.name()).collect();
        f.debug_struct("ExecutionOptions")
            .field("policies", &names)
            .field("cancellation", &self.cancellation.is_some())
            .field("properties", &self.properties)
            .finish()
    }
}
