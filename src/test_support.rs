//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::backend::{BackendFuture, CloudClient};
use crate::resource::{ProvisioningRequest, ResourceHandle, ResourceKind};

/// A call observed by [`RecordingCloud`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CloudCall {
    /// Listing of a kind.
    List(ResourceKind),
    /// Creation request.
    Create {
        /// Kind requested.
        kind: ResourceKind,
        /// Name requested.
        name: String,
        /// Kinds of the dependency handles supplied with the request.
        dependencies: Vec<ResourceKind>,
    },
    /// Power-off of the named machine.
    PowerOff(String),
    /// Deletion of the named group.
    DeleteGroup(String),
}

/// Errors produced by [`RecordingCloud`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RecordingCloudError {
    /// Failure injected by the test.
    #[error("injected {operation} failure")]
    Injected {
        /// Operation that was made to fail.
        operation: String,
    },
    /// Raised when a group-scoped resource names a group that does not exist.
    #[error("resource group {0} not found")]
    GroupNotFound(String),
    /// Raised when a dependency handle does not refer to a live resource.
    #[error("{kind} dependency {id} does not exist")]
    UnknownDependency {
        /// Kind of the dangling dependency.
        kind: ResourceKind,
        /// Identifier that could not be resolved.
        id: String,
    },
    /// Raised when a resource with the same kind and name already exists.
    #[error("{kind} {name} already exists")]
    Conflict {
        /// Kind requested.
        kind: ResourceKind,
        /// Duplicated name.
        name: String,
    },
    /// Raised when powering off a machine that does not exist.
    #[error("virtual machine {0} not found")]
    MachineNotFound(String),
}

#[derive(Clone, Debug)]
struct Stored {
    handle: ResourceHandle,
    group: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    resources: Vec<Stored>,
    calls: Vec<CloudCall>,
    stopped: Vec<String>,
    fail_create: BTreeSet<ResourceKind>,
    fail_list: BTreeSet<ResourceKind>,
    fail_power_off: bool,
    fail_delete: bool,
}

impl State {
    fn exists(&self, kind: ResourceKind, name: &str) -> bool {
        self.resources
            .iter()
            .any(|stored| stored.handle.kind == kind && stored.handle.name == name)
    }

    fn insert(
        &mut self,
        kind: ResourceKind,
        name: &str,
        region: &str,
        group: Option<&str>,
    ) -> ResourceHandle {
        let id = match group {
            Some(parent) => {
                format!("/subscriptions/recording/resourceGroups/{parent}/{kind}/{name}")
            }
            None => format!("/subscriptions/recording/resourceGroups/{name}"),
        };
        let handle = ResourceHandle {
            kind,
            name: name.to_owned(),
            id,
            region: region.to_owned(),
        };
        self.resources.push(Stored {
            handle: handle.clone(),
            group: group.map(str::to_owned),
        });
        handle
    }
}

/// In-memory cloud that records every call and enforces the provider's
/// referential rules: scoped resources need their group, dependencies must
/// exist and deleting a group removes its children.
#[derive(Clone, Debug, Default)]
pub struct RecordingCloud {
    state: Arc<Mutex<State>>,
}

impl RecordingCloud {
    /// Creates an empty cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an existing resource, bypassing the call log.
    pub fn seed(&self, kind: ResourceKind, name: &str, group: Option<&str>) -> ResourceHandle {
        self.state().insert(kind, name, "eastus", group)
    }

    /// Makes creation of `kind` fail.
    pub fn fail_create(&self, kind: ResourceKind) {
        self.state().fail_create.insert(kind);
    }

    /// Makes listing of `kind` fail.
    pub fn fail_list(&self, kind: ResourceKind) {
        self.state().fail_list.insert(kind);
    }

    /// Makes every power-off fail.
    pub fn fail_power_off(&self) {
        self.state().fail_power_off = true;
    }

    /// Makes every group deletion fail.
    pub fn fail_delete(&self) {
        self.state().fail_delete = true;
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CloudCall> {
        self.state().calls.clone()
    }

    /// Returns the kinds of every creation call, in order.
    #[must_use]
    pub fn create_calls(&self) -> Vec<ResourceKind> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                CloudCall::Create { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Returns the names of machines passed to power-off, in order.
    #[must_use]
    pub fn power_off_calls(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                CloudCall::PowerOff(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the live resources.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceHandle> {
        self.state()
            .resources
            .iter()
            .map(|stored| stored.handle.clone())
            .collect()
    }

    /// Returns `true` when the named machine has been stopped.
    #[must_use]
    pub fn is_stopped(&self, machine: &str) -> bool {
        self.state().stopped.iter().any(|name| name == machine)
    }

    fn record_create(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ResourceHandle, RecordingCloudError> {
        let kind = request.kind();
        let mut state = self.state();
        state.calls.push(CloudCall::Create {
            kind,
            name: request.name.clone(),
            dependencies: request.dependencies.iter().map(|dep| dep.kind).collect(),
        });

        if state.fail_create.contains(&kind) {
            return Err(RecordingCloudError::Injected {
                operation: format!("create {kind}"),
            });
        }
        let group = request
            .parent_group
            .as_deref()
            .filter(|_| kind.is_group_scoped());
        if let Some(parent) = group {
            if !state.exists(ResourceKind::ResourceGroup, parent) {
                return Err(RecordingCloudError::GroupNotFound(parent.to_owned()));
            }
        }
        for dependency in &request.dependencies {
            let live = state
                .resources
                .iter()
                .any(|stored| stored.handle.id == dependency.id);
            if !live {
                return Err(RecordingCloudError::UnknownDependency {
                    kind: dependency.kind,
                    id: dependency.id.clone(),
                });
            }
        }
        if state.exists(kind, &request.name) {
            return Err(RecordingCloudError::Conflict {
                kind,
                name: request.name.clone(),
            });
        }
        Ok(state.insert(kind, &request.name, &request.region, group))
    }

    fn record_power_off(&self, machine: &ResourceHandle) -> Result<(), RecordingCloudError> {
        let mut state = self.state();
        state.calls.push(CloudCall::PowerOff(machine.name.clone()));
        if state.fail_power_off {
            return Err(RecordingCloudError::Injected {
                operation: String::from("power off"),
            });
        }
        if !state.exists(ResourceKind::VirtualMachine, &machine.name) {
            return Err(RecordingCloudError::MachineNotFound(machine.name.clone()));
        }
        state.stopped.push(machine.name.clone());
        Ok(())
    }

    fn record_delete(&self, name: &str) -> Result<(), RecordingCloudError> {
        let mut state = self.state();
        state.calls.push(CloudCall::DeleteGroup(name.to_owned()));
        if state.fail_delete {
            return Err(RecordingCloudError::Injected {
                operation: String::from("delete group"),
            });
        }
        if !state.exists(ResourceKind::ResourceGroup, name) {
            return Err(RecordingCloudError::GroupNotFound(name.to_owned()));
        }
        state.resources.retain(|stored| {
            let is_group =
                stored.handle.kind == ResourceKind::ResourceGroup && stored.handle.name == name;
            !is_group && stored.group.as_deref() != Some(name)
        });
        Ok(())
    }
}

impl CloudClient for RecordingCloud {
    type Error = RecordingCloudError;

    fn list(&self, kind: ResourceKind) -> BackendFuture<'_, Vec<ResourceHandle>, Self::Error> {
        let mut state = self.state();
        state.calls.push(CloudCall::List(kind));
        let result: Result<Vec<ResourceHandle>, Self::Error> = if state.fail_list.contains(&kind) {
            Err(RecordingCloudError::Injected {
                operation: format!("list {kind}"),
            })
        } else {
            Ok(state
                .resources
                .iter()
                .filter(|stored| stored.handle.kind == kind)
                .map(|stored| stored.handle.clone())
                .collect())
        };
        Box::pin(future::ready(result))
    }

    fn create<'a>(
        &'a self,
        request: &'a ProvisioningRequest,
    ) -> BackendFuture<'a, ResourceHandle, Self::Error> {
        Box::pin(future::ready(self.record_create(request)))
    }

    fn power_off<'a>(&'a self, machine: &'a ResourceHandle) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(future::ready(self.record_power_off(machine)))
    }

    fn delete_group<'a>(&'a self, name: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(future::ready(self.record_delete(name)))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: tokio::sync::MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    ///
    /// Pairs with a `None` value are removed for the guard's lifetime.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
