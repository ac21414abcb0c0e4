//! The resource graph.
//!
//! Parent/child edges form a forest. Auxiliary edges are declared on both
//! ends: the driver lists its targets and each target names its driver,
//! so every cross-resource invocation is visible before a run starts.

use crate::error::{SyncError, SyncResult};
use crate::resource::{Invocation, ResourceDescriptor};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Validated set of resources.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    resources: Vec<ResourceDescriptor>,
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    /// Validates `resources` and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidGraph`] if:
    /// - two resources share a name
    /// - a parent, driver or auxiliary target does not exist
    /// - the parent relation has a cycle
    /// - an auxiliary edge is not declared on both ends
    /// - a virtual resource is not an auxiliary, or is paginated
    /// - an incremental resource has no replication key
    /// - a primary or replication key is not a schema property
    pub fn new(resources: Vec<ResourceDescriptor>) -> SyncResult<Self> {
        let mut index = HashMap::new();
        for (i, resource) in resources.iter().enumerate() {
            if index.insert(resource.name.clone(), i).is_some() {
                return Err(invalid(format!("duplicate resource {}", resource.name)));
            }
        }

        let graph = Self { resources, index };
        for resource in &graph.resources {
            graph.validate_resource(resource)?;
        }
        graph.validate_acyclic()?;
        Ok(graph)
    }

    fn validate_resource(&self, resource: &ResourceDescriptor) -> SyncResult<()> {
        let name = &resource.name;

        match &resource.invocation {
            Invocation::Root => {}
            Invocation::Child { parent } => {
                if !self.index.contains_key(parent) {
                    return Err(invalid(format!("{name}: unknown parent {parent}")));
                }
            }
            Invocation::Auxiliary { driver } => {
                let driver_res = self
                    .get(driver)
                    .ok_or_else(|| invalid(format!("{name}: unknown driver {driver}")))?;
                if !driver_res.auxiliaries.iter().any(|t| t == name) {
                    return Err(invalid(format!(
                        "{name}: driver {driver} does not declare it as auxiliary"
                    )));
                }
            }
        }

        for target in &resource.auxiliaries {
            let target_res = self
                .get(target)
                .ok_or_else(|| invalid(format!("{name}: unknown auxiliary {target}")))?;
            if target_res.driver() != Some(name.as_str()) {
                return Err(invalid(format!(
                    "{name}: auxiliary {target} is not declared as driven by {name}"
                )));
            }
        }

        if resource.is_virtual() {
            if resource.driver().is_none() {
                return Err(invalid(format!(
                    "{name}: virtual resources must be auxiliaries"
                )));
            }
            if resource.paginator.token_param().is_some() {
                return Err(invalid(format!("{name}: virtual resources cannot paginate")));
            }
        }

        if resource.is_incremental() && resource.replication_key.is_none() {
            return Err(invalid(format!(
                "{name}: incremental resources need a replication key"
            )));
        }

        for key in resource
            .primary_keys
            .iter()
            .chain(resource.replication_key.iter())
        {
            if !resource.schema.contains(key) {
                return Err(invalid(format!("{name}: key {key} is not in the schema")));
            }
        }
        Ok(())
    }

    fn validate_acyclic(&self) -> SyncResult<()> {
        for resource in &self.resources {
            let mut seen = HashSet::new();
            let mut current = resource;
            while let Some(parent) = current.parent() {
                if !seen.insert(current.name.as_str()) {
                    return Err(invalid(format!(
                        "{}: parent chain forms a cycle",
                        resource.name
                    )));
                }
                current = self
                    .get(parent)
                    .ok_or_else(|| invalid(format!("unknown parent {parent}")))?;
            }
        }
        Ok(())
    }

    /// All resources in declaration order.
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Looks up a resource.
    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.index.get(name).map(|&i| &self.resources[i])
    }

    /// Returns true if `name` is a resource.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Root resources in declaration order.
    pub fn roots(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources
            .iter()
            .filter(|r| r.invocation == Invocation::Root)
    }

    /// Children of `name` in declaration order.
    pub fn children_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResourceDescriptor> {
        self.resources.iter().filter(move |r| r.parent() == Some(name))
    }

    /// Auxiliary targets of `name`.
    pub fn auxiliaries_of(&self, name: &str) -> impl Iterator<Item = &ResourceDescriptor> {
        self.get(name)
            .into_iter()
            .flat_map(|r| r.auxiliaries.iter())
            .filter_map(|t| self.get(t))
    }

    /// Returns true if `target` is a declared auxiliary of `driver`.
    pub fn is_auxiliary_edge(&self, driver: &str, target: &str) -> bool {
        self.get(target).and_then(|t| t.driver()) == Some(driver)
            && self
                .get(driver)
                .is_some_and(|d| d.auxiliaries.iter().any(|a| a == target))
    }

    /// Returns true if `name` or anything reachable below it is selected.
    pub fn needs_traversal(&self, name: &str, selection: &Selection) -> bool {
        if selection.is_selected(name) {
            return true;
        }
        self.children_of(name)
            .chain(self.auxiliaries_of(name))
            .any(|r| self.needs_traversal(&r.name, selection))
    }

    /// Default selection: every resource marked selected by default.
    pub fn default_selection(&self) -> Selection {
        Selection::new(
            self.resources
                .iter()
                .filter(|r| r.selected_by_default)
                .map(|r| r.name.clone()),
        )
    }

    /// Selection of exactly `names`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidGraph`] for unknown names.
    pub fn select<I, S>(&self, names: I) -> SyncResult<Selection>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if let Some(unknown) = names.iter().find(|n| !self.contains(n)) {
            return Err(invalid(format!("unknown resource {unknown}")));
        }
        Ok(Selection::new(names))
    }
}

/// Set of resources whose records are emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    names: BTreeSet<String>,
}

impl Selection {
    /// Creates a selection from resource names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `name` is selected.
    pub fn is_selected(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Selected names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn invalid(msg: String) -> SyncError {
    SyncError::InvalidGraph(msg)
}
