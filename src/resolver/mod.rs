use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    graph::{policy::FamilyPolicy, DependencyGraph},
    model::{checksum::ChecksumSet, ModuleName},
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum RebuildMode {
    /// Rebuild the remote modules whose checksum changed and everything built on them.
    #[default]
    Changed,
    /// Rebuild every module of the remote closure regardless of the checksum snapshot.
    Full,
}

/// Inputs of a single resolution.
pub struct ResolutionRequest<'a> {
    /// Fingerprints of every module in the lock file.
    pub current: &'a ChecksumSet,
    /// Fingerprints recorded by the previous successful run.
    pub previous: &'a ChecksumSet,
    pub remote: &'a BTreeSet<ModuleName>,
    pub mode: RebuildMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutput {
    /// Modules that must be built, always a subset of `remote_closure`.
    pub build_set: BTreeSet<ModuleName>,
    /// Remote modules plus everything that has to travel with them.
    pub remote_closure: BTreeSet<ModuleName>,
    /// Members of `remote_closure` that are not remote modules themselves.
    pub glue_targets: BTreeSet<ModuleName>,
    /// Remote modules that seeded `build_set`.
    pub changed: BTreeSet<ModuleName>,
    pub total_module_count: usize,
    pub checksums_for_next_run: ChecksumSet,
}

impl ResolutionOutput {
    pub fn is_noop(&self) -> bool {
        self.build_set.is_empty()
    }
}

/// Decides what has to be rebuilt from the checksum change set and the graph.
pub struct Resolver<'a> {
    graph: &'a DependencyGraph,
    policy: &'a dyn FamilyPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a DependencyGraph, policy: &'a dyn FamilyPolicy) -> Self {
        Resolver { graph, policy }
    }

    pub fn resolve(&self, request: &ResolutionRequest) -> ResolutionOutput {
        let remote: HashSet<ModuleName> = request.remote.iter().cloned().collect();
        for name in request.remote {
            if !self
                .graph
                .module(name.as_str())
                .is_some_and(|module| module.remote)
            {
                warn!("Remote module {name} is not declared as a target of the project");
            }
        }

        let changed: BTreeSet<ModuleName> = match request.mode {
            RebuildMode::Full => request.remote.clone(),
            RebuildMode::Changed => request
                .current
                .restricted_to(request.remote)
                .changed_since(request.previous),
        };
        debug!("{} remote modules changed since the previous run", changed.len());

        let remote_closure = self.remote_closure(&remote);

        let build_set: BTreeSet<ModuleName> = match request.mode {
            RebuildMode::Full => remote_closure.iter().cloned().collect(),
            RebuildMode::Changed => self
                .graph
                .ancestors_of(&changed, &remote_closure)
                .into_iter()
                .collect(),
        };

        let glue_targets = remote_closure
            .iter()
            .filter(|name| !remote.contains(*name))
            .cloned()
            .collect();

        ResolutionOutput {
            build_set,
            remote_closure: remote_closure.into_iter().collect(),
            glue_targets,
            changed,
            total_module_count: request.current.len(),
            checksums_for_next_run: request.current.restricted_to(request.remote),
        }
    }

    fn remote_closure(&self, remote: &HashSet<ModuleName>) -> HashSet<ModuleName> {
        let mut closure = self
            .graph
            .descendants_reachable_from(remote, remote, self.policy);
        closure.extend(remote.iter().cloned());

        let groups = self.graph.grouping_targets(&closure);
        if !groups.is_empty() {
            debug!("Found {} grouping targets of remote modules", groups.len());
        }
        closure.extend(groups);
        closure
    }
}
