pub mod policy;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::{debug, trace};

use crate::model::{lock::LockFile, project::ProjectDescriptor, ModuleName};

use self::policy::FamilyPolicy;

/// A build target of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: ModuleName,
    /// Sourced from the external dependency manifest.
    pub remote: bool,
    /// Listed in the lock file at all, remote or local.
    pub locked: bool,
    pub dependencies: BTreeSet<ModuleName>,
}

/// Immutable snapshot of the project's `module -> dependencies` relation.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    modules: HashMap<ModuleName, Module>,
    dependents: HashMap<ModuleName, HashSet<ModuleName>>,
}

impl DependencyGraph {
    /// Builds the graph from the declared targets. Dependency names that are not
    /// declared as targets stay in the graph as leaves.
    pub fn build(project: &ProjectDescriptor, lock_file: &LockFile) -> DependencyGraph {
        let remote = lock_file.remote_modules();
        let locked = lock_file.checksums();

        let mut modules = HashMap::new();
        let mut dependents: HashMap<ModuleName, HashSet<ModuleName>> = HashMap::new();
        for target in &project.targets {
            if target.synthetic {
                debug!("Ignoring synthetic target {} from a previous run", target.name);
                continue;
            }
            let dependencies: BTreeSet<ModuleName> = target
                .dependencies
                .iter()
                .filter(|dependency| **dependency != target.name)
                .cloned()
                .collect();
            for dependency in &dependencies {
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .insert(target.name.clone());
            }
            modules.insert(
                target.name.clone(),
                Module {
                    name: target.name.clone(),
                    remote: remote.contains(&target.name),
                    locked: locked.contains(target.name.as_str()),
                    dependencies,
                },
            );
        }
        debug!("Built dependency graph with {} targets", modules.len());

        DependencyGraph {
            modules,
            dependents,
        }
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Names reachable from `roots` over dependency edges.
    ///
    /// A dependency is followed when its own name is in `restrict_to`, when the
    /// policy finds no family in it, or when the policy says it is part of one
    /// of the names in `restrict_to`. Roots are only part of the result when
    /// reached from another root.
    pub fn descendants_reachable_from<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a ModuleName>,
        restrict_to: &HashSet<ModuleName>,
        policy: &dyn FamilyPolicy,
    ) -> HashSet<ModuleName> {
        let admitted = |name: &ModuleName| {
            restrict_to.contains(name)
                || match policy.family(name.as_str()) {
                    None => true,
                    Some(_) => restrict_to
                        .iter()
                        .any(|family| policy.is_part_of(name.as_str(), family.as_str())),
                }
        };

        let mut reached = HashSet::new();
        let mut queue: VecDeque<&ModuleName> = roots.into_iter().collect();
        while let Some(name) = queue.pop_front() {
            // Dangling names have nothing to expand.
            let Some(module) = self.modules.get(name) else {
                continue;
            };
            for dependency in &module.dependencies {
                if !admitted(dependency) {
                    trace!("Not following {} -> {}", name, dependency);
                    continue;
                }
                if reached.insert(dependency.clone()) {
                    queue.push_back(dependency);
                }
            }
        }
        reached
    }

    /// Modules of `within` that depend on any of `targets`, directly or through
    /// other modules, together with the targets that are in `within`.
    pub fn ancestors_of<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a ModuleName>,
        within: &HashSet<ModuleName>,
    ) -> HashSet<ModuleName> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        for target in targets {
            if visited.insert(target) {
                queue.push_back(target);
            }
        }

        while let Some(name) = queue.pop_front() {
            for dependent in self.dependents.get(name).into_iter().flatten() {
                if visited.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        visited
            .into_iter()
            .filter(|name| within.contains(*name))
            .cloned()
            .collect()
    }

    /// Local targets that exist only to group `members`: declared, absent from
    /// the lock file, with at least one dependency and every dependency either a
    /// member or another such group.
    ///
    /// Being absent from the lock file is what marks a target as glue, so every
    /// other declared module, the application target included, has to be listed
    /// there. An unlisted application target depending only on remote modules
    /// would end up in the remote closure.
    pub fn grouping_targets(&self, members: &HashSet<ModuleName>) -> HashSet<ModuleName> {
        let mut groups: HashSet<ModuleName> = HashSet::new();
        loop {
            let found: Vec<ModuleName> = self
                .modules
                .values()
                .filter(|module| {
                    !module.locked
                        && !module.dependencies.is_empty()
                        && !members.contains(&module.name)
                        && !groups.contains(&module.name)
                        && module
                            .dependencies
                            .iter()
                            .all(|dependency| members.contains(dependency) || groups.contains(dependency))
                })
                .map(|module| module.name.clone())
                .collect();
            if found.is_empty() {
                return groups;
            }
            groups.extend(found);
        }
    }
}
