use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::{
    cache::{CacheError, ChecksumStore},
    cli::command_handlers::{do_clear_cache, do_plan},
    graph::{policy::FamilyPolicy, DependencyGraph},
    model::{lock::LockFile, project::ProjectDescriptor, ModuleName, ParseError},
    resolver::{RebuildMode, ResolutionOutput, ResolutionRequest, Resolver},
    synthesizer::{self, GraphWriteError},
};

mod builder;

pub use builder::ModcacheBuilder;

pub struct Modcache {
    root: PathBuf,
    lock_file_name: PathBuf,
    project_file_name: PathBuf,
    store: ChecksumStore,
    build_target: ModuleName,
    policy: Box<dyn FamilyPolicy>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PlanOptions {
    pub mode: RebuildMode,
    /// Resolve and report without writing the project descriptor or the snapshot.
    pub dry_run: bool,
}

/// Pipeline stages of a plan run, in order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Stage {
    Start,
    ChecksumLoaded,
    GraphBuilt,
    Resolved,
    TargetSynthesized,
    Skipped,
    Done,
    Failed,
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Could not load the lock file: {0}")]
    Manifest(#[source] ParseError),
    #[error("Could not load the project descriptor: {0}")]
    Project(#[source] ParseError),
    #[error("Could not persist the project descriptor: {source}")]
    GraphWrite {
        output: Box<ResolutionOutput>,
        #[source]
        source: GraphWriteError,
    },
    #[error("Could not persist the checksum snapshot: {source}")]
    ChecksumWrite {
        output: Box<ResolutionOutput>,
        #[source]
        source: CacheError,
    },
}

impl PlanError {
    /// The stage the run was about to reach when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PlanError::Manifest(_) => Stage::ChecksumLoaded,
            PlanError::Project(_) => Stage::GraphBuilt,
            PlanError::GraphWrite { .. } => Stage::TargetSynthesized,
            PlanError::ChecksumWrite { .. } => Stage::Done,
        }
    }

    /// The resolution computed before persisting failed, if it got that far.
    pub fn output(&self) -> Option<&ResolutionOutput> {
        match self {
            PlanError::Manifest(_) | PlanError::Project(_) => None,
            PlanError::GraphWrite { output, .. } | PlanError::ChecksumWrite { output, .. } => {
                Some(output.as_ref())
            }
        }
    }
}

struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {next:?} re-entered after {:?}", self.stage);
        debug!("{:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

impl Modcache {
    pub fn builder() -> ModcacheBuilder {
        ModcacheBuilder::default()
    }

    /// Resolves the modules to rebuild, adds the aggregate target to the project
    /// descriptor and records the checksums for the next run.
    pub fn plan(&self, options: PlanOptions) -> Result<ResolutionOutput, PlanError> {
        let mut tracker = StageTracker {
            stage: Stage::Start,
        };
        let result = self.run_plan(options, &mut tracker);
        if let Err(error) = &result {
            debug!("Could not reach {:?}", error.stage());
            tracker.advance(Stage::Failed);
        }
        result
    }

    /// Plans and writes an optional report of the resolution, as the CLI does.
    pub fn plan_and_report(
        &self,
        options: PlanOptions,
        report: Option<&Path>,
    ) -> Result<ResolutionOutput, Box<dyn std::error::Error>> {
        do_plan(self, options, report)
    }

    /// Deletes the checksum snapshot so the next run rebuilds every remote module.
    pub fn clear_cache(&self) -> Result<(), Box<dyn std::error::Error>> {
        do_clear_cache(&self.store)
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.root.join(&self.lock_file_name)
    }

    pub fn project_file_path(&self) -> PathBuf {
        self.root.join(&self.project_file_name)
    }

    pub fn checksum_store(&self) -> &ChecksumStore {
        &self.store
    }

    pub fn build_target(&self) -> &ModuleName {
        &self.build_target
    }

    fn run_plan(
        &self,
        options: PlanOptions,
        tracker: &mut StageTracker,
    ) -> Result<ResolutionOutput, PlanError> {
        let lock_file = LockFile::from_file(&self.lock_file_path()).map_err(PlanError::Manifest)?;
        let current = lock_file.checksums();
        let remote = lock_file.remote_modules();
        let previous = match options.mode {
            RebuildMode::Full => Default::default(),
            RebuildMode::Changed => self.store.load(),
        };
        tracker.advance(Stage::ChecksumLoaded);

        let project_path = self.project_file_path();
        let project = ProjectDescriptor::from_file(&project_path).map_err(PlanError::Project)?;
        let graph = DependencyGraph::build(&project, &lock_file);
        tracker.advance(Stage::GraphBuilt);

        let output = Resolver::new(&graph, self.policy.as_ref()).resolve(&ResolutionRequest {
            current: &current,
            previous: &previous,
            remote: &remote,
            mode: options.mode,
        });
        tracker.advance(Stage::Resolved);
        log_resolution(&output, &remote);

        if options.dry_run {
            info!("Dry run, leaving the project and the checksum snapshot untouched");
            tracker.advance(Stage::Skipped);
            tracker.advance(Stage::Done);
            return Ok(output);
        }

        if output.is_noop() {
            info!("Skip");
            tracker.advance(Stage::Skipped);
        } else {
            synthesizer::materialize(
                &project,
                &project_path,
                &self.build_target,
                &output.build_set,
            )
            .map_err(|source| PlanError::GraphWrite {
                output: Box::new(output.clone()),
                source,
            })?;
            tracker.advance(Stage::TargetSynthesized);
        }

        self.store
            .save(&output.checksums_for_next_run)
            .map_err(|source| PlanError::ChecksumWrite {
                output: Box::new(output.clone()),
                source,
            })?;
        tracker.advance(Stage::Done);
        Ok(output)
    }
}

fn log_resolution(output: &ResolutionOutput, remote: &BTreeSet<ModuleName>) {
    info!("Remote modules ({}):", remote.len());
    remote.iter().for_each(|name| info!("* {name}"));

    if !output.glue_targets.is_empty() {
        info!("Additional build targets ({}):", output.glue_targets.len());
        output.glue_targets.iter().for_each(|name| info!("* {name}"));
    }

    if !output.build_set.is_empty() {
        info!("Build modules ({}):", output.build_set.len());
        output.build_set.iter().for_each(|name| info!("* {name}"));
    }
    debug!(
        "{} of {} locked modules are remote",
        output.checksums_for_next_run.len(),
        output.total_module_count
    );
}
