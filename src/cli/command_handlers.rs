use log::{info, warn};

use crate::{
    api::{Modcache, PlanOptions},
    cache::ChecksumStore,
    resolver::ResolutionOutput,
};
use std::{error::Error, path::Path};

/// Handler to plan command
/// Resolves the build set, writes the aggregate target and the next snapshot,
/// then the optional report. The report is written even when persisting the
/// project failed, as long as resolution itself succeeded.
pub fn do_plan(
    modcache: &Modcache,
    options: PlanOptions,
    report_path: Option<&Path>,
) -> Result<ResolutionOutput, Box<dyn Error>> {
    let output = match modcache.plan(options) {
        Ok(output) => output,
        Err(error) => {
            if let (Some(output), Some(report_path)) = (error.output(), report_path) {
                warn!("Writing the resolution report although the plan failed");
                write_report(output, report_path)?;
            }
            return Err(error.into());
        }
    };

    if let Some(report_path) = report_path {
        write_report(&output, report_path)?;
    }

    if output.is_noop() {
        info!("Nothing to build, every remote module can be reused");
    } else if !options.dry_run {
        info!(
            "{} of {} remote modules scheduled for build through {}",
            output.build_set.len(),
            output.remote_closure.len(),
            modcache.build_target()
        );
    }
    Ok(output)
}

/// Handler to clear-cache command
pub fn do_clear_cache(store: &ChecksumStore) -> Result<(), Box<dyn Error>> {
    store.clear()?;
    Ok(())
}

fn write_report(output: &ResolutionOutput, report_path: &Path) -> Result<(), Box<dyn Error>> {
    let contents = toml::to_string_pretty(output)?;
    crate::fs::write_atomic(report_path, contents.as_bytes())?;
    info!("Wrote resolution report to {}", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"
        version = 1
        [[modules]]
        name = "A"
        checksum = "1"
        source = "remote"
    "#;

    const PROJECT: &str = r#"
        [[targets]]
        name = "A"
    "#;

    fn modcache(dir: &Path, project: &str) -> Modcache {
        std::fs::write(dir.join("modcache.lock"), LOCK).unwrap();
        std::fs::write(dir.join("project.toml"), project).unwrap();
        Modcache::builder()
            .root(dir)
            .build_target("RemoteModules")
            .try_build()
            .unwrap()
    }

    #[test]
    fn writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let modcache = modcache(dir.path(), PROJECT);
        let report_path = dir.path().join("reports").join("plan.toml");

        do_plan(&modcache, PlanOptions::default(), Some(&report_path)).unwrap();

        let report: toml::Table =
            toml::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(
            report.get("build_set"),
            Some(&toml::Value::Array(vec![toml::Value::from("A")]))
        );
        assert_eq!(report.get("total_module_count"), Some(&toml::Value::Integer(1)));
        assert_eq!(
            report
                .get("checksums_for_next_run")
                .and_then(|checksums| checksums.get("A"))
                .and_then(toml::Value::as_str),
            Some("1")
        );
    }

    #[test]
    fn writes_report_when_persisting_fails() {
        let dir = tempfile::tempdir().unwrap();
        let project = format!("{PROJECT}\n[[targets]]\nname = \"RemoteModules\"\n");
        let modcache = modcache(dir.path(), &project);
        let report_path = dir.path().join("plan.toml");

        let result = do_plan(&modcache, PlanOptions::default(), Some(&report_path));

        assert!(result.is_err());
        assert!(report_path.exists());
    }

    #[test]
    fn clear_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let modcache = modcache(dir.path(), PROJECT);
        do_clear_cache(modcache.checksum_store()).unwrap();
    }
}
