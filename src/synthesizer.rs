use std::{collections::BTreeSet, path::Path};

use log::{debug, info};
use thiserror::Error;

use crate::model::{
    project::{ProjectDescriptor, TargetDeclaration, TARGETS_KEY},
    ModuleName,
};

#[derive(Error, Debug)]
pub enum GraphWriteError {
    #[error("Target `{name}` is already declared in the project and cannot be replaced")]
    TargetExists { name: ModuleName },
    #[error("Could not serialize project descriptor: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("IO error writing project descriptor {path}: {source}")]
    IO {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Adds the aggregate target `name` depending on `dependencies` to the
/// descriptor and writes it to `path`. No other target is changed.
pub fn materialize(
    project: &ProjectDescriptor,
    path: &Path,
    name: &ModuleName,
    dependencies: &BTreeSet<ModuleName>,
) -> Result<(), GraphWriteError> {
    let target = TargetDeclaration::synthetic(name.clone(), dependencies);
    let document = project.document_with_target(&target).map_err(|existing| {
        GraphWriteError::TargetExists {
            name: existing.name.clone(),
        }
    })?;

    let target_count = target_count(&document);
    let contents = toml::to_string_pretty(&document)?;
    crate::fs::write_atomic(path, contents.as_bytes()).map_err(|source| GraphWriteError::IO {
        path: path.display().to_string(),
        source,
    })?;
    debug!(
        "Wrote project descriptor with {} targets to {}",
        target_count,
        path.display()
    );
    info!("Added aggregated build target: {}", name);
    Ok(())
}

fn target_count(document: &toml::Table) -> usize {
    document
        .get(TARGETS_KEY)
        .and_then(toml::Value::as_array)
        .map_or(0, Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    const PROJECT: &str = r#"
        name = "App"

        [[targets]]
        name = "A"

        [[targets]]
        name = "B"
        dependencies = ["A"]
    "#;

    fn dependencies() -> BTreeSet<ModuleName> {
        BTreeSet::from([ModuleName::from("A"), ModuleName::from("B")])
    }

    #[test]
    fn writes_aggregate_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, PROJECT).unwrap();
        let project = ProjectDescriptor::from_file(&path).unwrap();

        materialize(&project, &path, &ModuleName::from("RemoteModules"), &dependencies()).unwrap();

        let written = ProjectDescriptor::from_file(&path).unwrap();
        assert_eq!(written.targets.len(), 3);
        assert_eq!(&written.targets[..2], &project.targets[..]);
        let aggregate = written.target("RemoteModules").unwrap();
        assert!(aggregate.synthetic);
        assert_eq!(
            aggregate.dependencies,
            vec![ModuleName::from("A"), ModuleName::from("B")]
        );
    }

    #[test]
    fn replaces_previous_aggregate_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, PROJECT).unwrap();
        let name = ModuleName::from("RemoteModules");
        materialize(&ProjectDescriptor::from_file(&path).unwrap(), &path, &name, &dependencies())
            .unwrap();

        let project = ProjectDescriptor::from_file(&path).unwrap();
        let only_b = BTreeSet::from([ModuleName::from("B")]);
        let document = project
            .document_with_target(&TargetDeclaration::synthetic(name.clone(), &only_b))
            .unwrap();
        assert_eq!(target_count(&document), 3);

        materialize(&project, &path, &name, &only_b).unwrap();

        let written = ProjectDescriptor::from_file(&path).unwrap();
        assert_eq!(written.targets.len(), 3);
        assert_eq!(
            written.target("RemoteModules").unwrap().dependencies,
            vec![ModuleName::from("B")]
        );
    }

    #[test]
    fn rejects_declared_target_with_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, PROJECT).unwrap();
        let project = ProjectDescriptor::from_file(&path).unwrap();

        let error = materialize(&project, &path, &ModuleName::from("B"), &dependencies())
            .expect_err("B is a declared target");

        assert!(matches!(error, GraphWriteError::TargetExists { name } if name.as_str() == "B"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), PROJECT);
    }

    #[test]
    fn reports_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectDescriptor::from_toml_str(PROJECT).unwrap();
        // The destination is a directory, so the final rename fails.
        let path = dir.path().join("project.toml");
        std::fs::create_dir(&path).unwrap();

        let error = materialize(&project, &path, &ModuleName::from("RemoteModules"), &dependencies())
            .expect_err("destination is a directory");

        assert!(matches!(error, GraphWriteError::IO { .. }));
    }
}
