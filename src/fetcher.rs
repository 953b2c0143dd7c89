//! Local dependency-file loading
//!
//! Loads the ecosystem's manifest files for each configured directory
//! from a local repository checkout. The hosted file fetchers stay out
//! of scope; this is their minimal local stand-in for CLI runs.

use crate::domain::DependencyFile;
use crate::ecosystem::Ecosystem;
use crate::error::UpdaterError;
use crate::job::Job;
use log::debug;
use std::path::{Path, PathBuf};

/// Resolves a job directory ("/", "/app") against the checkout root.
fn directory_path(repo_path: &Path, directory: &str) -> PathBuf {
    repo_path.join(directory.trim_start_matches('/'))
}

/// Loads every manifest the ecosystem knows about from each of the
/// job's directories. A directory with no manifest at all is an error;
/// a run with nothing to parse cannot do anything useful.
pub fn fetch_dependency_files(
    job: &Job,
    ecosystem: &dyn Ecosystem,
    repo_path: &Path,
) -> Result<Vec<DependencyFile>, UpdaterError> {
    let mut files = Vec::new();
    for directory in job.directories() {
        let base = directory_path(repo_path, &directory);
        let mut found = false;
        for name in ecosystem.manifest_names() {
            let path = base.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    debug!("Loaded {}", path.display());
                    files.push(
                        DependencyFile::new(*name, content).in_directory(directory.clone()),
                    );
                    found = true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(UpdaterError::not_evaluatable(format!(
                        "failed to read {}: {e}",
                        path.display()
                    )));
                }
            }
        }
        if !found {
            return Err(UpdaterError::not_evaluatable(format!(
                "no {} manifest found in {}",
                ecosystem.name(),
                base.display()
            )));
        }
    }
    Ok(files)
}
