//! Integration tests for the depbot CLI
//!
//! These tests verify:
//! - Job definition loading and validation
//! - The parse-failure and unknown-ecosystem error paths
//! - Decision outcomes that need no registry access

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Creates a checkout directory with a package.json
fn checkout_with_package_json(content: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(dir.path().join("package.json"), content).unwrap();
    dir
}

/// Writes a job file next to the checkout and returns its path
fn write_job_file(dir: &TempDir, job: &str) -> std::path::PathBuf {
    let path = dir.path().join("job.json");
    fs::write(&path, job).unwrap();
    path
}

fn depbot() -> Command {
    Command::cargo_bin("depbot").expect("binary builds")
}

mod job_loading {
    use super::*;

    #[test]
    fn test_missing_job_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        depbot()
            .arg(dir.path().join("missing.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn test_invalid_job_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let job_file = write_job_file(&dir, "{not json");
        depbot().arg(job_file).assert().failure();
    }

    #[test]
    fn test_help_shows_flags() {
        depbot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--repo-path"))
            .stdout(predicate::str::contains("--base-commit-sha"));
    }
}

mod error_paths {
    use super::*;

    #[test]
    fn test_unknown_package_manager_is_reported() {
        let dir = checkout_with_package_json("{}");
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "bazel",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"}
            }}"#,
        );

        depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--quiet")
            .assert()
            .code(2)
            .stdout(predicate::str::contains("tool_version_not_supported"));
    }

    #[test]
    fn test_malformed_manifest_is_fatal_but_reported() {
        let dir = checkout_with_package_json("{broken json");
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"}
            }}"#,
        );

        depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--quiet")
            .assert()
            .code(2)
            .stdout(predicate::str::contains("dependency_file_not_evaluatable"));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"}
            }}"#,
        );

        depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--quiet")
            .assert()
            .code(2);
    }
}

mod decisions {
    use super::*;

    #[test]
    fn test_fully_filtered_job_makes_no_changes() {
        // The allow rule matches nothing, so no checker ever runs
        let dir = checkout_with_package_json(r#"{"dependencies": {"lodash": "^4.17.21"}}"#);
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"},
                "allowed-updates": [{"dependency-name": "no-such-package-*"}]
            }}"#,
        );

        depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--quiet")
            .assert()
            .success()
            .stdout(predicate::str::contains("No pull request changes"));
    }

    #[test]
    fn test_refresh_closes_pr_for_removed_dependency() {
        // The PR's dependency is gone from the manifest: close it
        let dir = checkout_with_package_json(r#"{"dependencies": {"lodash": "^4.17.21"}}"#);
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"},
                "updating-a-pull-request": true,
                "dependencies": ["left-pad"]
            }}"#,
        );

        depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--quiet")
            .assert()
            .success()
            .stdout(predicate::str::contains("closed:dependency_removed"))
            .stdout(predicate::str::contains("left-pad"));
    }

    #[test]
    fn test_json_summary_is_machine_readable() {
        let dir = checkout_with_package_json(r#"{"dependencies": {"lodash": "^4.17.21"}}"#);
        let job_file = write_job_file(
            &dir,
            r#"{"job": {
                "package-manager": "npm",
                "source": {"provider": "github", "repo": "org/repo", "directory": "/"},
                "updating-a-pull-request": true,
                "dependencies": ["left-pad"]
            }}"#,
        );

        let output = depbot()
            .arg(job_file)
            .arg("--repo-path")
            .arg(dir.path())
            .arg("--json")
            .arg("--quiet")
            .output()
            .unwrap();
        assert!(output.status.success());

        let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(document["outcomes"][0]["action"], "closed:dependency_removed");
    }
}
