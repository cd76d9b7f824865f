use predicates::prelude::*;
use xltemplate::test_utils::TestGit;

use crate::TestProject;

/// A repository with a tagged first revision and a newer default branch.
fn template_repo(project: &TestProject) -> TestGit {
    let repo = TestGit::new(project.path().join("origin"));
    repo.init().unwrap();
    repo.write_file("templates/main.tmpl", r#"v1 {{ .name }} {{ include "greeting" . }}"#).unwrap();
    repo.write_file("patterns/greeting.tmpl", "hi").unwrap();
    repo.commit_all("Initial templates").unwrap();
    repo.tag("v1.0.0").unwrap();
    repo.write_file("templates/main.tmpl", r#"v2 {{ .name }} {{ include "greeting" . }}"#).unwrap();
    repo.write_file("patterns/greeting.tmpl", "hello").unwrap();
    repo.commit_all("Second revision").unwrap();
    repo
}

fn checkout_count(project: &TestProject) -> usize {
    std::fs::read_dir(project.path().join("tmp")).map(|d| d.count()).unwrap_or(0)
}

#[test]
fn test_remote_source_and_patterns() {
    let project = TestProject::new();
    let repo = template_repo(&project);
    project.write("vars.yaml", "name: Ada\n");

    project
        .cmd()
        .args([
            "build",
            "--source",
            &format!("{}//templates/main.tmpl", repo.file_url()),
            "--patterns",
            &format!("{}//patterns", repo.file_url()),
            "--variables",
            "vars.yaml",
        ])
        .assert()
        .success()
        .stdout("v2 Ada hello");
}

#[test]
fn test_whole_repository_as_pattern_root() {
    let project = TestProject::new();
    let repo = template_repo(&project);
    project.write("vars.yaml", "name: Ada\n");

    project
        .cmd()
        .args([
            "build",
            "--source",
            &format!("{}//templates/main.tmpl", repo.file_url()),
            "--patterns",
            &repo.file_url(),
            "--variables",
            "vars.yaml",
        ])
        .assert()
        .success()
        .stdout("v2 Ada hello")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_remote_source_at_ref() {
    let project = TestProject::new();
    let repo = template_repo(&project);

    project
        .cmd()
        .args([
            "build",
            "--source",
            &format!("{}//templates/main.tmpl?ref=v1.0.0", repo.file_url()),
            "--patterns",
            &format!("{}//patterns?ref=v1.0.0", repo.file_url()),
        ])
        .assert()
        .success()
        .stdout("v1 <no value> hi");
}

#[cfg(unix)]
#[test]
fn test_checkouts_removed_after_success_and_failure() {
    let project = TestProject::new();
    let repo = template_repo(&project);
    std::fs::create_dir_all(project.path().join("tmp")).unwrap();

    project
        .cmd()
        .env("TMPDIR", project.path().join("tmp"))
        .args([
            "build",
            "--source",
            &format!("{}//templates/main.tmpl", repo.file_url()),
            "--patterns",
            &format!("{}//patterns", repo.file_url()),
        ])
        .assert()
        .success();
    assert_eq!(checkout_count(&project), 0);

    // Source resolves, then the pattern root fails
    project
        .cmd()
        .env("TMPDIR", project.path().join("tmp"))
        .args([
            "build",
            "--source",
            &format!("{}//templates/main.tmpl", repo.file_url()),
            "--patterns",
            &format!("{}//no-such-dir", repo.file_url()),
        ])
        .assert()
        .failure();
    assert_eq!(checkout_count(&project), 0);
}

#[test]
fn test_unknown_ref_fails() {
    let project = TestProject::new();
    let repo = template_repo(&project);

    project
        .cmd()
        .args(["build", "--source", &format!("{}//templates/main.tmpl?ref=v9.9.9", repo.file_url())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch remote source"));
}

#[test]
fn test_remote_subpath_cannot_escape() {
    let project = TestProject::new();
    let repo = template_repo(&project);

    project
        .cmd()
        .args(["build", "--source", &format!("{}//../outside.tmpl", repo.file_url())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not leave"));
}

#[test]
fn test_remote_source_at_commit() {
    let project = TestProject::new();
    let repo = TestGit::new(project.path().join("origin"));
    repo.init().unwrap();
    repo.write_file("main.tmpl", "first").unwrap();
    repo.commit_all("First").unwrap();
    let first = repo.get_commit_hash().unwrap();
    repo.write_file("main.tmpl", "second").unwrap();
    repo.commit_all("Second").unwrap();

    project
        .cmd()
        .args(["build", "--source", &format!("{}//main.tmpl?ref={first}", repo.file_url())])
        .assert()
        .success()
        .stdout("first");
}

#[cfg(unix)]
#[test]
fn test_remote_source_without_git() {
    let project = TestProject::new();
    let repo = template_repo(&project);
    std::fs::create_dir_all(project.path().join("empty-bin")).unwrap();

    project
        .cmd()
        .env("PATH", project.path().join("empty-bin"))
        .args(["build", "--source", &format!("{}//templates/main.tmpl", repo.file_url())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Git is not installed"));
}
