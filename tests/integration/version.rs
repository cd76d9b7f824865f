use crate::TestProject;

#[test]
fn test_version_command() {
    let project = TestProject::new();

    project
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(format!("v{}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_flag() {
    let project = TestProject::new();

    project.cmd().arg("--version").assert().success().stdout(predicates::str::contains(env!("CARGO_PKG_VERSION")));
}
