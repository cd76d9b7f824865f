use predicates::prelude::*;

use crate::TestProject;

#[test]
fn test_build_file_alone() {
    let project = TestProject::new();
    project.write("templates/main.tmpl", r#"{{ .app }}: {{ include "footer" . }}"#);
    project.write("templates/patterns/footer.tmpl", "v{{ .version }}");
    project.write("vars.yaml", "app: checkout\nversion: 3\n");
    project.write(
        "build.yaml",
        "source: templates/main.tmpl\nvariables: vars.yaml\npatterns:\n  - templates/patterns\noutput: out.txt\n",
    );

    project.cmd().args(["build", "build.yaml"]).assert().success().stdout(predicate::str::is_empty());
    assert_eq!(project.read("out.txt"), "checkout: v3");
}

#[test]
fn test_flags_override_build_file() {
    let project = TestProject::new();
    project.write("file.tmpl", "from file {{ include \"p\" . }}");
    project.write("flag.tmpl", "from flag {{ include \"p\" . }} {{ include \"q\" . }}");
    project.write("file-patterns/p.tmpl", "file-p");
    project.write("flag-patterns/p.tmpl", "flag-p");
    project.write("flag-patterns/q.tmpl", "flag-q");
    project.write(
        "build.yaml",
        "source: file.tmpl\npatterns:\n  - file-patterns\noutput: out.txt\n",
    );

    // Flag patterns come first, so the file's p.tmpl is registered last and wins
    project
        .cmd()
        .args(["build", "build.yaml", "--source", "flag.tmpl", "--patterns", "flag-patterns", "--output", "flag.txt"])
        .assert()
        .success();
    assert_eq!(project.read("flag.txt"), "from flag file-p flag-q");
    assert!(!project.path().join("out.txt").exists());
}

#[test]
fn test_malformed_build_file_fails() {
    let project = TestProject::new();
    project.write("build.yaml", "source: [unclosed\n");

    project
        .cmd()
        .args(["build", "build.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse build.yaml"));
}

#[test]
fn test_missing_build_file_fails() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["build", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found: nope.yaml"));
}
