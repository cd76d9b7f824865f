use predicates::prelude::*;

use crate::TestProject;

#[test]
fn test_primary_then_includes_in_order() {
    let project = TestProject::new();
    project.write("main.tmpl", "{{ .name }} {{ .region }} {{ .tier }} {{ .db.host }}:{{ .db.port }}");
    project.write("env/first.yaml", "region: eu\ndb:\n  port: 5432\n");
    project.write("env/second.yaml", "region: us\ntier: gold\ndb:\n  host: db.internal\n  port: 1\n");
    project.write(
        "vars.yaml",
        ":includes:\n  - env/first.yaml\n  - env/second.yaml\nname: api\ndb:\n  host: primary\n",
    );

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("api eu gold primary:5432");
}

#[test]
fn test_includes_key_is_not_visible() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ hasKey . ":includes" }} {{ keys . | sortAlpha }}"#);
    project.write("extra.yaml", "b: 2\n");
    project.write("vars.yaml", ":includes:\n  - extra.yaml\na: 1\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("false [a b]");
}

#[test]
fn test_bad_include_is_skipped_with_warning() {
    let project = TestProject::new();
    project.write("main.tmpl", "{{ .a }} {{ .b }}");
    project.write("broken.yaml", "b: [unclosed\n");
    project.write("good.yaml", "b: fine\n");
    project.write("vars.yaml", ":includes:\n  - broken.yaml\n  - missing.yaml\n  - good.yaml\na: 1\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("1 fine")
        .stderr(predicate::str::contains("broken.yaml").and(predicate::str::contains("missing.yaml")));
}

#[test]
fn test_includes_not_a_list_is_reported() {
    let project = TestProject::new();
    project.write("main.tmpl", "{{ .a }}");
    project.write("vars.yaml", ":includes: other.yaml\na: 1\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("1")
        .stderr(predicate::str::contains("must be a list"));
}

#[test]
fn test_non_string_keys_are_normalized() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ index .ports "80" }} {{ index .flags "true" }}"#);
    project.write("vars.yaml", "ports:\n  80: http\nflags:\n  true: on\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("http on");
}
