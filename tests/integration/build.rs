use predicates::prelude::*;

use crate::TestProject;

#[test]
fn test_build_end_to_end() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"Hello {{.name}}, patterns: {{include "greeting" .}}"#);
    project.write("patterns/greeting.tmpl", "Hi from pattern");
    project.write("vars.yaml", "name: Ada\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml", "--patterns", "patterns"])
        .assert()
        .success()
        .stdout("Hello Ada, patterns: Hi from pattern")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_patterns_in_subdirectories_and_mutual_include() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ include "countdown" 3 }}"#);
    project.write(
        "patterns/a/countdown.tmpl",
        r#"{{ . }}{{ if gt . 0 }},{{ include "step" . }}{{ end }}"#,
    );
    project.write("patterns/b/c/step.tmpl", r#"{{ include "countdown" (sub . 1) }}"#);

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "patterns"])
        .assert()
        .success()
        .stdout("3,2,1,0");
}

#[test]
fn test_deep_recursion_bounded_by_data() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ include "count" 1200 }}"#);
    project.write("patterns/count.tmpl", r#"{{ if gt . 0 }}x{{ include "count" (sub . 1) }}{{ end }}"#);

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "patterns", "--output", "out.txt"])
        .assert()
        .success();
    assert_eq!(project.read("out.txt"), "x".repeat(1200));
}

#[test]
fn test_repeated_patterns_last_root_wins() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ include "web.tmpl" . }}"#);
    project.write("r1/web.tmpl", "from r1");
    project.write("r2/web.tmpl", "from r2");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "r1", "--patterns", "r2"])
        .assert()
        .success()
        .stdout("from r2");
}

#[test]
fn test_unresolved_reference_warns_but_succeeds() {
    let project = TestProject::new();
    project.write("main.tmpl", "first\nValue: {{.missing}}\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl"])
        .assert()
        .success()
        .stdout("first\nValue: <no value>\n")
        .stderr(predicate::str::contains("<no value> detected at line 2: Value: <no value>"));
}

#[test]
fn test_quiet_suppresses_warnings() {
    let project = TestProject::new();
    project.write("main.tmpl", "Value: {{.missing}}");

    project
        .cmd()
        .args(["--quiet", "build", "--source", "main.tmpl"])
        .assert()
        .success()
        .stdout("Value: <no value>")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_output_file() {
    let project = TestProject::new();
    project.write("main.tmpl", "region: {{ .region | upper }}\n");
    project.write("vars.yaml", "region: eu\n");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml", "--output", "out/release.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(project.read("out/release.yaml"), "region: EU\n");
}

#[test]
fn test_execution_failure_writes_no_output() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"partial {{ required "name is required" .name }}"#);
    project.write("out.txt", "previous");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--output", "out.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("name is required"));
    assert_eq!(project.read("out.txt"), "previous");
}

#[test]
fn test_compile_error_names_pattern() {
    let project = TestProject::new();
    project.write("main.tmpl", "ok");
    project.write("patterns/broken.tmpl", "{{ if .x }}never closed");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "patterns"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template compilation failed").and(predicate::str::contains("broken.tmpl")))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unknown_function_is_compile_error() {
    let project = TestProject::new();
    project.write("main.tmpl", "{{ nosuchfunc . }}");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"function "nosuchfunc" not defined"#));
}

#[test]
fn test_missing_source_fails() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["build", "--source", "absent.tmpl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.tmpl"));
}

#[test]
fn test_no_source_at_all_fails() {
    let project = TestProject::new();

    project.cmd().arg("build").assert().failure().stderr(predicate::str::contains("no source given"));
}

#[test]
fn test_source_from_environment() {
    let project = TestProject::new();
    project.write("main.tmpl", "from env");

    project.cmd().env("XLTEMPLATE_SOURCE", "main.tmpl").arg("build").assert().success().stdout("from env");
}

#[test]
fn test_pattern_root_must_be_directory() {
    let project = TestProject::new();
    project.write("main.tmpl", "x");
    project.write("single.tmpl", "y");

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "single.tmpl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pattern roots must be directories"));
}

#[cfg(unix)]
#[test]
fn test_symlink_out_of_pattern_root_is_skipped() {
    let project = TestProject::new();
    project.write("main.tmpl", r#"{{ include "inside" . }}"#);
    project.write("patterns/inside.tmpl", "inside");
    project.write("secret.txt", "secret");
    std::os::unix::fs::symlink(project.path().join("secret.txt"), project.path().join("patterns/leak.tmpl")).unwrap();

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--patterns", "patterns"])
        .assert()
        .success()
        .stdout("inside")
        .stderr(predicate::str::contains("leak.tmpl"));
}

#[test]
fn test_range_over_variables() {
    let project = TestProject::new();
    project.write(
        "main.tmpl",
        "{{- range $i, $svc := .services }}\n{{ $i }}: {{ $svc.name }}{{ if $svc.public }} (public){{ end }}\n{{- end }}\n",
    );
    project.write(
        "vars.yaml",
        "services:\n  - name: api\n    public: true\n  - name: worker\n",
    );

    project
        .cmd()
        .args(["build", "--source", "main.tmpl", "--variables", "vars.yaml"])
        .assert()
        .success()
        .stdout("\n0: api (public)\n1: worker\n");
}
