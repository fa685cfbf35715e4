use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::json;
use tempfile::tempdir;

fn cli_bin() -> &'static str {
    env!("CARGO_BIN_EXE_makemessages")
}

fn run_cli<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Output {
    Command::new(cli_bin())
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("failed to run makemessages")
}

fn write_project(root: &Path) {
    fs::create_dir_all(root.join("app")).unwrap();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(
        root.join("app/main.go"),
        "package main\n\nimport \"github.com/leonelquinteros/gotext\"\n\nfunc main() {\n\tgotext.Get(\"Hello\")\n}\n",
    )
    .unwrap();
    fs::write(root.join("templates/index.html"), "{% trans \"World\" %}\n").unwrap();
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const EXTRACT_ARGS: [&str; 8] = ["-p", "app", "-t", "templates", "-l", "fr", "-o", "locales"];

#[test]
fn test_extract_creates_catalog() {
    let dir = tempdir().unwrap();
    write_project(dir.path());

    let output = run_cli(dir.path(), &EXTRACT_ARGS);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let content = fs::read_to_string(dir.path().join("locales/fr/default.po")).unwrap();
    assert!(content.contains("\"Language: fr\\n\""));
    assert!(content.contains("#: main.go:6\nmsgid \"Hello\"\nmsgstr \"\"\n"));
    assert!(content.contains("#: templates/index.html:1\nmsgid \"World\"\nmsgstr \"\"\n"));
    assert_eq!(content.matches("msgid \"").count(), 3);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("created"));
}

#[test]
fn test_extract_merge_keeps_translation() {
    let dir = tempdir().unwrap();
    write_project(dir.path());
    assert!(run_cli(dir.path(), &EXTRACT_ARGS).status.success());

    let po_path = dir.path().join("locales/fr/default.po");
    let content = fs::read_to_string(&po_path).unwrap();
    let translated = content.replace(
        "msgid \"Hello\"\nmsgstr \"\"",
        "msgid \"Hello\"\nmsgstr \"Bonjour\"",
    );
    assert_ne!(content, translated);
    fs::write(&po_path, translated).unwrap();

    fs::write(
        dir.path().join("templates/index.html"),
        "{% trans \"World\" %}\n{% trans \"Again\" %}\n",
    )
    .unwrap();

    let output = run_cli(dir.path(), &EXTRACT_ARGS);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("merged"));

    let merged = fs::read_to_string(&po_path).unwrap();
    assert!(merged.contains("msgid \"Hello\"\nmsgstr \"Bonjour\""));
    assert!(merged.contains("#: templates/index.html:2\nmsgid \"Again\"\nmsgstr \"\"\n"));
}

#[test]
fn test_extract_is_idempotent() {
    let dir = tempdir().unwrap();
    write_project(dir.path());
    assert!(run_cli(dir.path(), &EXTRACT_ARGS).status.success());
    let first = fs::read_to_string(dir.path().join("locales/fr/default.po")).unwrap();

    assert!(run_cli(dir.path(), &EXTRACT_ARGS).status.success());
    let second = fs::read_to_string(dir.path().join("locales/fr/default.po")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_languages_fails() {
    let dir = tempdir().unwrap();
    write_project(dir.path());

    let output = run_cli(dir.path(), &["-p", "app"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("At least one language must be specified"));
    assert!(!dir.path().join("locales").exists());
}

#[test]
fn test_missing_sources_fails() {
    let dir = tempdir().unwrap();

    let output = run_cli(dir.path(), &["-l", "fr"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("At least one package path or template path must be specified"));
}

#[test]
fn test_language_path_collision_fails() {
    let dir = tempdir().unwrap();
    write_project(dir.path());
    fs::create_dir_all(dir.path().join("locales")).unwrap();
    fs::write(dir.path().join("locales/fr"), "").unwrap();

    let output = run_cli(dir.path(), &EXTRACT_ARGS);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists, but is not a directory"));
}

#[test]
fn test_unterminated_template_fails() {
    let dir = tempdir().unwrap();
    write_project(dir.path());
    fs::write(dir.path().join("templates/broken.html"), "{% trans \"oops %}\n").unwrap();

    let output = run_cli(dir.path(), &EXTRACT_ARGS);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("broken.html"));
    assert!(!dir.path().join("locales/fr/default.po").exists());
}

#[test]
fn test_config_file_with_custom_functions() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/go.mod"), "module example.com/app\n").unwrap();
    fs::write(
        dir.path().join("app/main.go"),
        "package main\n\nfunc T(msg string) string { return msg }\n\nfunc main() {\n\tT(\"Custom\")\n}\n",
    )
    .unwrap();

    let config = json!({
        "packagePaths": ["app"],
        "languages": ["de", "fr"],
        "output": "translations",
        "functions": [{
            "prefixes": ["example.com/app."],
            "functions": [{ "name": "T", "arguments": ["single"] }]
        }]
    });
    fs::write(
        dir.path().join("makemessages.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();

    let output = run_cli(dir.path(), &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    for language in ["de", "fr"] {
        let path = dir.path().join("translations").join(language).join("default.po");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("#: main.go:6\nmsgid \"Custom\""));
    }
}

#[test]
fn test_cli_overrides_config_file() {
    let dir = tempdir().unwrap();
    write_project(dir.path());
    let config = json!({ "templatePaths": ["templates"], "languages": ["de"] });
    let config_path = dir.path().join("custom.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let output = run_cli(
        dir.path(),
        &["--config", "custom.json", "-l", "it,es", "--log-level", "warn"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
    assert!(dir.path().join("locales/it/default.po").is_file());
    assert!(dir.path().join("locales/es/default.po").is_file());
    assert!(!dir.path().join("locales/de").exists());
}

#[test]
fn test_unknown_log_level_fails() {
    let dir = tempdir().unwrap();
    write_project(dir.path());

    let output = run_cli(dir.path(), &["-t", "templates", "-l", "fr", "--log-level", "loud"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown log level: loud"));
}
