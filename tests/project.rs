use std::fs;
use std::path::Path;

use jest_to_vitest::config::{self, ConfigKind};
use jest_to_vitest::discover::{self, Patterns};
use jest_to_vitest::scripts;
use jest_to_vitest::{transform_test_files, TransformOptions};
use serde_json::json;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn migrates_a_small_project() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "package.json",
        r#"{
  "name": "app",
  "scripts": { "build": "tsc", "test": "jest --coverage --ci" },
  "jest": { "testTimeout": 10000, "setupFilesAfterEnv": ["./setup.ts"] }
}"#,
    );
    write(root, "src/sum.test.ts", "test('sums', () => {\n  expect(jest.fn()).toBeDefined();\n});\n");
    write(root, "src/sum.ts", "export const sum = (a: number, b: number) => a + b;\n");
    write(root, "node_modules/dep/x.test.js", "jest.fn();\n");

    let files = discover::load_test_files(root, &Patterns::default()).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path.replace('\\', "/"), "src/sum.test.ts");

    let report = transform_test_files(files, &TransformOptions::default());
    assert_eq!(report.changed.len(), 1);
    assert!(report.files[0]
        .content
        .starts_with("import { expect, test, vi } from 'vitest';\n\ntest('sums'"));

    let located = config::locate(root).unwrap().unwrap();
    assert_eq!(located.kind, ConfigKind::Manifest);
    let test = config::jest_to_vitest(located.value.as_ref().unwrap(), false);
    assert_eq!(test, json!({ "setupFiles": ["./setup.ts"], "testTimeout": 10000 }));
    let rendered = config::render_vitest_config(&test);
    assert!(rendered.starts_with("import { defineConfig } from 'vitest/config';"));
    assert!(rendered.contains("\"testTimeout\": 10000"));

    let mut manifest = config::read_json(&root.join("package.json")).unwrap();
    let rewrite = scripts::rewrite_manifest(&mut manifest);
    assert_eq!(rewrite.modified, vec!["test".to_string()]);
    assert!(rewrite.coverage);
    assert_eq!(manifest["scripts"]["test"], json!("vitest run --coverage.enabled"));
    assert_eq!(manifest["scripts"]["build"], json!("tsc"));
    let keys: Vec<&String> = manifest.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["name", "scripts", "jest"]);
}

#[test]
fn invalid_manifest_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "package.json", "{ not json");
    let err = config::locate(dir.path()).unwrap_err();
    assert!(matches!(err, jest_to_vitest::MigrateError::Json { .. }));
    assert!(err.path().unwrap().ends_with("package.json"));
}
