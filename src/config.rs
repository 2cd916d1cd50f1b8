//! Jest configuration → Vitest `test` configuration.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::error::MigrateError;
use crate::rules::utils::timers::to_fake;

/// Where a Vitest option takes its value from in the Jest config.
enum Source {
    Key(&'static str),
    Nested(&'static [(&'static str, Source)]),
}

// Sorted by target key so the emitted config reads alphabetically.
const CONFIG_MAP: &[(&str, Source)] = &[
    ("bail", Source::Key("bail")),
    ("clearMocks", Source::Key("clearMocks")),
    (
        "coverage",
        Source::Nested(&[
            ("enabled", Source::Key("collectCoverage")),
            ("exclude", Source::Key("coveragePathIgnorePatterns")),
            ("include", Source::Key("collectCoverageFrom")),
            ("provider", Source::Key("coverageProvider")),
            ("reporter", Source::Key("coverageReporters")),
            ("reportsDirectory", Source::Key("coverageDirectory")),
            ("thresholds", Source::Key("coverageThreshold")),
        ]),
    ),
    ("environment", Source::Key("testEnvironment")),
    ("exclude", Source::Key("testPathIgnorePatterns")),
    ("fakeTimers", Source::Key("fakeTimers")),
    ("include", Source::Key("testMatch")),
    ("maxConcurrency", Source::Key("maxConcurrency")),
    ("maxWorkers", Source::Key("maxWorkers")),
    ("restoreMocks", Source::Key("restoreMocks")),
    ("root", Source::Key("rootDir")),
    (
        "sequence",
        Source::Nested(&[("shuffle", Source::Nested(&[("files", Source::Key("randomize"))]))]),
    ),
    (
        "server",
        Source::Nested(&[("deps", Source::Nested(&[("cacheDir", Source::Key("cacheDirectory"))]))]),
    ),
    ("setupFiles", Source::Key("setupFiles")),
    ("slowTestThreshold", Source::Key("slowTestThreshold")),
    ("snapshotFormat", Source::Key("snapshotFormat")),
    ("snapshotSerializers", Source::Key("snapshotSerializers")),
    ("testTimeout", Source::Key("testTimeout")),
];

/// Maps a Jest config object to the object that goes under Vitest's `test`
/// key. Options without a counterpart are left out, as are empty objects.
pub fn jest_to_vitest(jest: &Value, globals: bool) -> Value {
    let mut test = map_level(jest, CONFIG_MAP);
    if globals {
        test.insert("globals".into(), Value::Bool(true));
    }
    prune(Value::Object(test)).unwrap_or_else(|| Value::Object(Map::new()))
}

fn map_level(jest: &Value, level: &[(&str, Source)]) -> Map<String, Value> {
    let mut out = Map::new();
    for (target, source) in level {
        let value = match source {
            Source::Key(key) => convert(key, jest),
            Source::Nested(inner) => Some(Value::Object(map_level(jest, inner))),
        };
        if let Some(value) = value {
            out.insert((*target).to_string(), value);
        }
    }
    out
}

fn convert(key: &str, jest: &Value) -> Option<Value> {
    let value = jest.get(key);
    match key {
        "bail" => match value? {
            Value::Bool(true) => Some(json!(1)),
            Value::Bool(false) => None,
            other => Some(other.clone()),
        },
        "coverageProvider" => value.map(|_| json!("v8")),
        "coverageThreshold" => value.map(coverage_thresholds),
        "fakeTimers" => value.map(fake_timers),
        // Vitest has a single setup list; Jest's post-framework hooks run
        // in the same place.
        "setupFiles" => {
            let files: Vec<Value> = ["setupFiles", "setupFilesAfterEnv"]
                .iter()
                .filter_map(|k| jest.get(*k).and_then(Value::as_array))
                .flatten()
                .cloned()
                .collect();
            (!files.is_empty()).then(|| Value::Array(files))
        }
        _ => value.cloned(),
    }
}

/// `{ global: { lines: 80 }, "./src": {...} }` → `{ lines: 80, "./src": {...} }`.
fn coverage_thresholds(threshold: &Value) -> Value {
    let Some(obj) = threshold.as_object() else {
        return threshold.clone();
    };
    let mut out = Map::new();
    if let Some(global) = obj.get("global").and_then(Value::as_object) {
        out.extend(global.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    for (k, v) in obj {
        if k != "global" {
            out.insert(k.clone(), v.clone());
        }
    }
    Value::Object(out)
}

fn fake_timers(timers: &Value) -> Value {
    let mut out = Map::new();
    if let Some(advance) = timers.get("advanceTimers") {
        let enabled = match advance {
            Value::Bool(b) => *b,
            Value::Number(_) => true,
            Value::Null => false,
            _ => true,
        };
        out.insert("shouldAdvanceTime".into(), Value::Bool(enabled));
        if advance.is_number() {
            out.insert("advanceTimeDelta".into(), advance.clone());
        }
    }
    if let Some(skip) = timers.get("doNotFake").and_then(Value::as_array) {
        let skip: Vec<&str> = skip.iter().filter_map(Value::as_str).collect();
        out.insert("toFake".into(), json!(to_fake(&skip)));
    }
    if let Some(now) = timers.get("now") {
        out.insert("now".into(), now.clone());
    }
    if let Some(limit) = timers.get("timerLimit") {
        out.insert("loopLimit".into(), limit.clone());
    }
    Value::Object(out)
}

/// Drops nulls and objects left empty; arrays are kept as they are.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(obj) => {
            let kept: Map<String, Value> = obj
                .into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other),
    }
}

/// Renders a `vitest.config.ts` module around a mapped `test` object.
pub fn render_vitest_config(test: &Value) -> String {
    let body = serde_json::to_string_pretty(test).unwrap_or_else(|_| "{}".to_string());
    let body = body.replace('\n', "\n  ");
    format!(
        "import {{ defineConfig }} from 'vitest/config';\n\nexport default defineConfig({{\n  test: {body},\n}});\n"
    )
}

/// Kind of Jest configuration found in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    /// `jest.config.json`.
    Json,
    /// `jest` key of `package.json`.
    Manifest,
    /// `jest.config.{js,ts,...}`: needs evaluating, converted by hand.
    Script,
}

#[derive(Debug, Clone)]
pub struct LocatedConfig {
    pub path: PathBuf,
    pub kind: ConfigKind,
    /// The config object, for the JSON kinds.
    pub value: Option<Value>,
}

const SCRIPT_CONFIGS: [&str; 6] = [
    "jest.config.ts",
    "jest.config.mts",
    "jest.config.cts",
    "jest.config.js",
    "jest.config.mjs",
    "jest.config.cjs",
];

/// Finds the project's Jest configuration, script configs first, then
/// `jest.config.json`, then the `jest` key of `package.json`.
pub fn locate(root: &Path) -> Result<Option<LocatedConfig>, MigrateError> {
    for name in SCRIPT_CONFIGS {
        let path = root.join(name);
        if path.is_file() {
            return Ok(Some(LocatedConfig {
                path,
                kind: ConfigKind::Script,
                value: None,
            }));
        }
    }

    let json_path = root.join("jest.config.json");
    if json_path.is_file() {
        let value = read_json(&json_path)?;
        return Ok(Some(LocatedConfig {
            path: json_path,
            kind: ConfigKind::Json,
            value: Some(value),
        }));
    }

    let manifest_path = root.join("package.json");
    if manifest_path.is_file() {
        let manifest = read_json(&manifest_path)?;
        if let Some(jest) = manifest.get("jest") {
            return Ok(Some(LocatedConfig {
                path: manifest_path,
                kind: ConfigKind::Manifest,
                value: Some(jest.clone()),
            }));
        }
    }
    Ok(None)
}

pub fn read_json(path: &Path) -> Result<Value, MigrateError> {
    let text = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| MigrateError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_flat_and_nested_keys() {
        let jest = json!({
            "bail": true,
            "clearMocks": false,
            "cacheDirectory": "./.test_cache",
            "collectCoverage": true,
            "testTimeout": 5000,
            "rootDir": ".",
            "maxWorkers": 5
        });
        let test = jest_to_vitest(&jest, false);
        assert_eq!(
            test,
            json!({
                "bail": 1,
                "clearMocks": false,
                "coverage": { "enabled": true },
                "maxWorkers": 5,
                "root": ".",
                "server": { "deps": { "cacheDir": "./.test_cache" } },
                "testTimeout": 5000
            })
        );
    }

    #[test]
    fn output_keys_are_sorted() {
        let jest = json!({ "testTimeout": 1, "bail": 2, "rootDir": "." });
        let test = jest_to_vitest(&jest, true);
        let keys: Vec<&String> = test.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["bail", "root", "testTimeout", "globals"]);
    }

    #[test]
    fn empty_config_maps_to_empty_object() {
        assert_eq!(jest_to_vitest(&json!({}), false), json!({}));
    }

    #[test]
    fn thresholds_are_flattened() {
        let jest = json!({
            "coverageThreshold": { "global": { "lines": 80 }, "./src/a.ts": { "lines": 100 } },
            "coverageProvider": "babel"
        });
        let test = jest_to_vitest(&jest, false);
        assert_eq!(
            test["coverage"],
            json!({ "provider": "v8", "thresholds": { "lines": 80, "./src/a.ts": { "lines": 100 } } })
        );
    }

    #[test]
    fn fake_timers_share_the_source_translation() {
        let jest = json!({ "fakeTimers": { "advanceTimers": 20, "doNotFake": ["nextTick"], "timerLimit": 10 } });
        let timers = &jest_to_vitest(&jest, false)["fakeTimers"];
        assert_eq!(timers["shouldAdvanceTime"], json!(true));
        assert_eq!(timers["advanceTimeDelta"], json!(20));
        assert_eq!(timers["loopLimit"], json!(10));
        let to_fake = timers["toFake"].as_array().unwrap();
        assert_eq!(to_fake.len(), 14);
        assert!(!to_fake.contains(&json!("nextTick")));
    }

    #[test]
    fn setup_lists_are_merged() {
        let jest = json!({ "setupFiles": ["a.js"], "setupFilesAfterEnv": ["b.js"] });
        assert_eq!(jest_to_vitest(&jest, false)["setupFiles"], json!(["a.js", "b.js"]));
    }

    #[test]
    fn renders_define_config_module() {
        let out = render_vitest_config(&json!({ "globals": true }));
        assert_eq!(
            out,
            "import { defineConfig } from 'vitest/config';\n\nexport default defineConfig({\n  test: {\n    \"globals\": true\n  },\n});\n"
        );
    }

    #[test]
    fn locate_prefers_script_configs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jest.config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("jest.config.ts"), "export default {}").unwrap();
        let found = locate(dir.path()).unwrap().unwrap();
        assert_eq!(found.kind, ConfigKind::Script);
    }

    #[test]
    fn locate_reads_manifest_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "x", "jest": { "testTimeout": 10 } }"#,
        )
        .unwrap();
        let found = locate(dir.path()).unwrap().unwrap();
        assert_eq!(found.kind, ConfigKind::Manifest);
        assert_eq!(found.value, Some(json!({ "testTimeout": 10 })));
    }

    #[test]
    fn locate_without_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate(dir.path()).unwrap().is_none());
    }
}
