//! Rewrites `jest` invocations in package scripts to `vitest`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static ENV_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=").expect("valid env assignment regex"));

/// Script added when a manifest has no script running Jest yet.
pub const FALLBACK_SCRIPT: (&str, &str) = ("test:vitest", "vitest run");

/// How a Jest flag carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    /// No value.
    Switch(&'static str),
    /// Exactly one value.
    Valued(&'static str),
    /// Value may be omitted; the default is filled in.
    Optional(&'static str, &'static str),
    /// Several values; the target flag is repeated per value.
    Repeated(&'static str),
    /// Any value is ignored and replaced by a fixed one.
    Fixed(&'static str, &'static str),
    /// Values become positional file filters.
    Filters,
    /// Selects `vitest watch`.
    Watch,
}

fn jest_flag(name: &str) -> Option<Flag> {
    use Flag::*;
    let flag = match name {
        "bail" | "b" => Optional("bail", "1"),
        "changedFilesWithAncestor" | "lastCommit" | "onlyChanged" | "o" => {
            Fixed("changed", "HEAD~1")
        }
        "changedSince" => Valued("changed"),
        "config" => Valued("config"),
        "c" => Valued("c"),
        "coverage" | "collectCoverage" => Switch("coverage.enabled"),
        "coverageDirectory" => Valued("coverage.reportsDirectory"),
        "env" => Valued("environment"),
        "expand" | "e" => Switch("expandSnapshotDiff"),
        "injectGlobals" => Switch("globals"),
        "json" => Fixed("reporter", "json"),
        "logHeapUsage" => Switch("logHeapUsage"),
        "maxConcurrency" => Valued("maxConcurrency"),
        "maxWorkers" | "w" => Valued("maxWorkers"),
        "noStackTrace" => Fixed("printConsoleTrace", "false"),
        "outputFile" => Valued("outputFile"),
        "passWithNoTests" => Switch("passWithNoTests"),
        "randomize" => Switch("sequence.shuffle.tests"),
        "reporters" => Repeated("reporter"),
        "roots" => Filters,
        "runInBand" | "i" => Switch("no-file-parallelism"),
        "seed" => Valued("sequence.seed"),
        "selectProjects" => Repeated("project"),
        "shard" => Valued("shard"),
        "silent" => Switch("silent"),
        "testNamePattern" => Valued("testNamePattern"),
        "t" => Valued("t"),
        "testPathIgnorePatterns" => Repeated("exclude"),
        "testTimeout" => Valued("testTimeout"),
        "updateSnapshot" => Switch("update"),
        "u" => Switch("u"),
        "verbose" => Fixed("reporter", "verbose"),
        "watch" | "watchAll" => Watch,
        _ => return None,
    };
    Some(flag)
}

fn render_flag(name: &str) -> String {
    if name.len() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Result of rewriting one command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptRewrite {
    pub command: String,
    pub changed: bool,
    /// A coverage flag was carried over; the project needs a coverage provider.
    pub coverage: bool,
    /// Jest flags with no Vitest counterpart, as written.
    pub dropped: Vec<String>,
}

/// Rewrites every `jest` invocation in a shell command line. Segments that
/// do not run Jest are copied unchanged.
pub fn rewrite_command(line: &str) -> ScriptRewrite {
    let mut out = ScriptRewrite::default();
    let mut command = String::with_capacity(line.len() + 8);
    for (segment, operator) in split_segments(line) {
        match rewrite_segment(segment, &mut out) {
            Some(rewritten) => {
                out.changed = true;
                command.push_str(&rewritten);
            }
            None => command.push_str(segment),
        }
        command.push_str(operator);
    }
    out.command = command;
    out
}

/// Splits on `&&`, `||`, `|`, `;` and `&` outside quotes. Each item is the
/// segment text followed by the operator that ends it (empty for the last).
fn split_segments(line: &str) -> Vec<(&str, &str)> {
    let bytes = line.as_bytes();
    let mut out = vec![];
    let mut start = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q == b'"' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\\' => i += 1,
                b'\'' | b'"' => quote = Some(b),
                b'&' | b'|' | b';' => {
                    let redirect = b == b'&'
                        && (i > 0 && bytes[i - 1] == b'>' || bytes.get(i + 1) == Some(&b'>'));
                    if !redirect {
                        let double = b != b';' && bytes.get(i + 1) == Some(&b);
                        let end = if double { i + 2 } else { i + 1 };
                        out.push((&line[start..i], &line[i..end]));
                        start = end;
                        i = end;
                        continue;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    out.push((&line[start..], ""));
    out
}

/// Whitespace-separated words with quotes respected, as byte ranges into
/// the segment.
fn words(segment: &str) -> Vec<std::ops::Range<usize>> {
    let bytes = segment.as_bytes();
    let mut out = vec![];
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b.is_ascii_whitespace() => break,
                None if b == b'\'' || b == b'"' => quote = Some(b),
                None if b == b'\\' => i += 1,
                None => {}
            }
            i += 1;
        }
        out.push(start..i.min(bytes.len()));
    }
    out
}

/// Index of the word naming the program, past env assignments and package
/// runners.
fn program_index(segment: &str, words: &[std::ops::Range<usize>]) -> Option<usize> {
    let mut i = 0;
    while i < words.len() {
        let word = &segment[words[i].clone()];
        if ENV_ASSIGNMENT.is_match(word) {
            i += 1;
            continue;
        }
        match word {
            "npx" | "bunx" | "yarn" | "cross-env" => {
                i += 1;
                while i < words.len() && segment[words[i].clone()].starts_with('-') {
                    i += 1;
                }
            }
            "pnpm" => {
                i += 1;
                if words.get(i).is_some_and(|w| &segment[w.clone()] == "exec") {
                    i += 1;
                }
            }
            _ => return Some(i),
        }
    }
    None
}

fn is_jest(word: &str) -> bool {
    word == "jest" || word.ends_with("/jest")
}

fn rewrite_segment(segment: &str, out: &mut ScriptRewrite) -> Option<String> {
    let words = words(segment);
    let index = program_index(segment, &words)?;
    let program = words[index].clone();
    if !is_jest(&segment[program.clone()]) {
        return None;
    }

    let mut watch = false;
    let mut args: Vec<String> = vec![];
    let rest: Vec<&str> = words[index + 1..].iter().map(|w| &segment[w.clone()]).collect();
    let mut i = 0;
    while i < rest.len() {
        let word = rest[i];
        i += 1;
        if word == "--" {
            args.extend(rest[i - 1..].iter().map(|w| w.to_string()));
            break;
        }
        let Some(stripped) = word.strip_prefix("--").or_else(|| word.strip_prefix('-')) else {
            args.push(word.to_string());
            continue;
        };
        let (name, inline) = match stripped.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (stripped, None),
        };
        let Some(flag) = jest_flag(name) else {
            out.dropped.push(word.to_string());
            continue;
        };

        match flag {
            Flag::Switch(to) => {
                out.coverage |= to == "coverage.enabled";
                match inline {
                    Some(value) => args.push(format!("{}={value}", render_flag(to))),
                    None => args.push(render_flag(to)),
                }
            }
            Flag::Valued(to) => match inline {
                Some(value) => args.push(format!("{}={value}", render_flag(to))),
                None => {
                    args.push(render_flag(to));
                    args.extend(take_values(&rest, &mut i, None, false).into_iter().map(str::to_string));
                }
            },
            Flag::Optional(to, default) => {
                let value = match inline {
                    Some(value) => value,
                    None if rest.get(i).is_some_and(|v| v.bytes().all(|b| b.is_ascii_digit())) => {
                        i += 1;
                        rest[i - 1]
                    }
                    None => default,
                };
                args.push(format!("{} {value}", render_flag(to)));
            }
            Flag::Repeated(to) => {
                for value in take_values(&rest, &mut i, inline, true) {
                    args.push(format!("{} {value}", render_flag(to)));
                }
            }
            Flag::Fixed(to, value) => {
                take_values(&rest, &mut i, inline, false);
                args.push(format!("{} {value}", render_flag(to)));
            }
            Flag::Filters => {
                args.extend(take_values(&rest, &mut i, inline, true).into_iter().map(str::to_string));
            }
            Flag::Watch => watch = true,
        }
    }

    let mut rewritten = String::with_capacity(segment.len() + 8);
    rewritten.push_str(&segment[..program.start]);
    let word = &segment[program.clone()];
    rewritten.push_str(&word[..word.len() - "jest".len()]);
    rewritten.push_str("vitest ");
    rewritten.push_str(if watch { "watch" } else { "run" });
    for arg in &args {
        rewritten.push(' ');
        rewritten.push_str(arg);
    }
    let tail = words.last().map(|w| w.end).unwrap_or(program.end);
    rewritten.push_str(&segment[tail..]);
    Some(rewritten)
}

/// Values following a flag: the inline `=value`, else the next word (or
/// every following word when `all`) up to the next flag.
fn take_values<'s>(rest: &[&'s str], i: &mut usize, inline: Option<&'s str>, all: bool) -> Vec<&'s str> {
    if let Some(value) = inline {
        return vec![value];
    }
    let mut values = vec![];
    while *i < rest.len() && !rest[*i].starts_with('-') {
        values.push(rest[*i]);
        *i += 1;
        if !all {
            break;
        }
    }
    values
}

/// Outcome of rewriting a manifest's `scripts` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ManifestRewrite {
    /// Script names whose command changed or that were added.
    pub modified: Vec<String>,
    pub coverage: bool,
    /// `script: flag` for each Jest flag that was dropped.
    pub notes: Vec<String>,
}

/// Rewrites every script of a parsed `package.json`. When no script runs
/// Jest a `test:vitest` script is added so the new runner has an entry point.
pub fn rewrite_manifest(manifest: &mut Value) -> ManifestRewrite {
    let mut out = ManifestRewrite::default();
    let Some(root) = manifest.as_object_mut() else {
        return out;
    };
    let scripts = root
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(scripts) = scripts.as_object_mut() else {
        return out;
    };

    for (name, command) in scripts.iter_mut() {
        let Some(text) = command.as_str() else {
            continue;
        };
        let rewrite = rewrite_command(text);
        if !rewrite.changed {
            continue;
        }
        out.coverage |= rewrite.coverage;
        out.notes
            .extend(rewrite.dropped.iter().map(|flag| format!("{name}: {flag}")));
        out.modified.push(name.clone());
        *command = Value::String(rewrite.command);
    }

    let (name, command) = FALLBACK_SCRIPT;
    if out.modified.is_empty() && !scripts.contains_key(name) {
        scripts.insert(name.to_string(), Value::String(command.to_string()));
        out.modified.push(name.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rewrite(line: &str) -> String {
        rewrite_command(line).command
    }

    #[test]
    fn leaves_other_commands_alone() {
        let out = rewrite_command("node index.js && tsc -p .");
        assert!(!out.changed);
        assert_eq!(out.command, "node index.js && tsc -p .");
    }

    #[test]
    fn plain_invocation() {
        assert_eq!(rewrite("jest"), "vitest run");
        assert_eq!(
            rewrite("jest tests/integrations/**.spec.ts"),
            "vitest run tests/integrations/**.spec.ts"
        );
        assert_eq!(
            rewrite("jest src/a/**.spec.ts src/b/**.test.ts"),
            "vitest run src/a/**.spec.ts src/b/**.test.ts"
        );
    }

    #[test]
    fn chained_segments() {
        assert_eq!(
            rewrite("jest src/a/**.spec.ts & jest src/b/**.test.ts && jest dist/c/*.ts"),
            "vitest run src/a/**.spec.ts & vitest run src/b/**.test.ts && vitest run dist/c/*.ts"
        );
        assert_eq!(rewrite("tsc; jest | tee out.log"), "tsc; vitest run | tee out.log");
    }

    #[test]
    fn operators_inside_quotes_do_not_split() {
        assert_eq!(
            rewrite("jest -t 'a && b' --silent"),
            "vitest run -t 'a && b' --silent"
        );
    }

    #[test]
    fn redirects_are_not_operators() {
        assert_eq!(rewrite("jest 2>&1"), "vitest run 2>&1");
    }

    #[test]
    fn runners_and_env_prefixes() {
        assert_eq!(rewrite("CI=true npx jest"), "CI=true npx vitest run");
        assert_eq!(
            rewrite("cross-env NODE_ENV=test jest --silent"),
            "cross-env NODE_ENV=test vitest run --silent"
        );
        assert_eq!(rewrite("pnpm exec jest"), "pnpm exec vitest run");
        assert_eq!(rewrite("node_modules/.bin/jest"), "node_modules/.bin/vitest run");
        assert_eq!(rewrite("npx jest-junit"), "npx jest-junit");
    }

    #[test]
    fn flags_with_values() {
        assert_eq!(
            rewrite("jest src/a/**.spec.ts --bail --silent"),
            "vitest run src/a/**.spec.ts --bail 1 --silent"
        );
        assert_eq!(rewrite("jest --bail 3"), "vitest run --bail 3");
        assert_eq!(rewrite("jest --maxWorkers=4"), "vitest run --maxWorkers=4");
        assert_eq!(rewrite("jest -w 2"), "vitest run --maxWorkers 2");
        assert_eq!(rewrite("jest -c"), "vitest run -c");
    }

    #[test]
    fn multi_value_flags_repeat() {
        assert_eq!(
            rewrite("jest --selectProjects a b c"),
            "vitest run --project a --project b --project c"
        );
    }

    #[test]
    fn fixed_values() {
        assert_eq!(rewrite("jest --onlyChanged"), "vitest run --changed HEAD~1");
        assert_eq!(rewrite("jest --changedSince main"), "vitest run --changed main");
    }

    #[test]
    fn coverage_flag_is_flagged() {
        let out = rewrite_command("jest --collectCoverage");
        assert_eq!(out.command, "vitest run --coverage.enabled");
        assert!(out.coverage);
    }

    #[test]
    fn watch_selects_subcommand() {
        assert_eq!(rewrite("jest --watchAll --silent"), "vitest watch --silent");
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let out = rewrite_command("jest --ci --forceExit src");
        assert_eq!(out.command, "vitest run src");
        assert_eq!(out.dropped, vec!["--ci".to_string(), "--forceExit".to_string()]);
    }

    #[test]
    fn manifest_scripts_are_rewritten_in_place() {
        let mut manifest = json!({
            "name": "app",
            "scripts": {
                "start": "node index.js",
                "test": "jest --ci",
                "test:cov": "jest --coverage"
            }
        });
        let out = rewrite_manifest(&mut manifest);
        assert_eq!(out.modified, vec!["test".to_string(), "test:cov".to_string()]);
        assert!(out.coverage);
        assert_eq!(out.notes, vec!["test: --ci".to_string()]);
        assert_eq!(manifest["scripts"]["start"], json!("node index.js"));
        assert_eq!(manifest["scripts"]["test"], json!("vitest run"));
        assert_eq!(manifest["scripts"]["test:cov"], json!("vitest run --coverage.enabled"));
    }

    #[test]
    fn manifest_without_jest_gets_fallback_script() {
        let mut manifest = json!({ "scripts": { "start": "node index.js" } });
        let out = rewrite_manifest(&mut manifest);
        assert_eq!(out.modified, vec!["test:vitest".to_string()]);
        assert_eq!(manifest["scripts"]["test:vitest"], json!("vitest run"));
    }
}
