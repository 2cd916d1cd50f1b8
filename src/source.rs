use std::ops::Range;
use std::path::Path;

use swc_core::{
    common::{sync::Lrc, BytePos, FileName, SourceFile, SourceMap, Span, Spanned},
    ecma::{
        ast::Program,
        parser::{EsSyntax, Parser, StringInput, Syntax, TsSyntax},
    },
};

use crate::error::MigrateError;

/// Grammar flavour a file is parsed with, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl ScriptKind {
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match ext {
            "js" | "cjs" | "mjs" => ScriptKind::Js,
            "jsx" => ScriptKind::Jsx,
            "tsx" => ScriptKind::Tsx,
            // .ts/.cts/.mts, and anything unrecognised
            _ => ScriptKind::Ts,
        }
    }

    fn syntax(self) -> Syntax {
        match self {
            // Plain .js test files in React projects routinely contain JSX.
            ScriptKind::Js | ScriptKind::Jsx => Syntax::Es(EsSyntax {
                jsx: true,
                decorators: true,
                ..Default::default()
            }),
            ScriptKind::Ts => Syntax::Typescript(TsSyntax {
                tsx: false,
                decorators: true,
                ..Default::default()
            }),
            ScriptKind::Tsx => Syntax::Typescript(TsSyntax {
                tsx: true,
                decorators: true,
                ..Default::default()
            }),
        }
    }
}

/// One parsed file: the tree, its original text and the mapping between
/// swc byte positions and offsets into that text.
pub struct SourceUnit {
    path: String,
    cm: Lrc<SourceMap>,
    file: Lrc<SourceFile>,
    text: String,
    program: Program,
}

impl SourceUnit {
    pub fn parse(path: &str, content: &str) -> Result<Self, MigrateError> {
        let kind = ScriptKind::from_path(path);
        let cm: Lrc<SourceMap> = Default::default();
        let file = cm.new_source_file(FileName::Real(path.into()).into(), content.to_string());

        let mut parser = Parser::new(kind.syntax(), StringInput::from(&*file), None);
        let parsed = parser.parse_program();
        // Recovered errors still mean the tree may not round-trip; refuse the file.
        let recovered = parser.take_errors();

        let parse_failure = |span: Span, message: String| MigrateError::Parse {
            path: path.to_string(),
            line: cm.lookup_char_pos(span.lo).line,
            message,
        };

        let program = match parsed {
            Ok(program) => program,
            Err(e) => return Err(parse_failure(e.span(), e.kind().msg().to_string())),
        };
        if let Some(e) = recovered.into_iter().next() {
            return Err(parse_failure(e.span(), e.kind().msg().to_string()));
        }

        Ok(Self {
            path: path.to_string(),
            cm,
            file,
            text: content.to_string(),
            program,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.file.start_pos.0) as usize
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.text[self.range(span)]
    }

    /// 1-based line number of a position.
    pub fn line(&self, pos: BytePos) -> usize {
        self.cm.lookup_char_pos(pos).line
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indent(&self, offset: usize) -> &str {
        let start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let rest = &self.text[start..];
        let width = rest
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(rest.len());
        &rest[..width]
    }

    /// True when only whitespace precedes `offset` on its line.
    pub fn starts_line(&self, offset: usize) -> bool {
        let start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        self.text[start..offset].chars().all(|c| c == ' ' || c == '\t')
    }

    /// Range to delete so that `range` disappears cleanly: a trailing comma is
    /// swallowed, and when the construct sits alone on its line(s) the whole
    /// line goes, newline included.
    pub fn removal_range(&self, range: Range<usize>) -> Range<usize> {
        let bytes = self.text.as_bytes();
        let mut end = range.end;
        let mut next = end;
        while next < bytes.len() && (bytes[next] == b' ' || bytes[next] == b'\t') {
            next += 1;
        }
        if next < bytes.len() && (bytes[next] == b',' || bytes[next] == b';') {
            end = next + 1;
        }

        let line_start = self.text[..range.start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let mut after = end;
        while after < bytes.len() && (bytes[after] == b' ' || bytes[after] == b'\t') {
            after += 1;
        }
        let alone = self.starts_line(range.start)
            && (after == bytes.len() || bytes[after] == b'\n' || bytes[after] == b'\r');
        if alone {
            let mut line_end = after;
            if line_end < bytes.len() && bytes[line_end] == b'\r' {
                line_end += 1;
            }
            if line_end < bytes.len() && bytes[line_end] == b'\n' {
                line_end += 1;
            }
            return line_start..line_end;
        }

        while end < bytes.len() && bytes[end] == b' ' {
            end += 1;
        }
        range.start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_kind_follows_extension() {
        assert_eq!(ScriptKind::from_path("a.test.js"), ScriptKind::Js);
        assert_eq!(ScriptKind::from_path("a.test.mjs"), ScriptKind::Js);
        assert_eq!(ScriptKind::from_path("a.test.jsx"), ScriptKind::Jsx);
        assert_eq!(ScriptKind::from_path("a.test.cts"), ScriptKind::Ts);
        assert_eq!(ScriptKind::from_path("a.test.tsx"), ScriptKind::Tsx);
        assert_eq!(ScriptKind::from_path("README"), ScriptKind::Ts);
    }

    #[test]
    fn parse_failure_reports_line() {
        let err = SourceUnit::parse("broken.test.ts", "const a = 1;\nconst = ;\n")
            .err()
            .expect("source should not parse");
        match err {
            MigrateError::Parse { path, line, .. } => {
                assert_eq!(path, "broken.test.ts");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tsx_accepts_jsx() {
        let unit = SourceUnit::parse("a.test.tsx", "const el = <div>hi</div>;\n");
        assert!(unit.is_ok());
    }

    #[test]
    fn removal_range_takes_whole_line_when_alone() {
        let text = "a;\n  jest.disableAutomock();\nb;\n";
        let unit = SourceUnit::parse("a.test.ts", text).unwrap();
        let start = text.find("jest").unwrap();
        let end = text.find(");").unwrap() + 1;
        let range = unit.removal_range(start..end);
        assert_eq!(&text[range], "  jest.disableAutomock();\n");
    }

    #[test]
    fn removal_range_swallows_comma_inline() {
        let text = "f({ a: 1, b: 2 });\n";
        let unit = SourceUnit::parse("a.test.ts", text).unwrap();
        let start = text.find("a: 1").unwrap();
        let range = unit.removal_range(start..start + 4);
        assert_eq!(&text[range], "a: 1, ");
    }

    #[test]
    fn line_indent_reads_leading_whitespace() {
        let text = "describe('x', () => {\n    it('y');\n});\n";
        let unit = SourceUnit::parse("a.test.ts", text).unwrap();
        let at = text.find("it(").unwrap();
        assert_eq!(unit.line_indent(at), "    ");
        assert!(unit.starts_line(at));
    }
}
