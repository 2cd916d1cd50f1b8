use std::sync::LazyLock;

use regex::Regex;
use swc_core::ecma::{
    ast::Str,
    visit::{Visit, VisitWith},
};

use crate::source::SourceUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Tab,
    TwoSpaces,
    FourSpaces,
    EightSpaces,
}

impl IndentUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            IndentUnit::Tab => "\t",
            IndentUnit::TwoSpaces => "  ",
            IndentUnit::FourSpaces => "    ",
            IndentUnit::EightSpaces => "        ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Single,
    Double,
}

impl QuoteKind {
    pub fn quote(self, s: &str) -> String {
        match self {
            QuoteKind::Single => format!("'{s}'"),
            QuoteKind::Double => format!("\"{s}\""),
        }
    }
}

/// Indentation and quoting conventions synthesised text should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleProfile {
    pub indent: IndentUnit,
    pub quote: QuoteKind,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            indent: IndentUnit::TwoSpaces,
            quote: QuoteKind::Single,
        }
    }
}

// First indented line that isn't the body of a block comment.
static INDENTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]+)[^\s*]").expect("valid indentation regex"));

impl StyleProfile {
    pub fn infer(unit: &SourceUnit) -> Self {
        let defaults = Self::default();
        Self {
            indent: infer_indent(unit.text()).unwrap_or(defaults.indent),
            quote: infer_quote(unit).unwrap_or(defaults.quote),
        }
    }
}

fn infer_indent(text: &str) -> Option<IndentUnit> {
    let leading = INDENTED_LINE.captures(text)?.get(1)?.as_str();
    if leading.contains('\t') {
        return Some(IndentUnit::Tab);
    }
    Some(match leading.len() {
        1 | 2 => IndentUnit::TwoSpaces,
        3 | 4 => IndentUnit::FourSpaces,
        _ => IndentUnit::EightSpaces,
    })
}

fn infer_quote(unit: &SourceUnit) -> Option<QuoteKind> {
    let mut finder = FirstString { unit, found: None };
    unit.program().visit_with(&mut finder);
    finder.found
}

struct FirstString<'a> {
    unit: &'a SourceUnit,
    found: Option<QuoteKind>,
}

impl Visit for FirstString<'_> {
    fn visit_str(&mut self, n: &Str) {
        if self.found.is_some() {
            return;
        }
        self.found = match self.unit.slice(n.span).chars().next() {
            Some('"') => Some(QuoteKind::Double),
            Some('\'') => Some(QuoteKind::Single),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(text: &str) -> StyleProfile {
        let unit = SourceUnit::parse("a.test.ts", text).unwrap();
        StyleProfile::infer(&unit)
    }

    #[test]
    fn defaults_without_samples() {
        assert_eq!(profile("foo();\n"), StyleProfile::default());
    }

    #[test]
    fn picks_up_four_spaces_and_double_quotes() {
        let p = profile("describe(\"a\", () => {\n    it('b', () => {});\n});\n");
        assert_eq!(p.indent, IndentUnit::FourSpaces);
        assert_eq!(p.quote, QuoteKind::Double);
    }

    #[test]
    fn tabs_win_over_width() {
        let p = profile("describe('a', () => {\n\tit('b', () => {});\n});\n");
        assert_eq!(p.indent, IndentUnit::Tab);
        assert_eq!(p.quote, QuoteKind::Single);
    }

    #[test]
    fn block_comment_bodies_are_not_samples() {
        let p = profile("/**\n * header\n */\ndescribe('a', () => {\n    it('b');\n});\n");
        assert_eq!(p.indent, IndentUnit::FourSpaces);
    }

    #[test]
    fn quote_wraps_with_profile_character() {
        assert_eq!(QuoteKind::Double.quote("vitest"), "\"vitest\"");
        assert_eq!(QuoteKind::Single.quote("vitest"), "'vitest'");
    }
}
