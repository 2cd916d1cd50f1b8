//! Callee path resolution: `a.b.c(...)` → `[a, b, c]`.

use swc_core::{
    common::Span,
    ecma::ast::{CallExpr, Callee, Expr, MemberProp, TaggedTpl},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub span: Span,
}

/// How the resolved path reached the call being inspected.
#[derive(Debug, Clone, Copy)]
pub enum Via<'a> {
    /// `a.b(...)`
    Direct,
    /// `a.b(table)(...)`: the path belongs to the inner call.
    Curried(&'a CallExpr),
    /// ``a.b`table`(...)``
    Tagged(&'a TaggedTpl),
}

#[derive(Debug, Clone)]
pub struct Chain<'a> {
    segments: Vec<Segment>,
    pub via: Via<'a>,
}

impl<'a> Chain<'a> {
    /// Resolves the callee path of `call`. Callees not rooted in a bare
    /// identifier (`this.x()`, `a().b()`, `a[b]()`, `super()`, `import()`)
    /// have no chain.
    pub fn resolve(call: &'a CallExpr) -> Option<Self> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        match &**callee {
            Expr::Call(inner) => {
                let chain = Self::resolve(inner)?;
                // Only the first currying level counts: `a.each(t)(n, fn)`.
                match chain.via {
                    Via::Direct => Some(Chain {
                        segments: chain.segments,
                        via: Via::Curried(inner),
                    }),
                    _ => None,
                }
            }
            Expr::TaggedTpl(tagged) => Some(Chain {
                segments: member_path(&tagged.tag)?,
                via: Via::Tagged(tagged),
            }),
            other => Some(Chain {
                segments: member_path(other)?,
                via: Via::Direct,
            }),
        }
    }

    pub fn root(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn get(&self, idx: usize) -> Option<&Segment> {
        self.segments.get(idx)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s.name == name)
    }

    /// Dotted form, e.g. `jest.useFakeTimers`.
    pub fn dotted(&self) -> String {
        self.names().join(".")
    }

    /// Whether this call is the one that carries the path text. For curried
    /// calls the inner call is visited separately and owns the segments.
    pub fn owns_segments(&self) -> bool {
        !matches!(self.via, Via::Curried(_))
    }
}

fn member_path(expr: &Expr) -> Option<Vec<Segment>> {
    let mut out = vec![];
    let mut cur = expr;
    loop {
        match cur {
            Expr::Ident(id) => {
                out.push(Segment {
                    name: id.sym.to_string(),
                    span: id.span,
                });
                break;
            }
            Expr::Member(m) => {
                let MemberProp::Ident(prop) = &m.prop else {
                    return None;
                };
                out.push(Segment {
                    name: prop.sym.to_string(),
                    span: prop.span,
                });
                cur = &m.obj;
            }
            _ => return None,
        }
    }
    out.reverse();
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceUnit;
    use swc_core::ecma::visit::{Visit, VisitWith};

    struct Outermost(Vec<Vec<String>>);

    impl Visit for Outermost {
        fn visit_call_expr(&mut self, n: &CallExpr) {
            if let Some(chain) = Chain::resolve(n) {
                self.0
                    .push(chain.names().into_iter().map(String::from).collect());
            } else {
                self.0.push(vec![]);
            }
            n.visit_children_with(self);
        }
    }

    fn chains(src: &str) -> Vec<Vec<String>> {
        let unit = SourceUnit::parse("a.test.ts", src).unwrap();
        let mut v = Outermost(vec![]);
        unit.program().visit_with(&mut v);
        v.0
    }

    #[test]
    fn length_tracks_member_depth() {
        assert_eq!(chains("a();")[0], vec!["a"]);
        assert_eq!(chains("a.b();")[0], vec!["a", "b"]);
        assert_eq!(chains("a.b.c();")[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn curried_each_resolves_through_inner_call() {
        let all = chains("test.failing.each([1])('x', (n) => {});");
        assert_eq!(all[0], vec!["test", "failing", "each"]);
        assert_eq!(all[1], vec!["test", "failing", "each"]);
    }

    #[test]
    fn tagged_template_resolves_through_tag() {
        let all = chains("describe.each`a | b`('x', () => {});");
        assert_eq!(all[0], vec!["describe", "each"]);
    }

    #[test]
    fn method_on_call_result_has_no_chain() {
        let all = chains("jest.fn().mockReturnValue(1);");
        assert!(all[0].is_empty());
        assert_eq!(all[1], vec!["jest", "fn"]);
    }

    #[test]
    fn computed_and_this_have_no_chain() {
        assert!(chains("a['b']();")[0].is_empty());
        assert!(chains("this.run();")[0].is_empty());
    }
}
