//! `jest.X` references inside type annotations.

use swc_core::{
    common::{Span, Spanned},
    ecma::{
        ast::{TsEntityName, TsTypeAnn, TsTypeRef},
        visit::{Visit, VisitWith},
    },
};

use crate::rules::LEGACY_NAMESPACE;

/// Types the target module exports under the same name.
pub const KNOWN_TYPES: [&str; 14] = [
    "Mock",
    "MockContext",
    "MockInstance",
    "MockResult",
    "Mocked",
    "MockedClass",
    "MockedFunction",
    "MockedObject",
    "Replaced",
    "Spied",
    "SpiedClass",
    "SpiedFunction",
    "SpiedGetter",
    "SpiedSetter",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRewrite {
    /// `jest.Mock` → `Mock`, imported as a type.
    Strip { span: Span, name: &'static str },
    /// A namespace type with no portable counterpart.
    Unknown { name: String },
}

pub fn classify(type_ref: &TsTypeRef) -> Option<TypeRewrite> {
    let TsEntityName::TsQualifiedName(q) = &type_ref.type_name else {
        return None;
    };
    let TsEntityName::Ident(left) = &q.left else {
        return None;
    };
    if left.sym.as_ref() != LEGACY_NAMESPACE {
        return None;
    }
    let right = q.right.sym.as_ref();
    Some(match KNOWN_TYPES.into_iter().find(|t| *t == right) {
        Some(name) => TypeRewrite::Strip {
            span: type_ref.type_name.span(),
            name,
        },
        None => TypeRewrite::Unknown {
            name: format!("{LEGACY_NAMESPACE}.{right}"),
        },
    })
}

/// Whether an annotation mentions a namespace type that cannot be kept.
pub fn has_unknown(ann: &TsTypeAnn) -> bool {
    let mut finder = UnknownFinder(false);
    ann.visit_with(&mut finder);
    finder.0
}

struct UnknownFinder(bool);

impl Visit for UnknownFinder {
    fn visit_ts_type_ref(&mut self, n: &TsTypeRef) {
        if matches!(classify(n), Some(TypeRewrite::Unknown { .. })) {
            self.0 = true;
            return;
        }
        n.visit_children_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceUnit;

    struct Refs(Vec<Option<TypeRewrite>>);

    impl Visit for Refs {
        fn visit_ts_type_ref(&mut self, n: &TsTypeRef) {
            self.0.push(classify(n));
            n.visit_children_with(self);
        }
    }

    fn refs(src: &str) -> Vec<Option<TypeRewrite>> {
        let unit = SourceUnit::parse("a.test.ts", src).unwrap();
        let mut v = Refs(vec![]);
        unit.program().visit_with(&mut v);
        v.0
    }

    #[test]
    fn known_names_are_stripped() {
        let found = refs("let a: jest.Mocked<typeof fs>;");
        assert!(matches!(
            found[0],
            Some(TypeRewrite::Strip { name: "Mocked", .. })
        ));
    }

    #[test]
    fn unknown_names_are_flagged() {
        let found = refs("let a: jest.SpyInstance;");
        assert_eq!(
            found[0],
            Some(TypeRewrite::Unknown {
                name: "jest.SpyInstance".into()
            })
        );
    }

    #[test]
    fn other_namespaces_are_ignored() {
        let found = refs("let a: React.FC; let b: Foo;");
        assert_eq!(found, vec![None, None]);
    }
}
