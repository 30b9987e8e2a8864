// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in class-name rules.

use heapscope_core::ClassCategory;

/// Primitive type names (also matched as array element types).
const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// JVM descriptor letters for primitive arrays (`[I`, `[[B`, ...).
const DESCRIPTOR_LETTERS: &[u8] = b"ZBCSIJFD";

/// Packages shipped with the runtime.
pub const RUNTIME_PREFIXES: &[&str] = &[
    "java.", "javax.", "jdk.", "sun.", "com.sun.", "kotlin.", "scala.",
];

/// Widely used third-party frameworks.
pub const FRAMEWORK_PREFIXES: &[&str] = &[
    "org.springframework.",
    "org.apache.",
    "org.hibernate.",
    "org.eclipse.",
    "org.slf4j.",
    "ch.qos.logback.",
    "io.netty.",
    "io.grpc.",
    "io.micrometer.",
    "io.opentelemetry.",
    "com.google.",
    "com.fasterxml.",
    "com.zaxxer.",
    "reactor.",
    "okhttp3.",
];

/// Strips array suffixes: `Foo[][]` becomes `Foo`.
pub fn element_type(name: &str) -> &str {
    let mut element = name.trim();
    while let Some(stripped) = element.strip_suffix("[]") {
        element = stripped;
    }
    element
}

fn is_primitive(name: &str) -> bool {
    if PRIMITIVES.contains(&element_type(name)) {
        return true;
    }
    let dims = name.bytes().take_while(|b| *b == b'[').count();
    dims > 0 && name.len() == dims + 1 && DESCRIPTOR_LETTERS.contains(&name.as_bytes()[dims])
}

fn has_prefix<S: AsRef<str>>(name: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|p| !p.as_ref().is_empty() && name.starts_with(p.as_ref()))
}

/// Categorizes `name` against the built-in tables and `business` prefixes.
///
/// Business prefixes win over the built-in package tables so a team can
/// claim a package that would otherwise count as framework code.
pub fn categorize_name<S: AsRef<str>>(name: &str, business: &[S]) -> ClassCategory {
    if is_primitive(name) {
        return ClassCategory::Primitive;
    }
    let element = element_type(name);
    if has_prefix(element, business) {
        ClassCategory::Business
    } else if has_prefix(element, RUNTIME_PREFIXES) {
        ClassCategory::RuntimeInternal
    } else if has_prefix(element, FRAMEWORK_PREFIXES) {
        ClassCategory::FrameworkInternal
    } else {
        ClassCategory::Application
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: &[&str] = &[];

    #[test]
    fn primitives_and_primitive_arrays() {
        for name in ["int", "byte[]", "double[][]", "[I", "[[B"] {
            assert_eq!(categorize_name(name, NONE), ClassCategory::Primitive, "{name}");
        }
        assert_ne!(categorize_name("[Ljava.lang.String;", NONE), ClassCategory::Primitive);
        assert_ne!(categorize_name("integer", NONE), ClassCategory::Primitive);
    }

    #[test]
    fn package_tables() {
        assert_eq!(
            categorize_name("java.util.HashMap", NONE),
            ClassCategory::RuntimeInternal
        );
        assert_eq!(
            categorize_name("java.lang.Object[]", NONE),
            ClassCategory::RuntimeInternal
        );
        assert_eq!(
            categorize_name("io.netty.buffer.PoolChunk", NONE),
            ClassCategory::FrameworkInternal
        );
        assert_eq!(
            categorize_name("com.acme.Order", NONE),
            ClassCategory::Application
        );
    }

    #[test]
    fn business_prefixes_take_precedence() {
        let business = ["com.acme.billing.", "com.google.acme."];
        assert_eq!(
            categorize_name("com.acme.billing.Invoice", &business),
            ClassCategory::Business
        );
        assert_eq!(
            categorize_name("com.google.acme.Thing", &business),
            ClassCategory::Business
        );
        assert_eq!(
            categorize_name("com.acme.Order", &business),
            ClassCategory::Application
        );
        assert_eq!(categorize_name("x.Y", &[""]), ClassCategory::Application);
    }

    proptest! {
        #[test]
        fn business_prefix_wins_at_any_array_depth(
            simple in "[A-Z][a-z]{0,8}",
            dims in 0usize..4,
        ) {
            let name = format!("java.acme.{simple}{}", "[]".repeat(dims));
            prop_assert_eq!(categorize_name(&name, NONE), ClassCategory::RuntimeInternal);
            prop_assert_eq!(categorize_name(&name, &["java.acme."]), ClassCategory::Business);
        }

        #[test]
        fn unmatched_names_are_application(simple in "[A-Z][a-z]{1,8}") {
            let name = format!("net.example.{simple}");
            prop_assert_eq!(categorize_name(&name, &["com.other."]), ClassCategory::Application);
        }
    }
}
