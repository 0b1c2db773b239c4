//! Message catalog: user-facing text for diagnostic codes.
//!
//! Templates use positional placeholders `{0}`, `{1}`, ... filled from
//! the diagnostic's parameters. A code without a template renders as its
//! number followed by the raw parameters.

use schemaflat_model::{codes, Diagnostic};

/// Template for `code`, if the catalog knows it.
pub(crate) fn template(code: u32) -> Option<&'static str> {
    let text = match code {
        codes::MISSING_PARAMETER => "Rule '{0}' requires parameter '{1}'; the rule is skipped.",
        codes::INVALID_PARAMETER => "Parameter '{1}' of rule '{0}' has invalid value '{2}'; the rule is skipped.",
        codes::UNKNOWN_RULE => "Unknown rule '{0}' is ignored.",
        codes::TYPE_UNRESOLVED => "Type '{1}' of '{0}' cannot be resolved.",
        codes::TYPE_NOT_FOUND => "Rule '{0}': no type named '{1}'.",
        codes::FLAT_TARGET_BOTH_ENDS => {
            "Both ends of association '{0}' are flattening targets; navigability is left unchanged."
        }
        codes::REASON_CODE_ROLE_REFERENCE => {
            "Reason-code union '{0}' is the type of association role '{1}' and is not folded."
        }
        codes::REASON_CODE_FOLDED => "Reason-code union '{0}' folded into '{1}'.",
        codes::BASIC_TYPE_HAS_PROPERTIES => {
            "Class '{0}' derives from basic type '{1}' but declares properties; it is kept."
        }
        codes::NO_CONCRETE_SUBTYPE => "Supertype '{0}' has no concrete subtype.",
        codes::SUPERCLASS_RETAINED => "Supertype '{0}' is still referenced and is kept.",
        codes::CYCLE_DETECTED => "Type dependency cycle: {0}",
        codes::REFLEXIVE_REFERENCE => "Class '{0}' references itself via {1}.",
        codes::BIDIRECTIONAL_KEPT => "Bidirectional many-to-many association '{0}' is kept.",
        codes::BIDIRECTIONAL_DISSOLVED => {
            "Bidirectional many-to-many association '{0}' split into one-way associations."
        }
        codes::CHOICE_OPTION_IS_ROLE => {
            "Option '{1}' of choice '{0}' is an association role; the choice is not replaced."
        }
        codes::MERGE_CYCLE_SKIPPED => {
            "Property '{1}' of '{0}' is not flattened: type '{2}' is already on its merge chain."
        }
        codes::REFLEXIVE_PROPERTY_DROPPED => "Reflexive property '{1}' of '{0}' dropped.",
        codes::GEOMETRY_UNMAPPED => {
            "Geometry type '{1}' of '{0}' has no type mapping; no variant is created for it."
        }
        codes::ASSOCIATION_CLASS_DISSOLVED => {
            "Association '{0}' dissolved into association class '{1}'."
        }
        codes::ASSOCIATION_CLASS_OWNS_END => {
            "Association class '{1}' is an end of association '{0}'; the link is removed and the association kept."
        }
        codes::DUPLICATE_PROPERTY_NAME => "Class '{0}' has more than one property named '{1}'.",
        codes::DUPLICATE_CLASS_NAME => "Package '{0}' has more than one class named '{1}'.",
        codes::MULTIPLE_TAG_VALUES => "'{0}' has several values for tag '{1}'; the first is used.",
        _ => return None,
    };
    Some(text)
}

/// Substitute `{n}` placeholders with `params[n]`. Placeholders without a
/// parameter are left as written.
pub(crate) fn fill(template: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let index = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)));
        match index {
            Some((i, close)) if i < params.len() => {
                out.push_str(&params[i]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Message text of a diagnostic, without severity or rule.
pub(crate) fn message(diagnostic: &Diagnostic) -> String {
    match template(diagnostic.code) {
        Some(t) => fill(t, &diagnostic.params),
        None if diagnostic.params.is_empty() => format!("code {}", diagnostic.code),
        None => format!("code {}: {}", diagnostic.code, diagnostic.params.join(", ")),
    }
}

/// One report line: `warning[110] (flatten-types): ...`.
pub(crate) fn render(diagnostic: &Diagnostic) -> String {
    match &diagnostic.rule {
        Some(rule) => format!(
            "{}[{}] ({}): {}",
            diagnostic.severity,
            diagnostic.code,
            rule,
            message(diagnostic)
        ),
        None => format!(
            "{}[{}]: {}",
            diagnostic.severity,
            diagnostic.code,
            message(diagnostic)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fill_positional() {
        assert_eq!(fill("{1} before {0}", &strings(&["a", "b"])), "b before a");
        assert_eq!(fill("no params", &[]), "no params");
    }

    #[test]
    fn test_fill_leaves_unknown_placeholders() {
        assert_eq!(fill("{0} and {3}", &strings(&["x"])), "x and {3}");
        assert_eq!(fill("brace { alone", &[]), "brace { alone");
        assert_eq!(fill("{name}", &strings(&["x"])), "{name}");
    }

    #[test]
    fn test_every_code_has_a_template() {
        let all = [
            codes::MISSING_PARAMETER,
            codes::INVALID_PARAMETER,
            codes::UNKNOWN_RULE,
            codes::TYPE_UNRESOLVED,
            codes::TYPE_NOT_FOUND,
            codes::FLAT_TARGET_BOTH_ENDS,
            codes::REASON_CODE_ROLE_REFERENCE,
            codes::REASON_CODE_FOLDED,
            codes::BASIC_TYPE_HAS_PROPERTIES,
            codes::NO_CONCRETE_SUBTYPE,
            codes::SUPERCLASS_RETAINED,
            codes::CYCLE_DETECTED,
            codes::REFLEXIVE_REFERENCE,
            codes::BIDIRECTIONAL_KEPT,
            codes::BIDIRECTIONAL_DISSOLVED,
            codes::CHOICE_OPTION_IS_ROLE,
            codes::MERGE_CYCLE_SKIPPED,
            codes::REFLEXIVE_PROPERTY_DROPPED,
            codes::GEOMETRY_UNMAPPED,
            codes::ASSOCIATION_CLASS_DISSOLVED,
            codes::ASSOCIATION_CLASS_OWNS_END,
            codes::DUPLICATE_PROPERTY_NAME,
            codes::DUPLICATE_CLASS_NAME,
            codes::MULTIPLE_TAG_VALUES,
        ];
        for code in all {
            assert!(template(code).is_some(), "no template for {}", code);
        }
    }

    #[test]
    fn test_render_with_and_without_rule() {
        let d = Diagnostic::warning(codes::MISSING_PARAMETER, strings(&["remove-type", "removeType"]))
            .with_rule("remove-type");
        assert_eq!(
            render(&d),
            "warning[100] (remove-type): Rule 'remove-type' requires parameter 'removeType'; the rule is skipped."
        );

        let d = Diagnostic::warning(codes::UNKNOWN_RULE, strings(&["bogus"]));
        assert_eq!(render(&d), "warning[102]: Unknown rule 'bogus' is ignored.");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let d = Diagnostic::info(999, strings(&["a", "b"]));
        assert_eq!(message(&d), "code 999: a, b");
    }
}
