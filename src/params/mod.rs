//! Parameter declarations embedded in shader comments.
//!
//! A declaration is a single line of the form
//! `// @param name=speed type=float default=1 min=0 max=10`.
//! Parsing never fails: malformed pieces are skipped and reported as
//! [`ParseWarning`]s alongside the resulting table.

pub mod decorator;
pub mod scan;
pub mod schema;
pub mod table;

pub use schema::{
    is_uniform_member_name, ParamSource, ParamTarget, ParamType, ParameterDescriptor,
    ParseWarning, WarningKind, ATTRIBUTES_MEMBER,
};
pub use table::{NameInterner, ParameterTable};

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub table: ParameterTable,
    pub warnings: Vec<ParseWarning>,
}

/// Extracts every parameter declared in `source`.
pub fn parse_parameters(source: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for payload in decorator::decorator_payloads(source) {
        let Some(descriptor) =
            schema::build_descriptor(payload.line, payload.text, &mut outcome.warnings)
        else {
            continue;
        };
        let name = descriptor.name.clone();
        if descriptor.target == ParamTarget::Uniform && !is_uniform_member_name(&name) {
            outcome.warnings.push(ParseWarning {
                line: payload.line,
                kind: WarningKind::InvalidUniformName(name.to_string()),
            });
        }
        if outcome.table.insert(descriptor).is_some() {
            outcome.warnings.push(ParseWarning {
                line: payload.line,
                kind: WarningKind::DuplicateName(name.to_string()),
            });
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = "\
// @param name=speed type=float default=2 min=0 max=10 step=0.5
// @param name=tint type=color3 default.r=1 default.g=0.5
let x = 1.0;
// plain comment
// @param name=time type=float source=time
// @param name=broken
";

    #[test]
    fn parses_every_declaration_in_order() {
        let outcome = parse_parameters(SHADER);
        let names: Vec<_> = outcome.table.names().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["speed", "tint", "time"]);

        let tint = outcome.table.get("tint").unwrap();
        assert_eq!(tint.value.floats(), [1.0, 0.5, 0.0, 0.0]);
        assert!(tint.edit_as_color);

        assert_eq!(outcome.warnings, vec![ParseWarning {
            line: 6,
            kind: WarningKind::MissingType("broken".into()),
        }]);
    }

    #[test]
    fn warnings_use_crlf_line_numbers() {
        let outcome = parse_parameters("// ok\r\n// @param name=broken\r\n");
        assert_eq!(outcome.warnings, vec![ParseWarning {
            line: 2,
            kind: WarningKind::MissingType("broken".into()),
        }]);
    }

    #[test]
    fn last_declaration_of_a_name_wins() {
        let source = "\
// @param name=a type=float default=1
// @param name=b type=int
// @param name=a type=float2 default=3
";
        let outcome = parse_parameters(source);
        assert_eq!(outcome.table.len(), 2);
        let first = outcome.table.iter().next().unwrap();
        assert_eq!(&*first.name, "a");
        assert_eq!(first.ty, ParamType::Float2);
        assert_eq!(first.value.float(0), 3.0);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [ParseWarning { line: 3, kind: WarningKind::DuplicateName(_) }]
        ));
    }

    #[test]
    fn malformed_line_commits_nothing() {
        let outcome = parse_parameters("// @param name=\n");
        assert!(outcome.table.is_empty());
    }

    #[test]
    fn source_without_declarations_is_empty() {
        let outcome = parse_parameters("@fragment fn fs_main() {}\n");
        assert!(outcome.table.is_empty());
        assert!(outcome.warnings.is_empty());
    }
}
