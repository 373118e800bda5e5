//! Templates that ship with tourniquet.

use tourniquet_patch_lang::{Expression, FixPattern, PatchTemplate, Statement};

/// Wrap the statement in a length check against every static buffer:
///
/// ```c
/// if (Variable() < StaticBufferSize()) {
///   <statement>
/// }
/// else {
///   return 1;
/// }
/// ```
pub fn buffer_guard() -> PatchTemplate {
    PatchTemplate::new(FixPattern::new([
        Statement::if_then(
            Expression::less_than(Expression::variable(), Expression::static_buffer_size()),
            Statement::node(),
        ),
        Statement::otherwise(Statement::ret(Expression::lit("1"))),
    ]))
}

/// Bail out before the statement when two locals compare a certain way.
pub fn bounds_check() -> PatchTemplate {
    PatchTemplate::new(FixPattern::new([
        Statement::if_then(
            Expression::compare(Expression::variable(), Expression::variable()),
            Statement::ret(Expression::lit("1")),
        ),
        Statement::node(),
    ]))
}

/// Replace the statement with an empty one.
pub fn delete_statement() -> PatchTemplate {
    PatchTemplate::new(FixPattern::new([Statement::from(Expression::lit(";"))]))
}

/// Every built-in template with its name.
pub fn builtin_templates() -> Vec<(&'static str, PatchTemplate)> {
    vec![
        ("buffer-guard", buffer_guard()),
        ("bounds-check", bounds_check()),
        ("delete-statement", delete_statement()),
    ]
}
