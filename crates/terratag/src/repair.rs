//! turn quoted expressions back into expressions
//!
//! After serializing, every injected expression sits in the text as a quoted string. The serialized text is parsed
//! again, each literal's [Site] is resolved in that tree and the quoted token found at the attribute's value span is
//! replaced by the bare expression. Text outside of those spans is never looked at.
use crate::inject::{InjectedLiteral, InjectedLiterals, Site};
use crate::quoting;
use hcl_edit::repr::Span;
use hcl_edit::structure::Body;
use std::ops::Range;

/// Unquotes all `literals`, which are consumed in recorded order
///
/// Fails if any literal is not found exactly where it was written.
pub fn repair(text: String, literals: InjectedLiterals) -> Result<String, RepairError> {
    if literals.is_empty() {
        return Ok(text);
    }

    let reparsed = hcl_edit::parser::parse_body(&text).map_err(RepairError::Reparse)?;

    let mut edits = Vec::with_capacity(literals.len());
    for InjectedLiteral { site, text: literal } in literals {
        let span = locate(&text, &reparsed, &site, &literal)?;
        tracing::trace!(%site, ?span, "unquoting");
        edits.push((span, literal));
    }

    // back to front, so earlier spans stay valid
    edits.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));

    let mut repaired = text;
    for (span, literal) in edits {
        repaired.replace_range(span, &literal);
    }

    Ok(repaired)
}

/// Byte range of the quoted literal written to `site`
fn locate(
    text: &str,
    reparsed: &Body,
    site: &Site,
    literal: &str,
) -> Result<Range<usize>, RepairError> {
    let not_found = || RepairError::LiteralNotFound {
        site: site.to_string(),
        literal: literal.to_owned(),
    };

    let attribute = site
        .resolve(reparsed)
        .ok_or_else(|| RepairError::SiteNotFound(site.to_string()))?;

    let span = attribute.value.span().ok_or_else(not_found)?;
    let written = text.get(span.clone()).ok_or_else(not_found)?;

    let expected = quoting::quoted(literal);
    if written.trim() != expected {
        return Err(not_found());
    }

    let start = span.start + (written.len() - written.trim_start().len());
    Ok(start..start + expected.len())
}

#[derive(thiserror::Error, Debug)]
pub enum RepairError {
    #[error("serialized output does not parse")]
    Reparse(#[source] hcl_edit::parser::Error),
    #[error("injected attribute {0} is missing from serialized output")]
    SiteNotFound(String),
    #[error("expected quoted `{literal}` at {site}")]
    LiteralNotFound { site: String, literal: String },
}
