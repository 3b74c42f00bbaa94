//! attribute writer
//!
//! Computed tag expressions are written as string literals: the value ends up as a quoted token with its
//! quotes and template markers escaped. [quoted] renders text through the same encoder, which is how
//! [crate::repair] knows what to look for.
use hcl_edit::expr::Expression;
use hcl_edit::repr::{Decor, Decorate};
use hcl_edit::structure::{Attribute, Block, Body, Structure};
use hcl_edit::Ident;

/// Indentation of attributes and blocks directly inside a resource
pub const RESOURCE_INDENT: &str = "  ";

/// Indentation of attributes inside a block nested in a resource
pub const NESTED_INDENT: &str = "    ";

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("`{0}` is not a valid HCL identifier")]
pub struct InvalidIdentifier(pub String);

/// `text` as it reads once written with [set_literal]
///
/// ```
/// assert_eq!(terratag::quoting::quoted(r#"{"a"="b"}"#), r#""{\"a\"=\"b\"}""#);
/// ```
pub fn quoted(text: &str) -> String {
    let mut literal = Expression::from(text);
    *literal.decor_mut() = Decor::default();
    literal.to_string().trim().to_owned()
}

/// Writes `text` as a string literal to attribute `key`
pub fn set_literal(
    body: &mut Body,
    key: &str,
    text: &str,
    indent: &str,
) -> Result<(), InvalidIdentifier> {
    set_attribute(body, key, Expression::from(text), indent)
}

/// Replaces the value of attribute `key` or appends the attribute
///
/// An existing value keeps its surrounding whitespace and comments.
pub fn set_attribute(
    body: &mut Body,
    key: &str,
    mut value: Expression,
    indent: &str,
) -> Result<(), InvalidIdentifier> {
    if let Some(existing) = body.get_attribute(key) {
        *value.decor_mut() = existing.value.decor().clone();
        if let Some(mut attribute) = body.get_attribute_mut(key) {
            *attribute.value_mut() = value;
        }
        return Ok(());
    }

    let ident = Ident::try_new(key).map_err(|_| InvalidIdentifier(key.to_owned()))?;
    *value.decor_mut() = Decor::new(" ", "");

    let mut attribute = Attribute::new(ident, value);
    attribute.decor_mut().set_prefix(indent);
    attribute.key.decor_mut().set_suffix(" ");

    open_lines(body, indent);
    body.push(attribute);
    Ok(())
}

/// Appends `block` to a body whose structures are indented by `indent`
pub fn push_block(body: &mut Body, block: Block, indent: &str) {
    open_lines(body, indent);
    body.push(block);
}

/// Lays out a one-line body as one structure per line and puts the closing brace one level out
///
/// Bodies built here start without any layout and only get the closing brace indent. Parsed multi-line bodies keep
/// theirs.
fn open_lines(body: &mut Body, indent: &str) {
    let closing = &indent[..indent.len().saturating_sub(RESOURCE_INDENT.len())];

    if body.prefer_oneline() {
        for structure in std::mem::take(body) {
            match structure {
                Structure::Attribute(mut attribute) => {
                    *attribute.decor_mut() = Decor::new(indent, "");
                    attribute.key.decor_mut().set_prefix("");
                    attribute.value.decor_mut().set_suffix("");
                    body.push(attribute);
                }
                Structure::Block(block) => body.push(block),
            }
        }
        *body.decor_mut() = Decor::new("", closing);
    } else if body.is_empty() && body.decor().suffix().is_none() {
        body.decor_mut().set_suffix(closing);
    }
}

/// An empty block without labels
pub fn new_block(ident: &str, prefix: &str) -> Result<Block, InvalidIdentifier> {
    let ident = Ident::try_new(ident).map_err(|_| InvalidIdentifier(ident.to_owned()))?;
    let mut block = Block::new(ident);
    block.decor_mut().set_prefix(prefix);
    Ok(block)
}

/// Source text of an expression without its surrounding whitespace and comments
pub fn expression_text(expression: &Expression) -> String {
    let mut expression = expression.clone();
    *expression.decor_mut() = Decor::default();
    expression.to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(source: &str) -> Body {
        hcl_edit::parser::parse_body(source).expect("body must parse")
    }

    #[test]
    fn quoted_escapes_inner_quotes() {
        insta::assert_snapshot!(quoted(r#"merge( {"a"="b"}, local.x)"#), @r#""merge( {\"a\"=\"b\"}, local.x)""#);
    }

    #[test]
    fn replaces_existing_value_in_place() {
        let mut body = body("name = \"x\"\ntags = local.foo # keep\nother = 1\n");
        set_literal(&mut body, "tags", "local.bar", "").unwrap();

        let written = body.get_attribute("tags").unwrap();
        assert_eq!(expression_text(&written.value), quoted("local.bar"));

        let keys: Vec<_> = body
            .attributes()
            .map(|attribute| attribute.key.value().as_str().to_owned())
            .collect();
        assert_eq!(keys, ["name", "tags", "other"]);
    }

    #[test]
    fn appends_missing_attribute() {
        let mut body = body("name = \"x\"\n");
        set_literal(&mut body, "tags", "local.bar", "").unwrap();

        let written = body.get_attribute("tags").expect("attribute appended");
        assert_eq!(expression_text(&written.value), "\"local.bar\"");
    }

    #[test]
    fn appending_opens_one_line_body() {
        let mut body = body("resource \"aws_s3_bucket\" \"b\" { bucket = \"b\" }\n");
        let resource = body.blocks_mut().next().unwrap();
        set_literal(&mut resource.body, "tags", "local.bar", RESOURCE_INDENT).unwrap();

        assert_eq!(
            body.to_string(),
            "resource \"aws_s3_bucket\" \"b\" {\n  bucket = \"b\"\n  tags = \"local.bar\"\n}\n"
        );
    }

    #[test]
    fn appending_to_nested_one_line_block_keeps_closing_brace_indented() {
        let mut body = body("resource \"aws_instance\" \"web\" {\n  root_block_device { volume_size = 1 }\n}\n");
        let resource = body.blocks_mut().next().unwrap();
        let device = resource.body.blocks_mut().next().unwrap();
        set_literal(&mut device.body, "tags", "local.bar", NESTED_INDENT).unwrap();

        assert_eq!(
            body.to_string(),
            "resource \"aws_instance\" \"web\" {\n  root_block_device {\n    volume_size = 1\n    tags = \"local.bar\"\n  }\n}\n"
        );
    }

    #[test]
    fn new_block_closes_at_its_own_indent() {
        let mut body = body("resource \"aws_autoscaling_group\" \"g\" { name = \"g\" }\n");
        let resource = body.blocks_mut().next().unwrap();
        let mut tag = new_block("tag", RESOURCE_INDENT).unwrap();
        set_literal(&mut tag.body, "key", "env", NESTED_INDENT).unwrap();
        push_block(&mut resource.body, tag, RESOURCE_INDENT);

        assert_eq!(
            body.to_string(),
            "resource \"aws_autoscaling_group\" \"g\" {\n  name = \"g\"\n  tag {\n    key = \"env\"\n  }\n}\n"
        );
    }

    #[test]
    fn empty_multiline_body_keeps_its_comment() {
        let mut body = body("resource \"aws_s3_bucket\" \"b\" {\n  # nothing yet\n}\n");
        let resource = body.blocks_mut().next().unwrap();
        set_literal(&mut resource.body, "tags", "local.bar", RESOURCE_INDENT).unwrap();

        assert_eq!(
            body.to_string(),
            "resource \"aws_s3_bucket\" \"b\" {\n  tags = \"local.bar\"\n  # nothing yet\n}\n"
        );
    }

    #[test]
    fn multiline_body_is_not_reformatted() {
        let source = "resource \"aws_s3_bucket\" \"b\" {\n    bucket   = \"b\" # name\n}\n";
        let mut body = body(source);
        let resource = body.blocks_mut().next().unwrap();
        set_literal(&mut resource.body, "tags", "local.bar", RESOURCE_INDENT).unwrap();

        assert_eq!(
            body.to_string(),
            "resource \"aws_s3_bucket\" \"b\" {\n    bucket   = \"b\" # name\n  tags = \"local.bar\"\n}\n"
        );
    }

    #[test]
    fn rejects_invalid_identifier() {
        let mut body = body("");
        assert_eq!(
            set_literal(&mut body, "not valid", "x", ""),
            Err(InvalidIdentifier("not valid".to_owned()))
        );
    }

    #[test]
    fn expression_text_drops_decor() {
        let body = body("tags = { a = \"b\" } # comment\n");
        let attribute = body.get_attribute("tags").unwrap();
        assert_eq!(expression_text(&attribute.value), "{ a = \"b\" }");
    }
}
