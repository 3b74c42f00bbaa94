//! tag injection
//!
//! One pass over the top level blocks of a file. Every `resource` block goes through
//!
//! `Unvisited → Classified → {NotTaggable | TaggedViaAttribute | TaggedViaBlock} → NestedEvaluated → Done`
//!
//! and no block is classified twice.
use crate::quoting::{self, InvalidIdentifier, NESTED_INDENT, RESOURCE_INDENT};
use crate::repair::{self, RepairError};
use crate::schema::{NestedTaggable, SchemaOracle, TagBlockShape, TagPlacement};
use crate::tag_set::TagSet;
use crate::terraform::LanguageVersion;
use crate::tf_file::FileIdentity;
use hcl_edit::expr::Expression;
use hcl_edit::structure::{Attribute, Block, BlockLabel, Body};
use std::collections::{HashMap, HashSet};

/// Everything a run shares between files. Never changes once created.
#[derive(Debug, Clone)]
pub struct RunContext {
    tags: TagSet,
    added_literal: String,
    version: LanguageVersion,
    filter: Option<regex::Regex>,
}

impl RunContext {
    pub fn new(tags: TagSet, version: LanguageVersion) -> Self {
        let added_literal = tags.to_hcl_literal();
        Self {
            tags,
            added_literal,
            version,
            filter: None,
        }
    }

    /// Only tag resource types matching `filter`
    pub fn with_filter(mut self, filter: regex::Regex) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The tags rendered as HCL object, identical for every file
    pub fn added_literal(&self) -> &str {
        &self.added_literal
    }

    pub fn version(&self) -> LanguageVersion {
        self.version
    }

    fn selects(&self, resource_type: &str) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.is_match(resource_type))
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Repaired output text
    Tagged(String),
    /// Nothing taggable, the file stays as it is
    Untouched,
}

/// Where an injected literal was written to
///
/// `blocks` are indices into [Body::blocks] from the document root down to the body holding `attribute`.
/// Blocks are only ever appended, so indices taken while injecting stay valid for the serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    blocks: Vec<usize>,
    attribute: String,
    address: String,
}

impl Site {
    pub(crate) fn new(blocks: Vec<usize>, attribute: impl Into<String>, address: String) -> Self {
        Self {
            blocks,
            attribute: attribute.into(),
            address,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn resolve<'b>(&self, body: &'b Body) -> Option<&'b Attribute> {
        let mut body = body;
        for index in &self.blocks {
            body = &body.blocks().nth(*index)?.body;
        }

        body.get_attribute(&self.attribute)
    }
}

/// e.g. `aws_instance.web.root_block_device[0].tags`
impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

#[derive(Debug, derive_new::new)]
pub struct InjectedLiteral {
    pub site: Site,
    /// Exactly what was handed to the attribute writer
    pub text: String,
}

/// Literals waiting to be unquoted, in the order they were written
#[derive(Debug, Default)]
pub struct InjectedLiterals(Vec<InjectedLiteral>);

impl InjectedLiterals {
    fn push(&mut self, literal: InjectedLiteral) {
        self.0.push(literal);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<InjectedLiteral> for InjectedLiterals {
    fn from_iter<T: IntoIterator<Item = InjectedLiteral>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for InjectedLiterals {
    type Item = InjectedLiteral;
    type IntoIter = std::vec::IntoIter<InjectedLiteral>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Source text of tags that were present before injection
///
/// Each entry is written once and read once.
#[derive(Debug, Default)]
pub struct ExistingTagsRegistry {
    found: HashMap<String, String>,
}

impl ExistingTagsRegistry {
    fn record(&mut self, key: String, expression: String) -> Result<(), InjectError> {
        use std::collections::hash_map::Entry;

        match self.found.entry(key) {
            Entry::Occupied(entry) => Err(InjectError::ExistingTagsRecordedTwice(
                entry.key().clone(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(expression);
                Ok(())
            }
        }
    }

    fn take(&mut self, key: &str) -> Result<String, InjectError> {
        self.found
            .remove(key)
            .ok_or_else(|| InjectError::ExistingTagsMissing(key.to_owned()))
    }
}

/// Per file state, dropped once the file is done
#[derive(Debug)]
struct TaggingContext<'f> {
    file: &'f FileIdentity,
    local_name: String,
    existing: ExistingTagsRegistry,
    literals: InjectedLiterals,
    visited: HashSet<Site>,
}

impl<'f> TaggingContext<'f> {
    fn new(file: &'f FileIdentity) -> Self {
        Self {
            file,
            local_name: file.local_name(),
            existing: Default::default(),
            literals: Default::default(),
            visited: Default::default(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(resource = %address))]
    fn tag_resource(
        &mut self,
        index: usize,
        block: &mut Block,
        resource_type: &str,
        address: &str,
        context: &RunContext,
        oracle: &dyn SchemaOracle,
    ) -> Result<bool, InjectError> {
        let mut tagged = false;

        let placement = oracle.classify(resource_type);
        match &placement {
            TagPlacement::Attribute(attribute) => {
                let site = Site::new(vec![index], attribute, format!("{address}.{attribute}"));
                tagged |= self.inject_expression(&mut block.body, site, context, RESOURCE_INDENT)?;
            }
            TagPlacement::Block(shape) => {
                tagged |= append_tag_blocks(&mut block.body, shape, context.tags())? > 0;
            }
            TagPlacement::NotTaggable => {}
        }

        for NestedTaggable {
            block: nested,
            attribute,
        } in oracle.nested_taggable(resource_type)
        {
            let instances = block
                .body
                .blocks_mut()
                .enumerate()
                .filter(|(_, child)| child.ident.value().as_str() == nested);

            for (instance, (child_index, child)) in instances.enumerate() {
                let site = Site::new(
                    vec![index, child_index],
                    &attribute,
                    format!("{address}.{nested}[{instance}].{attribute}"),
                );
                tagged |= self.inject_expression(&mut child.body, site, context, NESTED_INDENT)?;
            }
        }

        if tagged {
            tracing::debug!(?placement, "resource tagged");
        } else {
            tracing::debug!("resource not taggable, skipping");
        }

        Ok(tagged)
    }

    /// Writes `merge( <existing>, local.<name>)` or `local.<name>` to the site's attribute
    fn inject_expression(
        &mut self,
        body: &mut Body,
        site: Site,
        context: &RunContext,
        indent: &str,
    ) -> Result<bool, InjectError> {
        if !self.visited.insert(site.clone()) {
            return Err(InjectError::SiteVisitedTwice(site.to_string()));
        }

        let attribute = site.attribute().to_owned();
        if body
            .blocks()
            .any(|block| block.ident.value().as_str() == attribute)
        {
            tracing::warn!(%site, "tags are written as block, leaving them untouched");
            return Ok(false);
        }

        let added = format!("local.{}", self.local_name);
        let value = match body.get_attribute(&attribute) {
            Some(existing) => {
                let key = self.file.found_key(&site);
                self.existing
                    .record(key.clone(), quoting::expression_text(&existing.value))?;
                let found = self.existing.take(&key)?;
                format!("merge( {found}, {added})")
            }
            None => added,
        };
        let value = context.version().wrap_expression(value);

        quoting::set_literal(body, &attribute, &value, indent)?;
        tracing::trace!(%site, %value, "expression written");

        self.literals.push(InjectedLiteral::new(site, value));
        Ok(true)
    }

    /// Binds the added literal to the file's local name, recorded as last literal
    fn append_locals(&mut self, body: &mut Body, context: &RunContext) -> Result<(), InjectError> {
        let index = body.blocks().count();

        let mut locals = quoting::new_block("locals", "\n")?;
        quoting::set_literal(
            &mut locals.body,
            &self.local_name,
            context.added_literal(),
            RESOURCE_INDENT,
        )?;
        quoting::push_block(body, locals, "");

        let site = Site::new(
            vec![index],
            &self.local_name,
            format!("locals.{}", self.local_name),
        );
        self.literals.push(InjectedLiteral::new(
            site,
            context.added_literal().to_owned(),
        ));
        Ok(())
    }
}

/// One block per tag, returns how many were appended
fn append_tag_blocks(
    body: &mut Body,
    shape: &TagBlockShape,
    tags: &TagSet,
) -> Result<usize, InvalidIdentifier> {
    for (key, value) in tags.iter() {
        let mut block = quoting::new_block(&shape.name, RESOURCE_INDENT)?;
        quoting::set_attribute(&mut block.body, "key", Expression::from(key), NESTED_INDENT)?;
        quoting::set_attribute(&mut block.body, "value", Expression::from(value), NESTED_INDENT)?;
        if shape.propagate_at_launch {
            quoting::set_attribute(
                &mut block.body,
                "propagate_at_launch",
                Expression::from(true),
                NESTED_INDENT,
            )?;
        }

        quoting::push_block(body, block, RESOURCE_INDENT);
    }

    Ok(tags.len())
}

/// `aws_instance.web`
fn resource_address(block: &Block) -> String {
    block
        .labels
        .iter()
        .map(BlockLabel::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// Injects the run's tags into every taggable resource of a document
///
/// Returns [Outcome::Untouched] when nothing in the document takes tags. Otherwise a `locals` block is appended,
/// the document is serialized and every written expression unquoted again (see [repair::repair]).
#[tracing::instrument(level = "debug", skip_all, fields(file = %file))]
pub fn inject_tags(
    body: &mut Body,
    file: &FileIdentity,
    context: &RunContext,
    oracle: &dyn SchemaOracle,
) -> Result<Outcome, InjectError> {
    let mut tagging = TaggingContext::new(file);
    let mut any_tagged = false;

    for (index, block) in body.blocks_mut().enumerate() {
        if block.ident.value().as_str() != "resource" {
            continue;
        }

        let address = resource_address(block);
        let Some(resource_type) = block.labels.first().map(|label| label.as_str().to_owned())
        else {
            tracing::warn!(block = index, "resource block without labels, skipping");
            continue;
        };

        if !context.selects(&resource_type) {
            tracing::debug!(resource=%address, "resource type filtered out");
            continue;
        }

        any_tagged |=
            tagging.tag_resource(index, block, &resource_type, &address, context, oracle)?;
    }

    if !any_tagged {
        return Ok(Outcome::Untouched);
    }

    tagging.append_locals(body, context)?;

    let text = body.to_string();
    let text = repair::repair(text, tagging.literals)?;

    Ok(Outcome::Tagged(text))
}

#[derive(thiserror::Error, Debug)]
pub enum InjectError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
    #[error("{0} visited twice")]
    SiteVisitedTwice(String),
    #[error("existing tags recorded twice under {0}")]
    ExistingTagsRecordedTwice(String),
    #[error("existing tags under {0} were never recorded")]
    ExistingTagsMissing(String),
    #[error("unable to unquote injected expressions")]
    Repair(#[from] RepairError),
}
