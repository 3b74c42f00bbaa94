//! which resources take tags, and how
//!
//! The authoritative source is the provider schema terraform prints with `terraform providers schema -json`:
//!
//! ```json
//! {
//!   "provider_schemas": {
//!     "registry.terraform.io/hashicorp/aws": {
//!       "resource_schemas": {
//!         "aws_instance": {
//!           "block": {
//!             "attributes": { "tags": { "type": ["map", "string"], "optional": true } },
//!             "block_types": {
//!               "root_block_device": {
//!                 "nesting_mode": "list",
//!                 "block": { "attributes": { "tags": { "type": ["map", "string"], "optional": true } } }
//!               }
//!             }
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the repeatable block used by resources without a tags attribute
const TAG_BLOCK: &str = "tag";

/// How a resource type is tagged at its top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPlacement {
    NotTaggable,
    /// A single map attribute, named
    Attribute(String),
    /// One block per tag
    Block(TagBlockShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlockShape {
    pub name: String,
    /// Block also takes `propagate_at_launch` (autoscaling groups)
    pub propagate_at_launch: bool,
}

/// A nested block that carries its own tags attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedTaggable {
    pub block: String,
    pub attribute: String,
}

/// Classifies resource types
///
/// Unknown resource types are not taggable.
pub trait SchemaOracle {
    fn classify(&self, resource_type: &str) -> TagPlacement;
    fn nested_taggable(&self, resource_type: &str) -> Vec<NestedTaggable>;
}

/// Google resources call their tags `labels`
pub fn tag_attribute_for(resource_type: &str) -> &'static str {
    if resource_type.starts_with("google_") {
        "labels"
    } else {
        "tags"
    }
}

/// Parsed output of `terraform providers schema -json`
#[derive(Debug, Default, serde::Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    provider_schemas: IndexMap<String, ProviderResources>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProviderResources {
    #[serde(default)]
    resource_schemas: IndexMap<String, ResourceSchema>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ResourceSchema {
    #[serde(default)]
    block: BlockSchema,
}

#[derive(Debug, Default, serde::Deserialize)]
struct BlockSchema {
    #[serde(default)]
    attributes: IndexMap<String, AttributeSchema>,
    #[serde(default)]
    block_types: IndexMap<String, NestedBlockSchema>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct AttributeSchema {
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Default, serde::Deserialize)]
struct NestedBlockSchema {
    #[serde(default)]
    block: BlockSchema,
}

impl BlockSchema {
    /// computed-only attributes (`tags_all`) can't be written
    fn is_settable(&self, attribute: &str) -> bool {
        self.attributes
            .get(attribute)
            .is_some_and(|schema| schema.optional || schema.required)
    }

    fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }
}

impl ProviderSchema {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        tracing::info!(path=%path.display(), "loading provider schema");
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::from_json_str(&json)
    }

    /// Runs `terraform providers schema -json` in `dir`
    pub fn from_terraform(dir: &Path) -> Result<Self, SchemaError> {
        tracing::info!(directory=%dir.display(), "reading provider schema from terraform");
        let output = Command::new("terraform")
            .args(["providers", "schema", "-json"])
            .current_dir(dir)
            .output()
            .map_err(|source| SchemaError::Io {
                path: dir.to_owned(),
                source,
            })?;

        if !output.status.success() {
            return Err(SchemaError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// First provider defining `resource_type` wins
    fn resource(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.provider_schemas
            .values()
            .find_map(|provider| provider.resource_schemas.get(resource_type))
    }

    pub fn resource_count(&self) -> usize {
        self.provider_schemas
            .values()
            .map(|provider| provider.resource_schemas.len())
            .sum()
    }
}

impl SchemaOracle for ProviderSchema {
    fn classify(&self, resource_type: &str) -> TagPlacement {
        let Some(resource) = self.resource(resource_type) else {
            tracing::debug!(resource_type, "unknown resource type");
            return TagPlacement::NotTaggable;
        };

        let tag_attribute = tag_attribute_for(resource_type);
        if resource.block.is_settable(tag_attribute) {
            return TagPlacement::Attribute(tag_attribute.to_owned());
        }

        if let Some(tag_block) = resource.block.block_types.get(TAG_BLOCK) {
            let block = &tag_block.block;
            if block.has_attribute("key") && block.has_attribute("value") {
                return TagPlacement::Block(TagBlockShape {
                    name: TAG_BLOCK.to_owned(),
                    propagate_at_launch: block.has_attribute("propagate_at_launch"),
                });
            }
        }

        TagPlacement::NotTaggable
    }

    fn nested_taggable(&self, resource_type: &str) -> Vec<NestedTaggable> {
        let Some(resource) = self.resource(resource_type) else {
            return vec![];
        };

        let tag_attribute = tag_attribute_for(resource_type);
        resource
            .block
            .block_types
            .iter()
            .filter(|(name, nested)| *name != TAG_BLOCK && nested.block.is_settable(tag_attribute))
            .map(|(name, _)| NestedTaggable {
                block: name.clone(),
                attribute: tag_attribute.to_owned(),
            })
            .collect()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("unable to read provider schema from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid provider schema")]
    Json(#[from] serde_json::Error),
    #[error("`terraform providers schema -json` failed: {0}")]
    Command(String),
}
