//! # terratag - tag every taggable terraform resource
//!
//! ## Introduction for developers
//!
//! Read this to understand how `terratag` works internally.
//!
//! ### Input
//!
//! A run gets
//! - a flat JSON object of tags (`{"env":"prod","team":"x"}`), decoded into a [tag_set::TagSet]
//! - a directory that `terraform init` was run in
//! - the terraform language version, which only matters for the `0.11` dialect
//! - a provider schema (see [schema::ProviderSchema]) telling us which resource types take tags and how
//!
//! The tag set is rendered once per run into a HCL object literal, the *added literal*:
//!
//! ```hcl
//! {"env"="prod","team"="x"}
//! ```
//!
//! ### Tagging a file
//!
//! see [inject::inject_tags]
//!
//! Every `resource` block is classified through the [schema::SchemaOracle]:
//!
//! | **placement**           | **what we write**                                                 |
//! |-------------------------|-------------------------------------------------------------------|
//! | `tags` attribute        | `tags = merge( <existing>, local.terratag_added_main)`            |
//! | no existing `tags`      | `tags = local.terratag_added_main`                                |
//! | repeatable `tag` block  | one `tag { key = .. value = .. }` block per tag                   |
//! | nested taggable blocks  | same as the attribute case, inside each nested block              |
//!
//! If anything was tagged a `locals` block is appended that binds the added literal to the file's local name:
//!
//! ```hcl
//! locals {
//!   terratag_added_main = {"env"="prod","team"="x"}
//! }
//! ```
//!
//! ### Writing expressions
//!
//! [hcl_edit] attribute values are written from text as string literals (see [quoting]). So right after serializing,
//! the document reads `tags = "merge( local.foo, local.terratag_added_main)"`.
//!
//! Each written literal is recorded together with its site (the path of block indices leading to the attribute).
//! [repair::repair] re-parses the serialized text, resolves every site and replaces exactly the quoted value found
//! there with the bare expression. Text elsewhere in the file is never touched, even if it happens to be identical.
//!
//! ### Output
//!
//! A tagged `main.tf` is written atomically to `main.terratag.tf` next to it (see [run::run]). Files without
//! anything taggable are left alone and produce no output.
//!
pub mod inject;
pub mod quoting;
pub mod repair;
pub mod run;
pub mod schema;
pub mod tag_set;
pub mod terraform;
pub mod tf_file;
