//! a terraform file ([Body] and path to source file)
//!
//! The path is kept so errors can point at the file and so every file gets its own [FileIdentity].
use hcl_edit::structure::Body;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct TerraformFile {
    path: PathBuf,
    body: Body,
}

impl TerraformFile {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        tracing::debug!(path=%path.display(), "loading file");

        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(path, &source)
    }

    pub fn parse(path: impl Into<PathBuf>, source: &str) -> Result<Self, LoadError> {
        let path = path.into();
        match hcl_edit::parser::parse_body(source) {
            Ok(body) => Ok(Self { path, body }),
            Err(source) => Err(LoadError::HclParseFailed { path, source }),
        }
    }

    pub fn identity(&self) -> FileIdentity {
        FileIdentity::from_path(&self.path)
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("unable to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse hcl file {}", path.display())]
    HclParseFailed {
        path: PathBuf,
        #[source]
        source: hcl_edit::parser::Error,
    },
}

/// Names derived from a file's name
///
/// Files of one terraform module share a directory, so their stems differ. The stem is encoded one-to-one into
/// identifier characters, which keeps their locals apart as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    stem: String,
}

impl FileIdentity {
    pub fn from_path(path: &Path) -> Self {
        Self::new(&crate::terraform::file_stem(path))
    }

    /// Letters, digits and `_` are kept, `-` is doubled and anything else is written as `-<hex>-`
    ///
    /// ```
    /// # use terratag::tf_file::FileIdentity;
    /// assert_eq!(FileIdentity::new("a.b").local_name(), "terratag_added_a-2e-b");
    /// assert_eq!(FileIdentity::new("a_b").local_name(), "terratag_added_a_b");
    /// ```
    pub fn new(stem: &str) -> Self {
        let mut encoded = String::with_capacity(stem.len());
        for c in stem.chars() {
            match c {
                c if c.is_ascii_alphanumeric() || c == '_' => encoded.push(c),
                '-' => encoded.push_str("--"),
                c => encoded.push_str(&format!("-{:x}-", u32::from(c))),
            }
        }

        Self { stem: encoded }
    }

    /// Name of the local holding the added tags
    pub fn local_name(&self) -> String {
        format!("terratag_added_{}", self.stem)
    }

    /// Key under which existing tags of an attribute are kept
    pub fn found_key(&self, site: impl std::fmt::Display) -> String {
        format!("terratag_found_{}__{site}", self.stem)
    }
}

impl std::fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stem)
    }
}

/// Utility macro to create a [TerraformFile]
///
/// ```
/// # use terratag::terraform_file;
/// let file = terraform_file!("main.tf" => r#"resource "aws_s3_bucket" "logs" {}"#);
/// assert_eq!(file.identity().local_name(), "terratag_added_main");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use terratag::terraform_file;
/// terraform_file!("main.tf" => "not = valid = hcl");
/// ```
#[macro_export]
macro_rules! terraform_file {
    { $path:expr => $source:expr } => {
        $crate::tf_file::TerraformFile::parse($path, $source).expect("file must parse")
    };
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn local_names() {
        for (path, local) in [
            ("main.tf", "terratag_added_main"),
            ("infra/my-vpc.tf", "terratag_added_my--vpc"),
            ("a.b.tf", "terratag_added_a-2e-b"),
            ("a_b.tf", "terratag_added_a_b"),
            ("main.terratag.tf", "terratag_added_main-2e-terratag"),
            ("ü.tf", "terratag_added_-fc-"),
        ] {
            assert_eq!(FileIdentity::from_path(Path::new(path)).local_name(), local);
        }
    }

    #[test]
    fn look_alike_stems_get_distinct_names() {
        let stems = ["a.b", "a_b", "a-b", "a-2e-b", "a--b", "ü", "ö", "_fc_", "-fc-"];
        let names: std::collections::HashSet<_> = stems
            .iter()
            .map(|stem| FileIdentity::new(stem).local_name())
            .collect();
        assert_eq!(names.len(), stems.len());
    }

    #[test]
    fn local_name_is_an_identifier() {
        for stem in ["a.b", "my-vpc", "ü", "x y"] {
            let local = FileIdentity::new(stem).local_name();
            assert!(hcl_edit::Ident::try_new(local.as_str()).is_ok(), "{local}");
        }
    }

    #[test]
    fn parse_error_names_the_file() {
        let error = TerraformFile::parse("broken.tf", "resource {").unwrap_err();
        assert!(error.to_string().contains("broken.tf"));
    }

    #[test]
    fn load_missing_file() {
        let error = TerraformFile::load(Path::new("does/not/exist.tf")).unwrap_err();
        assert!(matches!(error, LoadError::Io { .. }));
    }
}
