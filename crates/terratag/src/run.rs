//! tag a whole directory, one file after another
use crate::inject::{inject_tags, InjectError, Outcome, RunContext};
use crate::schema::SchemaOracle;
use crate::terraform;
use crate::tf_file::{LoadError, TerraformFile};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dir: PathBuf,
    /// Skip `*.terratag.tf` files
    pub skip_terratag_files: bool,
    /// Move each tagged original to `*.tf.bak`
    pub rename_originals: bool,
}

impl RunOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            skip_terratag_files: false,
            rename_originals: false,
        }
    }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct RunSummary {
    pub tagged: Vec<TaggedFile>,
    /// Nothing taggable in there
    pub untouched: Vec<PathBuf>,
    /// Excluded terratag files
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, serde::Serialize, derive_new::new)]
pub struct TaggedFile {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Tags every terraform file below `options.dir`
///
/// Any error ends the run. Files tagged up to that point keep their output.
pub fn run(
    options: &RunOptions,
    context: &RunContext,
    oracle: &dyn SchemaOracle,
) -> Result<RunSummary, RunError> {
    if !terraform::is_init_run(&options.dir) {
        return Err(RunError::NotInitialized(options.dir.clone()));
    }

    let mut summary = RunSummary::default();

    for path in terraform::discover_files(&options.dir)? {
        if options.skip_terratag_files && terraform::is_terratag_file(&path) {
            tracing::info!(path=%path.display(), "skipping file, it's already tagged");
            summary.skipped.push(path);
            continue;
        }

        match tag_file(&path, options, context, oracle)? {
            Some(output) => summary.tagged.push(TaggedFile::new(path, output)),
            None => summary.untouched.push(path),
        }
    }

    tracing::info!(
        tagged = summary.tagged.len(),
        untouched = summary.untouched.len(),
        skipped = summary.skipped.len(),
        "done"
    );

    Ok(summary)
}

/// Returns the path of the written file, if any
fn tag_file(
    path: &Path,
    options: &RunOptions,
    context: &RunContext,
    oracle: &dyn SchemaOracle,
) -> Result<Option<PathBuf>, RunError> {
    tracing::info!(path=%path.display(), "processing file");

    let mut file = TerraformFile::load(path)?;
    let identity = file.identity();

    let outcome = inject_tags(file.body_mut(), &identity, context, oracle).map_err(|source| {
        RunError::Inject {
            path: path.to_owned(),
            source,
        }
    })?;

    let Outcome::Tagged(text) = outcome else {
        tracing::info!(path=%path.display(), "no taggable resources found, skipping");
        return Ok(None);
    };

    let output = terraform::tagged_path(path);
    terraform::write_atomically(&output, &text).map_err(|source| RunError::Write {
        path: output.clone(),
        source,
    })?;
    tracing::info!(path=%output.display(), "written");

    if options.rename_originals {
        let backup = terraform::backup_path(path);
        std::fs::rename(path, &backup).map_err(|source| RunError::Rename {
            path: path.to_owned(),
            source,
        })?;
        tracing::info!(path=%backup.display(), "original moved");
    }

    Ok(Some(output))
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("{} is not initialized, run `terraform init` first", .0.display())]
    NotInitialized(PathBuf),
    #[error("unable to list terraform files")]
    Discover(#[from] walkdir::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to tag {}", path.display())]
    Inject {
        path: PathBuf,
        #[source]
        source: InjectError,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to move {} out of the way", path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
