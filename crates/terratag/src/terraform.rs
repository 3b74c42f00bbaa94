//! everything terratag needs to know about the terraform working directory
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Marker inserted in front of the `.tf` extension of generated files
pub const TERRATAG_SUFFIX: &str = "terratag";

const TF_EXTENSION: &str = "tf";

/// Syntax dialect of the configuration language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageVersion {
    /// terraform 0.11 and earlier: expressions have to be interpolated (`"${...}"`)
    Legacy,
    /// terraform 0.12 and later
    Modern,
}

impl LanguageVersion {
    /// Turns a computed expression into the form this dialect accepts as attribute value
    pub fn wrap_expression(self, expression: String) -> String {
        match self {
            LanguageVersion::Legacy => format!("\"${{{expression}}}\""),
            LanguageVersion::Modern => expression,
        }
    }
}

impl FromStr for LanguageVersion {
    type Err = VersionError;

    /// Accepts terraform releases (`0.11.14`, `v1.5.7`) as well as bare dialect numbers (`11`, `12`)
    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let unrecognized = || VersionError::Unrecognized(version.to_owned());

        let trimmed = version.trim().trim_start_matches('v');
        let mut parts = trimmed.split('.');
        let major: u32 = parts
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(unrecognized)?;

        let dialect = match parts.next() {
            None => major,
            Some(minor) if major == 0 => minor.parse().map_err(|_| unrecognized())?,
            Some(_) => return Ok(LanguageVersion::Modern),
        };

        if dialect <= 11 {
            Ok(LanguageVersion::Legacy)
        } else {
            Ok(LanguageVersion::Modern)
        }
    }
}

impl std::fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageVersion::Legacy => f.write_str("0.11"),
            LanguageVersion::Modern => f.write_str("0.12+"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    #[error("unrecognized terraform version `{0}`")]
    Unrecognized(String),
    #[error("no terraform version found in `terraform version` output")]
    MissingVersion,
    #[error("failed to run `terraform version`")]
    Io(#[from] std::io::Error),
    #[error("`terraform version` failed: {0}")]
    Command(String),
}

/// Finds the language version in the output of `terraform version`
pub fn parse_version_output(output: &str) -> Result<LanguageVersion, VersionError> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Terraform v"))
        .ok_or(VersionError::MissingVersion)
        .and_then(|version| {
            let release = version.split_whitespace().next().unwrap_or_default();
            release.parse()
        })
}

/// Runs `terraform version` in `dir`
pub fn detect_version(dir: &Path) -> Result<LanguageVersion, VersionError> {
    let output = Command::new("terraform")
        .arg("version")
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(VersionError::Command(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }

    let version = parse_version_output(&String::from_utf8_lossy(&output.stdout))?;
    tracing::info!(%version, "detected terraform version");
    Ok(version)
}

/// `terraform init` leaves a `.terraform` directory behind
pub fn is_init_run(dir: &Path) -> bool {
    dir.join(".terraform").is_dir()
}

/// All `*.tf` files below `dir`, sorted
///
/// `.terraform` directories (downloaded modules and providers) are not entered.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = vec![];

    let walker = walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".terraform");

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_tf_file = entry
            .path()
            .extension()
            .is_some_and(|extension| extension == TF_EXTENSION);
        if is_tf_file {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Was this file written by terratag?
pub fn is_terratag_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| {
            name.to_string_lossy()
                .ends_with(&format!(".{TERRATAG_SUFFIX}.{TF_EXTENSION}"))
        })
}

/// `main.tf` becomes `main.terratag.tf`
pub fn tagged_path(path: &Path) -> PathBuf {
    let stem = file_stem(path);
    path.with_file_name(format!("{stem}.{TERRATAG_SUFFIX}.{TF_EXTENSION}"))
}

/// `main.tf` becomes `main.tf.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// File name without the `.tf` extension
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.strip_suffix(&format!(".{TF_EXTENSION}")) {
        Some(stem) => stem.to_owned(),
        None => name,
    }
}

/// Writes `contents` to a temporary file next to `path` and renames it into place
pub fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let temp_name = format!(
        ".{}.{TERRATAG_SUFFIX}-tmp-{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let written = std::fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    });

    if let Err(err) = written.and_then(|_| std::fs::rename(&temp_path, path)) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err);
    }

    Ok(())
}
