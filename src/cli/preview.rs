//! Show what content files would send, without git or network access.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::changeset::{self, ChangedFile};
use crate::dispatch::Planner;
use crate::error::Error;

use super::RunArgs;

/// Run the preview command. Prints one JSON document per file.
pub fn run(args: &RunArgs, files: &[PathBuf]) -> Result<(), Error> {
    let config = args.load_config()?;
    let site = args.site()?;
    let root = changeset::workdir(&args.repo);
    let planner = Planner::new(&root, &site, &config);

    let mut out = io::stdout().lock();
    for file in files {
        let rel = relative_path(&root, file);
        let value = match planner.plan(&ChangedFile::new(rel.clone())) {
            Ok(plan) => json!({ "plan": plan }),
            Err(reason) => json!({ "path": rel, "skipped": reason.to_string() }),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    }
    Ok(())
}

/// Repository-relative path with forward slashes. Absolute paths inside
/// the working tree are accepted too.
fn relative_path(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    let rel = rel.strip_prefix(".").unwrap_or(rel);
    rel.to_string_lossy().replace('\\', "/")
}
