//! One-shot tagging handlers: `apply` for the git hook and `preview`

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::cli::commands::{ApplyArgs, PreviewArgs};
use crate::core::config::Settings;
use crate::core::git::GitRepository;
use crate::core::message::{compute_message, MessageFile};
use crate::error::Result;

/// Message sources whose text git generated and which must stay as they are
const UNTOUCHED_SOURCES: &[&str] = &["merge", "squash", "commit"];

/// Whether git opens the editor after the hook, and so strips `#` lines
fn opens_editor(source: Option<&str>) -> bool {
    matches!(source, None | Some("template"))
}

/// Tag the subject line of a commit message file for the current branch
pub fn handle_apply(args: ApplyArgs, settings_path: &Path) -> Result<()> {
    if let Some(source) = args.source.as_deref() {
        if UNTOUCHED_SOURCES.contains(&source) {
            debug!(source, "Leaving generated message alone");
            return Ok(());
        }
    }

    let settings = Settings::load_from(settings_path)?;
    let config = settings.resolve()?;

    let repo = GitRepository::open_current_dir(&settings.message_file)?;
    let Some(branch) = repo.current_branch()? else {
        debug!("Detached HEAD, nothing to tag");
        return Ok(());
    };

    let contents = fs::read_to_string(&args.file)?;
    let file = if opens_editor(args.source.as_deref()) {
        MessageFile::parse_for_editor(&contents)
    } else {
        MessageFile::parse(&contents)
    };
    let updated = compute_message(&branch, &file.subject, &config);

    if updated != file.subject {
        fs::write(&args.file, file.with_subject(&updated).render())?;
        debug!(branch = %branch, message = %updated, "Tagged commit message");
    }

    Ok(())
}

/// Print the message that would be written for a branch
pub fn handle_preview(args: PreviewArgs, settings_path: &Path) -> Result<()> {
    let settings = Settings::load_from(settings_path)?;
    let config = settings.resolve()?;

    println!("{}", compute_message(&args.branch, &args.message, &config));
    Ok(())
}
