use std::path::Path;

use super::password_file::ConfigLine;
use super::password_file::PasswordFile;
use super::password_file::PasswordFileError;
use super::store::RealmCredentialStore;

/// Build a `RealmCredentialStore` from a file of `username = password` lines.
///
/// Loading is all-or-nothing: an unreadable file, a line the reader rejects,
/// or a line that is not `username = password` (e.g. a section) aborts the
/// whole load, and whatever was parsed so far is dropped (and erased). A
/// repeated username is the only recoverable problem; the later entry is
/// ignored with a warning.
///
/// An empty file is valid, and yields a store that denies everyone.
#[tracing::instrument(name = "Loading password file", skip_all, fields(path = %path.display()))]
pub fn load_password_file(path: &Path) -> Result<RealmCredentialStore, PasswordFileError> {
    let loaded = read_entries(path);
    match &loaded {
        Ok(store) => tracing::info!(entries = store.len(), "Loaded password file"),
        Err(e) => tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            line = e.line(),
            "Could not load password file"
        ),
    }
    loaded
}

fn read_entries(path: &Path) -> Result<RealmCredentialStore, PasswordFileError> {
    let file = PasswordFile::open(path)?;
    let mut store = RealmCredentialStore::new();

    let mut lines = file.lines();
    while let Some(line) = lines.next() {
        match line? {
            ConfigLine::Line { key, value } => {
                if !store.insert_unique(key, value) {
                    // the username is logged, the password never is
                    tracing::warn!(
                        username = key,
                        line = lines.line(),
                        "Username entry already exists, ignoring"
                    );
                }
            }
            ConfigLine::Section { .. } | ConfigLine::SectionEnd => {
                return Err(lines.error("Expected username = password"));
            }
        }
    }

    tracing::debug!(path = %file.path().display(), "Password file fully read");
    Ok(store)
}
