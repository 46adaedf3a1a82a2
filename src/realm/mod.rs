mod loader;
mod name;
mod password_file;
mod store;
// allow external `use` statements to skip `loader` etc
pub use loader::load_password_file;
pub use name::RealmName;
pub use password_file::ConfigLine;
pub use password_file::Lines;
pub use password_file::PasswordFile;
pub use password_file::PasswordFileError;
pub use password_file::LINE_BUFFER_CAPACITY;
pub use store::RealmCredentialStore;
pub use store::SENTINEL;

/// Password file in the system temp dir, removed on drop
#[cfg(test)]
pub(crate) struct TempFile(std::path::PathBuf);

#[cfg(test)]
impl TempFile {
    pub(crate) fn with_contents(contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("realm-auth-{}.passwd", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write temp password file");
        Self(path)
    }

    pub(crate) fn path(&self) -> &std::path::Path { &self.0 }

    pub(crate) fn overwrite(
        &self,
        contents: &str,
    ) {
        std::fs::write(&self.0, contents).expect("overwrite temp password file");
    }
}

#[cfg(test)]
impl Drop for TempFile {
    fn drop(&mut self) { let _ = std::fs::remove_file(&self.0); }
}
