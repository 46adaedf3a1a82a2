use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::compiler_fence;
use std::sync::atomic::Ordering;

/// Byte written over every username and password before their memory is
/// released. ASCII, so an erased `String` is still valid UTF-8.
pub const SENTINEL: u8 = b'*';

/// The username -> password mapping of one password file.
///
/// A store is only ever handed out fully built (see `load_password_file`), and
/// exposes nothing but `&self` lookups afterwards, so it can be shared freely
/// between requests. Passwords are kept in plaintext; on drop, every byte of
/// every entry is overwritten with `SENTINEL`.
///
/// Erasure is best-effort: it covers the buffers owned by the store, not
/// copies made elsewhere (the allocator, the OS, swap).
pub struct RealmCredentialStore {
    entries: HashMap<String, String>,
}

impl RealmCredentialStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns `false` (and stores nothing) if `username` is already present;
    /// the first entry always wins.
    pub(crate) fn insert_unique(
        &mut self,
        username: &str,
        password: &str,
    ) -> bool {
        // checked before allocating, so a discarded duplicate never leaves an
        // unerased copy behind
        if self.entries.contains_key(username) {
            return false;
        }
        self.entries
            .insert(username.to_owned(), password.to_owned());
        true
    }

    /// Exact, case-sensitive lookup
    pub fn lookup(
        &self,
        username: &str,
    ) -> Option<&str> {
        self.entries.get(username).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// never print credentials, not even in debug output
impl Debug for RealmCredentialStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RealmCredentialStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Drop for RealmCredentialStore {
    fn drop(&mut self) {
        for (mut username, mut password) in self.entries.drain() {
            erase(&mut username);
            erase(&mut password);
        }
    }
}

/// Overwrite every byte of `s` with `SENTINEL`, using volatile writes so the
/// stores cannot be elided even though `s` is about to be freed.
pub(crate) fn erase(s: &mut String) {
    // SAFETY: `SENTINEL` is ASCII, so the buffer remains valid UTF-8
    let bytes = unsafe { s.as_mut_vec() };
    for byte in bytes.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference
        unsafe { std::ptr::write_volatile(byte, SENTINEL) };
    }
    compiler_fence(Ordering::SeqCst);
}
