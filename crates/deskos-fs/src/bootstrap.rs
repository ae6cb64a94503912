//! First-run seeding of the default filesystem tree.
//!
//! The desktop expects a welcome note to exist so the editor has something
//! to open. Seeding is idempotent: existing user edits are never clobbered.

use tracing::info;

use crate::error::FsResult;
use crate::fs::Filesystem;
use crate::types::MkdirOptions;

/// Path of the seeded welcome note.
pub const WELCOME_NOTE_PATH: &str = "/notes/welcome.txt";

const WELCOME_NOTE_CONTENT: &str = "\
Welcome to deskos!

This note lives in a persistent filesystem. Try the terminal:

  mkdir -p /projects/ideas
  cd /projects
  ls

Everything you create here survives a restart.
";

/// Ensure the default tree exists, creating it on first run only.
pub async fn ensure_default_filesystem(fs: &Filesystem) -> FsResult<()> {
    if fs.exists(WELCOME_NOTE_PATH).await? {
        return Ok(());
    }

    let dir = deskos_paths::dirname(WELCOME_NOTE_PATH);
    if !fs.is_directory(&dir).await? {
        fs.mkdir(&dir, MkdirOptions::recursive()).await?;
    }
    fs.write_file(WELCOME_NOTE_PATH, WELCOME_NOTE_CONTENT, "text/plain")
        .await?;
    info!("bootstrap: seeded {}", WELCOME_NOTE_PATH);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn test_seeds_once() {
        let store = Store::in_memory().await.unwrap();
        let fs = Filesystem::new(store);

        ensure_default_filesystem(&fs).await.unwrap();
        let file = fs.read_file(WELCOME_NOTE_PATH).await.unwrap();
        assert_eq!(file.media_type, "text/plain");
        assert!(file.data.starts_with(b"Welcome"));

        // user edit survives a re-run
        fs.write_file(WELCOME_NOTE_PATH, "mine now", "text/plain")
            .await
            .unwrap();
        ensure_default_filesystem(&fs).await.unwrap();
        let file = fs.read_file(WELCOME_NOTE_PATH).await.unwrap();
        assert_eq!(file.data, b"mine now");
    }
}
