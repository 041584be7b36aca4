//! Scripted stand-ins for the daemon CLI, for tests in this and other crates.
//!
//! The scripts are run through `sh` rather than executed directly, so a
//! freshly written script is never exec'd while another test thread still
//! holds it open for writing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::IpfsClient;

const ONLINE_SCRIPT: &str = r#"#!/bin/sh
STORE='__STORE__'
mkdir -p "$STORE"
case "$1" in
  id)
    echo '{"ID": "12D3KooWArchivistTestPeer"}'
    ;;
  add)
    tmp="$STORE/incoming.$$"
    cat > "$tmp" || exit 1
    sum=$(cksum < "$tmp" | awk '{ print $1 "x" $2 }')
    cid="bafk$sum"
    mv "$tmp" "$STORE/$cid"
    echo "$cid"
    ;;
  cat)
    __CAT_PRELUDE__
    if [ ! -f "$STORE/$2" ]; then
      echo "Error: block was not found locally (offline): $2" >&2
      exit 1
    fi
    cat "$STORE/$2"
    ;;
  pin)
    if [ "$2" != "add" ] || [ ! -f "$STORE/$3" ]; then
      echo "Error: pin: $3 not found" >&2
      exit 1
    fi
    echo "pinned $3 recursively"
    ;;
  *)
    echo "Error: unknown command '$1'" >&2
    exit 1
    ;;
esac
"#;

const OFFLINE_SCRIPT: &str = r#"#!/bin/sh
echo "Error: cannot connect to the api. Is the daemon running?" >&2
exit 1
"#;

const HANGING_SCRIPT: &str = r#"#!/bin/sh
exec sleep 30
"#;

/// A fake daemon rooted in a scratch directory.
pub struct FakeDaemon {
    pub client: IpfsClient,
    pub store: PathBuf,
}

impl FakeDaemon {
    /// Implements `add`/`cat`/`pin add`/`id` over files in `dir/blocks`.
    pub fn online(dir: &Path) -> Self {
        Self::serving(dir, ":")
    }

    /// Like `online`, but `cat` writes far more than a pipe buffer of
    /// warnings to stderr before the content.
    pub fn noisy(dir: &Path) -> Self {
        Self::serving(dir, r#"head -c 262144 /dev/zero | tr '\0' 'w' >&2"#)
    }

    /// Fails every command the way an unreachable daemon does.
    pub fn offline(dir: &Path) -> Self {
        Self::install(dir, dir.join("blocks"), OFFLINE_SCRIPT)
    }

    /// Never answers.
    pub fn hanging(dir: &Path) -> Self {
        Self::install(dir, dir.join("blocks"), HANGING_SCRIPT)
    }

    /// Number of stored (completed) adds.
    pub fn block_count(&self) -> usize {
        fs::read_dir(&self.store)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with("bafk"))
                    .count()
            })
            .unwrap_or(0)
    }

    fn serving(dir: &Path, cat_prelude: &str) -> Self {
        let store = dir.join("blocks");
        let script = ONLINE_SCRIPT
            .replace("__STORE__", &store.display().to_string())
            .replace("__CAT_PRELUDE__", cat_prelude);
        Self::install(dir, store, &script)
    }

    fn install(dir: &Path, store: PathBuf, script: &str) -> Self {
        fs::create_dir_all(dir).expect("create fake daemon dir");
        let path = dir.join("fake-ipfs.sh");
        fs::write(&path, script).expect("write fake daemon script");

        let client = IpfsClient::new("sh").with_base_args([path.display().to_string()]);
        Self { client, store }
    }
}
