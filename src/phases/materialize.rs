//! Phase 1: Materialization
//!
//! Makes a source's files available under its materialized root. Web
//! sources are downloaded; git working copies and local directories are
//! used where they are, and only checked for existence.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::source::{Source, SourceKind};
use crate::web::{self, RemoteFetcher};

/// Ensure `source`'s materialized root exists and holds its files.
pub fn execute(source: &Source, fetcher: &dyn RemoteFetcher) -> Result<()> {
    match &source.kind {
        SourceKind::Web(web_source) => {
            let path = web::download(fetcher, &web_source.url, &web_source.download_root)?;
            info!("{}: downloaded {}", source.name, path.display());
            Ok(())
        }
        SourceKind::Git(_) | SourceKind::Local(_) => {
            let root = source.materialized_root();
            if root.is_dir() {
                debug!("{}: materialized at {}", source.name, root.display());
                Ok(())
            } else {
                Err(Error::FileSystem {
                    path: root.to_path_buf(),
                    message: match source.kind {
                        SourceKind::Git(_) => "working copy does not exist; run checkout first",
                        _ => "directory does not exist",
                    }
                    .to_string(),
                })
            }
        }
    }
}
