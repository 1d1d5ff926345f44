use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::error::ClientError;

/// Stable per-device id for viewers who never sign in.
///
/// Likes are attributed to this id, so it has to survive restarts. It is
/// persisted as a single line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousIdentity(String);

impl AnonymousIdentity {
    pub async fn load_or_create(path: &Path) -> Result<Self, ClientError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let id = contents.trim();
                if !id.is_empty() {
                    return Ok(Self(id.to_string()));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let id = Uuid::new_v4().to_string();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &id).await?;
        info!("Created anonymous identity {}", id);
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnonymousIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
