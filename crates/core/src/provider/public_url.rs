//! Public addressing of local assets handed to providers.

use std::path::{Path, PathBuf};

use crate::config::PublicConfig;

/// Turns local asset paths into URLs a remote provider can fetch.
#[derive(Debug, Clone)]
pub struct PublicUrlResolver {
    base_url: Option<String>,
    fallback_url: String,
    static_root: PathBuf,
    mount: String,
}

impl PublicUrlResolver {
    /// `static_root` is the local directory served under `mount` (e.g. "static").
    pub fn new(config: &PublicConfig, static_root: impl Into<PathBuf>, mount: &str) -> Self {
        Self {
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            fallback_url: config.fallback_reference_url.clone(),
            static_root: static_root.into(),
            mount: mount.trim_matches('/').to_string(),
        }
    }

    /// URL for a reference image. Uses the fallback image when no base URL is set.
    pub fn reference_url(&self, path: &Path) -> String {
        self.public_url(path)
            .unwrap_or_else(|| self.fallback_url.clone())
    }

    /// URL for a produced artifact, or its local path when no base URL is set.
    pub fn artifact_ref(&self, path: &Path) -> String {
        self.public_url(path)
            .unwrap_or_else(|| path.display().to_string())
    }

    fn public_url(&self, path: &Path) -> Option<String> {
        let base = self.base_url.as_ref()?;
        Some(format!("{}/{}", base, self.relative_path(path)))
    }

    /// Path relative to the server root: static files are re-rooted under the
    /// mount, anything else is used as given.
    fn relative_path(&self, path: &Path) -> String {
        let relative = match path.strip_prefix(&self.static_root) {
            Ok(rest) if !self.mount.is_empty() => Path::new(&self.mount).join(rest),
            Ok(rest) => rest.to_path_buf(),
            Err(_) => path.to_path_buf(),
        };
        normalize(&relative.to_string_lossy())
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(base: Option<&str>) -> PublicUrlResolver {
        let config = PublicConfig {
            base_url: base.map(String::from),
            fallback_reference_url: "https://cdn.example.com/fallback.jpg".to_string(),
        };
        PublicUrlResolver::new(&config, "static", "static")
    }

    #[test]
    fn test_reference_url_with_base() {
        let r = resolver(Some("https://reel.example.com/"));
        assert_eq!(
            r.reference_url(Path::new("static/uploads/ref_1.jpg")),
            "https://reel.example.com/static/uploads/ref_1.jpg"
        );
    }

    #[test]
    fn test_reference_url_without_base_uses_fallback() {
        let r = resolver(None);
        assert_eq!(
            r.reference_url(Path::new("static/uploads/ref_1.jpg")),
            "https://cdn.example.com/fallback.jpg"
        );
    }

    #[test]
    fn test_blank_base_counts_as_missing() {
        let r = resolver(Some("   "));
        assert_eq!(
            r.reference_url(Path::new("static/uploads/ref_1.jpg")),
            "https://cdn.example.com/fallback.jpg"
        );
    }

    #[test]
    fn test_backslashes_and_leading_slash_normalised() {
        let r = resolver(Some("https://reel.example.com"));
        assert_eq!(
            r.reference_url(Path::new("\\generated\\gemini_gen_1.png")),
            "https://reel.example.com/generated/gemini_gen_1.png"
        );
    }

    #[test]
    fn test_absolute_static_root() {
        let config = PublicConfig {
            base_url: Some("https://reel.example.com".to_string()),
            ..Default::default()
        };
        let r = PublicUrlResolver::new(&config, "/srv/keyreel/static", "static");
        assert_eq!(
            r.artifact_ref(Path::new("/srv/keyreel/static/videos/abc.mp4")),
            "https://reel.example.com/static/videos/abc.mp4"
        );
    }

    #[test]
    fn test_artifact_ref_without_base_is_local_path() {
        let r = resolver(None);
        assert_eq!(
            r.artifact_ref(Path::new("static/videos/abc.mp4")),
            "static/videos/abc.mp4"
        );
    }
}
