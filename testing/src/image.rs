//! Docker image references and image-family compatibility.

use errors::{FixtureError, FixtureResult};
use std::fmt;
use std::str::FromStr;

const DEFAULT_TAG: &str = "latest";
const DOCKER_HUB_REGISTRIES: [&str; 3] = ["docker.io", "registry-1.docker.io", "index.docker.io"];
const LIBRARY_PREFIX: &str = "library/";

/// Where the version part of a reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageVersion {
    Tag(String),
    Digest(String)
}

/// A parsed `[registry/]repository[:tag|@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    version: ImageVersion,
    compatible_substitute_for: Option<Box<ImageReference>>
}

impl ImageReference {
    /// Docker Hub reference from a repository and tag, without parsing.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            registry: None,
            repository: repository.into(),
            version: ImageVersion::Tag(tag.into()),
            compatible_substitute_for: None
        }
    }

    /// Parse a Docker image reference.
    ///
    /// The first path component is treated as a registry when it contains a
    /// `.` or `:` or is `localhost`. A missing tag means `latest`.
    pub fn parse(reference: &str) -> FixtureResult<Self> {
        let invalid = |reason: &str| FixtureError::InvalidImageReference {
            reference: reference.to_string(),
            reason: reason.to_string()
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("reference contains whitespace"));
        }

        let (remainder, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                if digest.is_empty() {
                    return Err(invalid("digest is empty"));
                }
                (name, Some(digest.to_string()))
            }
            None => (trimmed, None)
        };

        let (registry, path) = match remainder.split_once('/') {
            Some((first, rest)) if first.contains('.') || first.contains(':') || first == "localhost" => {
                (Some(first.to_string()), rest)
            }
            _ => (None, remainder)
        };

        // A colon after the last slash separates the tag.
        let last_segment_start = path.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match path[last_segment_start..].rfind(':') {
            Some(i) => {
                let split = last_segment_start + i;
                (&path[..split], Some(&path[split + 1..]))
            }
            None => (path, None)
        };

        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(invalid("repository is empty"));
        }
        if matches!(tag, Some("")) {
            return Err(invalid("tag is empty"));
        }

        let version = match (digest, tag) {
            (Some(digest), _) => ImageVersion::Digest(digest),
            (None, Some(tag)) => ImageVersion::Tag(tag.to_string()),
            (None, None) => ImageVersion::Tag(DEFAULT_TAG.to_string())
        };

        Ok(Self {
            registry,
            repository: repository.to_string(),
            version,
            compatible_substitute_for: None
        })
    }

    /// Reference with the same repository and a different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            version: ImageVersion::Tag(tag.into()),
            ..self.clone()
        }
    }

    /// Declare this image a drop-in replacement for `other`, e.g. a mirrored
    /// or custom-built InfluxDB image under a different name.
    pub fn as_compatible_substitute_for(mut self, other: ImageReference) -> Self {
        self.compatible_substitute_for = Some(Box::new(other));
        self
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Repository path as given, including any registry-local namespace.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn version(&self) -> &ImageVersion {
        &self.version
    }

    /// The value testcontainers expects as the image name: registry plus
    /// repository.
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}", registry, self.repository),
            None => self.repository.clone()
        }
    }

    /// Tag, or `@digest` form for digest references.
    pub fn tag(&self) -> String {
        match &self.version {
            ImageVersion::Tag(tag) => tag.clone(),
            ImageVersion::Digest(digest) => digest.clone()
        }
    }

    /// Repository with Docker Hub registry and `library/` prefixes removed.
    pub fn unversioned_part(&self) -> String {
        let hub_registry = self
            .registry
            .as_deref()
            .is_none_or(|registry| DOCKER_HUB_REGISTRIES.contains(&registry));

        let repository = if hub_registry {
            self.repository
                .strip_prefix(LIBRARY_PREFIX)
                .unwrap_or(&self.repository)
        } else {
            &self.repository
        };

        match (&self.registry, hub_registry) {
            (Some(registry), false) => format!("{}/{}", registry, repository),
            _ => repository.to_string()
        }
    }

    /// True when this image belongs to the same family as `other`, directly
    /// or through a declared substitute.
    pub fn is_compatible_with(&self, other: &ImageReference) -> bool {
        if self.unversioned_part() == other.unversioned_part() {
            return true;
        }
        self.compatible_substitute_for
            .as_deref()
            .is_some_and(|substitute| substitute.is_compatible_with(other))
    }

    pub fn assert_compatible_with(&self, other: &ImageReference) -> FixtureResult<()> {
        if self.is_compatible_with(other) {
            Ok(())
        } else {
            Err(FixtureError::IncompatibleImage {
                image: self.to_string(),
                expected: other.unversioned_part()
            })
        }
    }
}

impl FromStr for ImageReference {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            ImageVersion::Tag(tag) => write!(f, "{}:{}", self.name(), tag),
            ImageVersion::Digest(digest) => write!(f, "{}@{}", self.name(), digest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influxdb() -> ImageReference {
        ImageReference::parse("influxdb").unwrap()
    }

    #[test]
    fn test_parse_name_and_tag() {
        let image = ImageReference::parse("influxdb:2.0.6").unwrap();
        assert_eq!(image.registry(), None);
        assert_eq!(image.repository(), "influxdb");
        assert_eq!(image.version(), &ImageVersion::Tag("2.0.6".to_string()));
        assert_eq!(image.to_string(), "influxdb:2.0.6");
    }

    #[test]
    fn test_missing_tag_defaults_to_latest() {
        let image = ImageReference::parse("influxdb").unwrap();
        assert_eq!(image.tag(), "latest");
    }

    #[test]
    fn test_parse_registry_with_port() {
        let image = ImageReference::parse("localhost:5000/team/influxdb:2.7").unwrap();
        assert_eq!(image.registry(), Some("localhost:5000"));
        assert_eq!(image.repository(), "team/influxdb");
        assert_eq!(image.tag(), "2.7");
        assert_eq!(image.name(), "localhost:5000/team/influxdb");
    }

    #[test]
    fn test_parse_digest() {
        let image = ImageReference::parse("influxdb@sha256:abcdef").unwrap();
        assert_eq!(
            image.version(),
            &ImageVersion::Digest("sha256:abcdef".to_string())
        );
        assert_eq!(image.to_string(), "influxdb@sha256:abcdef");
    }

    #[test]
    fn test_parse_rejects_empty_parts() {
        for bad in ["", "   ", "influxdb:", "influxdb@", ":2.0", "team//influxdb", "influx db"] {
            let err = ImageReference::parse(bad).unwrap_err();
            assert!(
                matches!(err, FixtureError::InvalidImageReference { .. }),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_docker_hub_forms_are_one_family() {
        for reference in [
            "influxdb:1.8",
            "library/influxdb:2.7",
            "docker.io/influxdb:2.7",
            "docker.io/library/influxdb:2.0.6"
        ] {
            let image = ImageReference::parse(reference).unwrap();
            assert!(image.is_compatible_with(&influxdb()), "{}", reference);
        }
    }

    #[test]
    fn test_unrelated_family_is_incompatible() {
        let image = ImageReference::parse("postgres:16").unwrap();
        let err = image.assert_compatible_with(&influxdb()).unwrap_err();
        assert!(matches!(
            err,
            FixtureError::IncompatibleImage { ref expected, .. } if expected == "influxdb"
        ));
    }

    #[test]
    fn test_private_registry_needs_substitute_declaration() {
        let mirrored = ImageReference::parse("registry.example.com/mirror/influxdb:2.7").unwrap();
        assert!(!mirrored.is_compatible_with(&influxdb()));

        let declared = mirrored.as_compatible_substitute_for(influxdb());
        assert!(declared.is_compatible_with(&influxdb()));
    }

    #[test]
    fn test_with_tag_keeps_repository() {
        let image = influxdb().with_tag("2.0.6");
        assert_eq!(image.to_string(), "influxdb:2.0.6");
    }
}
