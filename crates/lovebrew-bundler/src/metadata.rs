//! Validated request metadata for a compile request.
//!
//! # Design
//! - `BuildMetadata` is built once through [`BuildMetadata::from_parts`] and is immutable
//!   afterwards; every check that can reject the whole request happens there.
//! - Targets keep first-seen request order with duplicates removed.

use std::collections::HashMap;

use crate::asset::validate_icon;
use crate::console::Target;
use crate::error::{MetadataError, MetadataResult};

/// Title used when none is supplied.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Author used when none is supplied.
pub const DEFAULT_AUTHOR: &str = "Unknown";
/// Description used when none is supplied.
pub const DEFAULT_DESCRIPTION: &str = "No description";
/// Version used when none is supplied.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Raw, unvalidated metadata fields as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    /// Application title.
    pub title: Option<String>,
    /// Application author.
    pub author: Option<String>,
    /// Application description.
    pub description: Option<String>,
    /// Application version.
    pub version: Option<String>,
    /// Comma-separated target ids.
    pub targets: Option<String>,
}

/// Immutable, validated metadata for one compile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    title: String,
    author: String,
    description: String,
    version: String,
    targets: Vec<Target>,
    icons: HashMap<Target, Vec<u8>>,
    game: Option<Vec<u8>>,
}

impl BuildMetadata {
    /// Validate raw fields, custom icons, and the optional game archive.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::NoTargets`] or [`MetadataError::InvalidTarget`] for a bad
    /// target list, [`MetadataError::UnexpectedIcon`] for icons of unrequested targets, and
    /// [`MetadataError::Icon`] for icons failing the target's exact size and format.
    pub fn from_parts(
        fields: MetadataFields,
        icons: Vec<(Target, Vec<u8>)>,
        game: Option<Vec<u8>>,
    ) -> MetadataResult<Self> {
        let targets = parse_targets(fields.targets.as_deref().unwrap_or_default())?;

        let mut validated = HashMap::with_capacity(icons.len());
        for (target, bytes) in icons {
            if !targets.contains(&target) {
                return Err(MetadataError::UnexpectedIcon { target });
            }
            validate_icon(&bytes, target.console().icon_spec())
                .map_err(|source| MetadataError::Icon { target, source })?;
            validated.insert(target, bytes);
        }

        Ok(Self {
            title: or_default(fields.title, DEFAULT_TITLE),
            author: or_default(fields.author, DEFAULT_AUTHOR),
            description: or_default(fields.description, DEFAULT_DESCRIPTION),
            version: or_default(fields.version, DEFAULT_VERSION),
            targets,
            icons: validated,
            game: game.filter(|bytes| !bytes.is_empty()),
        })
    }

    /// Application title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Application author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Application description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Application version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Requested targets in request order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Custom icon uploaded for `target`, if any.
    #[must_use]
    pub fn icon(&self, target: Target) -> Option<&[u8]> {
        self.icons.get(&target).map(Vec::as_slice)
    }

    /// Game archive appended to every produced binary, if any.
    #[must_use]
    pub fn game(&self) -> Option<&[u8]> {
        self.game.as_deref()
    }
}

/// Parse a comma-separated target list, dropping duplicates but keeping order.
///
/// # Errors
///
/// Returns [`MetadataError::NoTargets`] for an empty list and
/// [`MetadataError::InvalidTarget`] for the first unknown id.
pub fn parse_targets(csv: &str) -> MetadataResult<Vec<Target>> {
    let mut targets = Vec::new();
    for raw in csv.split(',').map(str::trim).filter(|raw| !raw.is_empty()) {
        let target: Target = raw.parse()?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return Err(MetadataError::NoTargets);
    }
    Ok(targets)
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovebrew_test_support::fixtures::{jpeg_bytes, png_bytes};

    fn fields(targets: &str) -> MetadataFields {
        MetadataFields {
            targets: Some(targets.to_string()),
            ..MetadataFields::default()
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() -> MetadataResult<()> {
        let metadata = BuildMetadata::from_parts(fields("ctr"), Vec::new(), None)?;
        assert_eq!(metadata.title(), "Untitled");
        assert_eq!(metadata.author(), "Unknown");
        assert_eq!(metadata.description(), "No description");
        assert_eq!(metadata.version(), "0.0.0");
        assert!(metadata.game().is_none());
        Ok(())
    }

    #[test]
    fn supplied_fields_are_kept_verbatim() -> MetadataResult<()> {
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                title: Some("  Spaced Out  ".to_string()),
                author: Some("Ada".to_string()),
                description: Some("A game".to_string()),
                version: Some("1.2.3".to_string()),
                targets: Some("hac".to_string()),
            },
            Vec::new(),
            Some(b"PK\x03\x04".to_vec()),
        )?;
        assert_eq!(metadata.title(), "  Spaced Out  ");
        assert_eq!(metadata.author(), "Ada");
        assert_eq!(metadata.game(), Some(&b"PK\x03\x04"[..]));
        Ok(())
    }

    #[test]
    fn targets_are_deduplicated_in_request_order() -> MetadataResult<()> {
        assert_eq!(
            parse_targets("cafe, ctr,cafe,,hac,ctr")?,
            vec![Target::Cafe, Target::Ctr, Target::Hac]
        );
        Ok(())
    }

    #[test]
    fn invalid_or_empty_target_lists_reject_the_request() {
        assert!(matches!(parse_targets(""), Err(MetadataError::NoTargets)));
        assert!(matches!(parse_targets(" , "), Err(MetadataError::NoTargets)));
        match BuildMetadata::from_parts(fields("ctr,bogus"), Vec::new(), None) {
            Err(MetadataError::InvalidTarget { value }) => assert_eq!(value, "bogus"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            BuildMetadata::from_parts(MetadataFields::default(), Vec::new(), None),
            Err(MetadataError::NoTargets)
        ));
    }

    #[test]
    fn icons_are_validated_per_target() -> MetadataResult<()> {
        let metadata = BuildMetadata::from_parts(
            fields("ctr,hac"),
            vec![
                (Target::Ctr, png_bytes(48, 48)),
                (Target::Hac, jpeg_bytes(256, 256)),
            ],
            None,
        )?;
        assert!(metadata.icon(Target::Ctr).is_some());
        assert!(metadata.icon(Target::Cafe).is_none());

        let err = BuildMetadata::from_parts(
            fields("ctr"),
            vec![(Target::Ctr, png_bytes(49, 49))],
            None,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_ICON_SIZE");

        let err = BuildMetadata::from_parts(
            fields("ctr"),
            vec![(Target::Cafe, png_bytes(128, 128))],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::UnexpectedIcon {
                target: Target::Cafe
            }
        ));
        Ok(())
    }
}
