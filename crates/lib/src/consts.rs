//! Fixed names and markers shared across the crate.

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "xpiup.toml";

/// Suffix appended to the manifest name and titles for beta builds.
pub const BETA_SUFFIX: &str = " [beta]";

/// Sentinel line opening the README badge block.
pub const README_BADGE_START: &str = "<!-- SHIELD IO BADGES INSTALL START -->";

/// Sentinel line closing the README badge block.
pub const README_BADGE_END: &str = "<!-- SHIELD IO BADGES INSTALL END -->";

/// Placeholder for the update base URL in the badge template.
pub const PLACEHOLDER_URL_UPDATES: &str = "{URL_UPDATES}";

/// Placeholder for the artifact path (relative to the project root) in the badge template.
pub const PLACEHOLDER_XPI_FILEPATH: &str = "{XPI_FILEPATH}";

/// Placeholder for the deployed version in the badge template.
pub const PLACEHOLDER_VERSION: &str = "{VERSION}";

/// Default prefix of version-stamped badge image URLs.
pub const DEFAULT_BADGE_URL_PREFIX: &str = "https://img.shields.io/badge/";
