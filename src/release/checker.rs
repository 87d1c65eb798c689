//! New-version decision rule shared by every release source

use crate::release::types::{Version, VersionCheck};

/// Compare the latest version reported by a backend with the recorded one
///
/// The latest version is always handed back, whether or not it is newer.
/// "Newer" means "different": no semantic ordering is applied.
pub fn check_version(current: &Version, latest: Version) -> VersionCheck {
    let is_newer = latest != *current;
    VersionCheck { latest, is_newer }
}
