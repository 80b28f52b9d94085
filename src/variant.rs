//! Stage3 variant selection.

use std::fmt;

use crate::config::{InitSystem, InstallConfig};

/// Desktop profile stage3 with systemd.
pub const DESKTOP_SYSTEMD: &str = "stage3-amd64-desktop-systemd";

/// Desktop profile stage3 with OpenRC.
pub const DESKTOP_OPENRC: &str = "stage3-amd64-desktop-openrc";

/// Token identifying a stage3 flavor. Matched as a substring of index lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map the user's choices to a stage3 variant.
///
/// Only the init system branches. `desktop_type` is carried in the config
/// but every install uses a desktop-profile stage3.
pub fn resolve(config: &InstallConfig) -> VariantId {
    match config.init_system {
        InitSystem::Systemd => VariantId::new(DESKTOP_SYSTEMD),
        InitSystem::OpenRc => VariantId::new(DESKTOP_OPENRC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalStorage, INIT_SYSTEM_KEY};

    fn resolve_raw(init: Option<&str>) -> VariantId {
        let mut gs = GlobalStorage::new();
        if let Some(init) = init {
            gs.insert(INIT_SYSTEM_KEY, init);
        }
        resolve(&InstallConfig::from_provider(&gs))
    }

    #[test]
    fn test_systemd_variant() {
        assert_eq!(resolve_raw(Some("systemd")).as_str(), DESKTOP_SYSTEMD);
    }

    #[test]
    fn test_everything_else_is_openrc() {
        for init in [None, Some("openrc"), Some(""), Some("SYSTEMD"), Some("s6"), Some(" systemd")] {
            assert_eq!(resolve_raw(init).as_str(), DESKTOP_OPENRC, "input {:?}", init);
        }
    }

    #[test]
    fn test_desktop_type_does_not_branch() {
        for desktop in ["desktop", "kde", "gnome", "none"] {
            let config = InstallConfig {
                init_system: InitSystem::OpenRc,
                desktop_type: desktop.to_string(),
            };
            assert_eq!(resolve(&config).as_str(), DESKTOP_OPENRC);
        }
    }
}
