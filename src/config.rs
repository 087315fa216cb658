//! Environment overrides for SpaceShift
//!
//! The primary configuration source is the settings file (see the
//! config_file module). These environment variables are optional:
//! - SPACESHIFT_CONFIG: use this settings file instead of the standard one
//! - SPACESHIFT_SKIP_CALIBRATION: skip the start-up timing probe (1/true/yes)

use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;

pub const CONFIG_PATH_VAR: &str = "SPACESHIFT_CONFIG";
pub const SKIP_CALIBRATION_VAR: &str = "SPACESHIFT_SKIP_CALIBRATION";

/// Parse the SPACESHIFT_CONFIG environment variable
///
/// Returns Some(path) if set to a non-empty value
pub fn parse_config_path() -> Option<PathBuf> {
    match env::var(CONFIG_PATH_VAR) {
        Ok(val) if !val.trim().is_empty() => {
            info!("Using settings file from {}: {}", CONFIG_PATH_VAR, val);
            Some(PathBuf::from(val.trim()))
        }
        Ok(_) => {
            warn!("{} is set but empty. Using standard location.", CONFIG_PATH_VAR);
            None
        }
        Err(_) => {
            debug!("{} not set.", CONFIG_PATH_VAR);
            None
        }
    }
}

/// Parse the SPACESHIFT_SKIP_CALIBRATION environment variable
pub fn parse_skip_calibration() -> bool {
    match env::var(SKIP_CALIBRATION_VAR) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => {
                info!("Timing calibration disabled via {}", SKIP_CALIBRATION_VAR);
                true
            }
            "0" | "false" | "no" | "" => false,
            other => {
                warn!(
                    "Invalid {} value: {:?} (expected 1/0/true/false). Calibration stays enabled.",
                    SKIP_CALIBRATION_VAR, other
                );
                false
            }
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both variables are exercised in one test so parallel tests never race
    // on the process environment.
    #[test]
    fn test_environment_overrides() {
        env::remove_var(CONFIG_PATH_VAR);
        assert_eq!(parse_config_path(), None, "Should return None when not set");

        env::set_var(CONFIG_PATH_VAR, "   ");
        assert_eq!(parse_config_path(), None, "Should ignore blank value");

        env::set_var(CONFIG_PATH_VAR, "/tmp/spaceshift/custom.toml");
        assert_eq!(
            parse_config_path(),
            Some(PathBuf::from("/tmp/spaceshift/custom.toml"))
        );
        env::remove_var(CONFIG_PATH_VAR);

        env::remove_var(SKIP_CALIBRATION_VAR);
        assert!(!parse_skip_calibration());

        for yes in ["1", "true", "YES"] {
            env::set_var(SKIP_CALIBRATION_VAR, yes);
            assert!(parse_skip_calibration(), "Should accept {}", yes);
        }
        for no in ["0", "false", "", "maybe"] {
            env::set_var(SKIP_CALIBRATION_VAR, no);
            assert!(!parse_skip_calibration(), "Should reject {}", no);
        }
        env::remove_var(SKIP_CALIBRATION_VAR);
    }
}
