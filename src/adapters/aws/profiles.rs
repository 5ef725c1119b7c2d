use crate::core::error::ProfileReadError;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Location of the shared AWS config and credentials files, honoring
/// AWS_CONFIG_FILE / AWS_SHARED_CREDENTIALS_FILE overrides.
pub(crate) fn shared_file_paths() -> Option<(PathBuf, PathBuf)> {
    let home = dirs::home_dir()?;
    let config = std::env::var_os("AWS_CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".aws").join("config"));
    let credentials = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".aws").join("credentials"));
    Some((config, credentials))
}

/// Enumerates the named profiles found across the given files.
///
/// Section headers of the form `[profile name]` (config file) and `[name]`
/// (credentials file) both count; duplicates collapse and the result is
/// sorted case-insensitively.
pub(crate) fn read_profiles_from(paths: &[PathBuf]) -> Result<Vec<String>, ProfileReadError> {
    let mut profiles = HashSet::new();
    let mut any_file_existed = false;

    for path in paths {
        if !path.exists() {
            continue;
        }
        any_file_existed = true;
        let content = fs::read_to_string(path).map_err(|source| ProfileReadError::Io {
            path: path.clone(),
            source,
        })?;
        for line in content.lines() {
            if let Some(name) = section_name(line) {
                profiles.insert(name.to_string());
            }
        }
    }

    if !any_file_existed {
        return Err(ProfileReadError::NoConfigFilesFound);
    }

    let mut sorted: Vec<String> = profiles.into_iter().collect();
    sorted.sort_by_key(|p| p.to_lowercase());
    Ok(sorted)
}

/// Read-only profile enumeration for UI selection lists. Failures are logged
/// and produce an empty list, never an error.
pub(crate) fn available_profiles() -> Vec<String> {
    let Some((config, credentials)) = shared_file_paths() else {
        warn!("Home directory not found; no AWS profiles available");
        return Vec::new();
    };
    match read_profiles_from(&[config, credentials]) {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!(%e, "Failed to enumerate AWS profiles");
            Vec::new()
        }
    }
}

/// Looks up a single property (e.g. `sso_role_name`, `region`) of a profile
/// section in the given config file. Missing file, section, or key all yield
/// `None`.
pub(crate) fn profile_property_in(path: &PathBuf, profile: &str, key: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let mut in_section = false;
    for line in content.lines() {
        if let Some(name) = section_name(line) {
            in_section = name == profile;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let value = v.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// `profile_property_in` against the default shared config file.
pub(crate) fn profile_property(profile: &str, key: &str) -> Option<String> {
    let (config, _) = shared_file_paths()?;
    profile_property_in(&config, profile, key)
}

fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }
    let mut name = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
    if let Some(stripped) = name.strip_prefix("profile ") {
        name = stripped.trim();
    }
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &std::path::Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn profiles_from_both_files_are_merged_and_sorted() {
        let dir = tempdir().unwrap();
        let config = write_file(
            dir.path(),
            "config",
            &[
                "[profile user1]",
                "region = us-east-1",
                "[default]",
                "output = json",
            ],
        );
        let credentials = write_file(
            dir.path(),
            "credentials",
            &[
                "[user2]",
                "aws_access_key_id = AKIA...",
                "[user1]",
                "aws_secret_access_key = ...",
            ],
        );

        let profiles = read_profiles_from(&[config, credentials]).unwrap();
        assert_eq!(profiles, vec!["default", "user1", "user2"]);
    }

    #[test]
    fn missing_files_are_an_error() {
        let dir = tempdir().unwrap();
        let result = read_profiles_from(&[dir.path().join("config")]);
        assert_matches!(result, Err(ProfileReadError::NoConfigFilesFound));
    }

    #[test]
    fn one_existing_file_is_enough() {
        let dir = tempdir().unwrap();
        let config = write_file(dir.path(), "config", &["[profile solo]"]);
        let profiles = read_profiles_from(&[config, dir.path().join("credentials")]).unwrap();
        assert_eq!(profiles, vec!["solo"]);
    }

    #[test]
    fn malformed_headers_are_skipped() {
        let dir = tempdir().unwrap();
        let config = write_file(
            dir.path(),
            "config",
            &["[]", "[profile ]", "not a header", "[profile ok]"],
        );
        let profiles = read_profiles_from(&[config]).unwrap();
        assert_eq!(profiles, vec!["ok"]);
    }

    #[test]
    fn property_lookup_scopes_to_the_section() {
        let dir = tempdir().unwrap();
        let config = write_file(
            dir.path(),
            "config",
            &[
                "[profile dev]",
                "sso_role_name = DevAccess",
                "region = eu-west-1",
                "[profile prod]",
                "sso_role_name = ProdAccess",
            ],
        );

        assert_eq!(
            profile_property_in(&config, "dev", "sso_role_name").as_deref(),
            Some("DevAccess")
        );
        assert_eq!(
            profile_property_in(&config, "prod", "sso_role_name").as_deref(),
            Some("ProdAccess")
        );
        assert_eq!(profile_property_in(&config, "dev", "mfa_serial"), None);
        assert_eq!(profile_property_in(&config, "stage", "region"), None);
    }
}
