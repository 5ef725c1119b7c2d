use crate::core::error::SsoLoginError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Runs `aws sso login --profile <profile>`, capturing stderr for error
/// reporting. Blocks the backend worker until the login flow finishes; that
/// serialization is intentional.
pub(crate) async fn exec_sso_login(profile: &str) -> Result<(), SsoLoginError> {
    info!(profile, "Executing aws sso login");
    run_login("aws", profile).await
}

async fn run_login(program: &str, profile: &str) -> Result<(), SsoLoginError> {
    let output = Command::new(program)
        .args(["sso", "login", "--profile", profile])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| SsoLoginError::Spawn {
            profile: profile.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SsoLoginError::CommandFailed {
            profile: profile.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = run_login("/nonexistent/aws-cli-for-test", "dev")
            .await
            .unwrap_err();
        assert_matches!(err, SsoLoginError::Spawn { ref profile, .. } if profile == "dev");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_carries_stderr() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("aws");
        let mut file = std::fs::File::create(&stub).unwrap();
        writeln!(file, "#!/bin/sh\necho login-denied >&2\nexit 3").unwrap();
        drop(file);
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = run_login(stub.to_str().unwrap(), "dev").await.unwrap_err();
        assert_matches!(
            err,
            SsoLoginError::CommandFailed { ref profile, ref stderr, .. }
                if profile == "dev" && stderr == "login-denied"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_is_ok() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("aws");
        let mut file = std::fs::File::create(&stub).unwrap();
        writeln!(file, "#!/bin/sh\nexit 0").unwrap();
        drop(file);
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(run_login(stub.to_str().unwrap(), "dev").await.is_ok());
    }
}
