use crate::types::PlatformInfo;
use std::path::Path;
use std::process::Command;

pub const FEED_BASE: &str = "https://storage.googleapis.com/flutter_infra_release/releases";

pub fn get_system_info() -> PlatformInfo {
    let os = match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        _ => "linux",
    };

    // The feed tags macOS builds with dart_sdk_arch x64/arm64
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    };

    PlatformInfo {
        os: os.to_string(),
        arch,
    }
}

pub fn default_feed_url() -> String {
    format!("{}/releases_{}.json", FEED_BASE, get_system_info().os)
}

/// The command that re-creates a directory link with elevated rights.
pub fn escalated_link_command(link: &Path, target: &Path) -> Command {
    if cfg!(windows) {
        let mklink = format!(
            "/C mklink /D \"{}\" \"{}\"",
            link.display(),
            target.display()
        );
        let mut cmd = Command::new("powershell");
        cmd.args([
            "-NoProfile",
            "-Command",
            &format!(
                "Start-Process -FilePath cmd -ArgumentList '{}' -Verb RunAs -Wait",
                mklink
            ),
        ]);
        cmd
    } else {
        let mut cmd = Command::new("sudo");
        cmd.arg("ln").arg("-s").arg(target).arg(link);
        cmd
    }
}

/// The command that removes the alias link with elevated rights. Only the link
/// itself is removed, never the directory it points at.
pub fn escalated_remove_command(link: &Path) -> Command {
    if cfg!(windows) {
        let rmdir = format!("/C rmdir \"{}\"", link.display());
        let mut cmd = Command::new("powershell");
        cmd.args([
            "-NoProfile",
            "-Command",
            &format!(
                "Start-Process -FilePath cmd -ArgumentList '{}' -Verb RunAs -Wait",
                rmdir
            ),
        ]);
        cmd
    } else {
        let mut cmd = Command::new("sudo");
        cmd.arg("rm").arg("-f").arg(link);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_names_host_platform() {
        let url = default_feed_url();
        assert!(url.starts_with(FEED_BASE));
        assert!(url.ends_with(".json"));
        assert!(["windows", "macos", "linux"]
            .iter()
            .any(|os| url.contains(&format!("releases_{}", os))));
    }

    #[cfg(unix)]
    #[test]
    fn escalation_goes_through_sudo() {
        let cmd = escalated_link_command(Path::new("/opt/current"), Path::new("/opt/v3.10.6"));
        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["ln", "-s", "/opt/v3.10.6", "/opt/current"]);
    }

    #[cfg(unix)]
    #[test]
    fn elevated_removal_only_unlinks() {
        let cmd = escalated_remove_command(Path::new("/opt/current"));
        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["rm", "-f", "/opt/current"]);
    }
}
