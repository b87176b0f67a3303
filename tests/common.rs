use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Not every test binary uses every helper.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub root: PathBuf,
    pub alias: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let root = temp_dir.path().join("versions");
        let alias = temp_dir.path().join("current");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_flutterver"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            root,
            alias,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("FLUTTERVER_CONFIG", &self.config_path);
        cmd.env("FLUTTERVER_ROOT", &self.root);
        cmd.env("FLUTTERVER_ALIAS", &self.alias);
        // Nothing listens on the discard port, so feed lookups fail fast
        cmd.env("FLUTTERVER_FEED_URL", "http://127.0.0.1:9/releases.json");
        cmd.env("HOME", self._temp_dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Lay out `v<version>/flutter/bin/flutter` the way an extracted SDK looks.
    pub fn install_fake(&self, version: &str) -> PathBuf {
        let dir = self.root.join(format!("v{}", version));
        let bin = dir.join("flutter").join("bin");
        fs::create_dir_all(&bin).expect("Failed to create fake SDK");
        fs::write(bin.join("flutter"), "#!/bin/sh\n").expect("Failed to write fake SDK");
        dir
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.cmd()
            .args(args)
            .output()
            .expect("Failed to run flutterver")
            .into()
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.status.success(),
            "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
