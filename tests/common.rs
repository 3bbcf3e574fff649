#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "s3nha-forte";

/// A private home for one test: config, database, storage and device files.
pub struct Home {
    pub dir: TempDir,
}

impl Home {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db(&self) -> String {
        self.path().join("rponto.sqlite").to_string_lossy().to_string()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}

/// `rponto` bound to the given home and database.
pub fn rpo(home: &Home) -> Command {
    let mut cmd = cargo_bin_cmd!("rponto");
    cmd.env("RPONTO_HOME", home.path()).args(["--db", &home.db()]);
    cmd
}

/// Initialize the home and create one employee account.
pub fn init_with_user(home: &Home) {
    rpo(home).arg("init").assert().success();
    rpo(home)
        .args([
            "admin",
            "add-user",
            "--email",
            EMAIL,
            "--password",
            PASSWORD,
            "--name",
            "Ana Souza",
            "--role",
            "Analista",
            "--hire-date",
            "2022-03-01",
            "--cpf",
            "12345678901",
        ])
        .assert()
        .success();
}

/// Sign in without accepting the terms of use.
pub fn sign_in(home: &Home, device: &str) {
    rpo(home)
        .args(["--device", device, "login", "--email", EMAIL, "--password", PASSWORD])
        .assert()
        .success();
}

pub fn accept_terms(home: &Home, device: &str) {
    rpo(home)
        .args([
            "--device", device, "terms", "--accept", "--lat", "-23.5505", "--lng", "-46.6333",
        ])
        .assert()
        .success();
}

/// Sign in, ready to use every feature.
pub fn login(home: &Home, device: &str) {
    sign_in(home, device);
    accept_terms(home, device);
}

/// The reset code delivered to the local mailbox.
pub fn reset_token(home: &Home) -> String {
    let mailbox = home.path().join("storage").join("mailbox");
    for user_dir in fs::read_dir(&mailbox).expect("mailbox") {
        for mail in fs::read_dir(user_dir.expect("entry").path()).expect("user mailbox") {
            let text = fs::read_to_string(mail.expect("mail").path()).expect("mail text");
            if let Some(token) = text.lines().find(|l| l.starts_with("rpo_")) {
                return token.to_string();
            }
        }
    }
    panic!("no reset mail in {}", mailbox.display());
}

/// Text between the last `(` and `)` of a line containing `marker`.
pub fn id_after(output: &[u8], marker: &str) -> String {
    let text = String::from_utf8_lossy(output);
    let line = text
        .lines()
        .find(|l| l.contains(marker))
        .expect("marker line");
    let start = line.rfind('(').expect("open paren") + 1;
    let end = line.rfind(')').expect("close paren");
    line[start..end].to_string()
}
