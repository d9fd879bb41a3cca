//! Common test utilities for integration tests.
//!
//! `Fixture` builds throwaway project trees on disk and opens a
//! `ContextLayer` over them with default configuration.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use context_layer_config::LayerConfig;
use context_layer_core::ContextLayer;
use tempfile::TempDir;

pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("Failed to read fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn layer(&self) -> ContextLayer {
        ContextLayer::new(self.root(), LayerConfig::default())
    }

    pub fn initialized_layer(&self) -> ContextLayer {
        let layer = self.layer();
        layer.init().expect("Failed to initialize");
        layer
    }

    /// Run `git` in the fixture root with a throwaway identity.
    pub fn git(&self, args: &[&str]) -> &Self {
        let status = Command::new("git")
            .args([
                "-c",
                "user.name=Fixture",
                "-c",
                "user.email=fixture@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(self.root())
            .output()
            .expect("Failed to run git");
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
        self
    }

    /// Initialize a repository with one base commit so `HEAD~1` exists
    /// once the next commit lands.
    pub fn init_repo(&self) -> &Self {
        self.write("README.md", "# Fixture\n");
        self.git(&["init", "-q"]).commit_all("base")
    }

    pub fn commit_all(&self, message: &str) -> &Self {
        self.git(&["add", "-A"]).git(&["commit", "-q", "-m", message])
    }
}

/// A TypeScript service directory that scores as a system: canonical name,
/// two role files and an entry point.
pub fn write_api_system(fixture: &Fixture, dir: &str) {
    fixture
        .write(
            &format!("{dir}/index.ts"),
            "export { UserService } from './userService';\n",
        )
        .write(
            &format!("{dir}/userService.ts"),
            "export class UserService {}\nexport async function loadUser(id: string): Promise<User> { return db.get(id); }\nfunction cacheKey(id: string) { return id; }\n",
        )
        .write(
            &format!("{dir}/authController.ts"),
            "export interface Session { id: string }\nexport type Token = string;\nexport const login = (user: string) => user;\n",
        )
        .write(&format!("{dir}/userService.test.ts"), "test('x', () => {});\n");
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
