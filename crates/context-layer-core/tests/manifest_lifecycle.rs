//! Manifest persistence across facade operations.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package context-layer-core --test manifest_lifecycle
//! ```

mod common;

use std::collections::BTreeMap;

use common::{write_api_system, Fixture};
use context_layer_config::LayerConfig;
use context_layer_core::{
    ContextLayer, LayerError, ManifestError, ManifestStore, SystemStatus, MANIFEST_VERSION,
};
use pretty_assertions::assert_eq;

#[test]
fn test_init_creates_empty_manifest() {
    let fixture = Fixture::new();
    let layer = fixture.initialized_layer();

    assert!(fixture.exists(".context-layer/manifest.json"));
    let manifest = layer.store().load_required().unwrap();
    assert_eq!(manifest.version, MANIFEST_VERSION);
    assert_eq!(manifest.repo, fixture.root().to_string_lossy());
    assert!(manifest.systems.is_empty());
    assert!(manifest.pending.is_empty());
    assert!(manifest.last_full_build.is_none());
    assert_eq!(manifest.coverage.percentage, 0);
}

#[test]
fn test_init_preserves_existing_gitignore() {
    let fixture = Fixture::new();
    fixture.write(".gitignore", "target/\n");
    fixture.initialized_layer();

    assert_eq!(
        fixture.read(".gitignore"),
        "target/\n\n# Context Layer\n.context-layer/\n"
    );
}

#[test]
fn test_custom_state_dir() {
    let fixture = Fixture::new();
    let mut config = LayerConfig::default();
    config.storage.state_dir = ".docs-state".into();

    let layer = ContextLayer::new(fixture.root(), config);
    layer.init().unwrap();

    assert!(fixture.exists(".docs-state/manifest.json"));
    assert!(fixture.read(".gitignore").contains(".docs-state/"));
}

#[test]
fn test_document_systems_builds_hierarchy() {
    let fixture = Fixture::new();
    write_api_system(&fixture, "src/core");
    write_api_system(&fixture, "src/core/engine");
    write_api_system(&fixture, "src/core/engine/runtime");
    write_api_system(&fixture, "tools/cli");

    let layer = fixture.initialized_layer();
    for dir in ["src/core", "src/core/engine/runtime", "tools/cli"] {
        layer.document_system(dir).unwrap();
    }

    let manifest = layer.store().load_required().unwrap();
    let expected: BTreeMap<String, Vec<String>> =
        [("src/core".to_string(), vec!["src/core/engine/runtime".to_string()])]
            .into_iter()
            .collect();
    assert_eq!(manifest.hierarchy, expected);

    layer.document_system("src/core/engine").unwrap();
    let manifest = layer.store().load_required().unwrap();
    assert_eq!(manifest.hierarchy["src/core"], vec!["src/core/engine"]);
    assert_eq!(
        manifest.hierarchy["src/core/engine"],
        vec!["src/core/engine/runtime"]
    );

    let entry = &manifest.systems["src/core"];
    assert_eq!(entry.agents_md_path, "src/core/AGENTS.md");
    assert_eq!(entry.status, SystemStatus::Active);
    assert_eq!(entry.file_count, 3);
    assert!(entry.tokens > 0);
    assert!(entry.codemap_updated.is_some());
    assert_eq!(manifest.coverage.documented_systems, 4);
}

#[test]
fn test_malformed_manifest_propagates() {
    let fixture = Fixture::new();
    fixture.write(".context-layer/manifest.json", "[1, 2");
    let layer = fixture.layer();

    assert!(matches!(
        layer.status(),
        Err(LayerError::Manifest(ManifestError::Parse { .. }))
    ));
    assert!(layer.full_scan().is_err());
    assert!(!layer.init().unwrap());
    assert_eq!(fixture.read(".context-layer/manifest.json"), "[1, 2");
}

#[test]
fn test_reads_manifest_written_elsewhere() {
    let fixture = Fixture::new();
    fixture.write(
        ".context-layer/manifest.json",
        r#"{
  "version": "1.0",
  "repo": "/somewhere",
  "created": "2024-05-01T10:00:00Z",
  "lastFullBuild": null,
  "lastSynthesis": "2024-05-02T10:00:00Z",
  "coverage": { "totalDirectories": 10, "documentedSystems": 99, "percentage": 1 },
  "systems": {
    "src/api": {
      "agentsMdPath": "src/api/AGENTS.md",
      "status": "stale",
      "fileCount": 4,
      "codemapUpdated": null,
      "curatorUpdated": "2024-05-01T10:00:00Z",
      "tokens": 300
    }
  },
  "pending": [
    { "path": "src/db", "detectedAt": "2024-05-01T10:00:00Z", "reason": "canonical", "score": 6 }
  ],
  "hierarchy": {},
  "synthesis": { "lastRun": null, "factsDeduped": 3, "parentNodesCreated": 1 }
}"#,
    );

    let store = ManifestStore::new(fixture.path(".context-layer/manifest.json"));
    let mut manifest = store.load_required().unwrap();
    assert_eq!(manifest.systems["src/api"].status, SystemStatus::Stale);
    assert_eq!(manifest.synthesis.facts_deduped, 3);

    // Saving recomputes derived coverage.
    store.save(&mut manifest).unwrap();
    assert_eq!(manifest.coverage.documented_systems, 1);
    assert_eq!(manifest.coverage.percentage, 10);

    let status = fixture.layer().status().unwrap().unwrap();
    assert_eq!(status.stale_systems, vec!["src/api"]);
    assert_eq!(status.pending.len(), 1);
    assert!(status.last_synthesis.is_some());
}
