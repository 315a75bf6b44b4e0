//! Persistence behavior of `FileAdapterRegistry`.

use serde_json::json;
use switchyard_foundation::FileAdapterRegistry;
use switchyard_kernel::{AdapterConfig, AdapterKind, AdapterRegistry, RegistryError};
use tempfile::TempDir;

#[test]
fn missing_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    assert!(reg.list().is_empty());
    assert!(dir.path().join("scripts").is_dir());
}

#[test]
fn upsert_persists_and_reopens() {
    let dir = TempDir::new().unwrap();
    {
        let reg = FileAdapterRegistry::open(dir.path()).unwrap();
        reg.upsert(
            AdapterConfig::builtin("deepseek", "DeepSeek")
                .with_setting("base_url", json!("https://api.deepseek.com")),
        )
        .unwrap();
    }

    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    let cfg = reg.get("deepseek").unwrap();
    assert_eq!(cfg.kind, AdapterKind::Builtin);
    assert_eq!(cfg.setting_str("base_url"), Some("https://api.deepseek.com"));
}

#[test]
fn custom_source_is_materialized_and_removed_on_delete() {
    let dir = TempDir::new().unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    let source = "fn generate_stream(messages, settings) { \"hi\" }";
    reg.upsert(AdapterConfig::custom("echo", "Echo", source)).unwrap();

    let script = reg.script_path("echo");
    assert_eq!(std::fs::read_to_string(&script).unwrap(), source);

    assert!(reg.delete("echo").unwrap());
    assert!(!script.exists());
    assert!(reg.get("echo").is_none());
    assert!(!reg.delete("echo").unwrap());
}

#[test]
fn delete_tolerates_missing_script_file() {
    let dir = TempDir::new().unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    reg.upsert(AdapterConfig::custom("echo", "Echo", "fn generate_stream(m, s) { 1 }"))
        .unwrap();
    std::fs::remove_file(reg.script_path("echo")).unwrap();
    assert!(reg.delete("echo").unwrap());
}

#[test]
fn legacy_layouts_are_loaded() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("models.json"),
        json!({
            "gpt": {"name": "GPT", "type": "openai", "config": {"model": "gpt-4o"}},
            "echo": {"id": "echo", "name": "Echo", "type": "custom",
                     "script_content": "fn generate_stream(m, s) { \"x\" }"}
        })
        .to_string(),
    )
    .unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    assert_eq!(reg.get("gpt").unwrap().setting_str("model"), Some("gpt-4o"));
    assert_eq!(reg.get("echo").unwrap().kind, AdapterKind::Custom);

    let list_dir = TempDir::new().unwrap();
    std::fs::write(
        list_dir.path().join("models.json"),
        json!([{"id": "a", "name": "A", "type": "openai"}]).to_string(),
    )
    .unwrap();
    let reg = FileAdapterRegistry::open(list_dir.path()).unwrap();
    assert_eq!(reg.list().len(), 1);
}

#[test]
fn corrupt_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("models.json"), "{not json").unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    assert!(reg.list().is_empty());
}

#[test]
fn ids_cannot_place_scripts_outside_the_data_dir() {
    let root = TempDir::new().unwrap();
    let data = root.path().join("data");
    let reg = FileAdapterRegistry::open(&data).unwrap();

    let err = reg
        .upsert(AdapterConfig::custom("../../escaped", "Escaped", "fn generate_stream(m, s) { 1 }"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Invalid(_)), "{err}");
    assert!(!root.path().join("escaped.rhai").exists());
    assert!(!data.join("escaped.rhai").exists());
    assert!(reg.list().is_empty());
}

#[test]
fn unsafe_ids_in_registry_file_are_skipped() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("models.json"),
        json!([
            {"id": "../victim", "name": "Bad", "type": "custom", "script_content": "fn f() {}"},
            {"id": "ok", "name": "Ok", "type": "openai"}
        ])
        .to_string(),
    )
    .unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    assert_eq!(reg.list().len(), 1);
    assert!(reg.get("ok").is_some());
}

#[test]
fn failed_persist_leaves_no_script_behind() {
    let dir = TempDir::new().unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    // A directory in place of models.json makes every write fail.
    std::fs::create_dir(dir.path().join("models.json")).unwrap();

    assert!(
        reg.upsert(AdapterConfig::custom("echo", "Echo", "fn generate_stream(m, s) { 1 }"))
            .is_err()
    );
    assert!(!reg.script_path("echo").exists());
    assert!(reg.get("echo").is_none());
}

#[test]
fn switching_to_builtin_drops_the_script_mirror() {
    let dir = TempDir::new().unwrap();
    let reg = FileAdapterRegistry::open(dir.path()).unwrap();
    reg.upsert(AdapterConfig::custom("m", "M", "fn generate_stream(m, s) { 1 }"))
        .unwrap();
    assert!(reg.script_path("m").exists());

    reg.upsert(AdapterConfig::builtin("m", "M")).unwrap();
    assert!(!reg.script_path("m").exists());
    assert_eq!(reg.get("m").unwrap().kind, AdapterKind::Builtin);
}
