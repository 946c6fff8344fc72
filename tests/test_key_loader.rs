use imagegen::{config::setup_logging, keys::KeyLoader};

#[test]
fn test_key_loader_reads_key_file() {
    let _ = setup_logging(true);

    let dir = tempfile::tempdir().expect("tempdir");
    let key_file = dir.path().join("API_key.txt");
    std::fs::write(&key_file, "test-key-123\n").expect("write key file");

    let loader = KeyLoader::new(&key_file).with_env_var("IMAGEGEN_INTEGRATION_UNSET_KEY");
    assert_eq!(loader.load().as_deref(), Some("test-key-123"));

    std::fs::remove_file(&key_file).expect("remove key file");
    assert!(
        loader.load().is_none(),
        "Key should not resolve once the file is gone"
    );
}
