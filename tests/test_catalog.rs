use imagegen::db::{connect_db, entities::images};
use imagegen::gemini::GeneratedImage;
use imagegen::store::{ImageStore, generate_filename};
use sea_orm_migration::MigratorTrait;

#[tokio::test]
async fn test_store_and_catalog_on_disk_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("image_metadata.sqlite");
    let db = connect_db(db_path.to_str().expect("utf-8 path"))
        .await
        .expect("connect db");
    imagegen::db::migrations::Migrator::up(&db, None)
        .await
        .expect("run migrations");

    let store = ImageStore::new(db.clone(), dir.path().join("PNG"));
    let filename = generate_filename(chrono::Local::now());
    let record = store
        .save(
            &GeneratedImage {
                filename: filename.clone(),
                bytes: b"not really a png".to_vec(),
                mime_type: "image/png".to_string(),
            },
            "a quiet harbour",
        )
        .await
        .expect("save");
    assert_eq!((record.width, record.height), (0, 0));

    let listed = store.catalog().list().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].prompt, "a quiet harbour");
    assert!(store.catalog().reconcile().await.expect("reconcile").is_consistent());

    store.delete(&filename).await.expect("delete");
    assert!(images::Entity::newest_first(&db).await.expect("rows").is_empty());
    assert!(store.catalog().list().await.expect("list").is_empty());
}
