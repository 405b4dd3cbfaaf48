use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{sqlite::db, SqliteDatabase};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    db::create_database(url).await.expect("Error creating database");
    let store = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db::run_migrations(store.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/storefront_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}
