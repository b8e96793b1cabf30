//! Generation lifecycle: implicit creation on open, explicit deletion.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open a generation, creating it if it doesn't exist.
    ///
    /// Returns true when the generation was created by this call.
    pub async fn open_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation name, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a generation exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry stored in it.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_generation("frappe-cache-v1").await.unwrap());
        assert!(!db.open_generation("frappe-cache-v1").await.unwrap());
        assert_eq!(db.generation_names().await.unwrap(), vec!["frappe-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_has_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.has_generation("v1").await.unwrap());
        db.open_generation("v1").await.unwrap();
        assert!(db.has_generation("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_generation("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_leaves_others() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert_eq!(db.generation_names().await.unwrap(), vec!["v2".to_string()]);
    }
}
