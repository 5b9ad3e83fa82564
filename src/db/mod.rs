//! Document store.
//!
//! One concurrent map per collection, persisted as one JSON file per
//! collection under the data directory. Writes are atomic (write to .tmp,
//! rename); persistence failures are logged, never surfaced, and every
//! operation is attempted exactly once. Without a data directory the store
//! runs in-memory only.

pub mod cascade;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::announcement::Announcement;
use crate::community::Community;
use crate::event::Event;
use crate::message::Message;
use crate::notification::Notification;
use crate::post::{Comment, Post};
use crate::users::User;

/// A single named collection of documents keyed by ID.
#[derive(Clone)]
pub struct Collection<T> {
    name: &'static str,
    docs: Arc<DashMap<String, T>>,
    /// Persistence file (`{data_dir}/{name}.json`). None = in-memory only.
    file: Option<PathBuf>,
}

impl<T: Clone + Serialize + DeserializeOwned> Collection<T> {
    fn new(name: &'static str, data_dir: Option<&Path>) -> Self {
        Self {
            name,
            docs: Arc::new(DashMap::new()),
            file: data_dir.map(|dir| dir.join(format!("{name}.json"))),
        }
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.docs.get(id).map(|doc| doc.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn insert(&self, id: &str, doc: T) {
        self.docs.insert(id.to_string(), doc);
        self.persist();
    }

    /// Bulk insert with a single persistence pass.
    pub fn insert_many<I: IntoIterator<Item = (String, T)>>(&self, docs: I) {
        for (id, doc) in docs {
            self.docs.insert(id, doc);
        }
        self.persist();
    }

    /// Apply `f` to the document under its entry lock, then persist.
    /// Returns None when the document does not exist.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            // Entry guard must drop before persist() iterates the map.
            let mut entry = self.docs.get_mut(id)?;
            f(entry.value_mut())
        };
        self.persist();
        Some(result)
    }

    /// Apply `f` to every document, then persist once.
    pub fn update_all(&self, mut f: impl FnMut(&mut T)) {
        for mut entry in self.docs.iter_mut() {
            f(entry.value_mut());
        }
        self.persist();
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        let removed = self.docs.remove(id).map(|(_, doc)| doc);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Delete every document matching the predicate; returns how many went.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.docs.len();
        self.docs.retain(|_, doc| !pred(doc));
        let removed = before - self.docs.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.docs
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.docs
            .iter()
            .find(|entry| pred(entry.value()))
            .map(|entry| entry.value().clone())
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.docs.iter().filter(|entry| pred(entry.value())).count()
    }

    pub fn all(&self) -> Vec<T> {
        self.docs.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Load this collection from disk. Missing or corrupt files start fresh.
    fn load(&self) -> usize {
        let path = match &self.file {
            Some(p) => p,
            None => return 0,
        };

        if !path.exists() {
            return 0;
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, T>>(&contents) {
                Ok(entries) => {
                    let count = entries.len();
                    for (id, doc) in entries {
                        self.docs.insert(id, doc);
                    }
                    count
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        collection = self.name,
                        path = %path.display(),
                        "Failed to parse collection file, starting fresh"
                    );
                    0
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    collection = self.name,
                    path = %path.display(),
                    "Failed to read collection file, starting fresh"
                );
                0
            }
        }
    }

    /// Persist the collection to disk with an atomic temp-file write.
    fn persist(&self) {
        let path = match &self.file {
            Some(p) => p,
            None => return,
        };

        let entries: HashMap<String, T> = self
            .docs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let json = match serde_json::to_string(&entries) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, collection = self.name, "Failed to serialize collection");
                return;
            }
        };

        let tmp_path = path.with_extension("json.tmp");
        match std::fs::write(&tmp_path, &json) {
            Ok(()) => {
                if let Err(e) = std::fs::rename(&tmp_path, path) {
                    tracing::error!(error = %e, collection = self.name, "Failed to rename collection temp file");
                    let _ = std::fs::remove_file(&tmp_path);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, collection = self.name, "Failed to write collection temp file");
            }
        }
    }
}

/// All collections of the platform.
#[derive(Clone)]
pub struct Database {
    pub users: Collection<User>,
    pub communities: Collection<Community>,
    pub posts: Collection<Post>,
    pub comments: Collection<Comment>,
    pub events: Collection<Event>,
    pub announcements: Collection<Announcement>,
    pub messages: Collection<Message>,
    pub notifications: Collection<Notification>,
}

impl Database {
    /// Open the database, loading every collection from `data_dir` when set.
    pub fn open(data_dir: Option<&Path>) -> Self {
        if let Some(dir) = data_dir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::error!(error = %e, path = %dir.display(), "Failed to create data directory");
            }
        } else {
            tracing::info!("No data directory configured, running in-memory only");
        }

        let db = Self {
            users: Collection::new("users", data_dir),
            communities: Collection::new("communities", data_dir),
            posts: Collection::new("posts", data_dir),
            comments: Collection::new("comments", data_dir),
            events: Collection::new("events", data_dir),
            announcements: Collection::new("announcements", data_dir),
            messages: Collection::new("messages", data_dir),
            notifications: Collection::new("notifications", data_dir),
        };

        if data_dir.is_some() {
            let loaded = db.users.load()
                + db.communities.load()
                + db.posts.load()
                + db.comments.load()
                + db.events.load()
                + db.announcements.load()
                + db.messages.load()
                + db.notifications.load();
            tracing::info!(
                documents = loaded,
                users = db.users.len(),
                communities = db.communities.len(),
                "Database loaded from disk"
            );
        }

        db
    }
}
