use async_trait::async_trait;
use anyhow::Result;
use dashmap::DashMap;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Site,
    Community,
    Collection,
    Item,
}

impl ObjectKind {
    pub fn is_container(self) -> bool {
        !matches!(self, ObjectKind::Item)
    }
}

/// A repository object as seen by curation tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationObject {
    pub id: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<String>>,
    /// Ids of contained objects (communities, collections, items).
    #[serde(default)]
    pub members: Vec<String>,
}

impl CurationObject {
    pub fn new(id: &str, kind: ObjectKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: String::new(),
            metadata: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_metadata(mut self, field: &str, value: &str) -> Self {
        self.metadata.entry(field.to_string()).or_default().push(value.to_string());
        self
    }

    pub fn with_member(mut self, id: &str) -> Self {
        self.members.push(id.to_string());
        self
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.metadata.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Lookup of objects by persistent id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<CurationObject>>;
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, CurationObject>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, object: CurationObject) {
        self.objects.insert(object.id.clone(), object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl FromIterator<CurationObject> for InMemoryObjectStore {
    fn from_iter<I: IntoIterator<Item = CurationObject>>(iter: I) -> Self {
        let store = InMemoryObjectStore::new();
        for object in iter {
            store.insert(object);
        }
        store
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn find(&self, id: &str) -> Result<Option<CurationObject>> {
        Ok(self.objects.get(id).map(|o| o.value().clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
}

impl Actor {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

/// Per-request context: who is acting and where objects come from.
#[derive(Clone)] // cheap: just Arcs
pub struct Context {
    current_user: Option<Actor>,
    pub store: Arc<dyn ObjectStore>,
}

impl Context {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            current_user: None,
            store,
        }
    }

    pub fn with_user(mut self, user: Actor) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn current_user(&self) -> Option<&Actor> {
        self.current_user.as_ref()
    }

    pub async fn find(&self, id: &str) -> Result<Option<CurationObject>> {
        self.store.find(id).await
    }
}
