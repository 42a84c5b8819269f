use crate::store::RosterStore;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedStore = Arc<RwLock<RosterStore>>;

pub struct Bot {
    pub data: SharedStore,
}

impl Bot {
    pub fn new(store: RosterStore) -> Self {
        Self {
            data: Arc::new(RwLock::new(store)),
        }
    }
}
