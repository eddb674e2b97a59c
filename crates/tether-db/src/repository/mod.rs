//! # Repository Module
//!
//! SQL access behind small typed handles.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.table("friends")          db.sync_nodes()                          │
//! │       │                            │                                    │
//! │       ▼                            ▼                                    │
//! │  Table                        SyncNodeRepository                       │
//! │  ├── put(doc)                 ├── upsert_connecting(url, ..)           │
//! │  ├── get(key)                 ├── set_status(url, status, error)       │
//! │  ├── delete(key)              ├── get(url) / list()                    │
//! │  └── count()                  └── delete(url)                          │
//! │       │                            │                                    │
//! │       ▼                            ▼                                    │
//! │  "<store>" (pk, doc JSON)     _sync_nodes                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod sync_nodes;
pub mod table;
