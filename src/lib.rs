//! Generation-pinned GID to LID mapping over a single-writer, multi-reader
//! document meta store.
//!
//! A [`DocumentMetaStore`] holds the association between global document ids
//! ([`GlobalId`]) and dense local ids ([`Lid`]). One [`MetaStoreWriter`]
//! mutates a private working copy and publishes it with `commit()`; every
//! commit advances the store's generation. Readers pin a generation with a
//! [`ReadGuard`] and resolve through a [`GidToLidMapper`], which answers every
//! lookup and enumeration from that one snapshot while the writer keeps going.
//!
//! The read path takes no locks. Published snapshots are never modified in
//! place; the writer retires them tagged with their generation and frees them
//! once no reader is pinned at or before that generation.
//!
//! ```
//! use gidmap::{DocumentMetaStore, GlobalId, NO_LID};
//!
//! let a = GlobalId::new([0xa; 12]);
//! let b = GlobalId::new([0xb; 12]);
//!
//! let (mut writer, store) = DocumentMetaStore::new();
//! writer.put(a, 7).unwrap();
//! writer.put(b, 9).unwrap();
//! writer.commit();
//!
//! let reader = store.register_reader();
//! let before = reader.gid_to_lid_mapper();
//!
//! writer.remove(&a);
//! writer.commit();
//!
//! let after = reader.gid_to_lid_mapper();
//! assert_eq!(before.map_gid_to_lid(&a), 7);
//! assert_eq!(after.map_gid_to_lid(&a), NO_LID);
//! assert_eq!(after.iter().collect::<Vec<_>>(), vec![(b, 9)]);
//! ```
//!
//! 基于代数钉住的 GID 到 LID 映射，构建在单写入者多读者的文档元数据存储之上。

mod domain;
mod error;
mod frozen;
mod garbage;
mod gid;
mod lid;
mod mapper;
mod ptr;
mod reader;
mod state;
mod sync;
mod writer;

pub use domain::{DocumentMetaStore, DocumentMetaStoreBuilder};
pub use error::MetaStoreError;
pub use frozen::{LiveLids, RawMetaData};
pub use gid::{GlobalId, Lid, NO_LID};
pub use mapper::{GidLidIter, GidToLidMapper};
pub use reader::{MetaStoreReader, ReadGuard};
pub use state::Generation;
pub use writer::MetaStoreWriter;

#[cfg(all(test, not(feature = "loom")))]
mod tests;
