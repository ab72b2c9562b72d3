use crate::gid::{GlobalId, Lid};
use thiserror::Error;

/// Errors reported by the meta store writer and by `GlobalId` parsing.
///
/// Reads never fail: an absent mapping is `NO_LID`, not an error.
///
/// 元数据存储写入者和 `GlobalId` 解析报告的错误。读取永远不会失败。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaStoreError {
    /// LID 0 is reserved for "no mapping".
    #[error("lid {lid} cannot be assigned to a document")]
    InvalidLid { lid: Lid },

    /// The GID is already mapped to another LID.
    #[error("gid {gid} is already mapped to lid {existing}")]
    GidAlreadyMapped { gid: GlobalId, existing: Lid },

    /// The LID already holds another GID.
    #[error("lid {lid} is in use by gid {existing}")]
    LidInUse { lid: Lid, existing: GlobalId },

    /// The LID lies above the store's configured maximum.
    #[error("lid {lid} exceeds the maximum lid {max_lid}")]
    LidOutOfRange { lid: Lid, max_lid: Lid },

    /// No LID is left to allocate.
    #[error("lid space exhausted")]
    LidSpaceExhausted,

    /// Input could not be parsed as a `GlobalId`.
    #[error("invalid global id: {input}")]
    InvalidGlobalId { input: String },
}
