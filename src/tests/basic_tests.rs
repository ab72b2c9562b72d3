/// 基础测试模块
/// 测试核心功能的正确性
use crate::{DocumentMetaStore, GlobalId, MetaStoreError, NO_LID};

fn gid(n: u8) -> GlobalId {
    let mut bytes = [0u8; GlobalId::LENGTH];
    bytes[GlobalId::LENGTH - 1] = n;
    GlobalId::new(bytes)
}

/// 测试1: 创建存储并注册读者
#[test]
fn test_create_store_and_register_reader() {
    let (writer, store) = DocumentMetaStore::new();
    assert_eq!(writer.generation(), 0);
    assert_eq!(store.current_generation(), 0);

    let reader = store.register_reader();
    let guard = reader.acquire_guard();
    assert_eq!(guard.generation(), 0);
    assert_eq!(guard.num_live(), 0);
}

/// 测试2: 读者 pin/unpin 循环
#[test]
fn test_reader_pin_unpin_cycle() {
    let (_writer, store) = DocumentMetaStore::new();
    let reader = store.register_reader();

    {
        let _guard = reader.acquire_guard();
        assert!(reader.is_pinned());
    }
    assert!(!reader.is_pinned());

    {
        let _guard = reader.acquire_guard();
        assert!(reader.is_pinned());
    }
    assert!(!reader.is_pinned());
}

/// 测试3: 提交后的解析
#[test]
fn test_resolve_after_commit() {
    let (mut writer, store) = DocumentMetaStore::new();
    writer.put(gid(1), 5).unwrap();
    assert_eq!(writer.commit(), 1);

    let reader = store.register_reader();
    let mapper = reader.gid_to_lid_mapper();
    assert_eq!(mapper.generation(), 1);
    assert_eq!(mapper.map_gid_to_lid(&gid(1)), 5);
    assert_eq!(mapper.len(), 1);
}

/// 测试4: 未提交的修改对读者不可见
#[test]
fn test_uncommitted_changes_are_invisible() {
    let (mut writer, store) = DocumentMetaStore::new();
    let reader = store.register_reader();

    writer.put(gid(1), 5).unwrap();
    assert!(writer.has_pending_changes());
    assert_eq!(writer.lookup(&gid(1)), Some(5));

    let mapper = reader.gid_to_lid_mapper();
    assert_eq!(mapper.map_gid_to_lid(&gid(1)), NO_LID);
    assert!(mapper.is_empty());
}

/// 测试5: 从未插入的 GID 返回哨兵值
#[test]
fn test_unknown_gid_resolves_to_sentinel() {
    let (mut writer, store) = DocumentMetaStore::new();
    writer.put(gid(1), 1).unwrap();
    writer.commit();

    let reader = store.register_reader();
    let mapper = reader.gid_to_lid_mapper();
    assert_eq!(mapper.map_gid_to_lid(&gid(2)), NO_LID);
    assert_eq!(mapper.map_gid_to_lid(&GlobalId::default()), NO_LID);
}

/// 测试6: insert 分配稠密的 LID，并对已存在的 GID 返回原 LID
#[test]
fn test_insert_allocates_dense_lids() {
    let (mut writer, _store) = DocumentMetaStore::new();
    assert_eq!(writer.insert(gid(1)), Ok(1));
    assert_eq!(writer.insert(gid(2)), Ok(2));
    assert_eq!(writer.insert(gid(1)), Ok(1));
    assert_eq!(writer.num_live(), 2);
    assert_eq!(writer.lid_limit(), 3);
}

/// 测试7: put 的错误情况
#[test]
fn test_put_rejects_conflicts() {
    let (mut writer, _store) = DocumentMetaStore::new();

    assert_eq!(
        writer.put(gid(1), NO_LID),
        Err(MetaStoreError::InvalidLid { lid: NO_LID })
    );

    writer.put(gid(1), 3).unwrap();
    assert_eq!(writer.put(gid(1), 3), Ok(()));
    assert_eq!(
        writer.put(gid(1), 4),
        Err(MetaStoreError::GidAlreadyMapped {
            gid: gid(1),
            existing: 3
        })
    );
    assert_eq!(
        writer.put(gid(2), 3),
        Err(MetaStoreError::LidInUse {
            lid: 3,
            existing: gid(1)
        })
    );
    assert_eq!(writer.num_live(), 1);
}

/// 测试8: remove 返回被释放的 LID
#[test]
fn test_remove_returns_lid() {
    let (mut writer, _store) = DocumentMetaStore::new();
    writer.put(gid(1), 3).unwrap();
    writer.put(gid(2), 4).unwrap();

    assert_eq!(writer.remove(&gid(1)), Some(3));
    assert_eq!(writer.remove(&gid(1)), None);
    assert_eq!(writer.remove_lid(4), Some(gid(2)));
    assert_eq!(writer.remove_lid(4), None);
    assert_eq!(writer.num_live(), 0);
    assert_eq!(writer.held_lid_count(), 2);
}

/// 测试9: ReadGuard 的反向查找
#[test]
fn test_guard_reverse_lookup() {
    let (mut writer, store) = DocumentMetaStore::new();
    writer.put(gid(1), 3).unwrap();
    writer.commit();

    let reader = store.register_reader();
    let guard = reader.acquire_guard();
    assert_eq!(guard.lookup(&gid(1)), Some(3));
    assert_eq!(guard.raw_meta_data(3).map(|m| *m.gid()), Some(gid(1)));
    assert_eq!(guard.raw_meta_data(2), None);
    assert_eq!(guard.raw_meta_data(NO_LID), None);
    assert_eq!(guard.raw_meta_data(10_000), None);
    assert_eq!(guard.frozen_lids().collect::<Vec<_>>(), vec![3]);
}

/// 测试10: GlobalId 的十六进制表示
#[test]
fn test_global_id_hex_round_trip() {
    let id = GlobalId::new([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0xab, 0xff]);
    let text = id.to_string();
    assert_eq!(text, "00010203040506070809abff");
    assert_eq!(text.parse::<GlobalId>(), Ok(id));
    assert_eq!(format!("0x{text}").parse::<GlobalId>(), Ok(id));
}

/// 测试11: GlobalId 解析错误
#[test]
fn test_global_id_rejects_bad_input() {
    assert!(matches!(
        "abc".parse::<GlobalId>(),
        Err(MetaStoreError::InvalidGlobalId { .. })
    ));
    assert!("zz0102030405060708090a0b".parse::<GlobalId>().is_err());
    assert!("+f0102030405060708090a0b".parse::<GlobalId>().is_err());

    let short: &[u8] = &[1, 2, 3];
    assert!(GlobalId::try_from(short).is_err());
    let exact: &[u8] = &[7; GlobalId::LENGTH];
    assert_eq!(GlobalId::try_from(exact), Ok(GlobalId::new([7; GlobalId::LENGTH])));
}

/// 测试12: 存储句柄克隆
#[test]
fn test_store_clone_shares_state() {
    let (mut writer, store) = DocumentMetaStore::new();
    let store_clone = store.clone();

    writer.put(gid(1), 1).unwrap();
    writer.commit();

    let reader = store_clone.register_reader();
    assert_eq!(reader.gid_to_lid_mapper().map_gid_to_lid(&gid(1)), 1);
    assert_eq!(store.current_generation(), 1);
}
