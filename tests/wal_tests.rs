//! Tests for the write-ahead log
//!
//! These tests verify:
//! - Frame encoding and CRC validation
//! - LSN generation and sequencing
//! - Sync strategies and truncation
//! - Reopening after recovery without a rescan
//! - Recovery from partial writes and corruption

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wordcount::config::WalSyncStrategy;
use wordcount::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use wordcount::StoreError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn increment(word: &str) -> Operation {
    Operation::Increment {
        word: word.to_string(),
    }
}

fn open_writer(path: &Path, sync_strategy: WalSyncStrategy) -> WalWriter {
    let (_, result) = WalRecovery::recover(path).unwrap();
    WalWriter::open_after_recovery(path, sync_strategy, result.last_lsn).unwrap()
}

fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = open_writer(path, WalSyncStrategy::EveryWrite);
    for i in 0..count {
        writer.append(increment(&format!("word{}", i))).unwrap();
    }
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_frame_layout() {
    let entry = WalEntry::new(7, increment("hello"));

    let bytes = entry.serialize().unwrap();

    assert!(bytes.len() > HEADER_SIZE);
    assert_eq!(u64::from_le_bytes(bytes[0..8].try_into().unwrap()), 7);
    let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);
    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

#[test]
fn test_entry_crc_detects_flipped_byte() {
    let entry = WalEntry::new(1, increment("hello"));
    let mut bytes = entry.serialize().unwrap();

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(StoreError::WalCorruption(_))));
}

#[test]
fn test_entry_truncated_frame_is_corruption() {
    let entry = WalEntry::new(1, increment("hello"));
    let bytes = entry.serialize().unwrap();

    let result = WalEntry::deserialize(&bytes[..HEADER_SIZE + 2]);
    assert!(matches!(result, Err(StoreError::WalCorruption(_))));
}

#[test]
fn test_operation_word() {
    assert_eq!(increment("ok").word(), "ok");
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = open_writer(&wal_path, WalSyncStrategy::EveryWrite);
    let lsn = writer.append(increment("key1")).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.size(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = open_writer(&wal_path, WalSyncStrategy::EveryNEntries { count: 3 });

    let lsns: Vec<u64> = (0..5).map(|i| writer.append(increment(&i.to_string())).unwrap()).collect();

    assert_eq!(lsns, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);

    let mut writer = open_writer(&wal_path, WalSyncStrategy::EveryWrite);

    assert_eq!(writer.current_lsn(), 5);
    assert_eq!(writer.append(increment("next")).unwrap(), 5);
}

#[test]
fn test_create_discards_existing_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);

    let writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

#[test]
fn test_truncate_keeps_lsn_counting() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = open_writer(&wal_path, WalSyncStrategy::EveryWrite);
    writer.append(increment("a")).unwrap();
    writer.append(increment("b")).unwrap();

    writer.truncate().unwrap();

    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(writer.append(increment("c")).unwrap(), 3);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().lsn, 3);
    assert!(reader.next_entry().unwrap().is_none());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_reads_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);

    let mut reader = WalReader::open(&wal_path).unwrap();

    for i in 0..3 {
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.lsn, i + 1);
        assert_eq!(entry.operation.word(), format!("word{}", i));
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), reader.len());
}

#[test]
fn test_reader_errors_at_garbage_without_advancing() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let mut file = fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    reader.next_entry().unwrap().unwrap();
    reader.next_entry().unwrap().unwrap();
    let valid_end = reader.position();

    assert!(matches!(reader.next_entry(), Err(StoreError::WalCorruption(_))));
    assert_eq!(reader.position(), valid_end);
    assert_eq!(reader.len(), valid_end + 3);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    let good_bytes = WalEntry::new(1, increment("k")).serialize().unwrap();
    let mut bad_bytes = WalEntry::new(2, increment("k2")).serialize().unwrap();
    bad_bytes.truncate(HEADER_SIZE + 4);

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&good_bytes).unwrap();
    file.write_all(&bad_bytes).unwrap();
    file.sync_all().unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good_bytes.len() as u64);
}

#[test]
fn test_recover_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let good_bytes = WalEntry::new(1, increment("k1")).serialize().unwrap();
    let mut bad_bytes = WalEntry::new(2, increment("k2")).serialize().unwrap();
    if let Some(byte) = bad_bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&good_bytes).unwrap();
    file.write_all(&bad_bytes).unwrap();
    file.sync_all().unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_rejects_lsn_going_backwards() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&WalEntry::new(5, increment("a")).serialize().unwrap()).unwrap();
    file.write_all(&WalEntry::new(3, increment("b")).serialize().unwrap()).unwrap();
    file.sync_all().unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_lsn, 5);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_open_after_recovery_continues_from_given_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);

    let (_, result) = WalRecovery::recover(&wal_path).unwrap();
    let mut writer =
        WalWriter::open_after_recovery(&wal_path, WalSyncStrategy::EveryWrite, result.last_lsn.max(40))
            .unwrap();

    assert_eq!(writer.current_lsn(), 41);
    assert_eq!(writer.size(), fs::metadata(&wal_path).unwrap().len());
    assert_eq!(writer.append(increment("after")).unwrap(), 41);

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].lsn, 41);
}
