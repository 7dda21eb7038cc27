//! Tests for ValueLogReader
//!
//! These tests verify:
//! - Values resolve from active, silence and retired segments
//! - Bad addresses are reported as corruption

use stratakv::config::WalSyncStrategy;
use stratakv::layout::{Layout, LogKind};
use stratakv::storage::ValueLogReader;
use stratakv::wal::{self, LogRecord, LogWriter};
use stratakv::{StrataError, ValueAddress};
use tempfile::TempDir;

fn setup_layout() -> (TempDir, Layout) {
    let temp_dir = TempDir::new().unwrap();
    let layout = Layout::new(temp_dir.path(), LogKind::ValueLog);
    layout.create_dirs().unwrap();
    (temp_dir, layout)
}

#[test]
fn test_read_follows_segment_lifecycle() {
    let (_temp, layout) = setup_layout();
    let reader = ValueLogReader::new(layout.clone());
    let mut writer = LogWriter::create(&layout, 3, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&LogRecord::put("a", "first")).unwrap();
    let offset = writer.append(&LogRecord::put("b", vec![7u8; 2048])).unwrap();
    let address = ValueAddress::new(3, offset);

    // Active
    assert_eq!(reader.read(address).unwrap(), vec![7u8; 2048]);

    // Silence
    writer.seal().unwrap();
    assert_eq!(reader.read(address).unwrap(), vec![7u8; 2048]);

    // Retired
    wal::retire(&layout, 3).unwrap();
    assert_eq!(reader.read(address).unwrap(), vec![7u8; 2048]);
    assert_eq!(reader.read(ValueAddress::new(3, 0)).unwrap(), b"first".to_vec());
}

#[test]
fn test_missing_segment_is_corruption() {
    let (_temp, layout) = setup_layout();
    let reader = ValueLogReader::new(layout);

    assert!(matches!(
        reader.read(ValueAddress::new(42, 0)),
        Err(StrataError::Corruption(_))
    ));
}

#[test]
fn test_address_of_deletion_is_corruption() {
    let (_temp, layout) = setup_layout();
    let mut writer = LogWriter::create(&layout, 1, WalSyncStrategy::EveryWrite).unwrap();
    let offset = writer.append(&LogRecord::delete("gone")).unwrap();

    let reader = ValueLogReader::new(layout);

    assert!(matches!(
        reader.read(ValueAddress::new(1, offset)),
        Err(StrataError::Corruption(_))
    ));
}

#[test]
fn test_offset_past_end_is_corruption() {
    let (_temp, layout) = setup_layout();
    let mut writer = LogWriter::create(&layout, 1, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&LogRecord::put("k", "v")).unwrap();
    let end = writer.len();

    let reader = ValueLogReader::new(layout);

    assert!(matches!(
        reader.read(ValueAddress::new(1, end)),
        Err(StrataError::Corruption(_))
    ));
}
