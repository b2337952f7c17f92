use keeper_core::manifest::{FileRecord, Manifest};

fn rec(path: &str, crc: u32) -> FileRecord {
    FileRecord { path: path.to_string(), crc }
}

#[test]
fn serialize_layout() {
    let m = Manifest::new(vec![rec("zeta", 0x1), rec("alpha", 0xDEADBEEF)]);
    assert_eq!(
        m.to_sfv_string(),
        "; Generated by keeper\n;\nalpha DEADBEEF\nzeta 00000001\n"
    );
}

#[test]
fn comments_and_blanks_skipped() {
    let d = Manifest::parse("; anything\n\n;\n   \na 00000001\n; trailing\n");
    // A whitespace-only line is not empty: zero tokens is a format error.
    assert_eq!(d.errors.len(), 1);
    assert_eq!(d.errors[0].line_no, 4);
    assert_eq!(d.manifest.records(), &[rec("a", 1)]);
}

#[test]
fn wrong_field_counts() {
    let d = Manifest::parse("one\nthree fields here\nok 0000ABCD\n");
    assert_eq!(d.errors.len(), 2);
    assert_eq!(d.errors[0].line, "one");
    assert_eq!(d.errors[1].line, "three fields here");
    assert_eq!(d.manifest.len(), 1);
    assert!(d.manifest.contains("ok"));
}

#[test]
fn tabs_and_runs_of_spaces_split() {
    let d = Manifest::parse("a\t\t00000002\nb    00000003\n");
    assert!(d.errors.is_empty());
    assert_eq!(d.manifest.records(), &[rec("a", 2), rec("b", 3)]);
}

#[test]
fn non_hex_and_overlong_checksums() {
    let d = Manifest::parse("a 0000000G\nb 1234567890\nc -1\n");
    assert_eq!(d.errors.len(), 3);
    assert!(d.manifest.is_empty());
    assert!(d.errors[0].to_string().starts_with("malformed line 1: invalid checksum"));
}

#[test]
fn unsorted_input_is_sorted_on_load() {
    let d = Manifest::parse("; Generated by keeper\n;\nb 00000002\na 00000001\n");
    assert_eq!(d.manifest.to_sfv_string(), "; Generated by keeper\n;\na 00000001\nb 00000002\n");
}

#[test]
fn duplicates_keep_first() {
    let d = Manifest::parse("a 00000001\na 00000002\n");
    assert_eq!(d.errors.len(), 1);
    assert_eq!(d.errors[0].line_no, 2);
    assert!(d.errors[0].reason.contains("line 1"));
    assert_eq!(d.manifest.records(), &[rec("a", 1)]);
}

#[test]
fn escaping_paths_rejected() {
    let d = Manifest::parse("/etc/passwd 00000001\n../up 00000002\nsub/../../x 00000003\nsub/ok 00000004\n");
    assert_eq!(d.errors.len(), 3);
    assert_eq!(d.manifest.records(), &[rec("sub/ok", 4)]);
}

#[test]
fn reload_is_byte_identical() {
    let text = "; Generated by keeper\n;\n0_byte_file 00000000\n10_byte_file_rising_ints 456CD746\nhello_world_file_nl 7D14DDDD\n";
    let d = Manifest::parse(text);
    assert!(d.errors.is_empty());
    assert_eq!(d.manifest.to_sfv_string(), text);
}

#[test]
fn write_truncates_existing_file() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("out.sfv");
    std::fs::write(&p, "x".repeat(4096)).unwrap();
    Manifest::new(vec![rec("a", 10)]).write(&p).unwrap();
    assert_eq!(std::fs::read_to_string(&p).unwrap(), "; Generated by keeper\n;\na 0000000A\n");
}
