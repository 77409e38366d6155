//! Discovery mode tests.
//!
//! Tests verify:
//! - Files are partitioned into the groups the reader forms
//! - Unnamed and unrecognized files are left out
//! - Overlapping groups are reported, not rejected

use omeis_import::{DiscoveredGroup, Importer, OmeisClient};

use super::test_utils::{MockImageReader, MockOmeis};

fn omeis_with(names: &[(u64, &str)]) -> MockOmeis {
    names.iter().fold(MockOmeis::new(), |omeis, (id, name)| {
        omeis.with_file(*id, name, &format!("/omeis/Files/{}", id))
    })
}

async fn discover(reader: MockImageReader, omeis: &MockOmeis, ids: &[u64]) -> Vec<Vec<u64>> {
    let mut importer = Importer::new(reader, OmeisClient::new(omeis.clone()));
    let groups = importer.test_ids(ids).await.unwrap();
    assert_eq!(importer.reader().close_count(), 1);
    groups.into_iter().map(|g| g.ids).collect()
}

#[tokio::test]
async fn test_partition_into_groups() {
    let omeis = omeis_with(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
    let reader = MockImageReader::new()
        .with_group(&["a", "b"])
        .with_group(&["c"]);

    let groups = discover(reader, &omeis, &[4, 3, 2, 1]).await;

    // Members are matched from the last used file backwards; "d" is not
    // a recognized format
    assert_eq!(groups, vec![vec![2, 1], vec![3]]);
    assert_eq!(omeis.call_count("NewPixels"), 0);
    assert_eq!(omeis.call_count("GetNativeEndian"), 0);
}

#[tokio::test]
async fn test_unnamed_file_skipped() {
    let omeis = omeis_with(&[(1, "a")]).with_unnamed_file(2, "/omeis/Files/2");
    let reader = MockImageReader::new().with_group(&["a"]);

    let groups = discover(reader, &omeis, &[1, 2]).await;
    assert_eq!(groups, vec![vec![1]]);

    // No local path is requested for a file without a name
    let calls = omeis.calls();
    assert!(!calls.contains(&("GetLocalPath".to_string(), "FileID=2".to_string())));
}

#[tokio::test]
async fn test_group_without_requested_members_is_empty() {
    let omeis = omeis_with(&[(1, "a")]);
    let reader = MockImageReader::new().with_used_files("a", vec![Some("elsewhere".to_string())]);

    let groups = discover(reader, &omeis, &[1]).await;
    assert_eq!(groups, vec![Vec::<u64>::new()]);
}

#[tokio::test]
async fn test_null_used_file_ignored() {
    let omeis = omeis_with(&[(1, "a"), (2, "b")]);
    let reader = MockImageReader::new()
        .with_used_files("a", vec![Some("a".to_string()), None, Some("b".to_string())]);

    let groups = discover(reader, &omeis, &[1, 2]).await;
    assert_eq!(groups, vec![vec![2, 1]]);
}

#[tokio::test]
async fn test_overlapping_groups_reported_twice() {
    let omeis = omeis_with(&[(1, "a"), (2, "b"), (3, "c")]);
    let reader = MockImageReader::new()
        .with_used_files("a", vec![Some("a".to_string()), Some("c".to_string())])
        .with_used_files("b", vec![Some("b".to_string()), Some("c".to_string())]);

    let groups = discover(reader, &omeis, &[1, 2, 3]).await;
    assert_eq!(groups, vec![vec![3, 1], vec![3, 2]]);
}

#[tokio::test]
async fn test_earlier_files_not_claimed_by_later_groups() {
    let omeis = omeis_with(&[(1, "a"), (2, "b")]);
    let reader = MockImageReader::new()
        .with_used_files("a", vec![Some("a".to_string())])
        .with_used_files("b", vec![Some("a".to_string()), Some("b".to_string())]);

    let groups = discover(reader, &omeis, &[1, 2]).await;
    assert_eq!(groups, vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn test_no_ids_yields_no_groups() {
    let omeis = MockOmeis::new();
    let groups = discover(MockImageReader::new(), &omeis, &[]).await;
    assert!(groups.is_empty());
}

#[test]
fn test_group_line_format() {
    let group = DiscoveredGroup { ids: vec![12, 3, 7] };
    assert_eq!(group.to_line(), "12 3 7");
    assert_eq!(DiscoveredGroup { ids: vec![] }.to_line(), "");
}
