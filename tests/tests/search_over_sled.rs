mod common;

use std::sync::Arc;

use common::{album, sled_albums};
use strata_core::{BoxCursor, CursorError, CursorExt, ExecuteConfig, NoNextReason, PipelineOperation, RecordStore, ScanProperties};
use strata_proto::{tuple, Continuation, IndexEntry};
use strata_search::{
    AutoCompleteScan, DirectoryManager, IndexScanBounds, SearchIndex, SearchIndexMaintainer, SearchQuery, SearchScanQuery, StandardAnalyzer,
};

async fn indexed_albums(count: i64, config: ExecuteConfig) -> Result<(strata_storage_sled::SledStorageEngine, SearchIndexMaintainer), anyhow::Error> {
    let (engine, store) = sled_albums(count, config).await?;
    let maintainer = title_index(store);
    for id in 0..count {
        maintainer.update(None, Some(&album(id))).await?;
    }
    Ok((engine, maintainer))
}

fn title_index(store: RecordStore) -> SearchIndexMaintainer {
    let index = SearchIndex::new("album_titles", "Album", &["title"]).with_auto_complete(true);
    SearchIndexMaintainer::new(index, store, Arc::new(DirectoryManager::new()), Arc::new(StandardAnalyzer))
}

fn pks(entries: &[IndexEntry]) -> Vec<i64> {
    entries.iter().filter_map(|e| e.primary_key.as_ref().and_then(|pk| pk.get(0)).and_then(|v| v.as_int())).collect()
}

async fn collect(cursor: BoxCursor<IndexEntry>) -> Result<(Vec<IndexEntry>, NoNextReason), CursorError> {
    let (entries, reason, _) = cursor.collect_all().await?;
    Ok((entries, reason))
}

#[tokio::test]
async fn test_auto_complete_loads_records_from_sled() -> Result<(), anyhow::Error> {
    for depth in [1, 4] {
        let config = ExecuteConfig::default().with_pipeline_size(PipelineOperation::KeyToRecord, depth);
        let (_engine, maintainer) = indexed_albums(30, config).await?;
        let bounds = IndexScanBounds::AutoComplete(AutoCompleteScan::new("jazz sess"));
        let (entries, reason) = collect(maintainer.scan(&bounds, &Continuation::Start, &ScanProperties::new().with_limit(5))?).await?;
        assert_eq!(pks(&entries), vec![1, 4, 7, 10, 13], "depth {depth}");
        assert_eq!(reason, NoNextReason::ReturnLimitReached);
        assert_eq!(entries[0].key, tuple!["title", "jazz sessions volume 1"]);
    }
    Ok(())
}

#[tokio::test]
async fn test_auto_complete_skips_records_gone_from_the_store() -> Result<(), anyhow::Error> {
    let (_engine, maintainer) = indexed_albums(12, ExecuteConfig::default()).await?;
    // removed from the store, the index not yet updated
    maintainer.context().store.delete_record(&tuple![4]).await?;
    let bounds = IndexScanBounds::AutoComplete(AutoCompleteScan::new("jazz"));
    let (entries, reason) = collect(maintainer.scan(&bounds, &Continuation::Start, &ScanProperties::new())?).await?;
    assert_eq!(pks(&entries), vec![1, 7, 10]);
    assert_eq!(reason, NoNextReason::SourceExhausted);
    Ok(())
}

#[tokio::test]
async fn test_search_scan_pages_with_tokens() -> Result<(), anyhow::Error> {
    let (_engine, maintainer) = indexed_albums(30, ExecuteConfig::default().with_search_page_size(3)).await?;
    let bounds = IndexScanBounds::Query(SearchScanQuery::new(SearchQuery::term("title", "folk")));

    let mut token: Option<String> = None;
    let mut found = Vec::new();
    loop {
        let continuation = match &token {
            Some(token) => Continuation::from_base64(token)?,
            None => Continuation::Start,
        };
        let (page, reason, next) = maintainer.scan(&bounds, &continuation, &ScanProperties::new().with_limit(4))?.collect_all().await?;
        found.extend(pks(&page));
        if reason.is_source_exhausted() {
            break;
        }
        token = Some(next.to_base64());
    }
    assert_eq!(found, (0..30).filter(|id| id % 3 == 2).collect::<Vec<_>>());
    Ok(())
}
