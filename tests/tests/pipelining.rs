mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{album, sled_albums};
use futures::FutureExt;
use rand::Rng;
use strata_core::{
    cursor::{CheckValueFn, FlatMapPipelinedCursor, ListCursor, OpenInnerFn},
    BoxCursor, Continuation, Cursor, CursorError, CursorExt, CursorResult, ExecuteConfig, ExecuteState, NoNextReason, Record, RecordStore,
    ScanProperties,
};
use strata_proto::{tuple, TupleRange};

fn album_id(record: &Record) -> i64 { record.primary_key.get(0).and_then(|v| v.as_int()).unwrap_or(-1) }

fn scan(store: &RecordStore, continuation: Continuation) -> Result<BoxCursor<Record>, CursorError> {
    store.scan_records(&TupleRange::all(), &continuation, &ScanProperties::new(), &ExecuteState::unlimited())
}

/// Title words of each album, tagged with the album id
fn title_words(store: &RecordStore, continuation: &Continuation, depth: usize) -> Result<BoxCursor<(i64, String)>, CursorError> {
    let open: OpenInnerFn<Record, (i64, String)> = Arc::new(|record: Record, continuation: Continuation| {
        async move {
            let delay = rand::thread_rng().gen_range(0..3);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let id = album_id(&record);
            let title = record.field("title").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let words: Vec<(i64, String)> = title.split(' ').map(|word| (id, word.to_string())).collect();
            Ok::<_, CursorError>(ListCursor::new(words, &continuation)?.boxed())
        }
        .boxed()
    });
    let check: CheckValueFn<Record> = Arc::new(|record: &Record| record.primary_key.pack());
    let store = store.clone();
    Ok(FlatMapPipelinedCursor::new(move |outer| scan(&store, outer), open, Some(check), continuation, depth)?.boxed())
}

#[tokio::test]
async fn test_pipelined_loads_keep_scan_order() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(20, ExecuteConfig::default().with_scan_batch_size(3)).await?;
    for depth in [1, 2, 5, 16] {
        let loader = store.clone();
        // each record resolves its successor, with jitter so completions arrive out of order
        let cursor = scan(&store, Continuation::Start)?.map_pipelined(
            move |record: Record| {
                let loader = loader.clone();
                let delay = rand::thread_rng().gen_range(0..5);
                async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    let next = tuple![(album_id(&record) + 1) % 20];
                    let loaded = loader.load_record(&next).await.map_err(CursorError::from)?;
                    Ok(loaded.map(|r| album_id(&r)))
                }
                .boxed()
            },
            depth,
        );
        let (successors, reason, continuation) = cursor.collect_all().await?;
        let expected: Vec<Option<i64>> = (0..20).map(|id| Some((id + 1) % 20)).collect();
        assert_eq!(successors, expected, "depth {depth}");
        assert_eq!(reason, NoNextReason::SourceExhausted);
        assert_eq!(continuation, Continuation::End);
    }
    Ok(())
}

#[tokio::test]
async fn test_pipelined_failure_surfaces_in_order() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(8, ExecuteConfig::default()).await?;
    let mut cursor = scan(&store, Continuation::Start)?.map_pipelined(
        |record: Record| {
            async move {
                match album_id(&record) {
                    // fail fast, ahead of the slower successful loads
                    5 => Err(CursorError::invalid_argument("album 5 is unreadable")),
                    id => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(id)
                    }
                }
            }
            .boxed()
        },
        8,
    );
    for expected in 0..5 {
        assert_eq!(cursor.next().await?.into_value(), Some(expected));
    }
    assert!(cursor.next().await.is_err_and(|err| err.is_invalid_argument()));
    assert!(matches!(cursor.next().await, Err(CursorError::Unusable)));
    Ok(())
}

#[tokio::test]
async fn test_flat_map_resumes_at_every_split() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(6, ExecuteConfig::default().with_scan_batch_size(2)).await?;
    let (full, _, _) = title_words(&store, &Continuation::Start, 3)?.collect_all().await?;
    assert_eq!(full.len(), 24);
    assert_eq!(full[..4].iter().map(|(_, w)| w.as_str()).collect::<Vec<_>>(), vec!["rock", "sessions", "volume", "0"]);

    for split in 1..full.len() {
        let mut cursor = title_words(&store, &Continuation::Start, 3)?;
        let mut first = Vec::new();
        let mut continuation = Continuation::Start;
        while first.len() < split {
            let CursorResult::Next { value, continuation: c } = cursor.next().await? else { panic!("ran out at {split}") };
            first.push(value);
            continuation = c;
        }
        cursor.close();
        // the token crosses a request boundary
        let continuation = Continuation::from_base64(continuation.to_base64())?;
        let (rest, _, _) = title_words(&store, &continuation, 1)?.collect_all().await?;
        first.extend(rest);
        assert_eq!(first, full, "split at {split}");
    }
    Ok(())
}

#[tokio::test]
async fn test_flat_map_restarts_inner_when_outer_changed() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(4, ExecuteConfig::default()).await?;
    let mut cursor = title_words(&store, &Continuation::Start, 2)?;
    let mut continuation = Continuation::Start;
    // through "rock sessions volume 0" and into "jazz sessions"
    for _ in 0..6 {
        continuation = cursor.next().await?.continuation().clone();
    }
    cursor.close();

    // album 1 is replaced by a record with the same key but a different shape
    store.delete_record(&tuple![1]).await?;
    let mut renamed = album(1);
    renamed.primary_key = tuple![1i64, "reissue"];
    store.save_record(&renamed).await?;

    let (rest, reason, _) = title_words(&store, &continuation, 2)?.collect_all().await?;
    assert_eq!(reason, NoNextReason::SourceExhausted);
    // the reissue sorts where album 1 was, its words start over
    let ids: Vec<i64> = rest.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    assert_eq!(rest[0].1, "jazz");
    Ok(())
}
