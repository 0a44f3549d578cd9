mod common;

use common::{ids, sled_albums};
use strata_core::{
    expression::{Bindings, KeyExpression},
    merge::ComparisonKeyFunction,
    plan::{FilterPlan, IntersectionPlan, Quantifier, QueryPlan, ScanPlan, UnionPlan},
    Continuation, CursorExt, ExecuteConfig, ExecuteState, NoNextReason, ScanProperties,
};
use strata_proto::{tuple, TupleRange};

fn genre(name: &str, reverse: bool) -> Quantifier {
    Quantifier::over(FilterPlan::new(ScanPlan::new(TupleRange::all(), reverse), KeyExpression::field("genre"), tuple![name]))
}

fn decade(value: i64, reverse: bool) -> Quantifier {
    Quantifier::over(FilterPlan::new(ScanPlan::new(TupleRange::all(), reverse), KeyExpression::field("decade"), tuple![value]))
}

fn by_year() -> ComparisonKeyFunction { ComparisonKeyFunction::on_key_expression(KeyExpression::field("year")) }

#[tokio::test]
async fn test_union_pages_across_requests() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(30, ExecuteConfig::default().with_scan_batch_size(4)).await?;
    let expected: Vec<i64> = (0..30).filter(|id| id % 3 == 0 || (10..20).contains(id)).collect();

    let mut token: Option<String> = None;
    let mut paged = Vec::new();
    let mut pages = 0;
    loop {
        // every page is a new request: a fresh plan resumed from the client's token
        let plan = UnionPlan::new(vec![genre("rock", false), decade(1970, false)], by_year(), false);
        let continuation = match &token {
            Some(token) => Continuation::from_base64(token)?,
            None => Continuation::Start,
        };
        let props = ScanProperties::new().with_limit(5);
        let (page, reason, next) = plan.execute(&store, &Bindings::new(), &continuation, &props, &ExecuteState::unlimited())?.collect_all().await?;
        paged.extend(page);
        pages += 1;
        if reason.is_source_exhausted() {
            break;
        }
        token = Some(next.to_base64());
    }
    assert_eq!(ids(&paged), expected);
    // 17 albums at 5 per page
    assert_eq!(pages, 4);
    Ok(())
}

#[tokio::test]
async fn test_reverse_intersection() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(30, ExecuteConfig::default()).await?;
    let plan = IntersectionPlan::new(vec![genre("jazz", true), decade(1980, true)], by_year(), true);
    let (results, reason, _) =
        plan.execute(&store, &Bindings::new(), &Continuation::Start, &ScanProperties::new(), &ExecuteState::unlimited())?.collect_all().await?;
    assert_eq!(ids(&results), vec![28, 25, 22]);
    assert_eq!(reason, NoNextReason::SourceExhausted);
    Ok(())
}

#[tokio::test]
async fn test_scan_limit_resumes_across_requests() -> Result<(), anyhow::Error> {
    let (_engine, store) = sled_albums(24, ExecuteConfig::default().with_scan_batch_size(2)).await?;
    let plan = UnionPlan::new(vec![genre("folk", false), genre("jazz", false)], by_year(), false);
    let expected: Vec<i64> = (0..24).filter(|id| id % 3 != 0).collect();

    let mut continuation = Continuation::Start;
    let mut results = Vec::new();
    loop {
        let state = ExecuteState::new(Some(10));
        let (page, reason, next) = plan.execute(&store, &Bindings::new(), &continuation, &ScanProperties::new(), &state)?.collect_all().await?;
        // each leg's first record passes regardless
        assert!(state.records_scanned() <= 10 + 2);
        results.extend(page);
        if reason.is_source_exhausted() {
            break;
        }
        assert_eq!(reason, NoNextReason::ScanLimitReached);
        continuation = next;
    }
    assert_eq!(ids(&results), expected);
    Ok(())
}
