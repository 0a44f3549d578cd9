use std::{collections::VecDeque, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;
use strata_proto::Continuation;
use tokio::task::JoinHandle;

use super::{Cursor, CursorResult, CursorTail, NoNextReason};
use crate::{
    error::{CursorError, StoreError},
    task::Executor,
};

/// One asynchronous computation started by a pipelined operator.
///
/// With a depth of one nothing overlaps, so the future is awaited in place
/// instead of being spawned.
pub(crate) enum InFlight<U> {
    Task(JoinHandle<Result<U, CursorError>>),
    Inline(BoxFuture<'static, Result<U, CursorError>>),
}

impl<U: Send + 'static> InFlight<U> {
    pub(crate) fn start(executor: &Executor, depth: usize, future: BoxFuture<'static, Result<U, CursorError>>) -> Self {
        if depth <= 1 {
            InFlight::Inline(future)
        } else {
            InFlight::Task(executor.spawn(future))
        }
    }

    pub(crate) async fn join(self) -> Result<U, CursorError> {
        match self {
            InFlight::Task(handle) => match handle.await {
                Ok(result) => result,
                Err(err) => Err(CursorError::failure(StoreError::TaskFailed(err.to_string()))),
            },
            InFlight::Inline(future) => future.await,
        }
    }

    /// Abandon the computation without waiting for it
    pub(crate) fn abort(self) {
        if let InFlight::Task(handle) = self {
            handle.abort();
        }
    }
}

type MapFn<T, U> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<U, CursorError>> + Send + Sync>;

/// Applies an asynchronous function to every source value with at most
/// `depth` applications in flight, delivering results in source order.
pub struct MapPipelinedCursor<C, T, U> {
    source: C,
    f: MapFn<T, U>,
    depth: usize,
    executor: Executor,
    pending: VecDeque<(InFlight<U>, Continuation)>,
    source_stop: Option<(NoNextReason, Continuation)>,
    tail: CursorTail,
    _item: PhantomData<fn(T)>,
}

impl<C, T, U> MapPipelinedCursor<C, T, U>
where
    C: Cursor<T>,
    T: Send,
    U: Send + 'static,
{
    /// A `depth` of 0 runs as 1, strictly sequential.
    pub fn new<F>(source: C, f: F, depth: usize) -> Self
    where F: Fn(T) -> BoxFuture<'static, Result<U, CursorError>> + Send + Sync + 'static {
        let executor = source.executor().clone();
        Self {
            source,
            f: Arc::new(f),
            depth: depth.max(1),
            executor,
            pending: VecDeque::new(),
            source_stop: None,
            tail: CursorTail::Open,
            _item: PhantomData,
        }
    }

    async fn fill(&mut self) -> Result<(), CursorError> {
        while self.pending.len() < self.depth && self.source_stop.is_none() {
            match self.source.next().await? {
                CursorResult::Next { value, continuation } => {
                    let work = InFlight::start(&self.executor, self.depth, (self.f)(value));
                    self.pending.push_back((work, continuation));
                }
                CursorResult::Exhausted { reason, continuation } => self.source_stop = Some((reason, continuation)),
            }
        }
        Ok(())
    }

    async fn advance(&mut self) -> Result<CursorResult<U>, CursorError> {
        self.fill().await?;
        match self.pending.pop_front() {
            Some((work, continuation)) => Ok(CursorResult::next(work.join().await?, continuation)),
            None => match &self.source_stop {
                Some((reason, continuation)) => Ok(CursorResult::stopped(*reason, continuation.clone())),
                None => Ok(CursorResult::exhausted()),
            },
        }
    }

    fn abandon(&mut self) {
        for (work, _) in self.pending.drain(..) {
            work.abort();
        }
    }
}

#[async_trait]
impl<C, T, U> Cursor<U> for MapPipelinedCursor<C, T, U>
where
    C: Cursor<T>,
    T: Send,
    U: Send + 'static,
{
    async fn next(&mut self) -> Result<CursorResult<U>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = self.advance().await;
        if result.is_err() {
            self.abandon();
        }
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.abandon();
        self.source.close();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::FutureExt;

    use super::*;
    use crate::cursor::{CursorExt, ListCursor};

    fn delayed_double(value: u64) -> BoxFuture<'static, Result<u64, CursorError>> {
        async move {
            // later elements finish first
            tokio::time::sleep(Duration::from_millis(20 - value * 2)).await;
            Ok(value * 2)
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_order_is_preserved_for_every_depth() -> Result<(), anyhow::Error> {
        let items: Vec<u64> = (0..8).collect();
        for depth in 1..=5 {
            let (values, reason, _) = ListCursor::from_vec(items.clone()).map_pipelined(delayed_double, depth).collect_all().await?;
            assert_eq!(values, items.iter().map(|v| v * 2).collect::<Vec<_>>(), "depth {depth}");
            assert_eq!(reason, NoNextReason::SourceExhausted);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_in_flight_is_bounded_by_depth() -> Result<(), anyhow::Error> {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (counter, high) = (in_flight.clone(), peak.clone());
        let cursor = ListCursor::from_vec((0..20u64).collect()).map_pipelined(
            move |value| {
                let (counter, high) = (counter.clone(), high.clone());
                async move {
                    let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    counter.fetch_sub(1, Ordering::SeqCst);
                    Ok(value)
                }
                .boxed()
            },
            3,
        );
        let (values, _, _) = cursor.collect_all().await?;
        assert_eq!(values.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_resume_from_mapped_continuation() -> Result<(), anyhow::Error> {
        let items: Vec<u64> = (0..6).collect();
        let mut cursor = ListCursor::from_vec(items.clone()).map_pipelined(delayed_double, 4);
        let mut continuation = Continuation::Start;
        for _ in 0..3 {
            continuation = cursor.next().await?.continuation().clone();
        }
        cursor.close();
        let (rest, _, _) = ListCursor::new(items, &continuation)?.map_pipelined(delayed_double, 4).collect_all().await?;
        assert_eq!(rest, vec![6, 8, 10]);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_depth_runs_sequentially() -> Result<(), anyhow::Error> {
        let (values, reason, _) = ListCursor::from_vec(vec![3u64, 1, 2]).map_pipelined(delayed_double, 0).collect_all().await?;
        assert_eq!(values, vec![6, 2, 4]);
        assert_eq!(reason, NoNextReason::SourceExhausted);
        Ok(())
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_failure_is_logged_once_through_wrappers() -> Result<(), anyhow::Error> {
        use tracing_subscriber::layer::SubscriberExt;

        let warnings = WarnCounter::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(warnings.clone()));
        let mut cursor = ListCursor::from_vec(vec![1u64, 2, 3])
            .map_pipelined(
                |value| {
                    async move {
                        match value {
                            2 => Err(CursorError::failure(StoreError::TaskFailed("disk unavailable".to_string()))),
                            value => Ok(value),
                        }
                    }
                    .boxed()
                },
                1,
            )
            .filter(|_: &u64| true)
            .skip_then_limit(&crate::scan::ScanProperties::new(), &Continuation::Start);
        assert_eq!(cursor.next().await?.into_value(), Some(1));
        assert!(cursor.next().await.is_err());
        assert!(matches!(cursor.next().await, Err(CursorError::Unusable)));
        assert_eq!(warnings.0.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_is_surfaced_in_order() -> Result<(), anyhow::Error> {
        let mut cursor = ListCursor::from_vec(vec![1u64, 2, 3]).map_pipelined(
            |value| async move { if value == 2 { Err(CursorError::invalid_argument("bad element")) } else { Ok(value) } }.boxed(),
            2,
        );
        assert_eq!(cursor.next().await?.into_value(), Some(1));
        assert!(cursor.next().await.is_err());
        assert!(matches!(cursor.next().await, Err(CursorError::Unusable)));
        Ok(())
    }
}
