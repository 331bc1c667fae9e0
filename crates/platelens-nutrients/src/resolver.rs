use std::sync::Arc;

use platelens_core::{
    AnalyzedItem, IdentifiedItem, NutrientRecord, ProgressObserver, ProgressUpdate, Stage,
};
use tracing::{debug, info, warn};

use crate::remote::RemoteNutrientSource;
use crate::store::NutrientStore;

pub const DEFAULT_FALLBACK_CALORIES: i64 = 250;

/// Tiered nutrient lookup: local store, then remote fallback, then a
/// deterministic estimate. A lookup miss never fails the analysis.
pub struct NutrientResolver {
    store: Arc<dyn NutrientStore>,
    remote: Option<Arc<dyn RemoteNutrientSource>>,
    fallback_calories: i64,
}

impl NutrientResolver {
    pub fn new(
        store: Arc<dyn NutrientStore>,
        remote: Option<Arc<dyn RemoteNutrientSource>>,
    ) -> Self {
        Self {
            store,
            remote,
            fallback_calories: DEFAULT_FALLBACK_CALORIES,
        }
    }

    pub fn with_fallback_calories(mut self, calories: i64) -> Self {
        self.fallback_calories = calories;
        self
    }

    /// Resolve one item. The fallback attempt is reported through the observer
    /// before the remote call goes out, so a UI can show the longer wait.
    pub async fn resolve(
        &self,
        item: &IdentifiedItem,
        observer: &dyn ProgressObserver,
    ) -> NutrientRecord {
        if let Some(record) = self
            .store
            .lookup(&item.name, item.quantity, &item.unit)
            .await
        {
            debug!("RESOLVER: local hit for '{}'", item.name);
            return record;
        }

        if let Some(remote) = &self.remote {
            observer.on_progress(ProgressUpdate::detail(
                Stage::ResolvingNutrients,
                format!("local miss for '{}', searching remote database", item.name),
            ));

            if let Some(record) = remote.lookup(&item.name, item.quantity, &item.unit).await {
                info!("RESOLVER: remote hit for '{}'", item.name);
                return record;
            }
        }

        warn!(
            "RESOLVER: no nutrient data for '{}', using {} kcal estimate",
            item.name, self.fallback_calories
        );
        NutrientRecord::estimate(self.fallback_calories)
    }

    /// Resolve every item sequentially in request order, emitting a progress
    /// detail per item.
    pub async fn resolve_all(
        &self,
        items: &[IdentifiedItem],
        observer: &dyn ProgressObserver,
    ) -> Vec<AnalyzedItem> {
        let total = items.len();
        let mut analyzed = Vec::with_capacity(total);

        for (i, item) in items.iter().enumerate() {
            observer.on_progress(ProgressUpdate::detail(
                Stage::ResolvingNutrients,
                format!("looking up '{}' ({}/{})", item.name, i + 1, total),
            ));

            let nutrients = self.resolve(item, observer).await;
            analyzed.push(AnalyzedItem {
                item: item.clone(),
                nutrients,
            });
        }

        analyzed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use platelens_core::NutrientSource;

    use super::*;

    /// Shared event log so tests can assert cross-component ordering.
    type EventLog = Arc<Mutex<Vec<String>>>;

    struct ScriptedStore {
        known: Vec<(&'static str, i64)>,
        events: EventLog,
    }

    #[async_trait]
    impl NutrientStore for ScriptedStore {
        async fn lookup(&self, name: &str, quantity: f64, _unit: &str) -> Option<NutrientRecord> {
            self.events.lock().unwrap().push(format!("local:{name}"));
            self.known
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, cal)| NutrientRecord {
                    source: NutrientSource::Local,
                    ..NutrientRecord::estimate((*cal as f64 * quantity) as i64)
                })
        }
    }

    struct ScriptedRemote {
        known: Vec<(&'static str, i64)>,
        events: EventLog,
    }

    #[async_trait]
    impl RemoteNutrientSource for ScriptedRemote {
        async fn lookup(&self, name: &str, _quantity: f64, _unit: &str) -> Option<NutrientRecord> {
            self.events.lock().unwrap().push(format!("remote:{name}"));
            self.known
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, cal)| NutrientRecord {
                    source: NutrientSource::Remote,
                    ..NutrientRecord::estimate(*cal)
                })
        }
    }

    struct LoggingObserver {
        events: EventLog,
    }

    impl ProgressObserver for LoggingObserver {
        fn on_progress(&self, update: ProgressUpdate) {
            if let Some(detail) = update.detail {
                self.events.lock().unwrap().push(format!("progress:{detail}"));
            }
        }
    }

    fn item(name: &str) -> IdentifiedItem {
        IdentifiedItem {
            name: name.to_string(),
            quantity: 1.0,
            unit: "item".to_string(),
        }
    }

    fn resolver_with(
        local: Vec<(&'static str, i64)>,
        remote: Vec<(&'static str, i64)>,
        events: &EventLog,
    ) -> NutrientResolver {
        NutrientResolver::new(
            Arc::new(ScriptedStore {
                known: local,
                events: Arc::clone(events),
            }),
            Some(Arc::new(ScriptedRemote {
                known: remote,
                events: Arc::clone(events),
            })),
        )
    }

    #[tokio::test]
    async fn local_hit_never_touches_remote() {
        let events: EventLog = Arc::default();
        let resolver = resolver_with(vec![("apple", 52)], vec![("apple", 99)], &events);
        let observer = LoggingObserver {
            events: Arc::clone(&events),
        };

        let record = resolver.resolve(&item("apple"), &observer).await;
        assert_eq!(record.source, NutrientSource::Local);

        let log = events.lock().unwrap();
        assert_eq!(log.as_slice(), ["local:apple"]);
    }

    #[tokio::test]
    async fn local_miss_tries_remote_exactly_once_after_reporting() {
        let events: EventLog = Arc::default();
        let resolver = resolver_with(vec![], vec![("ramen", 380)], &events);
        let observer = LoggingObserver {
            events: Arc::clone(&events),
        };

        let record = resolver.resolve(&item("ramen"), &observer).await;
        assert_eq!(record.source, NutrientSource::Remote);
        assert_eq!(record.calories, 380);

        let log = events.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], "local:ramen");
        assert!(log[1].starts_with("progress:local miss for 'ramen'"));
        assert_eq!(log[2], "remote:ramen");
    }

    #[tokio::test]
    async fn double_miss_yields_deterministic_estimate() {
        let events: EventLog = Arc::default();
        let resolver = resolver_with(vec![], vec![], &events).with_fallback_calories(250);
        let observer = LoggingObserver {
            events: Arc::clone(&events),
        };

        let record = resolver.resolve(&item("mystery stew"), &observer).await;
        assert_eq!(record.source, NutrientSource::Estimate);
        assert_eq!(record.calories, 250);
        assert!(record.protein_g.is_none());
    }

    #[tokio::test]
    async fn resolve_all_keeps_request_order_and_counts_steps() {
        let events: EventLog = Arc::default();
        let resolver = resolver_with(vec![("apple", 52), ("taco", 210)], vec![], &events);
        let observer = LoggingObserver {
            events: Arc::clone(&events),
        };

        let items = vec![item("apple"), item("taco")];
        let analyzed = resolver.resolve_all(&items, &observer).await;

        assert_eq!(analyzed.len(), 2);
        assert_eq!(analyzed[0].item.name, "apple");
        assert_eq!(analyzed[1].item.name, "taco");

        let log = events.lock().unwrap();
        assert!(log.contains(&"progress:looking up 'apple' (1/2)".to_string()));
        assert!(log.contains(&"progress:looking up 'taco' (2/2)".to_string()));
    }
}
