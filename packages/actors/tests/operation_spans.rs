mod common;

use std::sync::{Arc, Mutex};

use tracing::span::{Attributes, Id};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Collects the name of every span opened while installed.
#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> Layer<S> for SpanNames {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(attrs.metadata().name().to_string());
    }
}

#[tokio::test]
async fn read_operations_open_spans() {
    let names = SpanNames::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(names.clone()));

    let engine = common::engine(common::memory(), common::recording().encoder).await;
    engine.create_preset(common::mobile()).await.unwrap();
    let job = engine.submit(common::input("mobile")).await.unwrap();

    engine.get(&job.id.to_string()).await.unwrap();
    engine.list().await.unwrap();
    engine.get_preset("mobile").await.unwrap();
    engine.list_presets().await.unwrap();

    let seen = names.0.lock().unwrap().clone();
    for span in ["create-preset", "create-job", "get-job", "list-jobs", "get-preset", "list-presets"] {
        assert!(seen.iter().any(|name| name == span), "no {} span in {:?}", span, seen);
    }
}
