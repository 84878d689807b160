//! Composer tests.
//!
//! Requests are recorded by a [`RecordingDispatcher`] and run against a
//! [`FakeBackend`] on the test thread, so every interleaving is explicit.

mod lifecycle_tests;
mod scenario_tests;

use composer_api::RouteId;
use serde_json::json;

use crate::binding::BindingStore;
use crate::composer::Composer;
use crate::config::ComposerConfig;
use crate::test_support::{FakeBackend, RecordingDispatcher, region};

type TestComposer<S> = Composer<S, RecordingDispatcher>;

/// Run queued requests and apply their results until nothing is queued.
fn settle<S: BindingStore>(composer: &mut TestComposer<S>, backend: &FakeBackend) {
    while !composer.dispatcher().queue.is_empty() {
        for result in composer.dispatcher_mut().run_all(backend) {
            composer.apply(result);
        }
    }
}

/// Backend for route 1 with no bindings yet.
fn empty_route(bindings: serde_json::Value) -> FakeBackend {
    let backend = FakeBackend::new();
    backend.set_bindings(bindings);
    backend.set_route_region(region(9.9, 53.5, 10.1, 53.6));
    backend
}

fn mounted<S: BindingStore + Default>(backend: &FakeBackend) -> TestComposer<S> {
    let mut composer = TestComposer::<S>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    settle(&mut composer, backend);
    composer
}

fn empty_lsa_route() -> FakeBackend {
    empty_route(json!({}))
}

fn empty_sg_route() -> FakeBackend {
    empty_route(json!({"sgIds": [], "confirmed": []}))
}
