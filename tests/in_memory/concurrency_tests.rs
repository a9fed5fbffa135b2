//! Many caller threads sharing one client's scheduler.

use super::helpers::{TestClient, client_for, echo_operation, fast_options, provider_name};
use rstest::rstest;
use serde_json::json;
use std::time::{Duration, Instant};
use toolbridge::bridge::{
    adapters::InMemoryProvider,
    domain::{CallArguments, ClientOptions},
};

const THREADS: usize = 8;

fn echo_provider(index: usize) -> InMemoryProvider {
    InMemoryProvider::new(provider_name(&format!("echo_{index}")))
        .with_invoke_delay(Duration::from_millis(20))
        .with_operation(echo_operation("echo"), move |arguments| {
            Ok(json!({"from": index, "text": arguments.get("text").cloned()}))
        })
}

fn started_echo_client(options: ClientOptions) -> TestClient {
    let providers = (0..THREADS).map(echo_provider).collect();
    let mut client = client_for(providers, options).expect("client should build");
    client.start().expect("client should start");
    client
}

#[rstest]
fn each_thread_receives_its_own_echo(fast_options: ClientOptions) {
    let client = started_echo_client(fast_options);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|index| {
                let adapter = client
                    .adapter(&format!("echo_{index}__echo"))
                    .expect("adapter should exist")
                    .clone();
                scope.spawn(move || {
                    adapter.call(CallArguments::new().named("text", format!("message {index}")))
                })
            })
            .collect();

        for (index, handle) in handles.into_iter().enumerate() {
            let answer = handle
                .join()
                .expect("caller thread should not panic")
                .expect("call should succeed");
            assert_eq!(
                answer,
                json!({"from": index, "text": format!("message {index}")})
            );
        }
    });
}

#[rstest]
fn suspended_calls_overlap_on_the_single_scheduler(fast_options: ClientOptions) {
    let client = started_echo_client(fast_options);
    let started = Instant::now();

    std::thread::scope(|scope| {
        for index in 0..THREADS {
            let adapter = client
                .adapter(&format!("echo_{index}__echo"))
                .expect("adapter should exist");
            scope.spawn(move || {
                adapter
                    .call(CallArguments::new().arg("overlap"))
                    .expect("call should succeed")
            });
        }
    });

    // Eight 20ms calls run back to back would need at least 160ms.
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[rstest]
fn repeated_calls_from_one_thread_are_independent(fast_options: ClientOptions) {
    let client = started_echo_client(fast_options);
    let adapter = client.adapter("echo_3__echo").expect("adapter should exist");

    for round in 0..5 {
        let answer = adapter
            .call(CallArguments::new().arg(format!("round {round}")))
            .expect("call should succeed");
        assert_eq!(answer["text"], json!(format!("round {round}")));
    }
}
