//! Feedback loop behavior: canonical scenarios, containment, ordering,
//! lifecycle.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use futures::stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

use gyre_engine::{
    current_label, mutations, Command, Disposables, FeedbackLoop, LoopConfig, LoopPhase,
    MutationStream, SerialExecutor, UpstreamError, UpstreamPolicy,
};
use gyre_testkit::{
    boxed, counter_reducer, trail_reducer, Counter, IncrementCommand, NoopCommand,
    RecordingConsumer, TaggedCommand, Trail,
};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn computes_the_expected_states() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::iter(vec![IncrementCommand::new(); 6]))
        .consume(SerialExecutor::spawn("consume-queue-1"), recorder.callback())
        .start();

    timeout(WAIT, recorder.wait_for_len(7)).await.unwrap();
    handle.join().await;

    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5, 0]);
    assert_matches!(handle.phase(), LoopPhase::Completed);
}

#[tokio::test]
async fn a_failing_command_does_not_stop_the_loop() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::iter(vec![
            IncrementCommand::failing(),
            IncrementCommand::new(),
        ]))
        .consume(SerialExecutor::spawn("consume-queue-1"), recorder.callback())
        .start();

    timeout(WAIT, recorder.wait_for_len(2)).await.unwrap();
    handle.join().await;

    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1]);
}

#[tokio::test]
async fn zero_mutation_commands_emit_only_the_initial_state() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::at(3), counter_reducer)
        .commands(stream::iter(vec![NoopCommand; 4]))
        .consume(SerialExecutor::spawn("consume-queue-1"), recorder.callback())
        .start();

    handle.join().await;
    timeout(WAIT, recorder.wait_for_len(1)).await.unwrap();
    // Give any stray delivery a chance to surface before asserting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(recorder.snapshot(), vec![Counter::at(3)]);
}

#[tokio::test(start_paused = true)]
async fn folds_land_in_completion_order_not_submission_order() {
    // "slow" is submitted first but finishes last; its fold lands last.
    // This is the documented design choice: FIFO by completion, not by
    // submission.
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Trail::default(), trail_reducer)
        .commands(stream::iter(vec![
            TaggedCommand::delayed("slow", Duration::from_millis(100)),
            TaggedCommand::new("fast"),
        ]))
        .consume(SerialExecutor::spawn("fold-order"), recorder.callback())
        .start();

    handle.join().await;
    timeout(WAIT, recorder.wait_for_len(3)).await.unwrap();

    let final_trail = recorder.snapshot().pop().unwrap();
    assert_eq!(final_trail.entries, vec!["fast", "slow"]);
}

#[tokio::test]
async fn multi_mutation_commands_fold_in_emission_order() {
    struct Burst;

    impl Command for Burst {
        type State = Trail;
        type Mutation = gyre_testkit::TrailEvent;

        fn execute(&self, _state: Trail) -> MutationStream<gyre_testkit::TrailEvent> {
            mutations::many(["one", "two", "three"].map(|tag| gyre_testkit::TrailEvent(tag.into())))
        }
    }

    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Trail::default(), trail_reducer)
        .commands(stream::iter(vec![Burst]))
        .consume(SerialExecutor::spawn("burst"), recorder.callback())
        .start();

    handle.join().await;
    timeout(WAIT, recorder.wait_for_len(4)).await.unwrap();

    let final_trail = recorder.snapshot().pop().unwrap();
    assert_eq!(final_trail.entries, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn cancel_stops_emissions_and_releases_subscriptions() {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(UnboundedReceiverStream::new(command_rx))
        .consume(SerialExecutor::spawn("cancel-queue"), recorder.callback())
        .start();

    command_tx.send(IncrementCommand::new()).unwrap();
    command_tx.send(IncrementCommand::new()).unwrap();
    timeout(WAIT, recorder.wait_for_len(3)).await.unwrap();

    handle.cancel();
    assert_matches!(handle.phase(), LoopPhase::Cancelled);

    // Nothing submitted after cancellation is ever observed.
    command_tx.send(IncrementCommand::new()).ok();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.len(), 3);

    // The command subscription was released along with the loop.
    assert!(command_tx.is_closed());
}

#[tokio::test]
async fn upstream_failure_is_absorbed_by_default() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .fallible_commands(stream::iter(vec![
            Ok(IncrementCommand::new()),
            Err(UpstreamError::new("source hiccup")),
            Ok(IncrementCommand::new()),
        ]))
        .consume(SerialExecutor::spawn("absorb"), recorder.callback())
        .start();

    timeout(WAIT, recorder.wait_for_len(3)).await.unwrap();
    handle.join().await;

    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1, 2]);
    assert_matches!(handle.phase(), LoopPhase::Completed);
}

#[tokio::test]
async fn upstream_failure_can_complete_the_loop() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .fallible_commands(stream::iter(vec![
            Ok(IncrementCommand::new()),
            Err(UpstreamError::new("source died")),
            Ok(IncrementCommand::new()),
        ]))
        .config(LoopConfig {
            upstream_policy: UpstreamPolicy::Propagate,
        })
        .consume(SerialExecutor::spawn("propagate"), recorder.callback())
        .start();

    handle.join().await;
    timeout(WAIT, recorder.wait_for_len(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The command after the failure never ran.
    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1]);
    assert_matches!(handle.phase(), LoopPhase::Completed);
}

#[tokio::test]
async fn consumers_run_on_their_chosen_executors() {
    let labels_one: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
    let labels_two: Arc<Mutex<Vec<Option<String>>>> = Arc::default();

    let sink_one = labels_one.clone();
    let sink_two = labels_two.clone();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::iter(vec![IncrementCommand::new()]))
        .consume(SerialExecutor::spawn("consume-queue-1"), move |_| {
            sink_one.lock().unwrap().push(current_label());
        })
        .consume(SerialExecutor::spawn("consume-queue-2"), move |_| {
            sink_two.lock().unwrap().push(current_label());
        })
        .start();

    handle.join().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let seen_one = labels_one.lock().unwrap().clone();
    let seen_two = labels_two.lock().unwrap().clone();
    assert_eq!(seen_one.len(), 2);
    assert_eq!(seen_two.len(), 2);
    assert!(seen_one.iter().all(|l| l.as_deref() == Some("consume-queue-1")));
    assert!(seen_two.iter().all(|l| l.as_deref() == Some("consume-queue-2")));
}

#[tokio::test]
async fn on_command_observes_every_command() {
    let seen = Arc::new(AtomicUsize::new(0));
    let spy = seen.clone();

    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::iter(vec![IncrementCommand::new(); 3]))
        .on_command(move |_| {
            spy.fetch_add(1, Ordering::SeqCst);
        })
        .start();

    handle.join().await;
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn states_stream_supports_composition() {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(UnboundedReceiverStream::new(command_rx))
        .start();

    let mut doubled = handle.states().map(|state: Counter| state.value * 2);
    assert_eq!(doubled.next().await, Some(0));

    command_tx.send(IncrementCommand::new()).unwrap();
    assert_eq!(doubled.next().await, Some(2));

    handle.cancel();
}

#[tokio::test]
async fn producer_closure_is_the_entry_point() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .producer(|| stream::iter(vec![IncrementCommand::new()]))
        .consume(SerialExecutor::spawn("producer"), recorder.callback())
        .start();

    timeout(WAIT, recorder.wait_for_len(2)).await.unwrap();
    handle.join().await;

    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1]);
}

#[tokio::test]
async fn disposables_cancel_every_retained_loop() {
    let handle_one = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::pending::<IncrementCommand>())
        .start();
    let handle_two = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::pending::<IncrementCommand>())
        .start();

    let states_one = handle_one.states();
    let states_two = handle_two.states();

    let mut disposables = Disposables::new();
    handle_one.disposed_by(&mut disposables);
    handle_two.disposed_by(&mut disposables);
    assert_eq!(disposables.len(), 2);

    disposables.cancel_all();
    assert!(disposables.is_empty());

    // Both loops released their state stores; the streams end.
    timeout(WAIT, async {
        let drained: Vec<_> = states_one.collect().await;
        assert!(!drained.is_empty());
        let drained: Vec<_> = states_two.collect().await;
        assert!(!drained.is_empty());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn boxed_commands_mix_in_one_stream() {
    let recorder = RecordingConsumer::new();
    let handle = FeedbackLoop::new(Counter::default(), counter_reducer)
        .commands(stream::iter(vec![
            boxed(IncrementCommand::new()),
            boxed(NoopCommand),
            boxed(IncrementCommand::new()),
        ]))
        .consume(SerialExecutor::spawn("mixed"), recorder.callback())
        .start();

    timeout(WAIT, recorder.wait_for_len(3)).await.unwrap();
    handle.join().await;

    let values: Vec<i64> = recorder.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0, 1, 2]);
}
