//! End-to-end pipeline scenarios against fake boundaries.

use super::fakes::{FakeRetriever, FixedScreen, RecordingNotifier, ScriptedLlm};
use crate::generator::{AnswerGenerator, RetryPolicy, GENERATION_FAILED};
use crate::outcome::PipelineOutcome;
use crate::pipeline::QueryPipeline;
use crate::retriever::NO_RELEVANT_INFORMATION;
use crate::screen::{BiasFinding, BiasKind};
use askrc_core::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const QUESTION: &str = "How do I submit a GPU job?";

const GPU_DOCS: &str = "To submit a GPU job, use sbatch with the gpu partition and request \
    GPUs using the gres flag. Jobs wait in the queue until resources are available.";

const GROUNDED_ANSWER: &str = "Submit the job with sbatch on the gpu partition, requesting \
    GPUs through the gres flag; it waits in the queue.";

struct Harness {
    retriever: Arc<FakeRetriever>,
    llm: Arc<ScriptedLlm>,
    notifier: Arc<RecordingNotifier>,
    pipeline: QueryPipeline,
}

fn harness(retriever: FakeRetriever, llm: ScriptedLlm, notifier: RecordingNotifier) -> Harness {
    let retriever = Arc::new(retriever);
    let llm = Arc::new(llm);
    let notifier = Arc::new(notifier);

    let generator = AnswerGenerator::new(llm.clone(), "gpt-4-turbo").with_retry_policy(
        RetryPolicy {
            max_retries: 3,
            delay: Duration::ZERO,
        },
    );
    let pipeline = QueryPipeline::new(retriever.clone(), generator, notifier.clone()).unwrap();

    Harness {
        retriever,
        llm,
        notifier,
        pipeline,
    }
}

fn finding(message: &str) -> BiasFinding {
    BiasFinding {
        kind: BiasKind::Gender,
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_flagged_question_short_circuits() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );
    let pipeline = h
        .pipeline
        .with_question_screen(Arc::new(FixedScreen::flagging(finding("Please rephrase."))));

    let run = pipeline.run(QUESTION).await.unwrap();

    assert!(run.notification.is_none());
    assert_eq!(
        run.outcome,
        PipelineOutcome::RephraseRequested {
            finding: finding("Please rephrase.")
        }
    );
    assert_eq!(h.retriever.calls(), 0);
    assert_eq!(h.llm.calls(), 0);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_empty_context_is_insufficient() {
    let h = harness(
        FakeRetriever::empty(),
        ScriptedLlm::answering("Please contact the support team."),
        RecordingNotifier::default(),
    );

    let outcome = h.pipeline.run(QUESTION).await.unwrap().finish().await;

    let PipelineOutcome::InsufficientContext { answer } = outcome else {
        panic!("expected insufficient context, got {:?}", outcome);
    };
    assert_eq!(answer.cleaned, "Please contact the support team.");
    assert_eq!(answer.grounding.overlap(), 0);

    // The empty-context sentinel reached the prompt
    let request = h.llm.last_request().unwrap();
    assert!(request.prompt.contains(NO_RELEVANT_INFORMATION));

    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Answer lacks context");
    assert_eq!(
        alerts[0].body,
        "The answer provided lacks sufficient contextual relevance: Please contact the support team."
    );
    assert_eq!(alerts[0].question.as_deref(), Some(QUESTION));
}

#[tokio::test]
async fn test_grounded_clean_answer_is_displayed() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );

    let run = h.pipeline.run(QUESTION).await.unwrap();
    assert!(run.notification.is_none());

    let PipelineOutcome::Displayed { answer } = run.outcome else {
        panic!("expected displayed, got {:?}", run.outcome);
    };
    assert!(answer.grounding.grounded);
    assert!(answer.grounding.overlap() >= 7);
    assert_eq!(answer.cleaned, GROUNDED_ANSWER.split_whitespace().collect::<Vec<_>>().join(" "));
    assert!(h.notifier.alerts().is_empty());
    assert_eq!(h.retriever.last_top_k(), 8);
    assert_eq!(h.llm.calls(), 1);
}

#[tokio::test]
async fn test_grounded_flagged_answer_is_shown_with_warning() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );
    let answer_screen = Arc::new(FixedScreen::flagging(finding("Stereotype in answer.")));
    let pipeline = h.pipeline.with_answer_screen(answer_screen.clone());

    let outcome = pipeline.run(QUESTION).await.unwrap().finish().await;

    assert!(outcome
        .user_message()
        .ends_with("\n\nWarning: Stereotype in answer."));
    let PipelineOutcome::BiasFlaggedAnswer { answer, finding: f } = outcome else {
        panic!("expected bias-flagged answer, got {:?}", outcome);
    };
    assert!(answer.grounding.grounded);
    assert_eq!(f.message, "Stereotype in answer.");
    assert_eq!(answer_screen.calls(), 1);

    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Bias detected in model response");
    assert!(alerts[0].body.contains("Stereotype in answer."));
}

#[tokio::test]
async fn test_ungrounded_flagged_answer_reports_insufficient_context() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering("Ask someone else."),
        RecordingNotifier::default(),
    );
    let pipeline = h
        .pipeline
        .with_answer_screen(Arc::new(FixedScreen::flagging(finding("Flagged."))));

    let outcome = pipeline.run(QUESTION).await.unwrap().finish().await;

    assert_eq!(outcome.label(), "insufficient_context");
    assert_eq!(
        outcome.answer().and_then(|a| a.finding.as_ref()).map(|f| f.message.as_str()),
        Some("Flagged.")
    );
    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Answer lacks context");
    assert!(alerts[0].body.contains("Ask someone else."));
    assert!(alerts[0]
        .body
        .ends_with("\nBias message in the model response: Flagged."));
}

#[tokio::test]
async fn test_multiline_answer_keeps_its_layout() {
    let raw = "Steps:\n1. Submit the job with sbatch on the gpu partition.  \n\
        2. Request GPUs through the gres flag:\n\n\
        ```\n#SBATCH --partition=gpu\n#SBATCH --gres=gpu:1\n```\n\
        It waits in the queue.";
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(raw),
        RecordingNotifier::default(),
    );

    let outcome = h.pipeline.answer(QUESTION).await.unwrap();

    assert!(outcome.is_displayed(), "got {:?}", outcome);
    assert_eq!(
        outcome.user_message(),
        "Steps:\n1. Submit the job with sbatch on the gpu partition.\n\
         2. Request GPUs through the gres flag:\n\n\
         ```\n#SBATCH --partition=gpu\n#SBATCH --gres=gpu:1\n```\n\
         It waits in the queue."
    );
}

#[tokio::test]
async fn test_retrieval_failure_is_fatal() {
    let h = harness(
        FakeRetriever::failing(),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );

    let result = h.pipeline.run(QUESTION).await;

    assert!(matches!(result, Err(AppError::Retrieval(_))));
    assert_eq!(h.llm.calls(), 0);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_backend_error_is_fatal() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::new(vec![Err(AppError::Llm("401 Unauthorized".to_string()))]),
        RecordingNotifier::default(),
    );

    let result = h.pipeline.answer(QUESTION).await;

    assert!(matches!(result, Err(AppError::Llm(_))));
    assert_eq!(h.llm.calls(), 1);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_flow_through_validation() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::always_rate_limited(),
        RecordingNotifier::default(),
    );

    let outcome = h.pipeline.run(QUESTION).await.unwrap().finish().await;

    let PipelineOutcome::InsufficientContext { answer } = outcome else {
        panic!("expected insufficient context, got {:?}", outcome);
    };
    assert_eq!(answer.raw, GENERATION_FAILED);
    assert_eq!(h.llm.calls(), 3);
    assert_eq!(h.notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_notification_failure_does_not_change_outcome() {
    let h = harness(
        FakeRetriever::empty(),
        ScriptedLlm::answering("Please contact the support team."),
        RecordingNotifier::failing(),
    );

    let outcome = h.pipeline.run(QUESTION).await.unwrap().finish().await;

    assert_eq!(outcome.label(), "insufficient_context");
    assert_eq!(h.notifier.alerts().len(), 1);
}

#[tokio::test]
async fn test_question_is_cleaned_before_use() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );

    h.pipeline
        .answer("  How do I\n\tsubmit a   GPU job?  ")
        .await
        .unwrap();

    let request = h.llm.last_request().unwrap();
    assert!(request.prompt.contains(QUESTION));
    assert!(request.prompt.contains("gres flag"));
}

#[tokio::test]
async fn test_lexical_screen_rejects_biased_question() {
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::answering(GROUNDED_ANSWER),
        RecordingNotifier::default(),
    );

    let outcome = h
        .pipeline
        .answer("Why can only men use the GPU partition?")
        .await
        .unwrap();

    assert_eq!(outcome.label(), "rephrase_requested");
    assert_eq!(h.retriever.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_questions_keep_order() {
    let answers = (0..2).map(|_| Ok(GROUNDED_ANSWER.to_string())).collect();
    let h = harness(
        FakeRetriever::with_fragments(&[GPU_DOCS]),
        ScriptedLlm::new(answers),
        RecordingNotifier::default(),
    );

    let questions = vec![
        QUESTION.to_string(),
        "Why can only men use the GPU partition?".to_string(),
        "Which partition has GPUs?".to_string(),
    ];
    let runs = h.pipeline.answer_all(&questions).await;

    let labels: Vec<&str> = runs
        .iter()
        .map(|run| run.as_ref().unwrap().outcome.label())
        .collect();
    assert_eq!(labels, vec!["displayed", "rephrase_requested", "displayed"]);
    assert_eq!(h.llm.calls(), 2);
    assert_eq!(h.retriever.calls(), 2);

    let ids: HashSet<_> = runs.iter().map(|run| run.as_ref().unwrap().run_id).collect();
    assert_eq!(ids.len(), 3);
}
