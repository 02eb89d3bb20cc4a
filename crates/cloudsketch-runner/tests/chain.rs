#![cfg(unix)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use cloudsketch_core::normalize::from_text;
use cloudsketch_core::{ArchitectureRequest, GenerationMethod, OutputTarget};
use cloudsketch_runner::{
    CliError, CliStage, DiagramArtifact, FallbackChain, GenerationStage, StageError, StaticStage,
    TemplateStage,
};
use common::Workspace;
use pretty_assertions::assert_eq;

fn target() -> OutputTarget {
    OutputTarget::new("cloudsketch_test")
}

fn standard(ws: &Workspace, cli: Result<cloudsketch_runner::QCli, CliError>) -> FallbackChain {
    let exec = ws.fake_python();
    FallbackChain::new(
        vec![
            Box::new(CliStage::new(cli, exec.clone())),
            Box::new(TemplateStage::new(exec.clone())),
            Box::new(StaticStage::new(exec)),
        ],
        5,
    )
}

fn methods(report: &cloudsketch_runner::GenerationReport) -> Vec<(GenerationMethod, bool)> {
    report.attempts.iter().map(|a| (a.method, a.success)).collect()
}

#[tokio::test]
async fn cli_timeout_falls_through_to_template_once() {
    for text in ["EC2 3대", "S3 버킷", "RDS mysql", "lambda api", "VPC 네트워크"] {
        let ws = Workspace::new();
        let cli = ws.fake_cli("cat > /dev/null\nsleep 30\n", Duration::from_millis(300));
        let mut chain = standard(&ws, Ok(cli));

        let report = chain.generate(&from_text(text), &target()).await;

        assert_eq!(
            methods(&report),
            vec![
                (GenerationMethod::ExternalCli, false),
                (GenerationMethod::Template, true),
            ],
            "{text}"
        );
        assert!(report.attempts[0].detail.contains("timed out"), "{text}");
        assert_eq!(report.method, Some(GenerationMethod::Template));
        let artifact = report.artifact.unwrap();
        assert_eq!(
            artifact.path,
            ws.diagrams().join("cloudsketch_test_template.png"),
            "{text}"
        );
        assert_eq!(ws.pngs().len(), 1, "{text}");
        assert!(ws.leftover_scripts().is_empty());
    }
}

#[tokio::test]
async fn cli_reply_is_cleaned_and_run() {
    let ws = Workspace::new();
    let reply = ws.write(
        "reply.txt",
        "\x1b[32mHere is the diagram:\x1b[0m\n\
         ```python\n\
         from diagrams import Diagram\n\
         from diagrams.aws.compute import EC2\n\
         \n\
         with Diagram(\"Web\", show=True, filename=\"whatever\"):\n\
         \x20   EC2(\"web\")\n\
         ```\n",
    );
    let body = format!("cat > /dev/null\ncat '{}'\n", reply.display());
    let cli = ws.fake_cli(&body, Duration::from_secs(5));
    let mut chain = standard(&ws, Ok(cli));

    let report = chain.generate(&from_text("EC2 2대"), &target()).await;

    assert_eq!(methods(&report), vec![(GenerationMethod::ExternalCli, true)]);
    assert_eq!(
        report.artifact.unwrap().path,
        ws.diagrams().join("cloudsketch_test_cli.png")
    );
    assert!(report.message.starts_with("Diagram generated with external CLI"));
}

#[tokio::test]
async fn cli_without_code_uses_template() {
    let ws = Workspace::new();
    let cli = ws.fake_cli("cat > /dev/null\necho 'I cannot help with that.'\n", Duration::from_secs(5));
    let mut chain = standard(&ws, Ok(cli));

    let report = chain.generate(&from_text("S3"), &target()).await;

    assert_eq!(report.method, Some(GenerationMethod::Template));
    assert_eq!(
        report.attempts[0].detail,
        StageError::NoCode.to_string()
    );
}

#[tokio::test]
async fn cli_that_draws_the_diagram_itself_is_accepted() {
    let ws = Workspace::new();
    // Relative path: the CLI runs from the directory holding generated-diagrams
    let body = "cat > /dev/null\n\
                mkdir -p generated-diagrams\n\
                : > generated-diagrams/aws_arch_q.png\n\
                echo '{\"filename\": \"aws_arch_q.png\"}'\n";
    let cli = ws.fake_cli(body, Duration::from_secs(5));
    let mut chain = standard(&ws, Ok(cli));

    let report = chain.generate(&from_text("EC2 2대"), &target()).await;

    assert_eq!(methods(&report), vec![(GenerationMethod::ExternalCli, true)]);
    assert_eq!(
        report.artifact.unwrap().path,
        ws.diagrams().join("aws_arch_q.png")
    );
    assert!(ws.leftover_scripts().is_empty());
}

#[tokio::test]
async fn named_but_missing_cli_output_uses_template() {
    let ws = Workspace::new();
    let cli = ws.fake_cli(
        "cat > /dev/null\necho '{\"filename\": \"aws_arch_q\"}'\n",
        Duration::from_secs(5),
    );
    let mut chain = standard(&ws, Ok(cli));

    let report = chain.generate(&from_text("S3"), &target()).await;

    assert_eq!(
        methods(&report),
        vec![
            (GenerationMethod::ExternalCli, false),
            (GenerationMethod::Template, true),
        ]
    );
    assert_eq!(report.attempts[0].detail, StageError::NoCode.to_string());
    assert_eq!(ws.pngs(), vec![ws.diagrams().join("cloudsketch_test_template.png")]);
}

#[tokio::test]
async fn missing_cli_is_skipped() {
    let ws = Workspace::new();
    let mut chain = standard(&ws, Err(CliError::NotFound("q".into())));

    let report = chain.generate(&from_text("EC2"), &target()).await;

    assert_eq!(
        methods(&report),
        vec![
            (GenerationMethod::ExternalCli, false),
            (GenerationMethod::Template, true),
        ]
    );
    assert_eq!(report.attempts[0].detail, "skipped: CLI `q` not found");
}

#[tokio::test]
async fn exhausted_chain_reports_failure_and_records_history() {
    let ws = Workspace::new();
    let exec = ws.broken_python();
    let mut chain = FallbackChain::new(
        vec![
            Box::new(CliStage::new(Err(CliError::Disabled), exec.clone())),
            Box::new(TemplateStage::new(exec.clone())),
            Box::new(StaticStage::new(exec)),
        ],
        5,
    );

    let report = chain.generate(&from_text("EC2"), &target()).await;

    assert!(report.artifact.is_none());
    assert_eq!(report.method, None);
    assert_eq!(report.attempts.len(), 3);
    assert!(report.attempts.iter().all(|a| !a.success));
    assert!(report.message.starts_with("All generation methods failed"));
    assert!(report.message.contains("static fallback"));
    assert!(ws.leftover_scripts().is_empty());

    let latest = chain.history().latest().unwrap();
    assert!(!latest.success);
    assert_eq!(latest.diagram_path, None);
}

// --- Controller behaviour with scripted stages ---

struct Scripted {
    method: GenerationMethod,
    succeed: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GenerationStage for Scripted {
    fn method(&self) -> GenerationMethod {
        self.method
    }

    async fn attempt(
        &self,
        _request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> Result<DiagramArtifact, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(DiagramArtifact {
                path: target.file_name().into(),
                modified: Local::now(),
                priority: 3,
            })
        } else {
            Err(StageError::NoCode)
        }
    }
}

fn scripted(outcomes: [bool; 3], capacity: usize) -> (FallbackChain, Vec<Arc<AtomicUsize>>) {
    let methods = [
        GenerationMethod::ExternalCli,
        GenerationMethod::Template,
        GenerationMethod::StaticFallback,
    ];
    let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let stages: Vec<Box<dyn GenerationStage>> = methods
        .iter()
        .zip(outcomes)
        .zip(&counters)
        .map(|((method, succeed), calls)| {
            Box::new(Scripted {
                method: *method,
                succeed,
                calls: calls.clone(),
            }) as Box<dyn GenerationStage>
        })
        .collect();
    (FallbackChain::new(stages, capacity), counters)
}

fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
    counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
}

#[tokio::test]
async fn stops_at_first_success() {
    let (mut chain, counters) = scripted([false, true, true], 5);
    let report = chain.generate(&ArchitectureRequest::default(), &target()).await;

    assert_eq!(calls(&counters), vec![1, 1, 0]);
    assert_eq!(report.method, Some(GenerationMethod::Template));
    assert_eq!(
        report.artifact.unwrap().path,
        std::path::PathBuf::from("cloudsketch_test_template.png")
    );
}

#[tokio::test]
async fn never_retries_a_failed_stage() {
    let (mut chain, counters) = scripted([false, false, false], 5);
    let report = chain.generate(&ArchitectureRequest::default(), &target()).await;

    assert_eq!(calls(&counters), vec![1, 1, 1]);
    assert!(!report.succeeded());
    assert_eq!(chain.history().len(), 1);
}

#[tokio::test]
async fn history_is_bounded_and_newest_first() {
    let (mut chain, _) = scripted([true, false, false], 2);
    for i in 0..3 {
        let target = OutputTarget::new(format!("run{i}"));
        chain.generate(&ArchitectureRequest::default(), &target).await;
    }

    let recent = chain.history().recent(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(
        recent[0].diagram_path.as_deref(),
        Some(std::path::Path::new("run2_cli.png"))
    );
    assert_eq!(
        recent[1].diagram_path.as_deref(),
        Some(std::path::Path::new("run1_cli.png"))
    );

    chain.clear_history();
    assert!(chain.history().is_empty());
}
