//! Subcommand implementations

use crate::synthetic::{ScriptedPayload, SyntheticCamera};
use anyhow::{bail, Context, Result};
use labeltrace_core::{
    normalize, Identifier, ResolutionToken, ScanConfig, ScanController, ScanEvent, ScanRuntime,
    TraceabilityRecord, TraceabilityResolver,
};
use labeltrace_http::HttpTraceabilityResolver;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

/// Slack on top of the expected simulate run time
const SIMULATE_GRACE: Duration = Duration::from_secs(5);

/// Load configuration from `path` (or defaults) and apply CLI overrides
pub fn load_config(path: Option<&Path>, base_url: Option<&str>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Normalize then resolve one payload
pub async fn lookup(config: &ScanConfig, payload: &str, json: bool) -> Result<String> {
    let identifier = normalize(payload);
    if identifier.is_empty() {
        bail!("payload is empty after trimming");
    }

    let resolver = HttpTraceabilityResolver::new(&config.resolver)?;
    tracing::info!(identifier = %identifier, base_url = %resolver.base_url(), "looking up identifier");

    let record = resolver
        .resolve(&identifier, ResolutionToken::new())
        .await
        .with_context(|| format!("Lookup of {identifier} failed"))?;

    if json {
        Ok(serde_json::to_string_pretty(&record)?)
    } else {
        Ok(render_summary(&identifier, &record))
    }
}

/// Human-readable record summary
pub fn render_summary(identifier: &Identifier, record: &TraceabilityRecord) -> String {
    let product = &record.product;
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    let _ = writeln!(out, "Identifier:      {identifier}");
    let _ = writeln!(out, "Product:         {}", product.name);
    let _ = writeln!(out, "Batch:           {}", field(&product.batch_number));
    let _ = writeln!(out, "Category:        {}", field(&product.category));
    let _ = writeln!(out, "Manufacturer:    {}", field(&product.manufacturer));
    let _ = writeln!(out, "Expiry:          {}", field(&product.expiry_date));
    let _ = writeln!(out, "Workflow status: {}", field(&product.workflow_status));
    let _ = writeln!(
        out,
        "Quality checks:  {} ({} failed)",
        record.quality_checks.len(),
        record.failed_checks().count()
    );
    let _ = writeln!(
        out,
        "Labels:          {} ({} verified)",
        record.labels.len(),
        record.verified_label_count()
    );
    let _ = writeln!(out, "Score:           {:.1}", record.traceability_score);
    let _ = write!(out, "Compliance:      {}", record.compliance_status);
    out
}

/// One line per scan event
pub fn describe_event(event: &ScanEvent) -> String {
    match event {
        ScanEvent::StateChanged(state) => format!("state      {state:?}"),
        ScanEvent::CodeDetected {
            identifier,
            payload,
        } => format!("detected   {identifier} (payload {payload:?})"),
        ScanEvent::ResolutionSucceeded(record) => format!(
            "resolved   {} [{}] score {:.1}",
            record.product.name, record.compliance_status, record.traceability_score
        ),
        ScanEvent::ResolutionFailed(kind) => format!("failed     {kind}"),
        ScanEvent::DeviceFailed(kind) => format!("device     {kind}"),
    }
}

fn is_outcome(event: &ScanEvent) -> bool {
    matches!(
        event,
        ScanEvent::ResolutionSucceeded(_)
            | ScanEvent::ResolutionFailed(_)
            | ScanEvent::DeviceFailed(_)
    )
}

/// Run one scan session end to end and print every event.
///
/// Returns an error when the session ends in anything other than a record.
pub async fn simulate(config: &ScanConfig, payload: &str, detect_on: u32) -> Result<()> {
    let resolver = HttpTraceabilityResolver::new(&config.resolver)?;
    let decoder = ScriptedPayload::new(payload, detect_on);

    let (controller, mut events) = ScanController::new(SyntheticCamera::new(), decoder, config);
    let (handle, task) = ScanRuntime::spawn(controller, resolver, config);

    let budget = config.tick_interval() * (detect_on + 1) + config.resolver.timeout() + SIMULATE_GRACE;
    tracing::info!(detect_on, budget_ms = budget.as_millis() as u64, "starting simulated scan");

    let session = handle.start().await.context("Failed to start scan session")?;
    println!("session    {session}");

    let outcome = tokio::time::timeout(budget, async {
        while let Some(event) = events.recv().await {
            println!("{}", describe_event(&event));
            if is_outcome(&event) {
                return Some(event);
            }
        }
        None
    })
    .await;

    handle.stop().await?;
    handle.shutdown().await?;
    task.await.context("Scan runtime task panicked")?;

    match outcome {
        Ok(Some(ScanEvent::ResolutionSucceeded(_))) => Ok(()),
        Ok(Some(event)) => bail!("scan ended without a record: {}", describe_event(&event)),
        Ok(None) => bail!("event stream closed before an outcome"),
        Err(_) => bail!("no outcome within {}ms", budget.as_millis()),
    }
}
