//! Isolated child-process OCR pass (SPEC_FULL 4.2 step 7, 9 DESIGN NOTES).
//!
//! OCR runs in its own process so a native-library crash or leak inside
//! `ocrmypdf` cannot poison the worker. The child is joined through
//! `tokio::process::Command` so its blocking wait is an async suspension
//! point, wrapped in a timeout so a hung invocation cannot wedge the worker.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::PdfError;

/// The fixed OCR configuration record (SPEC_FULL 9). Never exposed as
/// runtime-tunable: the worker has exactly one OCR policy.
pub struct OcrConfig {
    pub timeout: Duration,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

pub async fn run_ocr(input: &Path, output: &Path, config: &OcrConfig) -> Result<(), PdfError> {
    let mut command = Command::new("ocrmypdf");
    command
        .arg("--output-type")
        .arg("pdf")
        .arg("--color-conversion-strategy")
        .arg("RGB")
        .arg("--continue-on-soft-render-error")
        .arg("--jobs")
        .arg("1")
        .arg("--skip-text")
        .arg("--optimize")
        .arg("2")
        .arg("--invalidate-digital-signatures")
        .arg(input)
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = command.spawn().map_err(|e| PdfError::Ocr(e.to_string()))?;

    let output_result = tokio::time::timeout(config.timeout, child.wait_with_output())
        .await
        .map_err(|_| PdfError::OcrTimeout)?
        .map_err(|e| PdfError::Ocr(e.to_string()))?;

    if !output_result.status.success() {
        return Err(PdfError::Ocr(format!(
            "ocrmypdf exited with {}: {}",
            output_result.status,
            String::from_utf8_lossy(&output_result.stderr)
        )));
    }

    Ok(())
}
