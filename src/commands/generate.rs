//! Generate static files

use anyhow::Result;
use std::sync::Arc;

use crate::generator::{GenerateSummary, Generator};
use crate::prismic::ContentSource;
use crate::Spacetraveling;

/// Generate the site from the configured content service
pub async fn run(app: &Spacetraveling, force: bool) -> Result<GenerateSummary> {
    let client = app.client()?;
    run_with_source(app, Arc::new(client), force).await
}

/// Generate the site from any content source
pub async fn run_with_source(
    app: &Spacetraveling,
    source: Arc<dyn ContentSource>,
    force: bool,
) -> Result<GenerateSummary> {
    let start = std::time::Instant::now();

    if force {
        tracing::info!("Full generation (force=true)");
    }

    let generator = Generator::new(app, source)?;
    let summary = generator.generate(force).await?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(summary)
}
