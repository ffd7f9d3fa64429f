//! Archive service and OCR worker commands.

use console::style;

use crate::config::Settings;
use crate::ocr::{OcrBackend, PdftoppmRasterizer, Rasterizer, TesseractBackend};

/// Start the archive service.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let bind = parse_bind_address(bind, 8080);

    println!("{} Preparing database...", style("→").cyan());
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    match ctx.init_schema().await {
        Ok(()) => {
            println!("  {} Database ready", style("✓").green());
        }
        Err(e) => {
            eprintln!("  {} Schema setup failed: {}", style("✗").red(), e);
            return Err(anyhow::anyhow!("Database setup failed: {}", e));
        }
    }

    println!(
        "{} Starting eArchive server at http://{}",
        style("→").cyan(),
        bind
    );
    println!("  OCR worker: {}", settings.worker_url);
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &bind).await
}

/// Start the OCR worker.
pub async fn cmd_worker(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let bind = parse_bind_address(bind, 8090);

    println!("{} Checking OCR tools...", style("→").cyan());
    let backend = TesseractBackend::new(settings.ocr.language.clone());
    let rasterizer = PdftoppmRasterizer::new(settings.ocr.dpi);
    for (name, available, hint) in [
        ("tesseract", backend.is_available(), backend.availability_hint()),
        (
            "pdftoppm",
            rasterizer.is_available(),
            "Install poppler-utils for PDF support".to_string(),
        ),
    ] {
        if available {
            println!("  {} {}", style("✓").green(), name);
        } else {
            println!("  {} {}: {}", style("!").yellow(), name, hint);
        }
    }

    println!(
        "{} Starting OCR worker at http://{} ({} concurrent jobs)",
        style("→").cyan(),
        bind,
        settings.ocr.max_concurrent_jobs
    );
    println!("  Press Ctrl+C to stop");

    crate::worker::serve_worker(settings, &bind).await
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:<default_port>
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str, default_port: u16) -> String {
    if let Ok(port) = bind.parse::<u16>() {
        return format!("127.0.0.1:{}", port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return format!("{}:{}", host, port_str);
        }
    }

    format!("{}:{}", bind, default_port)
}
