//! Import and export command handlers.

use std::io::Write;
use std::path::Path;

use anyhow::Context as _;
use bulkport::config::BulkportConfig;
use bulkport::io::{
    EmailOptions, ExportOptions, ExportService, Format, Headers, ImportOptions, ImportProgress,
    ImportResult, ImportService, RowMapping,
};
use bulkport::mail::OutboxMailer;
use bulkport::models::describe_errors;
use bulkport::storage::SqliteRecordStore;
use bulkport::{Clock, SystemClock};

use super::{ExportArgs, ImportArgs, parse_context, parse_mappings, split_list};

/// Rejections listed after an import.
const MAX_LISTED_REJECTIONS: usize = 10;

/// Executes the import command.
pub fn cmd_import(_config: &BulkportConfig, args: ImportArgs) -> anyhow::Result<()> {
    // Determine format from argument or file extension
    let format = match &args.format {
        Some(f) => f.parse::<Format>()?,
        None => Format::from_path(&args.file)?,
    };
    let headers = args
        .headers
        .as_deref()
        .map_or(Headers::FirstRow, |h| Headers::Explicit(split_list(h)));
    let mapping = RowMapping::new()
        .with_attributes(parse_mappings(&args.mappings)?)
        .with_context(parse_context(&args.context)?);
    let options = ImportOptions::default()
        .with_strip(args.strip)
        .with_rollback(args.rollback)
        .with_filtered_attributes(args.filtered.iter().cloned());

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let store = args.table.open_store()?;

    let progress_callback = Box::new(|progress: &ImportProgress| {
        if let Some(total) = progress.total_estimate {
            eprint!(
                "\rProcessing: {}/{} ({:.1}%) - Accepted: {}, Rejected: {}",
                progress.processed,
                total,
                progress.percent_complete().unwrap_or(0.0),
                progress.accepted,
                progress.rejected,
            );
        } else {
            eprint!(
                "\rProcessing: {} - Accepted: {}, Rejected: {}",
                progress.processed, progress.accepted, progress.rejected,
            );
        }
        let _ = std::io::stderr().flush();
    });

    let importer = ImportService::new(&store, &args.table.model, options)
        .with_progress(progress_callback);
    let outcome = importer.import(format, &text, &headers, &mapping);
    eprintln!();

    print!("{}", import_summary(&importer, &outcome?));
    Ok(())
}

fn import_summary(
    importer: &ImportService<'_, SqliteRecordStore>,
    result: &ImportResult,
) -> String {
    use std::fmt::Write as _;

    let mode = if importer.options().rollback { " (rollback mode)" } else { "" };
    let mut out = String::new();
    let _ = writeln!(out, "{} import completed{mode}:", importer.model());
    let _ = writeln!(out, "  Accepted:        {}", result.rows_accepted.len());
    let _ = writeln!(out, "  Rejected:        {}", result.rows_rejected.len());
    let _ = writeln!(out, "  Total processed: {}", result.total());

    if result.has_rejections() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Rejected rows ({}):", result.rows_rejected.len());
        for rejected in result.rows_rejected.iter().take(MAX_LISTED_REJECTIONS) {
            let row = serde_json::to_string(&rejected.row).unwrap_or_default();
            let _ = writeln!(out, "  - {row}: {}", describe_errors(&rejected.errors));
        }
        if result.rows_rejected.len() > MAX_LISTED_REJECTIONS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                result.rows_rejected.len() - MAX_LISTED_REJECTIONS
            );
        }
    }
    out
}

/// Executes the export command.
pub fn cmd_export(config: &BulkportConfig, args: ExportArgs) -> anyhow::Result<()> {
    let format = args.format.parse::<Format>()?;
    let mut options = ExportOptions::default().with_export_sensitive(args.export_sensitive);
    if let Some(attributes) = &args.attributes {
        options = options.with_attributes(split_list(attributes));
    }
    if let Some(batch_size) = args.batch_size {
        options = options.with_batch_size(batch_size);
    }

    let store = args.table.open_store()?;
    let relation = store.relation(&args.table.model)?;
    let exporter = ExportService::new(&store, config, options);

    if !args.email_to.is_empty() {
        let outbox = args
            .outbox
            .clone()
            .unwrap_or_else(|| args.out_dir.join("outbox"));
        let mailer = OutboxMailer::new(outbox);

        let mut email = EmailOptions::new(args.email_to.iter().cloned()).with_format(format);
        email.from = args.from.clone();
        email.subject = args.subject.clone();
        email.body = args.body.clone();

        let message = exporter.email(&relation, &mailer, &email)?;
        println!(
            "Queued export for {} with {} attachment(s) in {}",
            message.to.join(", "),
            message.attachments.len(),
            mailer.dir().display()
        );
        return Ok(());
    }

    let result = exporter.export(&relation, format)?;
    let names = result.file_names(&args.table.model, SystemClock.now());
    write_exports(&args.out_dir, &names, &result.exports)?;

    println!("Exported {} record(s) to {} file(s):", result.records, result.len());
    for name in &names {
        println!("  {}", args.out_dir.join(name).display());
    }
    Ok(())
}

fn write_exports(dir: &Path, names: &[String], exports: &[String]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (name, export) in names.iter().zip(exports) {
        let path = dir.join(name);
        std::fs::write(&path, export).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
