//! Record export service.
//!
//! Renders a record collection into one CSV or JSON document per batch,
//! redacting sensitive fields on the way out, and can mail the documents as
//! attachments.

use crate::clock::{Clock, SystemClock};
use crate::config::BulkportConfig;
use crate::io::formats::Format;
use crate::io::traits::BatchSource;
use crate::mail::{Attachment, Mailer, Message};
use crate::models::{FieldSet, Record};
use crate::security::FieldFilter;
use crate::storage::RecordStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::instrument;

/// Options for one exporter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Skip redaction entirely.
    pub export_sensitive: bool,
    /// Fields to export; empty means every field of the model.
    pub attributes: Vec<String>,
    /// Records per document; `None` uses the configured batch size.
    pub batch_size: Option<usize>,
}

impl ExportOptions {
    /// Enables or disables exporting sensitive values.
    #[must_use]
    pub const fn with_export_sensitive(mut self, export_sensitive: bool) -> Self {
        self.export_sensitive = export_sensitive;
        self
    }

    /// Restricts the exported fields.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Result of an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Format of every document.
    pub format: Format,
    /// One document per batch, in batch order. Never empty.
    pub exports: Vec<String>,
    /// Number of records exported.
    pub records: usize,
}

impl ExportResult {
    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Returns whether there are no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Returns a file name for each document.
    ///
    /// A single document gets no index suffix; several are numbered from 1.
    #[must_use]
    pub fn file_names(&self, model: &str, at: DateTime<Utc>) -> Vec<String> {
        if self.exports.len() == 1 {
            return vec![export_file_name(model, at, None, self.format)];
        }
        (1..=self.exports.len())
            .map(|index| export_file_name(model, at, Some(index), self.format))
            .collect()
    }
}

/// Builds an export file name.
///
/// # Examples
///
/// ```
/// use bulkport::io::{Format, export_file_name};
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap();
/// assert_eq!(
///     export_file_name("User", at, None, Format::Csv),
///     "user-export-1989-12-31-00-00-00-UTC.csv"
/// );
/// assert_eq!(
///     export_file_name("User", at, Some(2), Format::Json),
///     "user-export-1989-12-31-00-00-00-UTC-2.json"
/// );
/// ```
#[must_use]
pub fn export_file_name(
    model: &str,
    at: DateTime<Utc>,
    index: Option<usize>,
    format: Format,
) -> String {
    let suffix = index.map(|i| format!("-{i}")).unwrap_or_default();
    format!(
        "{}-export-{}-UTC{suffix}.{}",
        model.to_lowercase(),
        at.format("%Y-%m-%d-%H-%M-%S"),
        format.extension()
    )
}

/// Options for mailing an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailOptions {
    /// Recipients.
    pub to: Vec<String>,
    /// Sender; falls back to the configured default.
    pub from: Option<String>,
    /// Subject; defaults to `"<Model> export"`.
    pub subject: Option<String>,
    /// Body; defaults to `"<Model> export"`.
    pub body: Option<String>,
    /// Attachment format.
    pub format: Format,
}

impl EmailOptions {
    /// Creates options for the given recipients.
    #[must_use]
    pub fn new<I, S>(to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            to: to.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the attachment format.
    #[must_use]
    pub const fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}

/// Service exporting records of a store.
pub struct ExportService<'a> {
    store: &'a dyn RecordStore,
    config: &'a BulkportConfig,
    options: ExportOptions,
    clock: Box<dyn Clock>,
}

impl<'a> ExportService<'a> {
    /// Creates an exporter.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, config: &'a BulkportConfig, options: ExportOptions) -> Self {
        Self {
            store,
            config,
            options,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock used for attachment names.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Exports as CSV, one document per batch, each with a header line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the batch size is zero,
    /// [`Error::InvalidInput`] if none of the requested attributes exist, or a
    /// store error if the records cannot be read.
    #[instrument(skip(self, source), fields(model = source.model_name()))]
    pub fn to_csv(&self, source: &dyn BatchSource) -> Result<ExportResult> {
        self.export(source, Format::Csv)
    }

    /// Exports as JSON, one array document per batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the batch size is zero, or a store
    /// error if the records cannot be read.
    #[instrument(skip(self, source), fields(model = source.model_name()))]
    pub fn to_json(&self, source: &dyn BatchSource) -> Result<ExportResult> {
        self.export(source, Format::Json)
    }

    /// Exports in the given format.
    ///
    /// An empty collection yields a single document with no rows.
    ///
    /// # Errors
    ///
    /// See [`ExportService::to_csv`].
    pub fn export(&self, source: &dyn BatchSource, format: Format) -> Result<ExportResult> {
        let batch_size = self.batch_size()?;
        let header = self.header(source.model_name())?;
        let filter = FieldFilter::for_export(
            self.options.export_sensitive,
            &self.config.filtered_attributes,
        );

        let mut exports = Vec::new();
        let mut records = 0;
        source.for_each_batch(batch_size, &mut |batch| {
            let mut sink = format.export_sink(&header)?;
            for record in batch {
                sink.write(&filter.apply(&project(record, &header)))?;
            }
            exports.push(sink.finish()?);
            records += batch.len();
            tracing::debug!(batch = exports.len(), rows = batch.len(), "Rendered export batch");
            metrics::counter!("export_batches_total", "format" => format.extension())
                .increment(1);
            Ok(())
        })?;

        if exports.is_empty() {
            exports.push(format.export_sink(&header)?.finish()?);
            metrics::counter!("export_batches_total", "format" => format.extension())
                .increment(1);
        }

        tracing::info!(
            model = source.model_name(),
            %format,
            records,
            documents = exports.len(),
            "Export complete"
        );
        Ok(ExportResult {
            format,
            exports,
            records,
        })
    }

    /// Exports and mails the documents as attachments.
    ///
    /// The sender is resolved before any record is read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no sender is given or configured,
    /// [`Error::InvalidInput`] without recipients, and export or mailer
    /// errors otherwise.
    #[instrument(skip(self, source, mailer, email), fields(model = source.model_name(), format = %email.format))]
    pub fn email(
        &self,
        source: &dyn BatchSource,
        mailer: &dyn Mailer,
        email: &EmailOptions,
    ) -> Result<Message> {
        let from = email
            .from
            .clone()
            .or_else(|| self.config.from_address.clone())
            .ok_or_else(|| {
                Error::Configuration(
                    "missing sender: pass `from` or set a default from_address".to_string(),
                )
            })?;
        if email.to.is_empty() {
            return Err(Error::InvalidInput("at least one recipient is required".to_string()));
        }

        let model = source.model_name();
        let result = self.export(source, email.format)?;
        let names = result.file_names(model, self.clock.now());

        let attachments = names
            .into_iter()
            .zip(result.exports)
            .map(|(name, export)| Attachment::new(name, email.format.mime_type(), export))
            .collect();

        let default_text = format!("{model} export");
        let message = Message {
            to: email.to.clone(),
            from,
            subject: email.subject.clone().unwrap_or_else(|| default_text.clone()),
            body: email.body.clone().unwrap_or(default_text),
            attachments,
        };

        mailer.send(&message)?;
        metrics::counter!("export_emails_total").increment(1);
        tracing::info!(to = ?message.to, attachments = message.attachments.len(), "Export mailed");
        Ok(message)
    }

    fn batch_size(&self) -> Result<usize> {
        match self.options.batch_size.unwrap_or(self.config.batch_size) {
            0 => Err(Error::Configuration("batch size must be positive".to_string())),
            n => Ok(n),
        }
    }

    /// Model fields in natural order, restricted to the requested attributes.
    fn header(&self, model: &str) -> Result<Vec<String>> {
        let names = self.store.field_names(model)?;
        if self.options.attributes.is_empty() {
            return Ok(names);
        }
        let header: Vec<String> = names
            .into_iter()
            .filter(|name| self.options.attributes.contains(name))
            .collect();
        if header.is_empty() {
            return Err(Error::InvalidInput(format!(
                "none of the requested attributes exist on {model}: {}",
                self.options.attributes.join(", ")
            )));
        }
        Ok(header)
    }
}

/// Picks the header fields out of a record, `null` where missing.
fn project(record: &Record, header: &[String]) -> FieldSet {
    header
        .iter()
        .map(|name| (name.clone(), record.get(name).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::io::traits::Records;
    use crate::models::{RecordId, SaveOutcome};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;

    /// Store stub that only knows the `User` field list.
    struct UserFields;

    impl RecordStore for UserFields {
        fn field_names(&self, _model: &str) -> Result<Vec<String>> {
            Ok(["id", "email", "password"].map(String::from).to_vec())
        }

        fn build(&self, model: &str, fields: FieldSet) -> Result<Record> {
            Ok(Record::new(model, fields))
        }

        fn save(&self, _record: &Record) -> Result<SaveOutcome> {
            Ok(SaveOutcome::Saved(RecordId::new("1")))
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &Message) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn user(id: i64, email: &str) -> Record {
        let fields = json!({"id": id, "email": email, "password": "s3cure!"});
        Record::new("User", fields.as_object().unwrap().clone())
    }

    fn users(n: i64) -> Records {
        Records::new(
            "User",
            (1..=n).map(|i| user(i, &format!("u{i}@example.com"))).collect(),
        )
    }

    fn new_years_eve() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_csv_redacts_by_default() {
        let config = BulkportConfig::default();
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());

        let result = exporter.to_csv(&users(1)).unwrap();

        assert_eq!(result.exports, vec!["id,email,password\n1,u1@example.com,[FILTERED]\n"]);
        assert_eq!(result.records, 1);
    }

    #[test]
    fn test_export_sensitive_keeps_values() {
        let config = BulkportConfig::default();
        let options = ExportOptions::default().with_export_sensitive(true);
        let exporter = ExportService::new(&UserFields, &config, options);

        let result = exporter.to_json(&user(1, "a@example.com")).unwrap();

        assert_eq!(
            result.exports,
            vec![r#"[{"id":1,"email":"a@example.com","password":"s3cure!"}]"#]
        );
    }

    #[test]
    fn test_attributes_restrict_columns_in_model_order() {
        let config = BulkportConfig::default();
        let options = ExportOptions::default().with_attributes(["email", "id", "shoe_size"]);
        let exporter = ExportService::new(&UserFields, &config, options);

        let result = exporter.to_csv(&users(1)).unwrap();

        assert_eq!(result.exports, vec!["id,email\n1,u1@example.com\n"]);
    }

    #[test]
    fn test_unknown_attributes_only_is_invalid_input() {
        let config = BulkportConfig::default();
        let options = ExportOptions::default().with_attributes(["shoe_size", "hat_size"]);
        let exporter = ExportService::new(&UserFields, &config, options);

        for format in [Format::Csv, Format::Json] {
            let err = exporter.export(&users(2), format).unwrap_err();
            assert!(
                matches!(err, Error::InvalidInput(ref msg) if msg.contains("shoe_size, hat_size"))
            );
        }
    }

    #[test]
    fn test_batches() {
        let config = BulkportConfig::default().with_batch_size(2);
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());

        let result = exporter.to_json(&users(5)).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.records, 5);
        assert!(result.exports[2].contains("u5@example.com"));
    }

    #[test]
    fn test_option_batch_size_overrides_config() {
        let config = BulkportConfig::default().with_batch_size(2);
        let options = ExportOptions::default().with_batch_size(10);
        let exporter = ExportService::new(&UserFields, &config, options);

        assert_eq!(exporter.to_csv(&users(5)).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_batch_size_is_configuration_error() {
        let config = BulkportConfig::default().with_batch_size(0);
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());

        let err = exporter.to_csv(&users(1)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_collection_yields_one_empty_document() {
        let config = BulkportConfig::default();
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());

        assert_eq!(exporter.to_csv(&users(0)).unwrap().exports, vec!["id,email,password\n"]);
        assert_eq!(exporter.to_json(&users(0)).unwrap().exports, vec!["[]"]);
    }

    #[test]
    fn test_file_names() {
        let result = ExportResult {
            format: Format::Csv,
            exports: vec![String::new(), String::new()],
            records: 0,
        };
        assert_eq!(
            result.file_names("User", new_years_eve()),
            vec![
                "user-export-1989-12-31-00-00-00-UTC-1.csv",
                "user-export-1989-12-31-00-00-00-UTC-2.csv",
            ]
        );
    }

    #[test]
    fn test_email_single_attachment() {
        let config = BulkportConfig::default();
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default())
            .with_clock(FixedClock(new_years_eve()));
        let mailer = RecordingMailer::default();

        let message = exporter
            .email(
                &users(2),
                &mailer,
                &EmailOptions::new(["cosmo@kramerica.com"]).with_from("nori@example.com"),
            )
            .unwrap();

        assert_eq!(message.subject, "User export");
        assert_eq!(message.body, "User export");
        assert_eq!(message.attachments.len(), 1);
        let attachment = message
            .attachment("user-export-1989-12-31-00-00-00-UTC.csv")
            .unwrap();
        assert_eq!(attachment.content_type, "text/csv");
        assert!(String::from_utf8_lossy(&attachment.content).contains("[FILTERED]"));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_email_numbers_multiple_attachments() {
        let config = BulkportConfig::default()
            .with_batch_size(1)
            .with_from_address("default@example.com");
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default())
            .with_clock(FixedClock(new_years_eve()));
        let mailer = RecordingMailer::default();

        let message = exporter
            .email(
                &users(2),
                &mailer,
                &EmailOptions::new(["cosmo@kramerica.com"])
                    .with_subject("Users")
                    .with_body("See attached")
                    .with_format(Format::Json),
            )
            .unwrap();

        assert_eq!(message.from, "default@example.com");
        assert_eq!(message.subject, "Users");
        assert_eq!(message.body, "See attached");
        let names: Vec<&str> = message.attachments.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "user-export-1989-12-31-00-00-00-UTC-1.json",
                "user-export-1989-12-31-00-00-00-UTC-2.json",
            ]
        );
    }

    #[test]
    fn test_email_without_sender_fails_before_sending() {
        let config = BulkportConfig::default();
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());
        let mailer = RecordingMailer::default();

        let err = exporter
            .email(&users(1), &mailer, &EmailOptions::new(["cosmo@kramerica.com"]))
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_email_without_recipients() {
        let config = BulkportConfig::default().with_from_address("a@example.com");
        let exporter = ExportService::new(&UserFields, &config, ExportOptions::default());

        let err = exporter
            .email(&users(1), &RecordingMailer::default(), &EmailOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
