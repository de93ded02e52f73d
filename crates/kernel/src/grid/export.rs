//! Spreadsheet export.
//!
//! Streams the rows of a query description as CSV. Rows are pulled from the
//! store cursor and flushed in batches, so buffered rows never exceed the
//! batch size. The ids already written are kept for de-duplication and grow
//! with the export. Dropping the returned stream drops the cursor with it.

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::NaiveDate;
use futures_core::Stream;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{error, info};

use super::format::Presenter;
use super::grid_service::GridError;
use super::registry::Field;
use super::store::RowStream;
use super::types::Row;
use crate::metrics::Metrics;

/// Byte-order mark so spreadsheet applications detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Chunks of an export body.
pub type ExportStream = Pin<Box<dyn Stream<Item = Result<Bytes, GridError>> + Send>>;

/// Attachment name for an export generated on `date`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("properties-for-sale-{}.csv", date.format("%Y%m%d"))
}

/// Encodes rows as CSV records in projection order.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    fields: Vec<Field>,
    presenter: Presenter,
}

impl CsvEncoder {
    pub fn new(fields: Vec<Field>, presenter: Presenter) -> Self {
        Self { fields, presenter }
    }

    /// BOM plus the header row of field labels.
    pub fn header(&self) -> Result<Bytes, GridError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
        writer
            .write_record(self.fields.iter().map(|f| f.descriptor().label))
            .map_err(|e| GridError::Encode(io::Error::from(e)))?;
        finish(writer)
    }

    /// One CSV record per row.
    pub fn encode(&self, rows: &[Row]) -> Result<Bytes, GridError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(self.fields.iter().map(|f| self.presenter.cell(row, *f)))
                .map_err(|e| GridError::Encode(io::Error::from(e)))?;
        }
        finish(writer)
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Bytes, GridError> {
    writer
        .into_inner()
        .map(Bytes::from)
        .map_err(|e| GridError::Encode(io::Error::new(e.error().kind(), e.error().to_string())))
}

/// Identity used to skip rows already written.
fn row_identity(row: &Row) -> Option<String> {
    row.get(Field::Id.name())
        .filter(|v| !v.is_null())
        .map(Value::to_string)
}

/// Turn a row cursor into CSV chunks.
///
/// A store failure mid-stream yields an error item and ends the stream, so
/// the transport aborts the response instead of completing a truncated file.
pub fn csv_stream(
    mut rows: RowStream,
    encoder: CsvEncoder,
    batch_size: usize,
    metrics: Arc<Metrics>,
) -> ExportStream {
    let batch_size = batch_size.max(1);

    Box::pin(async_stream::stream! {
        match encoder.header() {
            Ok(header) => yield Ok(header),
            Err(e) => {
                metrics.record_export_failure();
                yield Err(e);
                return;
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut batch: Vec<Row> = Vec::with_capacity(batch_size);
        let mut exported: u64 = 0;

        loop {
            let next = rows.next().await;
            let done = next.is_none();

            match next {
                Some(Ok(row)) => {
                    if let Some(id) = row_identity(&row) {
                        if !seen.insert(id) {
                            continue;
                        }
                    }
                    batch.push(row);
                }
                Some(Err(e)) => {
                    error!(error = %e, exported, "export aborted by store failure");
                    metrics.record_export_failure();
                    yield Err(GridError::QueryFailed(e));
                    return;
                }
                None => {}
            }

            if batch.len() >= batch_size || (done && !batch.is_empty()) {
                match encoder.encode(&batch) {
                    Ok(chunk) => {
                        let count = batch.len() as u64;
                        exported += count;
                        metrics.record_export_rows(count);
                        batch.clear();
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        error!(error = %e, exported, "export aborted by encoding failure");
                        metrics.record_export_failure();
                        yield Err(e);
                        return;
                    }
                }
            }

            if done {
                break;
            }
        }

        info!(rows = exported, "export complete");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::grid::format::Currency;
    use chrono::FixedOffset;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn encoder(fields: Vec<Field>) -> CsvEncoder {
        CsvEncoder::new(
            fields,
            Presenter::new(Currency::Clp, FixedOffset::west_opt(3 * 3600).unwrap()),
        )
    }

    fn rows_stream(items: Vec<anyhow::Result<Row>>) -> RowStream {
        Box::pin(tokio_stream::iter(items))
    }

    async fn collect(stream: ExportStream) -> (Vec<u8>, Option<GridError>) {
        let mut stream = stream;
        let mut body = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => body.extend_from_slice(&chunk),
                Err(e) => return (body, Some(e)),
            }
        }
        (body, None)
    }

    #[test]
    fn filename_carries_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_filename(date), "properties-for-sale-20240309.csv");
    }

    #[test]
    fn header_has_bom_and_labels() {
        let header = encoder(vec![Field::Id, Field::Title, Field::Price])
            .header()
            .unwrap();

        assert!(header.starts_with(UTF8_BOM));
        assert_eq!(&header[UTF8_BOM.len()..], "ID,Título,Precio\n".as_bytes());
    }

    #[test]
    fn cells_are_quoted_when_needed() {
        let chunk = encoder(vec![Field::Id, Field::Title])
            .encode(&[row(json!({"id": "p1", "title": "Casa, con \"vista\""}))])
            .unwrap();

        assert_eq!(
            String::from_utf8(chunk.to_vec()).unwrap(),
            "p1,\"Casa, con \"\"vista\"\"\"\n"
        );
    }

    #[tokio::test]
    async fn streams_formatted_rows_in_batches() {
        let rows = (1..=5)
            .map(|i| Ok(row(json!({"id": format!("p{i}"), "price": 1_000_000 * i}))))
            .collect();
        let metrics = Arc::new(Metrics::new());
        let mut stream = csv_stream(
            rows_stream(rows),
            encoder(vec![Field::Id, Field::Price]),
            2,
            metrics.clone(),
        );

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(String::from_utf8(chunk.unwrap().to_vec()).unwrap());
        }

        // header, 2 + 2 + 1 rows
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[1], "p1,$1.000.000\np2,$2.000.000\n");
        assert_eq!(chunks[3], "p5,$5.000.000\n");
        assert!(metrics.encode().contains("export_rows_total 5"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_skipped() {
        let rows = vec![
            Ok(row(json!({"id": "p1", "title": "A"}))),
            Ok(row(json!({"id": "p1", "title": "A"}))),
            Ok(row(json!({"id": "p2", "title": "B"}))),
        ];
        let stream = csv_stream(
            rows_stream(rows),
            encoder(vec![Field::Id, Field::Title]),
            500,
            Arc::new(Metrics::new()),
        );

        let (body, err) = collect(stream).await;
        let text = String::from_utf8(body).unwrap();

        assert!(err.is_none());
        assert_eq!(text.matches("p1,A").count(), 1);
        assert!(text.ends_with("p2,B\n"));
    }

    #[tokio::test]
    async fn store_failure_ends_stream_with_error() {
        let rows = vec![
            Ok(row(json!({"id": "p1"}))),
            Err(anyhow::anyhow!("connection reset")),
            Ok(row(json!({"id": "p2"}))),
        ];
        let metrics = Arc::new(Metrics::new());
        let stream = csv_stream(
            rows_stream(rows),
            encoder(vec![Field::Id]),
            500,
            metrics.clone(),
        );

        let (body, err) = collect(stream).await;

        assert!(matches!(err, Some(GridError::QueryFailed(_))));
        assert!(!String::from_utf8_lossy(&body).contains("p2"));
        assert!(metrics.encode().contains("export_failures_total 1"));
    }

    #[tokio::test]
    async fn empty_result_is_header_only() {
        let stream = csv_stream(
            rows_stream(vec![]),
            encoder(vec![Field::Id, Field::Title]),
            500,
            Arc::new(Metrics::new()),
        );

        let (body, err) = collect(stream).await;

        assert!(err.is_none());
        assert_eq!(&body[UTF8_BOM.len()..], b"ID,T\xC3\xADtulo\n");
    }
}
