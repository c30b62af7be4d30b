use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::domains::einvoice::client::InvoiceApiClient;
use crate::domains::einvoice::error_handling::InvoiceApiError;
use crate::domains::einvoice::models::{BatchItem, InvoiceQueryRequest, InvoiceRecord, Outcome, RequestId};
use crate::domains::einvoice::params::{ParameterBuilder, PreparedRequest};
use crate::observability::record_einvoice_batch;

/// Verifies a batch of scheduled invoice records concurrently.
///
/// Every record is validated and built before the first request leaves, so an
/// unsupported channel or missing carrier material anywhere fails the whole
/// batch without network I/O.
/// All calls are then joined; none is cancelled early and each result is
/// paired with the identifiers of the record that produced it. Output order
/// matches input order.
///
/// `max_concurrency` caps the number of in-flight calls. `None` launches the
/// whole batch at once.
pub async fn dispatch_batch(
    client: &InvoiceApiClient,
    builder: &ParameterBuilder,
    now: DateTime<Utc>,
    records: Vec<InvoiceRecord>,
    max_concurrency: Option<usize>,
) -> Result<Vec<BatchItem>, InvoiceApiError> {
    let prepared = prepare_batch(builder, now, records)?;
    let batch_size = prepared.len();

    info!(
        batch_size,
        max_concurrency = ?max_concurrency,
        "Dispatching e-invoice verification batch"
    );

    let semaphore = max_concurrency.map(|limit| Semaphore::new(limit.max(1)));

    let calls = prepared.into_iter().map(|(request_id, request)| {
        let semaphore = semaphore.as_ref();
        async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };

            debug!(
                request_id = %request_id,
                channel = %request.channel,
                "Sending batch entry"
            );
            let report = client.execute_raw(request.endpoint, &request.parameters).await;

            BatchItem {
                request_id,
                raw_result: report.raw_body,
                result: report.result,
            }
        }
    });

    let items = join_all(calls).await;

    let succeeded = items
        .iter()
        .filter(|item| item.result.outcome() == Outcome::Success)
        .count();
    let transport_failures = items
        .iter()
        .filter(|item| item.result.outcome() == Outcome::TransportError)
        .count();

    info!(
        batch_size,
        succeeded,
        transport_failures,
        business_errors = batch_size - succeeded - transport_failures,
        "e-invoice verification batch finished"
    );
    record_einvoice_batch(batch_size, succeeded);

    Ok(items)
}

/// Validates and builds every record up front.
fn prepare_batch(
    builder: &ParameterBuilder,
    now: DateTime<Utc>,
    records: Vec<InvoiceRecord>,
) -> Result<Vec<(RequestId, PreparedRequest)>, InvoiceApiError> {
    records
        .into_iter()
        .map(|record| {
            let request = InvoiceQueryRequest::try_from(record.query)?;
            let prepared = builder.build(&request, now)?;

            info!(
                request_id = %record.request_id,
                url_path = prepared.endpoint.path(),
                parameters = %prepared.parameters.masked(),
                "Prepared batch entry"
            );

            Ok((record.request_id, prepared))
        })
        .collect()
}
