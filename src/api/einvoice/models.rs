use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::domains::einvoice::{BatchItem, InvoiceRecord};

// ============================================================================
// REQUEST/RESPONSE MODELS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVerifyRequest {
    pub records: Vec<InvoiceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVerifyResponse {
    pub total: usize,
    pub succeeded: usize,
    pub processed_at: DateTime<Utc>,
    pub items: Vec<BatchItem>,
}

impl BatchVerifyResponse {
    pub fn new(items: Vec<BatchItem>) -> Self {
        let succeeded = items.iter().filter(|item| item.result.is_success()).count();
        Self {
            total: items.len(),
            succeeded,
            processed_at: Utc::now(),
            items,
        }
    }
}
