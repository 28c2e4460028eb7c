//! Invoice ledger: append-only payments with a projected invoice status,
//! plus the accounts-receivable aggregate view.
//!
//! Status is a monotone function of the outstanding balance, recomputed
//! on every payment write. The AR summary buckets invoices by their
//! *stored* status, so it can transiently disagree with a freshly derived
//! one if some other process wrote the status; the two views converge on
//! the next payment write.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::interfaces::{LedgerError, LedgerStore, Result};
use crate::model::{InvoiceStatus, Payment};

/// A payment as reported by the cashier flow.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub invoice_id: Uuid,
    pub amount: f64,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_mode: String,
    pub reference: Option<String>,
    pub created_by: Option<String>,
}

/// Balance block returned alongside every payment write and history read.
/// `outstanding` is reported unclamped here (an overpayment shows as
/// negative); only the AR summary clamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub invoice_total: f64,
    pub total_paid: f64,
    pub outstanding: f64,
    pub status: InvoiceStatus,
}

/// What recording a payment produced.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub totals: PaymentTotals,
}

/// Payment history for one invoice with its current totals.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentHistory {
    pub payments: Vec<Payment>,
    pub totals: PaymentTotals,
}

/// One AR bucket: the invoices sharing a stored status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArBucket {
    pub invoice_count: u64,
    pub invoice_amount: f64,
    pub outstanding: f64,
}

/// AR buckets keyed by stored invoice status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArBuckets {
    pub paid: ArBucket,
    pub pending: ArBucket,
    pub overdue: ArBucket,
    pub partially_paid: ArBucket,
    pub other: ArBucket,
}

/// The accounts-receivable aggregate view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArSummary {
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub buckets: ArBuckets,
}

/// The invoice ledger service.
pub struct InvoiceLedger {
    store: Arc<dyn LedgerStore>,
}

impl InvoiceLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append one payment and recompute the invoice's derived status.
    ///
    /// `outstanding <= 0` makes the invoice `paid`; any payment against a
    /// remaining balance makes it `partially_paid`; with nothing paid the
    /// prior status (typically `pending` or `overdue`) is retained.
    pub async fn record_payment(&self, payment: RecordPayment) -> Result<PaymentOutcome> {
        if payment.amount <= 0.0 {
            return Err(LedgerError::Validation(
                "payment amount must be positive".into(),
            ));
        }

        let invoice = self
            .store
            .find_invoice(payment.invoice_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "invoice",
                reference: payment.invoice_id.to_string(),
            })?;

        let now = Utc::now();
        let row = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            amount: payment.amount,
            payment_date: payment.payment_date.unwrap_or(now),
            payment_mode: payment.payment_mode,
            reference: payment.reference,
            created_by: payment.created_by,
            created_at: now,
        };

        let total_paid = self.store.insert_payment(&row).await?;
        let outstanding = invoice.amount - total_paid;
        let status = derive_status(&invoice.status, total_paid, outstanding);
        self.store.update_invoice_status(invoice.id, &status).await?;

        debug!(
            invoice = %invoice.reference,
            total_paid = total_paid,
            outstanding = outstanding,
            status = %status.as_str(),
            "payment recorded"
        );

        Ok(PaymentOutcome {
            payment: row,
            totals: PaymentTotals {
                invoice_total: invoice.amount,
                total_paid,
                outstanding,
                status,
            },
        })
    }

    /// Payments for one invoice, oldest first, with current totals.
    /// Status comes from the stored row, not a re-derivation.
    pub async fn payment_history(&self, invoice_id: Uuid) -> Result<PaymentHistory> {
        let invoice = self
            .store
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "invoice",
                reference: invoice_id.to_string(),
            })?;

        let payments = self.store.list_payments(invoice_id).await?;
        let total_paid: f64 = payments.iter().map(|p| p.amount).sum();

        Ok(PaymentHistory {
            totals: PaymentTotals {
                invoice_total: invoice.amount,
                total_paid,
                outstanding: invoice.amount - total_paid,
                status: invoice.status,
            },
            payments,
        })
    }

    /// Aggregate every invoice into the AR view.
    ///
    /// Per invoice, outstanding is clamped at zero and the paid
    /// contribution at the invoice amount, so an overpaid invoice cannot
    /// drag the totals negative.
    pub async fn summarize_ar(&self) -> Result<ArSummary> {
        let invoices = self.store.list_invoices().await?;
        let paid_by_invoice: HashMap<Uuid, f64> =
            self.store.payment_totals().await?.into_iter().collect();

        let mut summary = ArSummary {
            total_invoiced: 0.0,
            total_paid: 0.0,
            total_outstanding: 0.0,
            buckets: ArBuckets::default(),
        };

        for invoice in &invoices {
            let paid = paid_by_invoice.get(&invoice.id).copied().unwrap_or(0.0);
            let outstanding = (invoice.amount - paid).max(0.0);

            summary.total_invoiced += invoice.amount;
            summary.total_paid += paid.min(invoice.amount);
            summary.total_outstanding += outstanding;

            let bucket = match invoice.status {
                InvoiceStatus::Paid => &mut summary.buckets.paid,
                InvoiceStatus::Pending => &mut summary.buckets.pending,
                InvoiceStatus::Overdue => &mut summary.buckets.overdue,
                InvoiceStatus::PartiallyPaid => &mut summary.buckets.partially_paid,
                InvoiceStatus::Other(_) => &mut summary.buckets.other,
            };
            bucket.invoice_count += 1;
            bucket.invoice_amount += invoice.amount;
            bucket.outstanding += outstanding;
        }

        Ok(summary)
    }
}

/// The status projection. Total over (`total_paid`, `outstanding`); the
/// zero-paid case retains whatever the invoice already was.
fn derive_status(prior: &InvoiceStatus, total_paid: f64, outstanding: f64) -> InvoiceStatus {
    if outstanding <= 0.0 {
        InvoiceStatus::Paid
    } else if total_paid > 0.0 {
        InvoiceStatus::PartiallyPaid
    } else {
        prior.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Invoice;
    use crate::storage::MockLedgerStore;

    async fn seed_invoice(store: &MockLedgerStore, amount: f64, status: InvoiceStatus) -> Uuid {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            reference: "INV-1".to_string(),
            amount,
            status,
            created_at: Utc::now(),
        };
        store.insert_invoice(&invoice).await.unwrap();
        invoice.id
    }

    fn payment(invoice_id: Uuid, amount: f64) -> RecordPayment {
        RecordPayment {
            invoice_id,
            amount,
            payment_date: None,
            payment_mode: "upi".to_string(),
            reference: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_partial_then_overpayment_sequence() {
        let store = Arc::new(MockLedgerStore::new());
        let invoice_id = seed_invoice(&store, 1000.0, InvoiceStatus::Pending).await;
        let ledger = InvoiceLedger::new(store.clone());

        let first = ledger.record_payment(payment(invoice_id, 400.0)).await.unwrap();
        assert_eq!(first.totals.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(first.totals.outstanding, 600.0);

        let second = ledger.record_payment(payment(invoice_id, 700.0)).await.unwrap();
        assert_eq!(second.totals.status, InvoiceStatus::Paid);
        assert_eq!(second.totals.outstanding, -100.0);

        // The AR view clamps what the payment endpoint reports raw.
        let summary = ledger.summarize_ar().await.unwrap();
        assert_eq!(summary.total_outstanding, 0.0);
        assert_eq!(summary.total_paid, 1000.0);
        assert_eq!(summary.buckets.paid.invoice_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_not_found() {
        let ledger = InvoiceLedger::new(Arc::new(MockLedgerStore::new()));
        let err = ledger
            .record_payment(payment(Uuid::new_v4(), 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let ledger = InvoiceLedger::new(Arc::new(MockLedgerStore::new()));
        for amount in [0.0, -50.0] {
            let err = ledger
                .record_payment(payment(Uuid::new_v4(), amount))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_overdue_status_retained_until_money_arrives() {
        let store = Arc::new(MockLedgerStore::new());
        let invoice_id = seed_invoice(&store, 500.0, InvoiceStatus::Overdue).await;
        let ledger = InvoiceLedger::new(store.clone());

        // Nothing paid yet: history still shows the stored overdue status.
        let history = ledger.payment_history(invoice_id).await.unwrap();
        assert_eq!(history.totals.status, InvoiceStatus::Overdue);
        assert_eq!(history.totals.total_paid, 0.0);

        let outcome = ledger.record_payment(payment(invoice_id, 100.0)).await.unwrap();
        assert_eq!(outcome.totals.status, InvoiceStatus::PartiallyPaid);
    }

    #[tokio::test]
    async fn test_ar_buckets_use_stored_status() {
        let store = Arc::new(MockLedgerStore::new());
        // Stored status says overdue even though nothing was ever derived;
        // the summary must follow the stored value.
        seed_invoice(&store, 300.0, InvoiceStatus::Overdue).await;
        seed_invoice(&store, 200.0, InvoiceStatus::Other("written_off".into())).await;

        let ledger = InvoiceLedger::new(store);
        let summary = ledger.summarize_ar().await.unwrap();

        assert_eq!(summary.buckets.overdue.invoice_count, 1);
        assert_eq!(summary.buckets.overdue.outstanding, 300.0);
        assert_eq!(summary.buckets.other.invoice_count, 1);
        assert_eq!(summary.total_invoiced, 500.0);
        assert_eq!(summary.total_paid, 0.0);
    }

    #[tokio::test]
    async fn test_payment_history_ordered_by_date() {
        let store = Arc::new(MockLedgerStore::new());
        let invoice_id = seed_invoice(&store, 1000.0, InvoiceStatus::Pending).await;
        let ledger = InvoiceLedger::new(store);

        let dates = [
            Utc::now() - chrono::Duration::days(2),
            Utc::now() - chrono::Duration::days(5),
            Utc::now(),
        ];
        for date in dates {
            ledger
                .record_payment(RecordPayment {
                    payment_date: Some(date),
                    ..payment(invoice_id, 10.0)
                })
                .await
                .unwrap();
        }

        let history = ledger.payment_history(invoice_id).await.unwrap();
        let ordered: Vec<_> = history.payments.iter().map(|p| p.payment_date).collect();
        let mut sorted = ordered.clone();
        sorted.sort();
        assert_eq!(ordered, sorted);
        assert_eq!(history.totals.total_paid, 30.0);
    }
}
