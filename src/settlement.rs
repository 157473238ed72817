//! The settlement operation.
//!
//! Both ingress paths - the provider webhook and the client-initiated poll -
//! converge here. This is the only code allowed to grant course access or
//! credit referrals, and the only mutator of a transaction reference's
//! terminal state.
//!
//! Idempotency rests on two independent storage-level boundaries:
//! 1. per reference: the conditional UPDATE in `queries::try_mark_settled` -
//!    of N concurrent callers exactly one owns the transition and cascades
//!    side effects;
//! 2. per referral pair: the UNIQUE(referrer_id, referee_id) index behind
//!    `queries::try_insert_referral_credit` - protects the ledger even
//!    across two different references for the same referee.
//!
//! The CAS and every cascaded write share one SQLite transaction, so a
//! storage fault before commit rolls the whole settlement back and provider
//! redelivery (or a re-poll) retries cleanly; no partial write is ever
//! observable.

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::{CreateReferralCredit, NotificationKind, TxnOutcome, TxnStatus};
use crate::payments::GatewayError;

/// What a settlement call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// This call settled the reference and granted (or re-granted) access.
    Granted,
    /// This call settled the reference as failed; no access, no credit.
    Failed,
    /// Another caller settled the reference first. No side effects were
    /// repeated; the recorded outcome is reported so both callers answer
    /// identically.
    AlreadySettled(TxnOutcome),
}

impl Settlement {
    pub fn outcome(&self) -> TxnOutcome {
        match self {
            Self::Granted => TxnOutcome::Success,
            Self::Failed => TxnOutcome::Failed,
            Self::AlreadySettled(outcome) => *outcome,
        }
    }
}

/// Settle a transaction reference against gateway ground truth.
///
/// Errors: `UnknownTransaction` when the reference was never created
/// (permanent), `ProviderUnavailable` when verification could not complete
/// (transient - the caller retries via webhook redelivery or re-poll).
pub async fn settle_transaction(state: &AppState, reference: &str) -> Result<Settlement> {
    let mut conn = state.db.get()?;

    let txn = queries::get_transaction_ref(&conn, reference)?
        .ok_or_else(|| AppError::UnknownTransaction(reference.to_string()))?;

    // Fast path for replays: settled is terminal, skip the gateway round trip
    if txn.is_settled() {
        let outcome = txn.outcome.unwrap_or(TxnOutcome::Failed);
        return Ok(Settlement::AlreadySettled(outcome));
    }

    // Ground truth from the provider. The webhook's claimed status never
    // reaches this function - only the reference does.
    let verified = match state.gateway.verify(reference).await {
        Ok(v) => v,
        Err(GatewayError::Unavailable(reason)) => {
            tracing::warn!("Verification unavailable for {}: {}", reference, reason);
            return Err(AppError::ProviderUnavailable);
        }
        Err(GatewayError::Pending) => {
            // Not terminal at the provider yet - settling now would be
            // premature. Same retry contract as an unavailable gateway.
            tracing::debug!("{} still in flight at the gateway", reference);
            return Err(AppError::ProviderUnavailable);
        }
        Err(GatewayError::NotFound) => {
            // The provider has no record: permanently failed, settle as such
            tracing::warn!("Gateway has no record of {}, settling as failed", reference);
            return finalize(state, &mut conn, &txn, TxnOutcome::Failed);
        }
    };

    let outcome = if !verified.success {
        TxnOutcome::Failed
    } else if verified.amount_cents != txn.amount_cents || verified.currency != txn.currency {
        // Paid amount disagrees with the price frozen at checkout. Settle as
        // failed and leave a loud trail for fraud review - never a crash.
        tracing::warn!(
            "Amount mismatch for {}: verified {} {} vs expected {} {}",
            reference,
            verified.amount_cents,
            verified.currency,
            txn.amount_cents,
            txn.currency
        );
        TxnOutcome::Failed
    } else {
        TxnOutcome::Success
    };

    let verified_status = match outcome {
        TxnOutcome::Success => TxnStatus::VerifiedSuccess,
        TxnOutcome::Failed => TxnStatus::VerifiedFailed,
    };
    queries::record_verified_status(&conn, reference, verified_status)?;

    finalize(state, &mut conn, &txn, outcome)
}

/// Claim the reference and cascade side effects, all in one DB transaction.
fn finalize(
    state: &AppState,
    conn: &mut rusqlite::Connection,
    txn: &crate::models::TransactionReference,
    outcome: TxnOutcome,
) -> Result<Settlement> {
    let reference = txn.reference.as_str();
    let tx = conn.transaction()?;

    // The idempotency boundary: exactly one caller, ever, proceeds past
    // this point for a given reference.
    if !queries::try_mark_settled(&tx, reference, outcome)? {
        drop(tx);
        let settled = queries::get_transaction_ref(conn, reference)?
            .ok_or_else(|| AppError::UnknownTransaction(reference.to_string()))?;
        let outcome = settled.outcome.unwrap_or(TxnOutcome::Failed);
        tracing::debug!("{} already settled ({}), no side effects", reference, outcome);
        return Ok(Settlement::AlreadySettled(outcome));
    }

    if outcome == TxnOutcome::Failed {
        tx.commit()?;

        state.notifier.enqueue(
            &txn.user_id,
            NotificationKind::PaymentFailed,
            serde_json::json!({
                "reference": reference,
                "course_id": txn.course_id,
            }),
        );

        tracing::info!("Settled {} as failed for user {}", reference, txn.user_id);
        return Ok(Settlement::Failed);
    }

    // Verified success: grant access. Serialization per reference already
    // happened above, so a second active enrollment here would be a
    // programming error, not a runtime race; a re-grant across a different
    // reference is a no-op inside grant_enrollment.
    queries::grant_enrollment(&tx, &txn.user_id, &txn.course_id, reference)?;

    // First paid enrollment of a referred user credits the referrer, once.
    // The UNIQUE index decides "first", not this code.
    let mut credited_referrer: Option<(String, i64)> = None;
    if let Some(rel) = queries::get_referral_relationship(&tx, &txn.user_id)? {
        let commission_cents = txn.amount_cents * state.referral_commission_percent / 100;
        let inserted = queries::try_insert_referral_credit(
            &tx,
            &CreateReferralCredit {
                referrer_id: rel.referrer_id.clone(),
                referee_id: txn.user_id.clone(),
                source_reference: reference.to_string(),
                amount_cents: commission_cents,
            },
        )?;
        if inserted {
            credited_referrer = Some((rel.referrer_id, commission_cents));
        } else {
            tracing::debug!(
                "Referral credit for referee {} already exists, skipping",
                txn.user_id
            );
        }
    }

    // Commit - the settled marker, enrollment, and credit land together or
    // not at all. Only after this does the webhook handler ack "processed".
    tx.commit()?;

    state.notifier.enqueue(
        &txn.user_id,
        NotificationKind::EnrollmentConfirmed,
        serde_json::json!({
            "reference": reference,
            "course_id": txn.course_id,
        }),
    );
    if let Some((referrer_id, commission_cents)) = &credited_referrer {
        state.notifier.enqueue(
            referrer_id,
            NotificationKind::RewardCredited,
            serde_json::json!({
                "referee_id": txn.user_id,
                "amount_cents": commission_cents,
                "reference": reference,
            }),
        );
    }

    tracing::info!(
        "Settled {}: enrollment active for user {} on course {}{}",
        reference,
        txn.user_id,
        txn.course_id,
        if credited_referrer.is_some() {
            ", referrer credited"
        } else {
            ""
        }
    );

    Ok(Settlement::Granted)
}
