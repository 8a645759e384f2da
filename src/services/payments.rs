use crate::{
    config::{GatewayConfig, StorageConfig},
    entities::{
        order::{self, OrderStatus},
        payment::{self, PaymentStatus},
        user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::cart::{merge_entitlements, CartUnit, Entitlement},
    storage::PhotoStorage,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Gateway transaction status codes, as posted back in `TxnStatus`.
pub const TXN_STATUS_SUCCESS: &str = "0";
pub const TXN_STATUS_FAILED: &str = "1";

/// Inputs to the payment-request signature. Field order in the hash is the
/// contract with the gateway and must never change.
#[derive(Debug, Clone)]
pub struct SignatureInput<'a> {
    pub merchant_password: &'a str,
    pub service_id: &'a str,
    pub payment_id: &'a str,
    pub return_url: &'a str,
    pub callback_url: &'a str,
    pub amount: Decimal,
    pub currency_code: &'a str,
    pub caller_ip: &'a str,
}

/// Serializes an amount for the gateway: exactly two decimal digits.
///
/// The gateway recomputes the signature over its own rendering of the amount;
/// any formatting drift between the two sides breaks verification silently,
/// so this is a strict serialization contract rather than a convenience.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Computes the deterministic request signature: lowercase hex SHA-256 over
/// the delimiter-free concatenation of the inputs in fixed order.
pub fn sign_request(input: &SignatureInput<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.merchant_password.as_bytes());
    hasher.update(input.service_id.as_bytes());
    hasher.update(input.payment_id.as_bytes());
    hasher.update(input.return_url.as_bytes());
    hasher.update(input.callback_url.as_bytes());
    hasher.update(format_amount(input.amount).as_bytes());
    hasher.update(input.currency_code.as_bytes());
    hasher.update(input.caller_ip.as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds the gateway payment id: `{order_no}_{yyyyMMddHHmmssSS}` where the
/// trailing two digits are centiseconds.
pub fn generate_payment_id(order_no: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}{:02}",
        order_no,
        at.format("%Y%m%d%H%M%S"),
        at.timestamp_subsec_millis() / 10
    )
}

/// The form fields posted to the gateway's payment page. Names are the
/// gateway's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayFields {
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    #[serde(rename = "PaymentID")]
    pub payment_id: String,
    #[serde(rename = "OrderNumber")]
    pub order_number: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "CurrencyCode")]
    pub currency_code: String,
    #[serde(rename = "CustName")]
    pub cust_name: String,
    #[serde(rename = "CustEmail")]
    pub cust_email: String,
    #[serde(rename = "CustPhone")]
    pub cust_phone: String,
    #[serde(rename = "ReturnURL")]
    pub return_url: String,
    #[serde(rename = "CallbackURL")]
    pub callback_url: String,
    #[serde(rename = "Signature")]
    pub signature: String,
}

/// The redirect payload handed back to the client after checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub payment_url: String,
    pub fields: GatewayFields,
}

/// Assembles the signed outbound request for one payment attempt.
pub fn build_gateway_request(
    gateway: &GatewayConfig,
    payment_id: &str,
    order_no: &str,
    amount: Decimal,
    cust_name: &str,
    cust_email: &str,
    cust_phone: &str,
    caller_ip: &str,
) -> GatewayRequest {
    let signature = sign_request(&SignatureInput {
        merchant_password: &gateway.merchant_password,
        service_id: &gateway.service_id,
        payment_id,
        return_url: &gateway.return_url,
        callback_url: &gateway.callback_url,
        amount,
        currency_code: &gateway.currency_code,
        caller_ip,
    });

    GatewayRequest {
        payment_url: gateway.payment_url.clone(),
        fields: GatewayFields {
            service_id: gateway.service_id.clone(),
            payment_id: payment_id.to_string(),
            order_number: order_no.to_string(),
            amount: format_amount(amount),
            currency_code: gateway.currency_code.clone(),
            cust_name: cust_name.to_string(),
            cust_email: cust_email.to_string(),
            cust_phone: cust_phone.to_string(),
            return_url: gateway.return_url.clone(),
            callback_url: gateway.callback_url.clone(),
            signature,
        },
    }
}

/// The asynchronous result the gateway posts to the callback endpoint.
/// `raw` preserves every posted field verbatim for the payment record.
#[derive(Debug, Clone)]
pub struct GatewayCallback {
    pub order_number: String,
    pub payment_id: String,
    pub txn_status: String,
    pub txn_id: String,
    pub raw: serde_json::Value,
}

impl GatewayCallback {
    /// Parses the gateway's form post. The four fields below are the minimum
    /// contract; everything else rides along in `raw`.
    pub fn from_form(form: HashMap<String, String>) -> Result<Self, ServiceError> {
        let required = |key: &str| {
            form.get(key)
                .cloned()
                .ok_or_else(|| ServiceError::BadRequest(format!("Missing callback field {}", key)))
        };
        let callback = Self {
            order_number: required("OrderNumber")?,
            payment_id: required("PaymentID")?,
            txn_status: required("TxnStatus")?,
            txn_id: required("TxnID")?,
            raw: serde_json::to_value(&form)?,
        };
        Ok(callback)
    }
}

/// Result of reconciling one callback, rendered into the confirmation view.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub order_id: Option<Uuid>,
    pub success: bool,
    pub message: String,
}

/// Reconciles gateway callbacks into payment/order state and download
/// entitlements.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    storage: Arc<dyn PhotoStorage>,
    storage_cfg: StorageConfig,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn PhotoStorage>,
        storage_cfg: StorageConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            storage,
            storage_cfg,
            event_sender,
        }
    }

    /// Applies one gateway callback.
    ///
    /// The payment's status is the transition guard: a callback for an
    /// already-settled payment is a no-op that reports the stored outcome, so
    /// gateway retries cannot re-run the success path. Unrecognized status
    /// codes mutate nothing.
    #[instrument(skip(self, callback), fields(payment_id = %callback.payment_id, txn_status = %callback.txn_status))]
    pub async fn handle_callback(
        &self,
        callback: GatewayCallback,
    ) -> Result<CallbackOutcome, ServiceError> {
        let payment = payment::Entity::find()
            .filter(payment::Column::PaymentId.eq(callback.payment_id.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let Some(payment) = payment else {
            warn!(payment_id = %callback.payment_id, "callback for unknown payment id");
            return Ok(CallbackOutcome {
                order_id: None,
                success: false,
                message: format!("Unknown payment {}", callback.payment_id),
            });
        };

        if payment.status.is_terminal() {
            info!(
                payment_id = %payment.payment_id,
                status = payment.status.as_str(),
                "callback replay against settled payment ignored"
            );
            return Ok(CallbackOutcome {
                order_id: Some(payment.order_id),
                success: payment.status == PaymentStatus::Succeeded,
                message: "Payment already finalized".to_string(),
            });
        }

        match callback.txn_status.as_str() {
            TXN_STATUS_SUCCESS => self.finalize_success(payment, callback).await,
            TXN_STATUS_FAILED => self.finalize_failure(payment, callback).await,
            other => {
                warn!(
                    payment_id = %payment.payment_id,
                    txn_status = %other,
                    "unrecognized gateway transaction status; no state change applied"
                );
                Ok(CallbackOutcome {
                    order_id: Some(payment.order_id),
                    success: false,
                    message: format!("Unrecognized transaction status {}", other),
                })
            }
        }
    }

    /// Success path: settle the payment, complete the order, grant download
    /// entitlements — atomically.
    async fn finalize_success(
        &self,
        payment: payment::Model,
        callback: GatewayCallback,
    ) -> Result<CallbackOutcome, ServiceError> {
        let now = Utc::now();
        let payment_id = payment.payment_id.clone();
        let order_id = payment.order_id;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, %payment_id, "failed to start reconciliation transaction");
            ServiceError::DatabaseError(e)
        })?;

        let mut payment_update: payment::ActiveModel = payment.into();
        payment_update.status = Set(PaymentStatus::Succeeded);
        payment_update.payment_detail = Set(Some(callback.raw.clone()));
        payment_update.transaction_no = Set(Some(callback.txn_id.clone()));
        payment_update.updated_at = Set(Some(now));
        payment_update
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("Payment {} has no order", payment_id))
            })?;

        let old_status = order.status;
        let cart: Vec<CartUnit> = serde_json::from_value(order.cart.clone())?;
        let user_id = order.user_id;

        if old_status.can_transition_to(OrderStatus::Completed) {
            let mut order_update: order::ActiveModel = order.into();
            order_update.status = Set(OrderStatus::Completed);
            order_update.transaction_no = Set(Some(callback.txn_id.clone()));
            order_update.success_payment_id = Set(Some(payment_id.clone()));
            order_update.updated_at = Set(Some(now));
            order_update
                .update(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        } else {
            warn!(
                %order_id,
                status = old_status.as_str(),
                "order already terminal while its payment was pending"
            );
        }

        let granted = self.grant_entitlements(&txn, user_id, &cart).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %payment_id, "failed to commit reconciliation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %payment_id, granted, "payment reconciled as successful");

        let events = [
            Event::PaymentSucceeded {
                order_id,
                payment_id: payment_id.clone(),
                transaction_no: callback.txn_id.clone(),
            },
            Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: OrderStatus::Completed.as_str().to_string(),
            },
            Event::EntitlementsGranted {
                user_id,
                order_id,
                photo_count: granted,
            },
        ];
        for event in events {
            if let Err(e) = self.event_sender.send(event).await {
                warn!(error = %e, %order_id, "failed to send reconciliation event");
            }
        }

        Ok(CallbackOutcome {
            order_id: Some(order_id),
            success: true,
            message: "Payment completed".to_string(),
        })
    }

    /// Failure path: record the callback on the payment; the order keeps its
    /// prior status so the buyer can retry.
    async fn finalize_failure(
        &self,
        payment: payment::Model,
        callback: GatewayCallback,
    ) -> Result<CallbackOutcome, ServiceError> {
        let payment_id = payment.payment_id.clone();
        let order_id = payment.order_id;

        let mut payment_update: payment::ActiveModel = payment.into();
        payment_update.status = Set(PaymentStatus::Failed);
        payment_update.payment_detail = Set(Some(callback.raw.clone()));
        payment_update.updated_at = Set(Some(Utc::now()));
        payment_update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(%order_id, %payment_id, "payment reconciled as failed");

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentFailed {
                order_id,
                payment_id,
            })
            .await
        {
            warn!(error = %e, %order_id, "failed to send payment failed event");
        }

        Ok(CallbackOutcome {
            order_id: Some(order_id),
            success: false,
            message: "Payment failed".to_string(),
        })
    }

    /// Computes the entitled photo set for the cart and merges it into the
    /// buyer's `download_images`, de-duplicated by photo id. Returns how many
    /// entries were actually added.
    async fn grant_entitlements(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        user_id: Uuid,
        cart: &[CartUnit],
    ) -> Result<usize, ServiceError> {
        let fresh: Vec<Entitlement> = cart
            .iter()
            .flat_map(|unit| unit.entitled_photos())
            .map(|photo| Entitlement {
                photo_id: photo.id,
                photo_url: photo.url.clone(),
                photo_name: photo.name.clone(),
                download_url: self
                    .storage
                    .signed_url(&photo.storage_key, self.storage_cfg.download_url_ttl_secs),
            })
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let user = user::Entity::find_by_id(user_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let existing: Vec<Entitlement> =
            serde_json::from_value(user.download_images.clone()).unwrap_or_default();
        let before = existing.len();
        let merged = merge_entitlements(&existing, fresh);
        let added = merged.len() - before;

        let mut user_update: user::ActiveModel = user.into();
        user_update.download_images = Set(serde_json::to_value(&merged)?);
        user_update.updated_at = Set(Some(Utc::now()));
        user_update
            .update(txn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn input() -> SignatureInput<'static> {
        SignatureInput {
            merchant_password: "merchant-pass",
            service_id: "SVC001",
            payment_id: "00000042_2026030912000007",
            return_url: "https://shop.example.com/payment/return",
            callback_url: "https://shop.example.com/api/v1/payments/gateway/callback",
            amount: dec!(120.50),
            currency_code: "MYR",
            caller_ip: "203.0.113.7",
        }
    }

    #[test]
    fn signature_is_deterministic() {
        assert_eq!(sign_request(&input()), sign_request(&input()));
    }

    #[test]
    fn signature_changes_with_each_bound_field() {
        let base = sign_request(&input());

        let mut changed = input();
        changed.payment_id = "00000042_2026030912000008";
        assert_ne!(base, sign_request(&changed));

        let mut changed = input();
        changed.amount = dec!(120.51);
        assert_ne!(base, sign_request(&changed));

        let mut changed = input();
        changed.currency_code = "SGD";
        assert_ne!(base, sign_request(&changed));

        let mut changed = input();
        changed.caller_ip = "203.0.113.8";
        assert_ne!(base, sign_request(&changed));
    }

    #[test]
    fn fixed_amount_width_prevents_field_bleed() {
        // "1.0" + "0MYR" must not collide with "1.00" + "MYR": the two-decimal
        // amount contract keeps the concatenation unambiguous for the formats
        // the gateway accepts.
        let mut a = input();
        a.amount = dec!(1.00);
        a.currency_code = "MYR";

        let mut b = input();
        b.amount = dec!(1.0);
        b.currency_code = "0MYR";

        assert_ne!(sign_request(&a), sign_request(&b));
    }

    #[test]
    fn amount_formats_with_exactly_two_decimals() {
        assert_eq!(format_amount(dec!(1)), "1.00");
        assert_eq!(format_amount(dec!(1.5)), "1.50");
        assert_eq!(format_amount(dec!(120.505)), "120.50");
        assert_eq!(format_amount(dec!(0.999)), "1.00");
    }

    #[test]
    fn payment_id_embeds_order_no_and_centiseconds() {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 9, 12, 0, 7)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(230))
            .unwrap();
        assert_eq!(
            generate_payment_id("00000042", at),
            "00000042_2026030912000723"
        );
    }

    #[test]
    fn gateway_fields_serialize_with_wire_names() {
        let request = build_gateway_request(
            &GatewayConfig {
                merchant_password: "mp".into(),
                service_id: "SVC001".into(),
                payment_url: "https://gateway.example.com/pay".into(),
                return_url: "https://shop.example.com/r".into(),
                callback_url: "https://shop.example.com/c".into(),
                currency_code: "MYR".into(),
            },
            "00000042_2026030912000723",
            "00000042",
            dec!(120.50),
            "Jo Lim",
            "jo@example.com",
            "+60123456789",
            "203.0.113.7",
        );

        let json = serde_json::to_value(&request.fields).unwrap();
        for key in [
            "ServiceID",
            "PaymentID",
            "OrderNumber",
            "Amount",
            "CurrencyCode",
            "CustName",
            "CustEmail",
            "CustPhone",
            "ReturnURL",
            "CallbackURL",
            "Signature",
        ] {
            assert!(json.get(key).is_some(), "missing wire field {}", key);
        }
        assert_eq!(json["Amount"], "120.50");
    }

    #[test]
    fn callback_requires_minimum_fields() {
        let mut form = HashMap::new();
        form.insert("OrderNumber".to_string(), "00000042".to_string());
        form.insert("PaymentID".to_string(), "00000042_x".to_string());
        form.insert("TxnStatus".to_string(), "0".to_string());
        assert!(GatewayCallback::from_form(form.clone()).is_err());

        form.insert("TxnID".to_string(), "TXN123".to_string());
        form.insert("Extra".to_string(), "kept".to_string());
        let callback = GatewayCallback::from_form(form).unwrap();
        assert_eq!(callback.txn_status, TXN_STATUS_SUCCESS);
        assert_eq!(callback.raw["Extra"], "kept");
    }

    proptest! {
        #[test]
        fn signature_deterministic_for_any_amount(cents in 0u64..10_000_000) {
            let amount = Decimal::new(cents as i64, 2);
            let mut a = input();
            a.amount = amount;
            let mut b = input();
            b.amount = amount;
            prop_assert_eq!(sign_request(&a), sign_request(&b));
        }

        #[test]
        fn distinct_payment_ids_never_collide(suffix_a in "[0-9]{6}", suffix_b in "[0-9]{6}") {
            prop_assume!(suffix_a != suffix_b);
            let id_a = format!("00000042_20260309{}", suffix_a);
            let id_b = format!("00000042_20260309{}", suffix_b);
            let base = input();
            let a = SignatureInput { payment_id: &id_a, ..base.clone() };
            let b = SignatureInput { payment_id: &id_b, ..base };
            prop_assert_ne!(sign_request(&a), sign_request(&b));
        }
    }
}
