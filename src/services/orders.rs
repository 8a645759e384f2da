use crate::{
    config::GatewayConfig,
    entities::{
        academic_year, album, course, institution,
        order::{self, OrderStatus},
        order_cart,
        payment::{self, PaymentStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::cart::{cart_refs, CartUnit},
    services::{
        ip_lookup::IpEcho,
        payments::{build_gateway_request, generate_payment_id, GatewayRequest},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must not be negative".into());
        Err(err)
    }
}

/// Checkout submission. Every field is required; absence fails validation
/// before any database access.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "Cart must not be empty"))]
    pub cart: Vec<CartUnit>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    #[validate(length(min = 1, message = "Shipment method is required"))]
    pub shipment_method: String,
    #[validate(custom = "validate_non_negative_decimal")]
    pub shipping_fee: Decimal,
    #[validate(custom = "validate_non_negative_decimal")]
    pub price: Decimal,
    pub remark: Option<String>,
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub cust_name: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub cust_email: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub cust_phone: String,
    pub priority: i32,
}

/// Staff-side updates.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTrackingRequest {
    #[validate(length(min = 1, message = "Tracking number is required"))]
    pub tracking_no: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePriorityRequest {
    pub priority: i32,
}

/// Returned from checkout: everything the client needs to redirect the buyer
/// to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_no: String,
    pub payment_id: String,
    pub gateway: GatewayRequest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Builds orders from cart submissions and serves the staff order console.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    gateway: GatewayConfig,
    ip_source: Arc<dyn IpEcho>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: GatewayConfig,
        ip_source: Arc<dyn IpEcho>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            gateway,
            ip_source,
            event_sender,
        }
    }

    /// Builds an order from a cart submission.
    ///
    /// Validates that every institution, academic year, course and album the
    /// cart references still exists and is enabled (a cheap existence check —
    /// prices stay frozen in the snapshot), then persists the order, its
    /// flattened cart rows and the signed payment request in one transaction.
    /// No partial order can exist without its payment request.
    #[instrument(skip(self, request), fields(user_id = %user_id, units = request.cart.len()))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for unit in &request.cart {
            unit.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        }

        self.check_cart_references(&request.cart).await?;

        let db = &*self.db;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_no = next_order_no(&txn).await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_no: Set(order_no.clone()),
            user_id: Set(user_id),
            cust_name: Set(request.cust_name.clone()),
            cust_email: Set(request.cust_email.clone()),
            cust_phone: Set(request.cust_phone.clone()),
            shipping_address: Set(request.shipping_address.clone()),
            shipment_method: Set(request.shipment_method.clone()),
            cart: Set(serde_json::to_value(&request.cart)?),
            price: Set(request.price),
            shipping_fee: Set(request.shipping_fee),
            payment_method: Set(request.payment_method.clone()),
            status: Set(OrderStatus::Pending),
            tracking_no: Set(None),
            transaction_no: Set(None),
            success_payment_id: Set(None),
            remark: Set(request.remark.clone()),
            priority: Set(request.priority),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        order_model
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        for unit in &request.cart {
            let (unit_kind, institution_id, photo_id, package_id) = match unit {
                CartUnit::Product(p) => {
                    ("product", p.institution_id, Some(p.photo.id), None)
                }
                CartUnit::Package(p) => {
                    let institution_id = p
                        .items
                        .first()
                        .map(|item| item.institution_id)
                        .unwrap_or_default();
                    ("package", institution_id, None, Some(p.package_id))
                }
            };
            let row = order_cart::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                unit_kind: Set(unit_kind.to_string()),
                institution_id: Set(institution_id),
                photo_id: Set(photo_id),
                package_id: Set(package_id),
                description: Set(unit.description()),
                amount: Set(unit.amount()),
                grants_download: Set(unit.grants_download()),
                created_at: Set(now),
            };
            row.insert(&txn).await.map_err(ServiceError::db_error)?;
        }

        // The payable amount and the gateway request are part of the same
        // atomic unit: if the IP echo or the payment insert fails, the order
        // and its cart rows roll back with it.
        let caller_ip = self.ip_source.public_ip().await?;
        let payment_id = generate_payment_id(&order_no, now);
        let amount = request.price + request.shipping_fee;

        let gateway_request = build_gateway_request(
            &self.gateway,
            &payment_id,
            &order_no,
            amount,
            &request.cust_name,
            &request.cust_email,
            &request.cust_phone,
            &caller_ip,
        );

        let payment_model = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            payment_id: Set(payment_id.clone()),
            amount: Set(amount),
            currency: Set(self.gateway.currency_code.clone()),
            status: Set(PaymentStatus::Pending),
            request_detail: Set(serde_json::to_value(&gateway_request)?),
            payment_detail: Set(None),
            transaction_no: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        payment_model
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %order_no, %payment_id, "Order created");

        let events = [
            Event::OrderCreated {
                order_id,
                order_no: order_no.clone(),
                amount,
            },
            Event::PaymentRequested {
                order_id,
                payment_id: payment_id.clone(),
                amount,
            },
        ];
        for event in events {
            if let Err(e) = self.event_sender.send(event).await {
                warn!(error = %e, %order_id, "Failed to send order event");
            }
        }

        Ok(CheckoutResponse {
            order_id,
            order_no,
            payment_id,
            gateway: gateway_request,
        })
    }

    /// Existence + enablement check over every catalog id the cart touches.
    /// Counts are compared against the de-duplicated reference sets; any
    /// shortfall names the first entity class that failed.
    async fn check_cart_references(&self, cart: &[CartUnit]) -> Result<(), ServiceError> {
        let refs = cart_refs(cart);
        let db = &*self.db;

        let enabled_institutions = institution::Entity::find()
            .filter(institution::Column::Id.is_in(ids(&refs.institutions)))
            .filter(institution::Column::IsEnabled.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if (enabled_institutions as usize) < refs.institutions.len() {
            return Err(ServiceError::InvalidReference("Institution".to_string()));
        }

        let enabled_years = academic_year::Entity::find()
            .filter(academic_year::Column::Id.is_in(ids(&refs.academic_years)))
            .filter(academic_year::Column::IsEnabled.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if (enabled_years as usize) < refs.academic_years.len() {
            return Err(ServiceError::InvalidReference("Academic Year".to_string()));
        }

        let enabled_courses = course::Entity::find()
            .filter(course::Column::Id.is_in(ids(&refs.courses)))
            .filter(course::Column::IsEnabled.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if (enabled_courses as usize) < refs.courses.len() {
            return Err(ServiceError::InvalidReference("Course".to_string()));
        }

        let enabled_albums = album::Entity::find()
            .filter(album::Column::Id.is_in(ids(&refs.albums)))
            .filter(album::Column::IsEnabled.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if (enabled_albums as usize) < refs.albums.len() {
            return Err(ServiceError::InvalidReference("Album".to_string()));
        }

        Ok(())
    }

    /// Retrieves an order by ID
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists orders with pagination, newest first, optionally filtered by
    /// status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Records the shipment tracking number on an order.
    #[instrument(skip(self, request))]
    pub async fn update_tracking(
        &self,
        order_id: Uuid,
        request: UpdateTrackingRequest,
    ) -> Result<order::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let order = self.require_order(order_id).await?;
        let mut update: order::ActiveModel = order.into();
        update.tracking_no = Set(Some(request.tracking_no));
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Adjusts fulfilment priority.
    #[instrument(skip(self, request))]
    pub async fn update_priority(
        &self,
        order_id: Uuid,
        request: UpdatePriorityRequest,
    ) -> Result<order::Model, ServiceError> {
        let order = self.require_order(order_id).await?;
        let mut update: order::ActiveModel = order.into();
        update.priority = Set(request.priority);
        update.updated_at = Set(Some(Utc::now()));
        update.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Staff status override, constrained by the order transition table.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = self.require_order(order_id).await?;
        let old_status = order.status;

        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Order cannot move from {} to {}",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let mut update: order::ActiveModel = order.into();
        update.status = Set(new_status);
        update.updated_at = Set(Some(Utc::now()));
        let updated = update
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, %order_id, "Failed to send order status changed event");
        }

        Ok(updated)
    }

    async fn require_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        self.get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}

fn ids(set: &BTreeSet<Uuid>) -> Vec<Uuid> {
    set.iter().copied().collect()
}

/// Next sequential human-facing order number, zero-padded so lexicographic
/// and numeric order agree. Runs inside the creation transaction; the unique
/// constraint on `order_no` backstops concurrent checkouts.
async fn next_order_no(txn: &DatabaseTransaction) -> Result<String, ServiceError> {
    let last = order::Entity::find()
        .order_by_desc(order::Column::OrderNo)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?;

    let next = last
        .and_then(|order| order.order_no.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;

    Ok(format!("{:08}", next))
}
