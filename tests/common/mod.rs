#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};

use commerce_backend::config::ShipperConfig;
use commerce_backend::entities::orders::{PaymentProvider, PaymentStatus};
use commerce_backend::entities::users::UserRole;
use commerce_backend::entities::{affiliates, products, users};
use commerce_backend::error::{AppError, AppResult};
use commerce_backend::external::{
    Area, CourierRate, GatewayStatus, LogisticsProvider, ObjectStorage, PaymentGateway,
    PaymentGateways, PaymentIntent, PaymentRequest, RateQuery, ShipmentBooking, ShipmentRequest,
    StoredObject, TrackingEvent, TrackingInfo, UploadFile,
};
use commerce_backend::models::ShippingDetails;
use commerce_backend::services::{
    AffiliateService, CartService, OrderService, PaymentService, ShipmentService,
    WithdrawalService,
};

pub const COMMISSION_RATE_BPS: u32 = 1000;
pub const MIN_WITHDRAWAL: i64 = 50_000;

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

/// 记录调用次数的支付渠道
pub struct FakeGateway {
    provider: PaymentProvider,
    pub creates: AtomicUsize,
    pub cancels: AtomicUsize,
    pub fail_create: AtomicBool,
    pub status: Mutex<Option<GatewayStatus>>,
}

impl FakeGateway {
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            creates: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            status: Mutex::new(None),
        }
    }

    pub fn set_status(&self, raw: &str, status: PaymentStatus) {
        *self.status.lock().unwrap() = Some(GatewayStatus {
            raw_status: raw.to_string(),
            status,
            provider_transaction_id: Some("TX-POLL".to_string()),
            payment_method: Some("bank_transfer".to_string()),
        });
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<PaymentIntent> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("gateway down".to_string()));
        }
        Ok(PaymentIntent {
            payment_url: format!("https://pay.test/{}", request.order_code),
            provider_transaction_id: Some(format!("TX-{}", request.order_code)),
        })
    }

    async fn get_status(
        &self,
        _order_code: &str,
        _provider_transaction_id: Option<&str>,
    ) -> AppResult<GatewayStatus> {
        self.status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::UpstreamError("no status".to_string()))
    }

    async fn cancel(&self, _order_code: &str, _provider_transaction_id: Option<&str>) -> AppResult<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Err(AppError::UpstreamError("cancel not supported".to_string()))
    }
}

#[derive(Default)]
pub struct FakeLogistics {
    pub shipments: AtomicUsize,
    pub fail_shipment: AtomicBool,
    pub fail_tracking: AtomicBool,
}

#[async_trait]
impl LogisticsProvider for FakeLogistics {
    async fn search_areas(&self, query: &str) -> AppResult<Vec<Area>> {
        Ok(vec![Area {
            id: "IDNP6".to_string(),
            name: format!("{query}, Jakarta"),
            postal_code: Some("10110".to_string()),
        }])
    }

    async fn get_rates(&self, _query: &RateQuery) -> AppResult<Vec<CourierRate>> {
        Ok(vec![CourierRate {
            courier_company: "jne".to_string(),
            courier_service: "reg".to_string(),
            courier_name: Some("JNE".to_string()),
            price: 15_000,
            duration: Some("1 - 2 days".to_string()),
        }])
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> AppResult<ShipmentBooking> {
        if self.fail_shipment.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("logistics down".to_string()));
        }
        // 让并发的下单请求有机会交错
        tokio::task::yield_now().await;
        let n = self.shipments.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ShipmentBooking {
            tracking_id: format!("TRK-{}-{n}", request.reference_id),
            waybill_number: Some(format!("WB{n:06}")),
        })
    }

    async fn get_tracking(&self, _tracking_id: &str) -> AppResult<TrackingInfo> {
        if self.fail_tracking.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("tracking down".to_string()));
        }
        Ok(TrackingInfo {
            status: Some("picked".to_string()),
            waybill_number: None,
            history: vec![TrackingEvent {
                status: "picked".to_string(),
                note: Some("Picked up by courier".to_string()),
                updated_at: Some("2025-06-01T10:00:00+07:00".to_string()),
            }],
        })
    }
}

/// 让测试在上传进行中插入别的操作
#[derive(Default)]
pub struct UploadGate {
    pub started: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub gate: Mutex<Option<Arc<UploadGate>>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, file: &UploadFile, folder: &str) -> AppResult<StoredObject> {
        if file.bytes.is_empty() {
            return Err(AppError::ValidationError("empty file".to_string()));
        }
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let key = format!("{folder}/{n}-{}", file.filename);
        Ok(StoredObject {
            url: format!("https://files.test/{key}"),
            key,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub midtrans: Arc<FakeGateway>,
    pub xendit: Arc<FakeGateway>,
    pub logistics: Arc<FakeLogistics>,
    pub storage: Arc<FakeStorage>,
    pub shipments: ShipmentService,
    pub payments: PaymentService,
    pub orders: OrderService,
    pub carts: CartService,
    pub affiliates: AffiliateService,
    pub withdrawals: WithdrawalService,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let midtrans = Arc::new(FakeGateway::new(PaymentProvider::Midtrans));
        let xendit = Arc::new(FakeGateway::new(PaymentProvider::Xendit));
        let logistics = Arc::new(FakeLogistics::default());
        let storage = Arc::new(FakeStorage::default());

        let gateways = PaymentGateways::new(midtrans.clone(), xendit.clone()).expect("gateways");
        let shipments = ShipmentService::new(db.clone(), logistics.clone(), shipper());
        let payments = PaymentService::new(
            db.clone(),
            gateways,
            shipments.clone(),
            COMMISSION_RATE_BPS,
        );
        let orders = OrderService::new(db.clone(), payments.clone(), shipments.clone());

        Self {
            carts: CartService::new(db.clone()),
            affiliates: AffiliateService::new(db.clone(), storage.clone()),
            withdrawals: WithdrawalService::new(db.clone(), storage.clone(), MIN_WITHDRAWAL),
            db,
            midtrans,
            xendit,
            logistics,
            storage,
            shipments,
            payments,
            orders,
        }
    }
}

pub fn shipper() -> ShipperConfig {
    ShipperConfig {
        contact_name: "Toko Test".to_string(),
        contact_phone: "081200000000".to_string(),
        address: "Jl. Gudang 5".to_string(),
        postal_code: "12950".to_string(),
        area_id: None,
    }
}

pub fn shipping() -> ShippingDetails {
    ShippingDetails {
        recipient_name: "Siti".to_string(),
        recipient_phone: "081234567890".to_string(),
        recipient_address: "Jl. Melati 10".to_string(),
        recipient_city: Some("Bandung".to_string()),
        recipient_postal_code: Some("40111".to_string()),
        recipient_area_id: Some("IDNP9".to_string()),
        courier_company: "jne".to_string(),
        courier_service: "reg".to_string(),
    }
}

pub async fn seed_user(db: &DatabaseConnection, email: &str, role: UserRole) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        email: Set(email.to_string()),
        password_hash: Set("x".to_string()),
        role: Set(role),
        phone: Set(Some("081298765432".to_string())),
        address: Set(Some("Jl. Kenanga 3".to_string())),
        city: Set(Some("Jakarta".to_string())),
        postal_code: Set(Some("10110".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn seed_product(db: &DatabaseConnection, name: &str, price: i64, stock: i32) -> products::Model {
    let now = Utc::now();
    products::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        weight_grams: Set(250),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert product")
}

pub async fn seed_affiliate(
    db: &DatabaseConnection,
    user_id: i64,
    referral_code: &str,
    balance: i64,
) -> affiliates::Model {
    let now = Utc::now();
    affiliates::ActiveModel {
        user_id: Set(user_id),
        referral_code: Set(referral_code.to_string()),
        bank_type: Set("BCA".to_string()),
        account_name: Set("Affiliate".to_string()),
        account_number: Set(format!("ACC-{user_id}")),
        bank_book_image_url: Set(None),
        bank_book_image_key: Set(None),
        total_commission: Set(balance),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert affiliate")
}

pub async fn product(db: &DatabaseConnection, id: i64) -> products::Model {
    products::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query product")
        .expect("product exists")
}

pub async fn affiliate_balance(db: &DatabaseConnection, id: i64) -> i64 {
    affiliates::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query affiliate")
        .expect("affiliate exists")
        .total_commission
}

pub fn upload(name: &str) -> UploadFile {
    UploadFile {
        bytes: b"\x89PNG fake image".to_vec(),
        filename: name.to_string(),
    }
}
